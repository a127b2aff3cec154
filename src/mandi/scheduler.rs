use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{Local, NaiveDate};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::context::PriceContext;
use super::disk_cache::DiskPriceCache;
use super::mandi_client::PriceSource;
use crate::utility::timing::{AggregateTimer, Timer};

/// States refreshed and skipped in one pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RefreshReport {
    pub refreshed: Vec<String>,
    pub skipped: Vec<String>,
}

/// Keeps every known state's disk snapshot warm so request-path resolutions rarely
/// need a live fetch. One pass walks all states with a fixed pause between them, then
/// sleeps until the next pass. Only today's date is fetched.
pub struct RefreshScheduler {
    source: Arc<dyn PriceSource>,
    cache: DiskPriceCache,
    states: Vec<String>,
    state_delay: Duration,
    pass_interval: Duration,
    max_passes: Option<usize>,
    running: AtomicBool,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl RefreshScheduler {
    pub fn new(context: &PriceContext, source: Arc<dyn PriceSource>, cache: DiskPriceCache) -> Self {
        Self::with_states(context.districts.states(), source, cache)
            .with_timing(context.config.refresh_state_delay, context.config.refresh_pass_interval)
    }

    pub fn with_states(states: Vec<String>, source: Arc<dyn PriceSource>, cache: DiskPriceCache) -> Self {
        Self {
            source,
            cache,
            states,
            state_delay: super::config::REFRESH_STATE_DELAY,
            pass_interval: super::config::REFRESH_PASS_INTERVAL,
            max_passes: None,
            running: AtomicBool::new(false),
            handle: Mutex::new(None),
        }
    }

    pub fn with_timing(mut self, state_delay: Duration, pass_interval: Duration) -> Self {
        self.state_delay = state_delay;
        self.pass_interval = pass_interval;
        self
    }

    /// Stop after `passes` passes instead of running for the process lifetime
    pub fn with_max_passes(mut self, passes: usize) -> Self {
        self.max_passes = Some(passes);
        self
    }

    pub fn states(&self) -> &[String] {
        &self.states
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Spawn the refresh loop. Returns `false` without spawning when a loop is
    /// already running.
    pub fn start(self: &Arc<Self>, shutdown: watch::Receiver<bool>) -> bool {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::info!("Cache updater already running");
            return false;
        }

        if self.states.is_empty() {
            tracing::error!("Cache updater has no states to refresh, district map not loaded");
        }

        tracing::info!("Starting background cache refresh for {} states", self.states.len());
        let scheduler = Arc::clone(self);
        let handle = tokio::spawn(async move {
            scheduler.run(shutdown).await;
            scheduler.running.store(false, Ordering::SeqCst);
        });

        *self.handle.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
        true
    }

    /// Wait for the spawned loop to exit
    pub async fn join(&self) {
        let handle = self.handle.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!("Cache updater task failed: {}", e);
            }
        }
    }

    async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut passes = 0usize;

        loop {
            let report = self.refresh_pass(Local::now().date_naive(), &mut shutdown).await;
            passes += 1;
            tracing::info!(
                refreshed = report.refreshed.len(),
                skipped = report.skipped.len(),
                "Cache updater pass {} complete",
                passes
            );

            if self.max_passes.is_some_and(|max| passes >= max) {
                break;
            }

            tracing::info!("Cache updater sleeping for {}s", self.pass_interval.as_secs());
            if sleep_or_shutdown(self.pass_interval, &mut shutdown).await {
                break;
            }
        }

        tracing::info!("Cache updater stopped");
    }

    /// One pass over every state for `date`
    pub async fn refresh_all(&self, date: NaiveDate) -> RefreshReport {
        // Nothing ever signals this receiver, so the pass runs to completion
        let (_tx, mut rx) = watch::channel(false);
        self.refresh_pass(date, &mut rx).await
    }

    async fn refresh_pass(&self, date: NaiveDate, shutdown: &mut watch::Receiver<bool>) -> RefreshReport {
        let _pass_timer = Timer::start(format!("Cache refresh pass for {}", date));
        let mut fetch_times = AggregateTimer::new("Cache refresh fetches");
        let mut report = RefreshReport::default();

        for (idx, state) in self.states.iter().enumerate() {
            if idx > 0 && sleep_or_shutdown(self.state_delay, shutdown).await {
                tracing::info!("Cache updater interrupted mid-pass");
                break;
            }

            let started = Instant::now();
            let fetched = self.source.fetch_live(state, date).await;
            fetch_times.record(started.elapsed());

            match fetched {
                Ok(records) if !records.is_empty() => match self.cache.store(state, &records).await {
                    Ok(()) => {
                        tracing::info!("Refreshed cache for '{}'", state);
                        report.refreshed.push(state.clone());
                    }
                    Err(e) => {
                        tracing::error!("Cache updater could not save '{}': {}", state, e);
                        report.skipped.push(state.clone());
                    }
                },
                Ok(_) => {
                    tracing::warn!("No live data for '{}' on {}, cache not updated", state, date);
                    report.skipped.push(state.clone());
                }
                Err(e) => {
                    tracing::warn!("Could not fetch live data for '{}': {}. Cache not updated", state, e);
                    report.skipped.push(state.clone());
                }
            }
        }

        fetch_times.summary();
        report
    }
}

/// Sleep for `duration`; returns `true` early if shutdown is signalled
async fn sleep_or_shutdown(duration: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    let deadline = tokio::time::Instant::now() + duration;

    loop {
        if *shutdown.borrow() {
            return true;
        }

        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => return false,
            changed = shutdown.changed() => {
                if changed.is_err() {
                    // No sender left, nobody can ask us to stop
                    tokio::time::sleep_until(deadline).await;
                    return false;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sleep_or_shutdown_wakes_on_signal() {
        let (tx, mut rx) = watch::channel(false);
        let waiter = tokio::spawn(async move { sleep_or_shutdown(Duration::from_secs(60), &mut rx).await });
        tx.send(true).unwrap();
        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn test_sleep_or_shutdown_times_out() {
        let (_tx, mut rx) = watch::channel(false);
        assert!(!sleep_or_shutdown(Duration::from_millis(5), &mut rx).await);
    }
}
