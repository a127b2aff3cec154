// ============================================
// TIMING UTILITY - Performance Measurement
// ============================================
// Usage:
//   1. Manual tracking: let timer = Timer::start("name"); ... timer.stop();
//   2. Only log slow work: Timer::start_with_threshold("name", 1000)
//   3. Async wrapper: Timer::measure_async("name", || async { .. }).await
//   4. Batch stats: AggregateTimer::new("name"), record(..), summary()
// ============================================

use std::time::{Duration, Instant};

/// Timer for measuring execution time, logged through `tracing`
pub struct Timer {
    name: String,
    start: Instant,
    threshold_ms: u128,
    silent: bool,
}

impl Timer {
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: Instant::now(),
            threshold_ms: 0,
            silent: false,
        }
    }

    /// Create a timer that only logs if execution exceeds threshold (in milliseconds)
    pub fn start_with_threshold(name: impl Into<String>, threshold_ms: u128) -> Self {
        Self {
            name: name.into(),
            start: Instant::now(),
            threshold_ms,
            silent: false,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and log the result
    pub fn stop(mut self) -> Duration {
        let duration = self.start.elapsed();
        self.log_duration(duration);
        self.silent = true;
        duration
    }

    fn log_duration(&self, duration: Duration) {
        if self.silent {
            return;
        }

        let ms = duration.as_millis();
        if ms < self.threshold_ms {
            return;
        }

        match ms {
            0..=5000 => tracing::info!(elapsed_ms = ms as u64, "{} finished", self.name),
            _ => tracing::warn!(elapsed_ms = ms as u64, "{} was slow", self.name),
        }
    }

    /// Time an async function
    pub async fn measure_async<F, Fut, R>(name: impl Into<String>, f: F) -> R
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = R>,
    {
        let timer = Self::start(name);
        let result = f().await;
        timer.stop();
        result
    }
}

// Auto-log on drop if not silent
impl Drop for Timer {
    fn drop(&mut self) {
        if !self.silent {
            let duration = self.start.elapsed();
            self.log_duration(duration);
        }
    }
}

// ============================================
// AGGREGATE TIMING FOR BATCH OPERATIONS
// ============================================

/// Aggregate timer for tracking multiple operations
pub struct AggregateTimer {
    name: String,
    count: usize,
    total_duration: Duration,
    min_duration: Option<Duration>,
    max_duration: Option<Duration>,
}

impl AggregateTimer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            count: 0,
            total_duration: Duration::ZERO,
            min_duration: None,
            max_duration: None,
        }
    }

    /// Record a single operation duration
    pub fn record(&mut self, duration: Duration) {
        self.count += 1;
        self.total_duration += duration;
        self.min_duration = Some(self.min_duration.map_or(duration, |min| min.min(duration)));
        self.max_duration = Some(self.max_duration.map_or(duration, |max| max.max(duration)));
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn avg_duration(&self) -> Option<Duration> {
        if self.count == 0 {
            None
        } else {
            Some(self.total_duration / self.count as u32)
        }
    }

    /// Log summary statistics
    pub fn summary(&self) {
        if self.count == 0 {
            tracing::info!("{} - no operations recorded", self.name);
            return;
        }

        tracing::info!(
            count = self.count,
            total_ms = self.total_duration.as_millis() as u64,
            avg_ms = self.avg_duration().map(|d| d.as_millis() as u64).unwrap_or(0),
            min_ms = self.min_duration.map(|d| d.as_millis() as u64).unwrap_or(0),
            max_ms = self.max_duration.map(|d| d.as_millis() as u64).unwrap_or(0),
            "{} - summary",
            self.name
        );
    }
}
