mod app_config;

use std::sync::Arc;

use anyhow::{Context, Result};
use app_config::AppConfig;
use colored::Colorize;
use mandi_price::logging::init_logging;
use mandi_price::mandi::{MandiClient, MandiConfig, PriceContext, PriceResolver, PriceSource, RefreshScheduler};
use tokio::sync::watch;

/// Resolve one price and print it as JSON
async fn run_resolve(resolver: &PriceResolver, app: &AppConfig) -> Result<()> {
    println!(
        "{} Resolving {} in {}...",
        "→".cyan(),
        app.commodity.yellow(),
        app.district.yellow()
    );

    match app.area_acres {
        Some(area) => {
            let state = resolver.state_for(&app.district, app.state.as_deref())?;
            let estimate = resolver.estimate_revenue(&state, &app.district, &app.commodity, area).await;
            println!("{}", serde_json::to_string_pretty(&estimate)?);
        }
        None => {
            let result = resolver
                .resolve_price_for_district(&app.district, &app.commodity, app.state.as_deref())
                .await
                .context("Price resolution failed")?;

            let marker = if result.is_found() { "✓".green() } else { "✗".red() };
            println!("{} {}", marker, result.note);
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}

async fn run_summary(resolver: &PriceResolver, app: &AppConfig) -> Result<()> {
    let state = resolver.state_for(&app.district, app.state.as_deref())?;

    println!("{} Dashboard prices for {}, {}", "→".cyan(), app.district.yellow(), state.yellow());
    let summary = resolver.dashboard_summary(&state, &app.district).await;

    for (label, price) in summary.labels.iter().zip(summary.prices.iter()) {
        println!("  {} {:<8} ₹{}", "•".blue(), label, price);
    }
    if !summary.note.is_empty() {
        println!("{} {}", "ℹ".blue(), summary.note);
    }
    println!();
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}

/// Keep the disk cache warm until Ctrl-C
async fn run_daemon(context: &PriceContext, resolver: &PriceResolver) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = Arc::new(RefreshScheduler::new(
        context,
        Arc::clone(resolver.source()),
        resolver.cache().clone(),
    ));

    if !scheduler.start(shutdown_rx) {
        println!("{} Cache updater already running", "ℹ".blue());
        return Ok(());
    }
    println!(
        "{} Cache updater running for {} states, press Ctrl-C to stop",
        "✓".green(),
        scheduler.states().len()
    );

    tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl-C")?;
    println!("{} Shutting down...", "⚠".yellow());

    let _ = shutdown_tx.send(true);
    scheduler.join().await;
    println!("{} Cache updater stopped", "✓".green());

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging().context("Failed to initialize logging")?;

    let app = AppConfig::from_env();
    app.validate()?;
    app.print_banner();

    let config = MandiConfig::from_env();
    if config.api_key.is_none() {
        println!("{} DATA_GOV_IN_API_KEY not set, live prices disabled", "⚠".yellow());
    }

    let client = MandiClient::new(&config).context("Failed to build the mandi API client")?;
    let context = Arc::new(PriceContext::load(config).context("Failed to load price data")?);
    let source: Arc<dyn PriceSource> = Arc::new(client);
    let resolver = PriceResolver::new(Arc::clone(&context), source);

    match app.mode.as_str() {
        "daemon" => run_daemon(&context, &resolver).await?,
        "summary" => run_summary(&resolver, &app).await?,
        _ => run_resolve(&resolver, &app).await?,
    }

    println!();
    println!("{}", "=".repeat(60).blue());
    println!("{}", "Done!".green().bold());
    println!("{}", "=".repeat(60).blue());

    Ok(())
}
