use anyhow::{anyhow, Context, Result};
use tokio::sync::watch;

use price_tick_logger::binance::ws::BinanceKlineFeed;
use price_tick_logger::config::{Config, LoggingConfig};
use price_tick_logger::tracker::PriceTracker;

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Resolves on SIGINT, or SIGTERM where available.
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable, listening for Ctrl+C only");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.ok();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider (required by rustls 0.23+)
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("failed to install rustls crypto provider"))?;

    let config = Config::load().context("failed to load config")?;
    init_tracing(&config.logging);

    let output_path = config.storage.output_path(chrono::Local::now());
    let feed = BinanceKlineFeed::new(&config.binance)?;
    let mut tracker = PriceTracker::new(&config, feed, output_path)?;

    tracing::info!(
        symbol = %config.binance.symbol,
        ws_url = %tracker.feed().url(),
        output = %tracker.output_path().display(),
        "Starting price-tick-logger"
    );

    tracker
        .initialize()
        .await
        .context("failed to establish Binance session")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    tracker.start(shutdown_rx).await;
    tracker.cleanup().await;

    tracing::info!("Shutdown complete");
    Ok(())
}
