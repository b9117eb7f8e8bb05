use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::watch;

use crate::aggregator::{format_second, SecondAggregator};
use crate::config::Config;
use crate::error::TrackerError;
use crate::feed::{MarketFeed, ReceiveOutcome};
use crate::model::tick::Tick;
use crate::persist::{should_flush, CsvPersister, FlushWatermark};

/// Connection state of the feed loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    Disconnected,
    Subscribing,
    Streaming,
}

/// Subscribes to one symbol, folds ticks into per-second buckets and
/// appends them to CSV whenever a new second starts.
pub struct PriceTracker<F: MarketFeed> {
    symbol: String,
    feed: F,
    aggregator: SecondAggregator,
    persister: CsvPersister,
    watermark: FlushWatermark,
    reconnect_delay: Duration,
    state: FeedState,
}

impl<F: MarketFeed> PriceTracker<F> {
    pub fn new(config: &Config, feed: F, output_path: PathBuf) -> Result<Self, TrackerError> {
        Ok(Self {
            symbol: config.binance.symbol.trim().to_ascii_uppercase(),
            feed,
            aggregator: SecondAggregator::new(),
            persister: CsvPersister::new(output_path)?,
            watermark: None,
            reconnect_delay: Duration::from_millis(config.reconnect.delay_ms),
            state: FeedState::Disconnected,
        })
    }

    pub fn state(&self) -> FeedState {
        self.state
    }

    pub fn watermark(&self) -> FlushWatermark {
        self.watermark
    }

    pub fn pending(&self) -> &SecondAggregator {
        &self.aggregator
    }

    pub fn output_path(&self) -> &Path {
        self.persister.path()
    }

    pub fn feed(&self) -> &F {
        &self.feed
    }

    pub async fn initialize(&mut self) -> Result<(), TrackerError> {
        self.feed.open_session().await
    }

    /// Run the subscribe/receive loop until `shutdown` flips, reconnecting after
    /// every failure with a fixed delay.
    pub async fn start(&mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(symbol = %self.symbol, "Starting price tracking");
        let mut attempt: u32 = 0;

        while !*shutdown.borrow() {
            attempt += 1;
            match self.run_session(&mut shutdown).await {
                Ok(()) => break,
                Err(e) => {
                    self.state = FeedState::Disconnected;
                    tracing::error!(
                        error = %e,
                        attempt,
                        delay_ms = self.reconnect_delay.as_millis() as u64,
                        pending = self.aggregator.len(),
                        "Feed error, reconnecting"
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(self.reconnect_delay) => {}
                        _ = shutdown.changed() => break,
                    }
                }
            }
        }

        self.state = FeedState::Disconnected;
        tracing::info!(symbol = %self.symbol, "Price tracking stopped");
    }

    /// One subscription lifetime. `Ok` means shutdown was requested.
    async fn run_session(
        &mut self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<(), TrackerError> {
        self.state = FeedState::Subscribing;
        tokio::select! {
            res = self.feed.subscribe() => res?,
            _ = shutdown.changed() => return Ok(()),
        }

        self.state = FeedState::Streaming;
        tracing::info!(symbol = %self.symbol, "Subscribed to one-second klines");

        loop {
            let outcome = tokio::select! {
                outcome = self.feed.recv() => outcome,
                _ = shutdown.changed() => return Ok(()),
            };
            self.handle_outcome(outcome)?;
        }
    }

    /// Apply one receive outcome. Only connection errors are returned.
    pub fn handle_outcome(&mut self, outcome: ReceiveOutcome) -> Result<(), TrackerError> {
        match outcome {
            ReceiveOutcome::Tick(tick) => {
                self.on_tick(tick);
                Ok(())
            }
            ReceiveOutcome::TickError(reason) => {
                tracing::warn!(error = %reason, "Dropping malformed tick");
                Ok(())
            }
            ReceiveOutcome::ConnectionError(reason) => Err(TrackerError::Connection(reason)),
        }
    }

    /// Flush on the first tick of a new second, then fold the tick into its bucket.
    pub fn on_tick(&mut self, tick: Tick) {
        let current_second = tick.second();
        let key = match format_second(current_second) {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!(error = %e, event_time_ms = tick.event_time_ms, "Dropping tick");
                return;
            }
        };

        if should_flush(self.watermark, current_second) {
            self.flush();
            self.watermark = Some(current_second);
        }

        tracing::info!(symbol = %self.symbol, time = %key, price = tick.price, "Tick");
        self.aggregator.record(key, tick.price);
    }

    /// Write pending buckets. Failed writes keep the buckets for the next attempt.
    pub fn flush(&mut self) -> Option<usize> {
        match self.persister.flush(&mut self.aggregator) {
            Ok(0) => Some(0),
            Ok(rows) => {
                tracing::info!(rows, path = %self.persister.path().display(), "Saved prices");
                Some(rows)
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    pending = self.aggregator.len(),
                    "Failed to save prices, keeping rows for retry"
                );
                None
            }
        }
    }

    /// Flush the last partial second, then close the feed session.
    pub async fn cleanup(&mut self) {
        if !self.aggregator.is_empty() {
            self.flush();
        }
        self.feed.close().await;
        self.state = FeedState::Disconnected;
        tracing::info!(path = %self.persister.path().display(), "Tracker cleaned up");
    }
}
