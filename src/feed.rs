use std::future::Future;

use crate::error::TrackerError;
use crate::model::tick::Tick;

/// Result of a single receive on a streaming feed.
#[derive(Debug, Clone, PartialEq)]
pub enum ReceiveOutcome {
    Tick(Tick),
    /// The message arrived but could not be turned into a tick. The session is still usable.
    TickError(String),
    /// The session is broken and must be re-subscribed.
    ConnectionError(String),
}

/// Streaming market-data source for a single symbol.
pub trait MarketFeed {
    /// Establish the client session. Failure here is fatal for the process.
    fn open_session(&mut self) -> impl Future<Output = Result<(), TrackerError>> + Send;

    /// Open a new one-second kline subscription, replacing any previous one.
    fn subscribe(&mut self) -> impl Future<Output = Result<(), TrackerError>> + Send;

    fn recv(&mut self) -> impl Future<Output = ReceiveOutcome> + Send;

    fn close(&mut self) -> impl Future<Output = ()> + Send;
}
