use std::collections::BTreeMap;

use chrono::{Local, TimeZone};

use crate::error::TrackerError;
use crate::model::tick::Tick;

/// Local-time `YYYY-MM-DD HH:MM:SS` label for a whole second since epoch.
///
/// Zero-padded, so lexical order of labels matches chronological order
/// (outside of a DST fall-back hour, where the earliest mapping is used).
pub fn format_second(second: u64) -> Result<String, TrackerError> {
    let secs = i64::try_from(second)
        .map_err(|_| TrackerError::TickParse(format!("timestamp {} out of range", second)))?;
    Local
        .timestamp_opt(secs, 0)
        .earliest()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .ok_or_else(|| TrackerError::TickParse(format!("timestamp {} out of range", second)))
}

/// First and last price observed within one second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SecondPrices {
    pub first_price: f64,
    pub last_price: f64,
}

/// Pending per-second buckets that have not been written yet, ordered by label.
#[derive(Debug, Default)]
pub struct SecondAggregator {
    buckets: BTreeMap<String, SecondPrices>,
}

impl SecondAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a tick into its second's bucket and return the bucket label.
    pub fn update(&mut self, tick: &Tick) -> Result<String, TrackerError> {
        let key = format_second(tick.second())?;
        self.record(key.clone(), tick.price);
        Ok(key)
    }

    /// Fold a price into an already-formatted bucket label.
    pub fn record(&mut self, key: String, price: f64) {
        self.buckets
            .entry(key)
            .and_modify(|p| p.last_price = price)
            .or_insert(SecondPrices {
                first_price: price,
                last_price: price,
            });
    }

    pub fn get(&self, key: &str) -> Option<SecondPrices> {
        self.buckets.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Rows in ascending timestamp order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, SecondPrices)> {
        self.buckets.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
    }
}
