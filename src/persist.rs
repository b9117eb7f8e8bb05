use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::aggregator::SecondAggregator;
use crate::error::TrackerError;

/// Last whole second that triggered a flush. `None` until the first tick.
pub type FlushWatermark = Option<u64>;

/// A flush is due on the first tick of a second later than the watermark.
pub fn should_flush(watermark: FlushWatermark, current_second: u64) -> bool {
    match watermark {
        None => true,
        Some(last) => current_second > last,
    }
}

#[derive(Debug, Serialize)]
struct PriceRow<'a> {
    timestamp: &'a str,
    first_price: f64,
    last_price: f64,
}

/// Appends per-second price rows to a single CSV file.
#[derive(Debug, Clone)]
pub struct CsvPersister {
    path: PathBuf,
}

impl CsvPersister {
    /// Creates the parent directory if needed. The file itself is created on first flush.
    pub fn new(path: PathBuf) -> Result<Self, TrackerError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write every pending bucket, oldest first, and clear the table.
    ///
    /// Returns the number of rows written. On failure the table is left untouched
    /// so the next flush retries the same rows.
    pub fn flush(&self, table: &mut SecondAggregator) -> Result<usize, TrackerError> {
        if table.is_empty() {
            return Ok(0);
        }
        let rows = table.len();
        self.write_rows(table)
            .map_err(|e| TrackerError::Persistence(format!("{}: {}", self.path.display(), e)))?;
        table.clear();
        tracing::debug!(rows, path = %self.path.display(), "Appended price rows");
        Ok(rows)
    }

    fn write_rows(&self, table: &SecondAggregator) -> Result<(), TrackerError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        // Header only goes into an empty file, including one left behind by a failed write.
        let needs_header = file.metadata()?.len() == 0;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        for (timestamp, prices) in table.iter() {
            writer.serialize(PriceRow {
                timestamp,
                first_price: prices.first_price,
                last_price: prices.last_price,
            })?;
        }
        writer.flush()?;
        Ok(())
    }
}
