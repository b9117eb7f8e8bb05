/// One close-price update for the tracked symbol.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub price: f64,
    pub event_time_ms: u64,
}

impl Tick {
    pub fn new(price: f64, event_time_ms: u64) -> Self {
        Self {
            price,
            event_time_ms,
        }
    }

    /// Whole second (since epoch) this tick falls in; sub-second part is truncated.
    pub fn second(&self) -> u64 {
        self.event_time_ms / 1_000
    }
}
