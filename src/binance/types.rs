use serde::Deserialize;

use crate::model::tick::Tick;

/// Deserialize Binance string-encoded numbers to f64.
pub fn string_to_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let v = s.parse::<f64>().map_err(serde::de::Error::custom)?;
    if !v.is_finite() {
        return Err(serde::de::Error::custom(format!("non-finite price '{}'", s)));
    }
    Ok(v)
}

/// Binance kline stream event (symbol@kline_<interval>).
///
/// Only `E` and `k.c` are required; the rest are informational.
#[derive(Debug, Deserialize)]
pub struct BinanceKlineEvent {
    #[serde(rename = "e", default)]
    pub event_type: String,
    #[serde(rename = "E")]
    pub event_time: u64,
    #[serde(rename = "s", default)]
    pub symbol: String,
    #[serde(rename = "k")]
    pub kline: BinanceKline,
}

#[derive(Debug, Deserialize)]
pub struct BinanceKline {
    #[serde(rename = "t", default)]
    pub open_time: u64,
    #[serde(rename = "T", default)]
    pub close_time: u64,
    #[serde(rename = "i", default)]
    pub interval: String,
    #[serde(rename = "o", default, deserialize_with = "string_to_f64")]
    pub open: f64,
    #[serde(rename = "c", deserialize_with = "string_to_f64")]
    pub close: f64,
    #[serde(rename = "x", default)]
    pub is_closed: bool,
}

impl BinanceKlineEvent {
    pub fn to_tick(&self) -> Tick {
        Tick::new(self.kline.close, self.event_time)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerTimeResponse {
    pub server_time: u64,
}
