use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// `data/` under the project root, independent of the working directory.
pub fn default_data_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("data")
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub binance: BinanceConfig,
    pub storage: StorageConfig,
    pub reconnect: ReconnectConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BinanceConfig {
    pub rest_base_url: String,
    pub ws_base_url: String,
    pub symbol: String,
    pub kline_interval: String,
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            rest_base_url: "https://api.binance.com".to_string(),
            ws_base_url: "wss://stream.binance.com:9443/ws".to_string(),
            symbol: "btcusdt".to_string(),
            kline_interval: "1s".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub file_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            file_prefix: "btc_prices".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Fixed wait between a failed subscription or receive and the next attempt.
    pub delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self { delay_ms: 1_000 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Parse a Binance kline interval string (e.g. "1s", "1m", "1h", "1d") into milliseconds.
pub fn parse_interval_ms(s: &str) -> Result<u64> {
    if s.len() < 2 {
        bail!("invalid interval '{}': expected format like '1s'", s);
    }

    let (num_str, suffix) = s.split_at(s.len() - 1);
    let n: u64 = num_str
        .parse()
        .with_context(|| format!("invalid interval '{}': quantity must be an integer", s))?;
    if n == 0 {
        bail!("invalid interval '{}': quantity must be > 0", s);
    }

    let unit_ms = match suffix {
        "s" => 1_000,
        "m" => 60_000,
        "h" => 3_600_000,
        "d" => 86_400_000,
        _ => bail!("invalid interval '{}': unsupported suffix '{}'", s, suffix),
    };

    n.checked_mul(unit_ms)
        .with_context(|| format!("invalid interval '{}': value is too large", s))
}

impl BinanceConfig {
    /// Lower-cased symbol as used in stream names (`btcusdt@kline_1s`).
    pub fn stream_symbol(&self) -> String {
        self.symbol.trim().to_ascii_lowercase()
    }

    pub fn kline_stream(&self) -> String {
        format!("{}@kline_{}", self.stream_symbol(), self.kline_interval)
    }
}

impl StorageConfig {
    /// Output path for a run started at `started_at`, e.g. `data/btc_prices_20240101_120000.csv`.
    pub fn output_path(&self, started_at: chrono::DateTime<chrono::Local>) -> PathBuf {
        self.data_dir.join(format!(
            "{}_{}.csv",
            self.file_prefix,
            started_at.format("%Y%m%d_%H%M%S")
        ))
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let lookup = |key: &str| std::env::var(key).ok();

        let mut config = match lookup("TICK_LOGGER_CONFIG") {
            Some(path) => Self::from_path(Path::new(&path))?,
            None => Self::from_default_path(Path::new(DEFAULT_CONFIG_PATH))?,
        };
        config.apply_env_overrides(lookup);

        config.validate()?;
        Ok(config)
    }

    /// Like `from_path`, but a missing file yields built-in defaults.
    pub fn from_default_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::from_path(path)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&config_str).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Applies `DATA_DIR` and `TICK_LOGGER_SYMBOL` on top of file values.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup("DATA_DIR").filter(|d| !d.trim().is_empty()) {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(symbol) = lookup("TICK_LOGGER_SYMBOL") {
            self.binance.symbol = symbol;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.binance.stream_symbol().is_empty() {
            bail!("binance.symbol must not be empty");
        }
        let interval_ms = parse_interval_ms(&self.binance.kline_interval)
            .context("binance.kline_interval is invalid")?;
        if interval_ms != 1_000 {
            bail!(
                "binance.kline_interval must be one second, got '{}'",
                self.binance.kline_interval
            );
        }
        if self.reconnect.delay_ms == 0 {
            bail!("reconnect.delay_ms must be > 0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parse_partial_toml_keeps_defaults() {
        let toml_str = r#"
[binance]
symbol = "ETHUSDT"

[storage]
data_dir = "/var/lib/ticks"

[logging]
level = "debug"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.binance.stream_symbol(), "ethusdt");
        assert_eq!(config.binance.kline_interval, "1s");
        assert_eq!(config.storage.data_dir, PathBuf::from("/var/lib/ticks"));
        assert_eq!(config.storage.file_prefix, "btc_prices");
        assert_eq!(config.reconnect.delay_ms, 1_000);
        assert_eq!(config.logging.level, "debug");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn kline_stream_uses_lowercase_symbol() {
        let cfg = BinanceConfig {
            symbol: " BTCUSDT ".to_string(),
            ..BinanceConfig::default()
        };
        assert_eq!(cfg.kline_stream(), "btcusdt@kline_1s");
    }

    #[test]
    fn output_path_embeds_start_time() {
        let storage = StorageConfig::default();
        let started = chrono::Local
            .with_ymd_and_hms(2024, 3, 9, 7, 5, 1)
            .single()
            .unwrap();
        assert_eq!(
            storage.output_path(started),
            Path::new(env!("CARGO_MANIFEST_DIR"))
                .join("data")
                .join("btc_prices_20240309_070501.csv")
        );
    }

    #[test]
    fn parse_interval_valid() {
        assert_eq!(parse_interval_ms("1s").unwrap(), 1_000);
        assert_eq!(parse_interval_ms("2h").unwrap(), 7_200_000);
    }

    #[test]
    fn parse_interval_rejects_invalid_inputs() {
        assert!(parse_interval_ms("").is_err());
        assert!(parse_interval_ms("s").is_err());
        assert!(parse_interval_ms("0s").is_err());
        assert!(parse_interval_ms("1x").is_err());
    }

    #[test]
    fn validate_rejects_non_second_interval_and_empty_symbol() {
        let mut config = Config::default();
        config.binance.kline_interval = "1m".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.binance.symbol = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.reconnect.delay_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_default_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join("price-tick-logger-missing-config.toml");
        let config = Config::from_default_path(&path).unwrap();
        assert_eq!(config.binance.symbol, "btcusdt");
        assert!(Config::from_path(&path).is_err());
    }
}
