use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub price_db: PriceDbConfig,
    pub detection: DetectionConfig,
    pub monitor: MonitorConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the ledger API (blockchain.info compatible).
    pub ledger_url: String,
    /// Base URL of the primary price API (CryptoCompare compatible).
    pub price_url: String,
    /// Per-request timeout so one stuck lookup cannot stall the run.
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PriceDbConfig {
    /// Local day-indexed price table used when the primary API fails.
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MonitorConfig {
    pub interval_secs: u64,
}

/// Detection policy. Every threshold the detector and risk scorer apply lives
/// here so tests and operators can tune the policy without touching the rules.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DetectionConfig {
    /// Rule: high variance. Flag when the population stddev of an address's
    /// amounts exceeds this (BTC) and it has more than `variance_min_txs` txs.
    pub variance_stddev_btc: f64,
    pub variance_min_txs: u64,
    /// Rule: high volume with few transactions. Volume above this (BTC)...
    pub high_volume_btc: f64,
    /// ...with strictly fewer transactions than this.
    pub low_count_txs: u64,
    /// Rule: unusually frequent. More than this many recorded deltas...
    pub frequent_min_deltas: usize,
    /// ...whose mean is below this many hours.
    pub frequent_mean_hours: f64,
    /// Rule: daily spam. A single UTC day above this volume (BTC)...
    pub daily_volume_btc: f64,
    /// ...for an address with more than this many amount samples.
    pub daily_min_samples: usize,
    /// Stream rule: single transactions above this absolute size (BTC).
    pub high_value_btc: f64,
    /// Stream rule: spike when an amount exceeds this multiple of the
    /// immediately preceding transaction's amount.
    pub spike_ratio: f64,
    /// Stream rule: frequent interactor when an address has more than this
    /// many transactions.
    pub frequent_interactor_txs: u64,
    /// Gap (hours) under which consecutive transactions form a rapid sequence.
    pub rapid_window_hours: f64,
    /// Risk: counterparty interactions per hour since first seen.
    pub rate_per_hour: f64,
    /// Risk: busiest single day's volume (BTC) marking whale activity.
    pub whale_day_btc: f64,
    /// Risk: mean transactions per active day marking suspicious frequency.
    pub daily_tx_rate: f64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            ledger_url: "https://blockchain.info".into(),
            price_url: "https://min-api.cryptocompare.com".into(),
            timeout_secs: 10,
        }
    }
}

impl Default for PriceDbConfig {
    fn default() -> Self {
        Self {
            path: "data/btcprice.db".into(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            variance_stddev_btc: 2.0,
            variance_min_txs: 3,
            high_volume_btc: 1.0,
            low_count_txs: 3,
            frequent_min_deltas: 3,
            frequent_mean_hours: 1.0,
            daily_volume_btc: 1.0,
            daily_min_samples: 3,
            high_value_btc: 1.0,
            spike_ratio: 1.5,
            frequent_interactor_txs: 3,
            rapid_window_hours: 24.0,
            rate_per_hour: 5.0,
            whale_day_btc: 5.0,
            daily_tx_rate: 10.0,
        }
    }
}

impl Config {
    /// Load config from a TOML file. Falls back to defaults if file doesn't exist.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!("Config file {} not found, using defaults", path.display());
            return Self::default();
        }
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Config loaded from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {e}, using defaults", path.display());
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read {}: {e}, using defaults", path.display());
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_policy() {
        let cfg = DetectionConfig::default();
        assert_eq!(cfg.variance_stddev_btc, 2.0);
        assert_eq!(cfg.spike_ratio, 1.5);
        assert_eq!(cfg.rapid_window_hours, 24.0);
        assert_eq!(cfg.whale_day_btc, 5.0);
        assert_eq!(cfg.daily_tx_rate, 10.0);
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let toml_src = r#"
            [detection]
            spike_ratio = 2.0

            [api]
            timeout_secs = 3
        "#;
        let cfg: Config = toml::from_str(toml_src).unwrap();
        assert_eq!(cfg.detection.spike_ratio, 2.0);
        assert_eq!(cfg.detection.whale_day_btc, 5.0);
        assert_eq!(cfg.api.timeout_secs, 3);
        assert_eq!(cfg.api.ledger_url, "https://blockchain.info");
    }

    #[test]
    fn missing_file_uses_defaults() {
        let cfg = Config::load("/nonexistent/walletlens.toml");
        assert_eq!(cfg.monitor.interval_secs, 60);
    }
}
