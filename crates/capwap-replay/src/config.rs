//! Replay tool configuration.

use std::path::{Path, PathBuf};

use capwap_oracle::config::OracleConfig;
use capwap_oracle::twap::TwapOracle;
use serde::{Deserialize, Serialize};

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "CAPWAP_CONFIG";

/// Complete replay configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Oracle parameters.
    #[serde(default)]
    pub oracle: OracleSettings,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Oracle construction and activation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleSettings {
    /// Initial price and first capping baseline.
    #[serde(default = "default_init_price")]
    pub init_price: u64,
    /// Warm-up in milliseconds. Must be a whole number of minutes.
    #[serde(default = "default_start_delay")]
    pub start_delay_ms: u64,
    /// Maximum per-window move, in parts per million of `init_price`.
    #[serde(default = "default_cap_ppm")]
    pub cap_ppm: u32,
    /// Activation time in milliseconds.
    #[serde(default)]
    pub start_time_ms: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace" | "debug" | "info" | "warn" | "error".
    /// `RUST_LOG` takes precedence when set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_init_price() -> u64 {
    10_000
}

fn default_start_delay() -> u64 {
    60_000
}

fn default_cap_ppm() -> u32 {
    1_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            init_price: default_init_price(),
            start_delay_ms: default_start_delay(),
            cap_ppm: default_cap_ppm(),
            start_time_ms: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl ReplayConfig {
    /// Load configuration from `path`, or from the default location.
    ///
    /// Falls back to defaults if no path is given and the default file does
    /// not exist. An explicit path must exist.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default_path = Self::config_path();
                if !default_path.exists() {
                    return Ok(Self::default());
                }
                default_path
            }
        };
        let content = std::fs::read_to_string(&config_path)?;
        let config: ReplayConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Get the config file path.
    fn config_path() -> PathBuf {
        std::env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("capwap.toml"))
    }
}

impl OracleSettings {
    /// Build and activate an oracle from these settings.
    pub fn build(&self) -> capwap_oracle::Result<TwapOracle> {
        let config = OracleConfig::new(self.init_price, self.start_delay_ms, self.cap_ppm)?;
        let mut oracle = TwapOracle::with_config(config);
        oracle.set_start_time(self.start_time_ms)?;
        Ok(oracle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReplayConfig::default();
        assert_eq!(config.oracle.init_price, 10_000);
        assert_eq!(config.oracle.start_delay_ms, 60_000);
        assert_eq!(config.oracle.cap_ppm, 1_000);
        assert_eq!(config.logging.log_level, "info");
    }

    #[test]
    fn test_config_serialization() {
        let config = ReplayConfig::default();
        let toml_str = toml::to_string(&config).expect("serialize");
        let parsed: ReplayConfig = toml::from_str(&toml_str).expect("parse");
        assert_eq!(parsed.oracle.cap_ppm, config.oracle.cap_ppm);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed: ReplayConfig = toml::from_str(
            r#"
            [oracle]
            init_price = 500
            start_time_ms = 1000
            "#,
        )
        .expect("parse");
        assert_eq!(parsed.oracle.init_price, 500);
        assert_eq!(parsed.oracle.start_time_ms, 1_000);
        assert_eq!(parsed.oracle.cap_ppm, 1_000);
        assert_eq!(parsed.logging.log_level, "info");
    }

    #[test]
    fn test_build_activates_oracle() {
        let settings = OracleSettings {
            start_time_ms: 1_000,
            ..OracleSettings::default()
        };
        let oracle = settings.build().expect("build");
        assert_eq!(oracle.market_start_time(), Some(1_000));
        assert_eq!(oracle.config().cap_step(), 10);
    }

    #[test]
    fn test_build_rejects_misaligned_delay() {
        let settings = OracleSettings {
            start_delay_ms: 1_500,
            ..OracleSettings::default()
        };
        assert!(settings.build().is_err());
    }

    #[test]
    fn test_load_explicit_missing_path_fails() {
        let missing = Path::new("/nonexistent/capwap-replay/config.toml");
        assert!(ReplayConfig::load(Some(missing)).is_err());
    }
}
