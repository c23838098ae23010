//! Run configuration.
//!
//! Stored as TOML. Every field has a default, so a file only needs the
//! values it changes:
//!
//! ```toml
//! tickers = ["TSLA", "SPY"]
//! start_date = "2020-01-01"
//!
//! [source]
//! type = "csv"
//! dir = "data"
//!
//! [decomposition]
//! model = "additive"
//! ```

use crate::analysis::{DecompositionModel, SeasonalDecomposer, DEFAULT_SEASONAL_PERIOD, DEFAULT_VOLATILITY_WINDOW};
use crate::data::{CsvProvider, DataError, DataProvider, SyntheticProvider, YahooProvider};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub tickers: Vec<String>,
    pub start_date: NaiveDate,
    /// Exclusive, as with the provider date range.
    pub end_date: NaiveDate,
    /// Where rendered charts are written.
    pub output_dir: PathBuf,
    pub source: SourceConfig,
    pub volatility: VolatilityConfig,
    pub decomposition: DecompositionConfig,
    pub http: HttpConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            tickers: vec!["TSLA".into(), "BND".into(), "SPY".into()],
            start_date: NaiveDate::from_ymd_opt(2015, 1, 1).unwrap_or_default(),
            end_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap_or_default(),
            output_dir: PathBuf::from("plots"),
            source: SourceConfig::default(),
            volatility: VolatilityConfig::default(),
            decomposition: DecompositionConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    #[default]
    Yahoo,
    Csv {
        dir: PathBuf,
    },
    Synthetic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolatilityConfig {
    pub window: usize,
}

impl Default for VolatilityConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_VOLATILITY_WINDOW,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecompositionConfig {
    pub model: DecompositionModel,
    pub period: usize,
    pub extrapolate_trend: bool,
}

impl Default for DecompositionConfig {
    fn default() -> Self {
        Self {
            model: DecompositionModel::Multiplicative,
            period: DEFAULT_SEASONAL_PERIOD,
            extrapolate_trend: false,
        }
    }
}

impl DecompositionConfig {
    pub fn decomposer(&self) -> SeasonalDecomposer {
        SeasonalDecomposer::new(self.model, self.period).with_trend_extrapolation(self.extrapolate_trend)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

impl AnalysisConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tickers.is_empty() {
            return Err(ConfigError::Invalid("no tickers given".into()));
        }
        if let Some(bad) = self.tickers.iter().find(|t| t.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!("blank ticker {bad:?}")));
        }
        if self.start_date >= self.end_date {
            return Err(ConfigError::Invalid(format!(
                "start_date {} must be before end_date {}",
                self.start_date, self.end_date
            )));
        }
        if self.volatility.window < 2 {
            return Err(ConfigError::Invalid(format!(
                "volatility window must be at least 2, got {}",
                self.volatility.window
            )));
        }
        if self.decomposition.period < 2 {
            return Err(ConfigError::Invalid(format!(
                "decomposition period must be at least 2, got {}",
                self.decomposition.period
            )));
        }
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::Invalid("http timeout must be positive".into()));
        }
        Ok(())
    }

    /// Build the provider selected by `[source]`.
    pub fn provider(&self) -> Result<Box<dyn DataProvider>, DataError> {
        Ok(match &self.source {
            SourceConfig::Yahoo => Box::new(YahooProvider::new(Duration::from_secs(self.http.timeout_secs))?),
            SourceConfig::Csv { dir } => Box::new(CsvProvider::new(dir.clone())),
            SourceConfig::Synthetic => Box::new(SyntheticProvider::new()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.tickers, vec!["TSLA", "BND", "SPY"]);
        assert_eq!(config.start_date, NaiveDate::from_ymd_opt(2015, 1, 1).unwrap());
        assert_eq!(config.end_date, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        assert_eq!(config.volatility.window, 20);
        assert_eq!(config.decomposition.period, 252);
        assert_eq!(config.decomposition.model, DecompositionModel::Multiplicative);
        assert_eq!(config.source, SourceConfig::Yahoo);
        config.validate().unwrap();
    }

    #[test]
    fn toml_roundtrip() {
        let mut config = AnalysisConfig::default();
        config.source = SourceConfig::Csv { dir: "prices".into() };
        config.decomposition.model = DecompositionModel::Additive;

        let text = config.to_toml().unwrap();
        let parsed = AnalysisConfig::from_toml(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config = AnalysisConfig::from_toml(
            r#"
tickers = ["SPY"]

[source]
type = "synthetic"

[decomposition]
period = 5
"#,
        )
        .unwrap();

        assert_eq!(config.tickers, vec!["SPY"]);
        assert_eq!(config.source, SourceConfig::Synthetic);
        assert_eq!(config.decomposition.period, 5);
        assert!(!config.decomposition.extrapolate_trend);
        assert_eq!(config.volatility.window, 20);
    }

    #[test]
    fn rejects_invalid_values() {
        let err = AnalysisConfig::from_toml("tickers = []").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = AnalysisConfig::from_toml("start_date = \"2025-01-01\"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = AnalysisConfig::from_toml("[volatility]\nwindow = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = AnalysisConfig::from_toml("tickers = \"SPY\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = AnalysisConfig::from_file(Path::new("/nonexistent/pricelens.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn builds_offline_providers() {
        let mut config = AnalysisConfig::default();
        config.source = SourceConfig::Synthetic;
        assert_eq!(config.provider().unwrap().name(), "synthetic");

        config.source = SourceConfig::Csv { dir: "prices".into() };
        assert_eq!(config.provider().unwrap().name(), "csv");
    }
}
