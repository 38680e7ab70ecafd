use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{FixedOffset, Offset, Utc};
use serde::Deserialize;

use crate::error::ConfigError;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Offset used to decide calendar days and hours of day.
    pub utc_offset_hours: i32,
    pub peak_start_hour: u32,
    pub peak_end_hour: u32,
    pub baseline_daily_kwh: f64,
    pub trend_window_days: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: 3,
            peak_start_hour: 18,
            peak_end_hour: 22,
            baseline_daily_kwh: 10.0,
            trend_window_days: 7,
        }
    }
}

impl AnalysisConfig {
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_hours * 3600).unwrap_or_else(|| Utc.fix())
    }

    pub fn is_peak_hour(&self, hour: u32) -> bool {
        hour >= self.peak_start_hour && hour < self.peak_end_hour
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuleThresholds {
    pub efficiency_excellent: u8,
    pub efficiency_fair: u8,
    pub peak_share_warning: f64,
    pub device_share_notice: f64,
    pub low_balance_days: u32,
}

impl Default for RuleThresholds {
    fn default() -> Self {
        Self {
            efficiency_excellent: 80,
            efficiency_fair: 50,
            peak_share_warning: 0.4,
            device_share_notice: 0.3,
            low_balance_days: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    pub starting_balance: f64,
    pub horizon_days: u32,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            starting_balance: 500.0,
            horizon_days: 7,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { max_connections: 5 }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub analysis: AnalysisConfig,
    pub rules: RuleThresholds,
    pub tokens: TokenConfig,
    pub database: DatabaseConfig,
}

impl AppConfig {
    /// Loads `$METER_INSIGHTS_CONFIG`, falling back to `meter-insights.toml`.
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = env::var("METER_INSIGHTS_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("meter-insights.toml"));
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let cfg = Self::from_toml(&contents).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        tracing::info!(path = %path.display(), "loaded config");
        Ok(cfg)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let cfg: AppConfig = toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let analysis = &self.analysis;
        if !(-12..=14).contains(&analysis.utc_offset_hours) {
            return Err(ConfigError::Invalid(format!(
                "utc_offset_hours must be between -12 and 14, got {}",
                analysis.utc_offset_hours
            )));
        }
        if analysis.peak_start_hour >= analysis.peak_end_hour || analysis.peak_end_hour > 24 {
            return Err(ConfigError::Invalid(format!(
                "peak hours must satisfy start < end <= 24, got {}..{}",
                analysis.peak_start_hour, analysis.peak_end_hour
            )));
        }
        if analysis.baseline_daily_kwh <= 0.0 {
            return Err(ConfigError::Invalid(
                "baseline_daily_kwh must be positive".to_string(),
            ));
        }
        if analysis.trend_window_days == 0 {
            return Err(ConfigError::Invalid(
                "trend_window_days must be at least 1".to_string(),
            ));
        }

        let rules = &self.rules;
        if rules.efficiency_fair > rules.efficiency_excellent || rules.efficiency_excellent > 100 {
            return Err(ConfigError::Invalid(format!(
                "efficiency bands must satisfy fair <= excellent <= 100, got {} / {}",
                rules.efficiency_fair, rules.efficiency_excellent
            )));
        }
        for (name, share) in [
            ("peak_share_warning", rules.peak_share_warning),
            ("device_share_notice", rules.device_share_notice),
        ] {
            if !(0.0..=1.0).contains(&share) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a fraction between 0 and 1, got {share}"
                )));
            }
        }

        if self.tokens.starting_balance < 0.0 {
            return Err(ConfigError::Invalid(
                "starting_balance must not be negative".to_string(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "max_connections must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
