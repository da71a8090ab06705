//! Configuration for the fraud engine

use crate::{Error, Result};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Fraud detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FraudConfig {
    /// Master kill switch. When false every transaction is allowed untouched.
    pub enabled: bool,

    /// Block cutoff on the normalized risk score. Review starts at 0.7x this.
    pub score_threshold: f64,

    /// Sliding window for velocity tracking (seconds)
    pub velocity_window_secs: u64,

    /// Maximum total amount per account inside the velocity window
    pub max_daily_amount: Decimal,

    /// Maximum single transaction amount
    pub max_single_amount: Decimal,

    /// Reserved, not read by the engine
    pub real_time_scoring: bool,

    /// Reserved. The geolocation rule is always wired.
    pub geofencing_enabled: bool,

    /// Reserved for model-based scoring, unused
    pub ml_model_path: Option<String>,

    /// Capacity of the bounded alert queue
    pub alert_queue_capacity: usize,

    /// Maximum number of alerts kept in memory
    pub max_stored_alerts: usize,
}

impl Default for FraudConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            score_threshold: 0.7,
            velocity_window_secs: 24 * 60 * 60,    // 24h
            max_daily_amount: Decimal::from(10_000),
            max_single_amount: Decimal::from(5_000),
            real_time_scoring: true,
            geofencing_enabled: true,
            ml_model_path: None,
            alert_queue_capacity: 100,
            max_stored_alerts: 10_000,
        }
    }
}

impl FraudConfig {
    /// Velocity window as a chrono duration.
    ///
    /// Saturates at [`Duration::MAX`] for values [`validate`](Self::validate)
    /// rejects.
    pub fn velocity_window(&self) -> Duration {
        checked_window(self.velocity_window_secs).unwrap_or(Duration::MAX)
    }

    /// Score at which a transaction goes to manual review
    pub fn review_threshold(&self) -> f64 {
        self.score_threshold * 0.7
    }

    /// Check the configuration for values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if !(self.score_threshold > 0.0 && self.score_threshold <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "score_threshold must be in (0, 1], got {}",
                self.score_threshold
            )));
        }

        if self.velocity_window_secs == 0 {
            return Err(Error::InvalidConfig(
                "velocity_window_secs must be positive".to_string(),
            ));
        }

        // The window start is computed as `now - window` on every read
        let representable = checked_window(self.velocity_window_secs)
            .is_some_and(|window| Utc::now().checked_sub_signed(window).is_some());
        if !representable {
            return Err(Error::InvalidConfig(format!(
                "velocity_window_secs out of range, got {}",
                self.velocity_window_secs
            )));
        }

        if self.max_daily_amount.is_sign_negative() || self.max_single_amount.is_sign_negative() {
            return Err(Error::InvalidConfig(
                "amount limits must not be negative".to_string(),
            ));
        }

        if self.alert_queue_capacity == 0 {
            return Err(Error::InvalidConfig(
                "alert_queue_capacity must be positive".to_string(),
            ));
        }

        if self.max_stored_alerts == 0 {
            return Err(Error::InvalidConfig(
                "max_stored_alerts must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Load from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: FraudConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables on top of the defaults
    pub fn from_env() -> Result<Self> {
        let mut config = FraudConfig::default();

        if let Ok(v) = std::env::var("FRAUD_ENABLED") {
            config.enabled = parse_var("FRAUD_ENABLED", &v)?;
        }

        if let Ok(v) = std::env::var("FRAUD_SCORE_THRESHOLD") {
            config.score_threshold = parse_var("FRAUD_SCORE_THRESHOLD", &v)?;
        }

        if let Ok(v) = std::env::var("FRAUD_VELOCITY_WINDOW_SECS") {
            config.velocity_window_secs = parse_var("FRAUD_VELOCITY_WINDOW_SECS", &v)?;
        }

        if let Ok(v) = std::env::var("FRAUD_MAX_DAILY_AMOUNT") {
            config.max_daily_amount = parse_var("FRAUD_MAX_DAILY_AMOUNT", &v)?;
        }

        if let Ok(v) = std::env::var("FRAUD_MAX_SINGLE_AMOUNT") {
            config.max_single_amount = parse_var("FRAUD_MAX_SINGLE_AMOUNT", &v)?;
        }

        if let Ok(path) = std::env::var("FRAUD_ML_MODEL_PATH") {
            config.ml_model_path = Some(path);
        }

        config.validate()?;
        Ok(config)
    }
}

fn checked_window(secs: u64) -> Option<Duration> {
    i64::try_from(secs).ok().and_then(Duration::try_seconds)
}

fn parse_var<T>(name: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = FraudConfig::default();
        assert!(config.enabled);
        assert_eq!(config.score_threshold, 0.7);
        assert_eq!(config.alert_queue_capacity, 100);
        assert_eq!(config.velocity_window(), Duration::hours(24));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_review_threshold() {
        let config = FraudConfig {
            score_threshold: 0.5,
            ..Default::default()
        };
        assert!((config.review_threshold() - 0.35).abs() < 1e-12);
    }

    #[test]
    fn test_validate_rejects_bad_threshold() {
        let config = FraudConfig {
            score_threshold: 1.5,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let config = FraudConfig {
            score_threshold: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_queue() {
        let config = FraudConfig {
            alert_queue_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_partial_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
enabled = false
score_threshold = 0.8
max_single_amount = "2500"
"#
        )
        .unwrap();

        let config = FraudConfig::from_file(file.path()).unwrap();
        assert!(!config.enabled);
        assert_eq!(config.score_threshold, 0.8);
        assert_eq!(config.max_single_amount, Decimal::from(2_500));
        // Untouched fields keep their defaults
        assert_eq!(config.max_daily_amount, Decimal::from(10_000));
    }

    #[test]
    fn test_validate_rejects_unrepresentable_window() {
        for secs in [u64::MAX, u64::MAX / 2, 1_000_000_000_000_000] {
            let config = FraudConfig {
                velocity_window_secs: secs,
                ..Default::default()
            };
            assert!(
                matches!(config.validate(), Err(Error::InvalidConfig(_))),
                "window {} accepted",
                secs
            );
            // Never wraps to a negative window
            assert!(config.velocity_window() > Duration::zero());
        }

        let config = FraudConfig {
            velocity_window_secs: 400 * 86_400,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.velocity_window(), Duration::days(400));
    }

    #[test]
    fn test_parse_var() {
        let threshold: f64 = parse_var("FRAUD_SCORE_THRESHOLD", " 0.85 ").unwrap();
        assert_eq!(threshold, 0.85);

        let amount: Decimal = parse_var("FRAUD_MAX_DAILY_AMOUNT", "12500.50").unwrap();
        assert_eq!(amount, Decimal::new(1_250_050, 2));

        let err = parse_var::<bool>("FRAUD_ENABLED", "maybe").unwrap_err();
        assert!(err.to_string().contains("FRAUD_ENABLED"));
    }

    #[test]
    fn test_from_file_invalid_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "score_threshold = [").unwrap();

        assert!(matches!(
            FraudConfig::from_file(file.path()),
            Err(Error::Config(_))
        ));
    }
}
