//! Configuration module for the analytics core.
//!
//! Provides configuration loading, validation, and environment variable
//! interpolation for every analytics component. Every section is optional
//! and falls back to its documented defaults.
//!
//! # Usage
//!
//! ```rust,ignore
//! use options_analytics::config::{Config, load_config};
//!
//! // Load from default path (config.yaml)
//! let config = load_config(None)?;
//!
//! // Load from custom path
//! let config = load_config(Some("custom/config.yaml"))?;
//!
//! println!("risk-free rate: {}", config.pricing.risk_free_rate);
//! ```

mod alerts;
mod observability;
mod pricing;
mod risk;
mod surface;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::pricing::IvSolverConfig;
pub use alerts::AlertsConfig;
pub use observability::{LoggingConfig, ObservabilityConfig};
pub use pricing::PricingConfig;
pub use risk::RiskConfig;
pub use surface::SurfaceConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Pricing model configuration.
    #[serde(default)]
    pub pricing: PricingConfig,
    /// Implied volatility solver configuration.
    #[serde(default)]
    pub iv_solver: IvSolverConfig,
    /// Volatility surface configuration.
    #[serde(default)]
    pub surface: SurfaceConfig,
    /// Risk metrics configuration.
    #[serde(default)]
    pub risk: RiskConfig,
    /// Alert engine configuration.
    #[serde(default)]
    pub alerts: AlertsConfig,
    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ============================================
// Configuration Loading
// ============================================

/// Load configuration from a YAML file with environment variable interpolation.
///
/// # Arguments
///
/// * `path` - Optional path to the config file. Defaults to "config.yaml".
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or("config.yaml");

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string (useful for testing).
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);

    let config: Config = if interpolated.trim().is_empty() {
        Config::default()
    } else {
        serde_yaml_bw::from_str(&interpolated)?
    };

    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax.
#[allow(clippy::expect_used)] // Regex is compile-time constant; expect() is safe here
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    re.replace_all(input, |cap: &regex::Captures<'_>| {
        let default_value = cap.get(2).map_or("", |m| m.as_str());
        match std::env::var(&cap[1]) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.to_string(),
        }
    })
    .into_owned()
}

fn check_range(name: &str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(format!(
            "{name} must be between {min} and {max}, got {value}"
        )))
    }
}

/// Validate configuration values.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    check_range("pricing.risk_free_rate", config.pricing.risk_free_rate, -0.1, 1.0)?;
    check_range(
        "pricing.default_dividend_yield",
        config.pricing.default_dividend_yield,
        0.0,
        1.0,
    )?;
    check_range(
        "pricing.fallback_volatility",
        config.pricing.fallback_volatility,
        0.001,
        5.0,
    )?;
    if config.pricing.contract_multiplier == 0 {
        return Err(ConfigError::ValidationError(
            "pricing.contract_multiplier must be positive".to_string(),
        ));
    }

    let iv = &config.iv_solver;
    if iv.min_vol.is_nan() || iv.min_vol <= 0.0 || iv.min_vol >= iv.max_vol {
        return Err(ConfigError::ValidationError(
            "iv_solver.min_vol must be positive and below iv_solver.max_vol".to_string(),
        ));
    }
    if iv.tolerance.is_nan() || iv.tolerance <= 0.0 || iv.max_iterations == 0 {
        return Err(ConfigError::ValidationError(
            "iv_solver.tolerance and iv_solver.max_iterations must be positive".to_string(),
        ));
    }

    if config.surface.max_neighbors == 0 {
        return Err(ConfigError::ValidationError(
            "surface.max_neighbors must be positive".to_string(),
        ));
    }
    check_range(
        "surface.max_strike_distance",
        config.surface.max_strike_distance,
        0.0,
        10.0,
    )?;

    check_range("risk.price_move_pct", config.risk.price_move_pct, 0.0, 1.0)?;
    check_range("risk.vol_move_pct", config.risk.vol_move_pct, 0.0, 1.0)?;
    check_range(
        "risk.correlation_threshold",
        config.risk.correlation_threshold,
        0.0,
        1.0,
    )?;
    check_range(
        "risk.min_liquidity_score",
        config.risk.min_liquidity_score,
        0.0,
        100.0,
    )?;

    if config.alerts.max_alerts_per_user == 0 {
        return Err(ConfigError::ValidationError(
            "alerts.max_alerts_per_user must be positive".to_string(),
        ));
    }
    check_range("alerts.base_confidence", config.alerts.base_confidence, 0.1, 1.0)?;
    if config.alerts.subscriber_buffer == 0 {
        return Err(ConfigError::ValidationError(
            "alerts.subscriber_buffer must be positive".to_string(),
        ));
    }

    let valid_formats = ["json", "pretty"];
    if !valid_formats.contains(&config.observability.logging.format.as_str()) {
        return Err(ConfigError::ValidationError(format!(
            "observability.logging.format must be one of: {valid_formats:?}"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::RiskTolerance;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!((config.pricing.risk_free_rate - 0.05).abs() < f64::EPSILON);
        assert!((config.pricing.fallback_volatility - 0.30).abs() < f64::EPSILON);
        assert_eq!(config.pricing.contract_multiplier, 100);
        assert_eq!(config.iv_solver.max_iterations, 100);
        assert_eq!(config.surface.max_neighbors, 4);
        assert_eq!(config.risk.tolerance, RiskTolerance::Moderate);
        assert_eq!(config.alerts.max_alerts_per_user, 100);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = match load_config_from_string("") {
            Ok(c) => c,
            Err(e) => panic!("should load empty config: {e}"),
        };
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_partial_config() {
        let yaml = r"
pricing:
  risk_free_rate: 0.04
risk:
  tolerance: conservative
";

        let config = match load_config_from_string(yaml) {
            Ok(c) => c,
            Err(e) => panic!("should load partial config: {e}"),
        };
        assert!((config.pricing.risk_free_rate - 0.04).abs() < f64::EPSILON);
        assert_eq!(config.risk.tolerance, RiskTolerance::Conservative);
        // Untouched fields keep defaults
        assert!((config.risk.price_move_pct - 0.10).abs() < f64::EPSILON);
        assert!((config.iv_solver.tolerance - 0.001).abs() < f64::EPSILON);
    }

    #[test]
    fn test_env_var_with_default_when_missing() {
        let input = "tolerance: ${OPTIONS_ANALYTICS_TEST_NONEXISTENT_VAR:-aggressive}";
        let result = interpolate_env_vars(input);
        assert_eq!(result, "tolerance: aggressive");
    }

    #[test]
    #[expect(clippy::literal_string_with_formatting_args)] // ${...} is env var syntax, not format args
    fn test_env_var_with_default_uses_existing() {
        let input = "path: ${PATH:-default}";
        let result = interpolate_env_vars(input);

        assert_ne!(result, "path: default");
        assert!(result.starts_with("path: "));
    }

    #[test]
    fn test_env_var_without_default_becomes_empty() {
        let input = "level: ${OPTIONS_ANALYTICS_TEST_UNLIKELY_TO_EXIST}";
        assert_eq!(interpolate_env_vars(input), "level: ");
    }

    #[test]
    fn test_validation_invalid_risk_free_rate() {
        let yaml = r"
pricing:
  risk_free_rate: 1.5
";
        let Err(err) = load_config_from_string(yaml) else {
            panic!("expected error for invalid risk_free_rate");
        };
        assert!(err.to_string().contains("risk_free_rate"));
    }

    #[test]
    fn test_validation_inverted_vol_bounds() {
        let yaml = r"
iv_solver:
  min_vol: 2.0
  max_vol: 1.0
";
        let Err(err) = load_config_from_string(yaml) else {
            panic!("expected error for inverted vol bounds");
        };
        assert!(err.to_string().contains("min_vol"));
    }

    #[test]
    fn test_validation_zero_retention() {
        let yaml = r"
alerts:
  max_alerts_per_user: 0
";
        assert!(load_config_from_string(yaml).is_err());
    }

    #[test]
    fn test_validation_invalid_log_format() {
        let yaml = r"
observability:
  logging:
    format: xml
";
        let Err(err) = load_config_from_string(yaml) else {
            panic!("expected error for invalid log format");
        };
        assert!(err.to_string().contains("format"));
    }

    #[test]
    fn test_full_config_parse() {
        let yaml = r#"
pricing:
  risk_free_rate: 0.045
  default_dividend_yield: 0.01
  fallback_volatility: 0.35

iv_solver:
  tolerance: 0.0005
  max_iterations: 50
  bisection_fallback: true

surface:
  max_strike_distance: 0.15
  max_days_distance: 45

risk:
  tolerance: aggressive
  price_move_pct: 0.08
  vol_move_pct: 0.04

alerts:
  max_alerts_per_user: 50
  base_confidence: 0.6

observability:
  logging:
    level: "debug"
    format: "pretty"
"#;

        let config = match load_config_from_string(yaml) {
            Ok(c) => c,
            Err(e) => panic!("should load full config: {e}"),
        };

        assert!((config.pricing.fallback_volatility - 0.35).abs() < f64::EPSILON);
        assert_eq!(config.iv_solver.max_iterations, 50);
        assert!(config.iv_solver.bisection_fallback);
        assert!((config.iv_solver.min_vol - 0.001).abs() < f64::EPSILON);
        assert_eq!(config.surface.max_days_distance, 45);
        assert_eq!(config.risk.tolerance, RiskTolerance::Aggressive);
        assert_eq!(config.alerts.max_alerts_per_user, 50);
        assert_eq!(config.observability.logging.level, "debug");
        assert_eq!(config.observability.logging.format, "pretty");
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let result = load_config(Some("/definitely/not/here/config.yaml"));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }
}
