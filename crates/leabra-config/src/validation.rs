// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Bound checks over a loaded configuration. Every violation is collected and
//! reported together.

use crate::{ConfigError, ConfigResult, LeabraConfig};

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    MissingRequired { field: String },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRequired { field } => {
                write!(f, "Missing required configuration: {}", field)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every failed check
pub fn validate_config(config: &LeabraConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_schedule(config, &mut errors);
    validate_training(config, &mut errors);
    validate_logging(config, &mut errors);
    validate_params(config, &mut errors);

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}

fn validate_schedule(config: &LeabraConfig, errors: &mut Vec<ConfigValidationError>) {
    let s = &config.schedule;
    if s.cycles_per_quarter < 1 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "schedule.cycles_per_quarter".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    if s.quarters != 4 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "schedule.quarters".to_string(),
            reason: format!("must be 4 (got {})", s.quarters),
        });
    }
    if s.wt_bal_interval < 1 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "schedule.wt_bal_interval".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    if s.time_per_cycle.is_nan() || s.time_per_cycle <= 0.0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "schedule.time_per_cycle".to_string(),
            reason: "must be positive".to_string(),
        });
    }
}

fn validate_training(config: &LeabraConfig, errors: &mut Vec<ConfigValidationError>) {
    let tol = config.training.sse_tolerance;
    if !(0.0..1.0).contains(&tol) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "training.sse_tolerance".to_string(),
            reason: format!("must be in [0, 1) (got {})", tol),
        });
    }
}

fn validate_logging(config: &LeabraConfig, errors: &mut Vec<ConfigValidationError>) {
    let fmt = config.logging.format.to_lowercase();
    if fmt != "text" && fmt != "json" {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.format".to_string(),
            reason: format!("expected \"text\" or \"json\" (got {:?})", config.logging.format),
        });
    }
}

fn validate_params(config: &LeabraConfig, errors: &mut Vec<ConfigValidationError>) {
    for (i, rule) in config.params.iter().enumerate() {
        if rule.selector.trim().is_empty() {
            errors.push(ConfigValidationError::MissingRequired {
                field: format!("params[{}].selector", i),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ParamRuleConfig;

    #[test]
    fn test_default_config_passes() {
        assert!(validate_config(&LeabraConfig::default()).is_ok());
    }

    #[test]
    fn test_all_violations_reported() {
        let mut config = LeabraConfig::default();
        config.schedule.cycles_per_quarter = 0;
        config.schedule.quarters = 3;
        config.schedule.wt_bal_interval = 0;
        config.training.sse_tolerance = 1.0;
        config.params.push(ParamRuleConfig::default());

        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("schedule.cycles_per_quarter"), "{}", err);
        assert!(err.contains("schedule.quarters"), "{}", err);
        assert!(err.contains("schedule.wt_bal_interval"), "{}", err);
        assert!(err.contains("training.sse_tolerance"), "{}", err);
        assert!(err.contains("params[0].selector"), "{}", err);
        assert_eq!(err.matches("  - ").count(), 5);
    }

    #[test]
    fn test_unknown_log_format() {
        let mut config = LeabraConfig::default();
        config.logging.format = "yaml".to_string();
        assert!(validate_config(&config).is_err());
        config.logging.format = "JSON".to_string();
        assert!(validate_config(&config).is_ok());
    }
}
