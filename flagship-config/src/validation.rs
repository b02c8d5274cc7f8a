// Settings validation

use crate::{ConfigError, Result};

/// Trait for validating loaded settings
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Field-level validation rules
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate that a number is within range
    pub fn in_range<T: PartialOrd + std::fmt::Display>(
        value: T,
        min: T,
        max: T,
        field: &str,
    ) -> Result<()> {
        if value < min || value > max {
            return Err(ConfigError::ValidationError(format!(
                "{} must be between {} and {} (got {})",
                field, min, max, value
            )));
        }
        Ok(())
    }

    /// Validate that a duration-like value is non-zero
    pub fn positive(value: u64, field: &str) -> Result<()> {
        if value == 0 {
            return Err(ConfigError::ValidationError(format!(
                "{} must be greater than zero",
                field
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_validation() {
        assert!(ConfigValidator::in_range(5, 1, 10, "field").is_ok());
        assert!(ConfigValidator::in_range(0, 1, 10, "field").is_err());
        assert!(ConfigValidator::in_range(11, 1, 10, "field").is_err());
    }

    #[test]
    fn test_range_message_names_field() {
        let err = ConfigValidator::in_range(0.5, 0.9, 1.0, "experiments.interval_level").unwrap_err();
        assert!(err.to_string().contains("experiments.interval_level"));
    }

    #[test]
    fn test_positive_validation() {
        assert!(ConfigValidator::positive(5, "client.timeout_secs").is_ok());
        assert!(ConfigValidator::positive(0, "client.timeout_secs").is_err());
    }
}
