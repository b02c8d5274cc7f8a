//! Auto-stop decision

use crate::config::ExperimentConfig;
use serde::{Deserialize, Serialize};

/// Declares an experiment decided once either arm is a clear winner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutoStopPolicy {
    pub upper: f64,
    pub lower: f64,
}

impl Default for AutoStopPolicy {
    fn default() -> Self {
        Self {
            upper: 0.95,
            lower: 0.05,
        }
    }
}

impl AutoStopPolicy {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { upper, lower }
    }

    pub fn from_config(config: &ExperimentConfig) -> Self {
        Self::new(config.significance_lower, config.significance_upper)
    }

    /// Both thresholds are inclusive.
    pub fn is_significant(&self, win_probability: f64) -> bool {
        win_probability >= self.upper || win_probability <= self.lower
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds_inclusive() {
        let policy = AutoStopPolicy::default();
        assert!(policy.is_significant(0.95));
        assert!(policy.is_significant(0.05));
        assert!(policy.is_significant(1.0));
        assert!(policy.is_significant(0.0));
        assert!(!policy.is_significant(0.9499));
        assert!(!policy.is_significant(0.0501));
        assert!(!policy.is_significant(0.5));
    }

    #[test]
    fn test_from_config() {
        let config = ExperimentConfig::builder().significance(0.1, 0.9).build().unwrap();
        let policy = AutoStopPolicy::from_config(&config);
        assert!(policy.is_significant(0.9));
        assert!(!policy.is_significant(0.89));
    }
}
