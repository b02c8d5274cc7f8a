//! Experiment engine configuration

use crate::error::{ExperimentError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Monte Carlo draws used for the reference significance thresholds
pub const DEFAULT_SAMPLES: usize = 10_000;

/// Configuration for the Bayesian experiment engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Monte Carlo iterations per computation
    pub samples: usize,
    /// Win probability at or above which treatment is declared the winner
    pub significance_upper: f64,
    /// Win probability at or below which control is declared the winner
    pub significance_lower: f64,
    /// Coverage of the interval on the rate difference
    pub interval_level: f64,
    /// Fixed seed for reproducible runs; OS entropy when unset
    pub seed: Option<u64>,
    /// Per-experiment deadline in milliseconds for batch runs
    pub timeout_ms: Option<u64>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            samples: DEFAULT_SAMPLES,
            significance_upper: 0.95,
            significance_lower: 0.05,
            interval_level: 0.95,
            seed: None,
            timeout_ms: None,
        }
    }
}

impl ExperimentConfig {
    pub fn builder() -> ExperimentConfigBuilder {
        ExperimentConfigBuilder::default()
    }

    /// Configuration for deterministic tests.
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<()> {
        if self.samples == 0 {
            return Err(ExperimentError::InvalidConfig(
                "samples must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.significance_lower)
            || !(0.0..=1.0).contains(&self.significance_upper)
            || self.significance_lower >= self.significance_upper
        {
            return Err(ExperimentError::InvalidConfig(format!(
                "significance thresholds must satisfy 0 <= lower < upper <= 1 (got {} / {})",
                self.significance_lower, self.significance_upper
            )));
        }
        if !(self.interval_level > 0.0 && self.interval_level < 1.0) {
            return Err(ExperimentError::InvalidConfig(format!(
                "interval_level must be in (0, 1), got {}",
                self.interval_level
            )));
        }
        Ok(())
    }
}

/// Builder for ExperimentConfig
#[derive(Default)]
pub struct ExperimentConfigBuilder {
    config: ExperimentConfig,
}

impl ExperimentConfigBuilder {
    pub fn samples(mut self, samples: usize) -> Self {
        self.config.samples = samples;
        self
    }

    pub fn significance(mut self, lower: f64, upper: f64) -> Self {
        self.config.significance_lower = lower;
        self.config.significance_upper = upper;
        self
    }

    pub fn interval_level(mut self, level: f64) -> Self {
        self.config.interval_level = level;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Build and validate.
    pub fn build(self) -> Result<ExperimentConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
