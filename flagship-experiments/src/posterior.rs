//! Beta-Binomial posteriors for experiment arms.

use crate::error::{ExperimentError, Result};
use serde::{Deserialize, Serialize};

/// Uniform Beta(1, 1) prior shared by both arms.
pub const PRIOR_ALPHA: f64 = 1.0;
pub const PRIOR_BETA: f64 = 1.0;

/// Aggregated counts for one arm
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmData {
    pub users: u64,
    pub conversions: u64,
}

impl ArmData {
    pub fn new(users: u64, conversions: u64) -> Self {
        Self { users, conversions }
    }
}

/// Observed counts for a two-arm experiment.
///
/// Conversion counts must come from tracked conversion events; the engine
/// never fills them in itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentData {
    pub control: ArmData,
    pub treatment: ArmData,
}

impl ExperimentData {
    pub fn new(control: ArmData, treatment: ArmData) -> Self {
        Self { control, treatment }
    }

    /// Reject arms reporting more conversions than users.
    pub fn validate(&self) -> Result<()> {
        for (name, arm) in [("control", &self.control), ("treatment", &self.treatment)] {
            if arm.conversions > arm.users {
                return Err(ExperimentError::InvalidData(format!(
                    "{} arm has {} conversions but only {} users",
                    name, arm.conversions, arm.users
                )));
            }
        }
        Ok(())
    }
}

/// Posterior summary for one arm
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArmPosterior {
    pub users: u64,
    pub conversions: u64,
    /// Observed rate, 0 for an arm without users
    pub conversion_rate: f64,
    pub alpha: f64,
    pub beta: f64,
}

impl ArmPosterior {
    /// Update the uniform prior with an arm's counts.
    pub fn from_counts(arm: &ArmData) -> Self {
        let failures = arm.users.saturating_sub(arm.conversions);
        Self {
            users: arm.users,
            conversions: arm.conversions,
            conversion_rate: arm.conversions as f64 / arm.users.max(1) as f64,
            alpha: PRIOR_ALPHA + arm.conversions as f64,
            beta: PRIOR_BETA + failures as f64,
        }
    }

    /// Posterior mean `alpha / (alpha + beta)`.
    pub fn mean(&self) -> f64 {
        self.alpha / (self.alpha + self.beta)
    }
}
