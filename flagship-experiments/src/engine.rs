//! Bayesian A/B computation

use crate::config::ExperimentConfig;
use crate::error::Result;
use crate::estimator::{self, ConfidenceInterval};
use crate::policy::AutoStopPolicy;
use crate::posterior::{ArmPosterior, ExperimentData};
use crate::sampler::Sampler;
use flagship_log::{Fields, debug, targets};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Verdict for a two-arm experiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BayesianResult {
    pub control: ArmPosterior,
    pub treatment: ArmPosterior,
    /// Probability that treatment's true rate exceeds control's
    pub win_probability: f64,
    pub confidence_interval: ConfidenceInterval,
    pub is_significant: bool,
    pub expected_lift: f64,
    /// Expected lift as a percentage of the control posterior mean
    pub relative_lift: f64,
}

impl BayesianResult {
    /// The experiment should be marked stopped.
    pub fn should_stop(&self) -> bool {
        self.is_significant
    }
}

/// Run the default analysis (10,000 draws, 95% interval, 0.95/0.05
/// thresholds) with a fresh entropy-seeded sampler.
pub fn compute_bayesian_ab_test(data: &ExperimentData) -> Result<BayesianResult> {
    BayesianEngine::default().compute(data)
}

/// Computes [`BayesianResult`]s under a fixed configuration.
///
/// The engine holds no sampler. Every call to [`compute`](Self::compute)
/// builds its own, so one engine can be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct BayesianEngine {
    config: ExperimentConfig,
}

impl BayesianEngine {
    pub fn new(config: ExperimentConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Sampler for one computation, seeded from config when a seed is set.
    pub fn sampler(&self) -> Sampler {
        match self.config.seed {
            Some(seed) => Sampler::seeded(seed),
            None => Sampler::from_entropy(),
        }
    }

    pub fn compute(&self, data: &ExperimentData) -> Result<BayesianResult> {
        let mut sampler = self.sampler();
        self.compute_with(&mut sampler, data)
    }

    /// Compute using a caller-owned sampler.
    pub fn compute_with<R: Rng>(
        &self,
        sampler: &mut Sampler<R>,
        data: &ExperimentData,
    ) -> Result<BayesianResult> {
        data.validate()?;

        let control = ArmPosterior::from_counts(&data.control);
        let treatment = ArmPosterior::from_counts(&data.treatment);
        let estimate = estimator::estimate(
            sampler,
            &control,
            &treatment,
            self.config.samples,
            self.config.interval_level,
        )?;
        let is_significant =
            AutoStopPolicy::from_config(&self.config).is_significant(estimate.win_probability);

        debug!(
            target: targets::EXPERIMENT,
            fields: Fields::new()
                .with("win_probability", estimate.win_probability)
                .with("lower", estimate.interval.lower)
                .with("upper", estimate.interval.upper)
                .with("significant", is_significant),
            "Posterior computed"
        );

        Ok(BayesianResult {
            win_probability: estimate.win_probability,
            confidence_interval: estimate.interval,
            is_significant,
            expected_lift: estimator::expected_lift(&control, &treatment),
            relative_lift: estimator::relative_lift(&control, &treatment),
            control,
            treatment,
        })
    }
}
