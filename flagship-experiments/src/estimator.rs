//! Monte Carlo win probability and interval estimation.

use crate::error::{ExperimentError, Result};
use crate::posterior::ArmPosterior;
use crate::sampler::Sampler;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Interval on the treatment minus control rate difference
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

impl ConfidenceInterval {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }
}

/// Simulation output
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonteCarloEstimate {
    /// Share of draws where treatment beat control
    pub win_probability: f64,
    pub interval: ConfidenceInterval,
}

/// Draw `samples` pairs from the two posteriors.
///
/// The interval bounds are the sorted differences at indices
/// `floor(q * N)` and `floor((1 - q) * N)` with `q = (1 - level) / 2`.
pub fn estimate<R: Rng>(
    sampler: &mut Sampler<R>,
    control: &ArmPosterior,
    treatment: &ArmPosterior,
    samples: usize,
    level: f64,
) -> Result<MonteCarloEstimate> {
    if samples == 0 {
        return Err(ExperimentError::InvalidConfig(
            "samples must be greater than zero".to_string(),
        ));
    }
    for posterior in [control, treatment] {
        if !(posterior.alpha > 0.0 && posterior.beta > 0.0) {
            return Err(ExperimentError::InvalidData(format!(
                "posterior parameters must be positive (alpha={}, beta={})",
                posterior.alpha, posterior.beta
            )));
        }
    }

    let mut wins = 0usize;
    let mut differences = Vec::with_capacity(samples);
    for _ in 0..samples {
        let treatment_sample = sampler.beta_unchecked(treatment.alpha, treatment.beta);
        let control_sample = sampler.beta_unchecked(control.alpha, control.beta);
        if treatment_sample > control_sample {
            wins += 1;
        }
        differences.push(treatment_sample - control_sample);
    }
    differences.sort_unstable_by(f64::total_cmp);

    let tail = (1.0 - level) / 2.0;
    let index = |q: f64| ((q * samples as f64).floor() as usize).min(samples - 1);

    Ok(MonteCarloEstimate {
        win_probability: wins as f64 / samples as f64,
        interval: ConfidenceInterval {
            lower: differences[index(tail)],
            upper: differences[index(1.0 - tail)],
        },
    })
}

/// Difference of posterior means, treatment minus control.
pub fn expected_lift(control: &ArmPosterior, treatment: &ArmPosterior) -> f64 {
    treatment.mean() - control.mean()
}

/// Expected lift as a percentage of the control posterior mean.
pub fn relative_lift(control: &ArmPosterior, treatment: &ArmPosterior) -> f64 {
    let baseline = control.mean();
    if baseline == 0.0 {
        return 0.0;
    }
    expected_lift(control, treatment) / baseline * 100.0
}
