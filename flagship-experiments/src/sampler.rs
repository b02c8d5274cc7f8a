//! Seedable random variate generation.
//!
//! A [`Sampler`] owns its generator and the spare value left over from the
//! last Box-Muller transform. One sampler belongs to one computation; it is
//! passed by `&mut`, so two computations can never interleave draws from the
//! same state.

use crate::error::{ExperimentError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

/// Normal, gamma, and beta variates from a single owned generator.
#[derive(Debug, Clone)]
pub struct Sampler<R = StdRng> {
    rng: R,
    spare_normal: Option<f64>,
}

impl Sampler<StdRng> {
    /// Reproducible sampler: the same seed yields the same sequence.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Sampler seeded from operating system entropy.
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_os_rng())
    }
}

impl<R: Rng> Sampler<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            spare_normal: None,
        }
    }

    /// Uniform draw in `[0, 1)`.
    pub fn uniform(&mut self) -> f64 {
        self.rng.random::<f64>()
    }

    /// Uniform draw in `(0, 1)`, safe to take a logarithm of.
    fn open_uniform(&mut self) -> f64 {
        loop {
            let u = self.uniform();
            if u > 0.0 {
                return u;
            }
        }
    }

    /// Standard normal draw (Box-Muller).
    ///
    /// Each transform yields two independent values; the second is kept and
    /// returned by the next call.
    pub fn normal(&mut self) -> f64 {
        if let Some(spare) = self.spare_normal.take() {
            return spare;
        }

        let radius = (-2.0 * self.open_uniform().ln()).sqrt();
        let angle = 2.0 * PI * self.uniform();
        self.spare_normal = Some(radius * angle.sin());
        radius * angle.cos()
    }

    /// Gamma(shape, 1) draw.
    pub fn gamma(&mut self, shape: f64) -> Result<f64> {
        check_shape("shape", shape)?;
        Ok(self.gamma_unchecked(shape))
    }

    /// Beta(alpha, beta) draw via the ratio of two gamma draws.
    pub fn beta(&mut self, alpha: f64, beta: f64) -> Result<f64> {
        check_shape("alpha", alpha)?;
        check_shape("beta", beta)?;
        Ok(self.beta_unchecked(alpha, beta))
    }

    /// Marsaglia-Tsang for `shape >= 1`; smaller shapes are boosted with
    /// `Gamma(a) = Gamma(a + 1) * U^(1/a)`.
    pub(crate) fn gamma_unchecked(&mut self, shape: f64) -> f64 {
        if shape < 1.0 {
            let boost = self.open_uniform().powf(1.0 / shape);
            return self.gamma_unchecked(shape + 1.0) * boost;
        }

        let d = shape - 1.0 / 3.0;
        let c = 1.0 / (9.0 * d).sqrt();
        loop {
            let (x, v) = loop {
                let x = self.normal();
                let v = 1.0 + c * x;
                if v > 0.0 {
                    break (x, v * v * v);
                }
            };

            let u = self.open_uniform();
            let x2 = x * x;
            if u < 1.0 - 0.0331 * x2 * x2 {
                return d * v;
            }
            if u.ln() < 0.5 * x2 + d * (1.0 - v + v.ln()) {
                return d * v;
            }
        }
    }

    pub(crate) fn beta_unchecked(&mut self, alpha: f64, beta: f64) -> f64 {
        let x = self.gamma_unchecked(alpha);
        let y = self.gamma_unchecked(beta);
        let sum = x + y;
        if sum > 0.0 {
            x / sum
        } else {
            // Both draws underflowed; fall back to the distribution mean
            alpha / (alpha + beta)
        }
    }
}

fn check_shape(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ExperimentError::InvalidData(format!(
            "{} must be positive and finite, got {}",
            name, value
        )))
    }
}
