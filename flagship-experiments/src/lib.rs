//! Bayesian A/B Experiment Analysis for Flagship
//!
//! Turns aggregated per-arm counts into a posterior verdict: win probability,
//! an interval on the rate difference, expected lift, and an auto-stop signal.
//!
//! ## Features
//!
//! - **Beta-Binomial Posteriors**: Uniform Beta(1, 1) prior per arm
//! - **Monte Carlo Estimation**: Win probability and percentile interval from
//!   10,000 paired posterior draws (configurable)
//! - **Auto-Stop**: Significant at win probability >= 0.95 or <= 0.05
//! - **Seedable Sampling**: Box-Muller normals, Marsaglia-Tsang gammas, and
//!   beta variates from an owned, per-computation generator
//! - **Batch Runner**: Experiments computed on the blocking pool with
//!   per-experiment deadlines and failure isolation
//!
//! ## Quick Start
//!
//! ```rust
//! use flagship_experiments::{ArmData, BayesianEngine, ExperimentConfig, ExperimentData};
//!
//! let engine = BayesianEngine::new(ExperimentConfig::seeded(42)).unwrap();
//! let data = ExperimentData::new(ArmData::new(1000, 120), ArmData::new(1000, 156));
//!
//! let result = engine.compute(&data).unwrap();
//! assert!(result.win_probability > 0.9);
//! assert!(result.is_significant);
//! ```
//!
//! ## Batch Runs
//!
//! ```rust
//! use flagship_experiments::*;
//!
//! # tokio_test::block_on(async {
//! let runner = ExperimentRunner::new(ExperimentConfig::seeded(7)).unwrap();
//! let writer = InMemorySummaryWriter::new();
//!
//! let outcomes = runner
//!     .compute_and_record(
//!         vec![("checkout-v2", ExperimentData::new(ArmData::new(1000, 120), ArmData::new(1000, 156)))],
//!         &writer,
//!     )
//!     .await;
//!
//! assert!(outcomes[0].is_ok());
//! assert!(writer.is_stopped("checkout-v2"));
//! # });
//! ```

mod config;
mod engine;
mod error;
mod estimator;
mod policy;
mod posterior;
mod runner;
mod sampler;

pub use config::*;
pub use engine::*;
pub use error::*;
pub use estimator::{ConfidenceInterval, MonteCarloEstimate, estimate, expected_lift, relative_lift};
pub use policy::*;
pub use posterior::*;
pub use runner::*;
pub use sampler::*;
