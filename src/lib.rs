// Flagship - feature flags and Bayesian experiments for Rust
//
// This library bundles deterministic flag evaluation with a Bayesian A/B
// analysis engine. Each part lives in its own crate and is re-exported here.

// Re-export flag evaluation
pub use flagship_features::*;

// Re-export experiment analysis under its own namespace
pub use flagship_experiments;

// Re-export logging
pub use flagship_log;

// Re-export optional crates
#[cfg(feature = "config")]
pub use flagship_config;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        AttributeValue,
        ClientConfig,
        EvaluationReason,
        ExposureEvent,
        ExposureSink,
        FeatureError,
        Flag,
        FlagEvaluationResult,
        FlagService,
        FlagStore,
        FlagshipClient,
        InMemoryFlagStore,
        TargetingRules,
        UserAttributes,
        Variant,
        VariantValue,
    };
    pub use flagship_experiments::{
        ArmData, BayesianEngine, BayesianResult, ExperimentConfig, ExperimentData,
        ExperimentRunner, ExperimentSummaryWriter,
    };
}
