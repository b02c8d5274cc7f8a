//! Flag Evaluation for Flagship
//!
//! Deterministic, stateless decision of which variant of a feature a user
//! sees, with an explicit reason for every outcome.
//!
//! # Features
//!
//! - **Sticky Bucketing** - `(userKey, salt)` always maps to the same bucket
//! - **Targeting Rules** - Country, device, user agent, and custom properties
//! - **Weighted Variants** - Multivariate flags with optional traffic weights
//! - **Gradual Rollout** - Percentage-based rollout per flag
//! - **Exposure Events** - Best-effort, fire-and-forget exposure emission
//! - **Caching Client** - Per-user client with TTL cache and background refresh
//!
//! # Quick Start
//!
//! ```
//! use flagship_features::*;
//!
//! let flag = Flag::new(
//!     "checkout-redesign",
//!     vec![
//!         Variant::new("control", false).with_weight(50.0),
//!         Variant::new("treatment", true).with_weight(50.0),
//!     ],
//! )
//! .with_salt("x");
//!
//! let user = UserAttributes::new("u1").with_country("US");
//! let result = flag.evaluate("u1", &user).unwrap();
//! assert_eq!(result.reason, EvaluationReason::Evaluated);
//! ```
//!
//! # Targeting
//!
//! ```
//! use flagship_features::*;
//!
//! let rules = TargetingRules::new()
//!     .with_countries(["US", "CA"])
//!     .with_device_types(["mobile"]);
//!
//! let flag = Flag::boolean("mobile-nav").with_rules(rules);
//! let desktop = UserAttributes::new("u2").with_country("US").with_device_type("desktop");
//! let result = flag.evaluate("u2", &desktop).unwrap();
//! assert_eq!(result.reason, EvaluationReason::TargetingRulesNotMet);
//! ```
//!
//! # Serving From a Store
//!
//! ```
//! use flagship_features::*;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let store = Arc::new(InMemoryFlagStore::with_flags([Flag::boolean("new-ui")]));
//! let service = FlagService::new(store, Arc::new(NoopExposureSink));
//!
//! let evaluation = service
//!     .evaluate("new-ui", "user-123", &UserAttributes::new("user-123"))
//!     .await
//!     .unwrap();
//! assert_eq!(evaluation.result.flag_key, "new-ui");
//! # });
//! ```

pub mod bucket;
pub mod client;
pub mod config;
pub mod error;
pub mod exposure;
pub mod flag;
pub mod service;
pub mod store;
pub mod targeting;
pub mod variant;

pub use bucket::{BUCKET_COUNT, bucket};
pub use client::FlagshipClient;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{FeatureError, Result};
pub use exposure::{ExposureEvent, ExposureSink, MemoryExposureSink, NoopExposureSink, emit};
pub use flag::{Evaluation, EvaluationReason, Flag, FlagEvaluationResult};
pub use service::FlagService;
pub use store::{FlagStore, InMemoryFlagStore};
pub use targeting::{AttributeValue, RuleValue, TargetingRules, UserAttributes};
pub use variant::{Variant, VariantValue, select_variant};
