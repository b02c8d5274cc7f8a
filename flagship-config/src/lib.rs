//! Settings loading for Flagship
//!
//! [`Settings`] aggregates the SDK client configuration and the experiment
//! engine configuration. Values are layered: built-in defaults, then JSON or
//! TOML files, then dotenv files, then `FLAGSHIP_*` environment variables.
//! Nested fields use a double underscore in variable names:
//!
//! ```text
//! FLAGSHIP_CLIENT__CACHE_TTL_SECS=600
//! FLAGSHIP_EXPERIMENTS__SAMPLES=20000
//! ```
//!
//! ```rust
//! use flagship_config::Settings;
//! use serde_json::json;
//!
//! let settings = Settings::builder()
//!     .add_value(json!({"client": {"cache_ttl_secs": 60}}))
//!     .build()
//!     .unwrap();
//! assert_eq!(settings.client.cache_ttl_secs, 60);
//! assert_eq!(settings.experiments.samples, 10_000);
//! ```

pub mod env;
pub mod error;
pub mod loader;
pub mod settings;
pub mod validation;

pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use settings::{Settings, SettingsBuilder};
pub use validation::{ConfigValidator, Validate};
