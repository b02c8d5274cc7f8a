// Layered Flagship settings

use crate::env::{EnvLoader, nest};
use crate::loader::{ConfigLoader, FileFormat};
use crate::validation::{ConfigValidator, Validate};
use crate::{ConfigError, Result};
use flagship_experiments::ExperimentConfig;
use flagship_features::ClientConfig;
use flagship_log::{debug, info, targets};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Settings for the SDK client and the experiment engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub client: ClientConfig,
    pub experiments: ExperimentConfig,
}

impl Settings {
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::new()
    }

    /// Defaults overlaid with a JSON, TOML or dotenv file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::builder().add_file(path).build()
    }

    /// Defaults overlaid with `FLAGSHIP_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::builder().load_env().build()
    }

    /// File (when given) overlaid with environment variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Self::builder();
        if let Some(path) = path {
            builder = builder.add_file(path);
        }
        builder.load_env().build()
    }

    /// Deserialize and validate a settings tree
    pub fn from_value(value: Value) -> Result<Self> {
        let settings: Settings = serde_json::from_value(value)
            .map_err(|e| ConfigError::ParseError(format!("Invalid settings: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        ConfigValidator::positive(self.client.timeout_secs, "client.timeout_secs")?;
        ConfigValidator::in_range(self.experiments.samples, 1, 10_000_000, "experiments.samples")?;
        self.experiments.validate()?;
        Ok(())
    }
}

/// Builder for [`Settings`]. Layers apply in order: files, in-memory values,
/// dotenv, then the process environment. Later layers override earlier ones key by key.
pub struct SettingsBuilder {
    load_env: bool,
    env_loader: EnvLoader,
    load_dotenv: bool,
    dotenv_path: Option<PathBuf>,
    config_files: Vec<(PathBuf, Option<FileFormat>)>,
    overrides: Vec<Value>,
}

impl SettingsBuilder {
    pub fn new() -> Self {
        Self {
            load_env: false,
            env_loader: EnvLoader::flagship(),
            load_dotenv: false,
            dotenv_path: None,
            config_files: Vec::new(),
            overrides: Vec::new(),
        }
    }

    /// Set environment variable prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_loader = EnvLoader::new(Some(prefix.into()));
        self
    }

    /// Enable loading from environment variables
    pub fn load_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Enable loading from a dotenv file; `None` reads `./.env` if present
    pub fn load_dotenv(mut self, path: Option<PathBuf>) -> Self {
        self.load_dotenv = true;
        self.dotenv_path = path;
        self
    }

    /// Add configuration file to load, detecting its format
    pub fn add_file(mut self, path: impl AsRef<Path>) -> Self {
        self.config_files.push((path.as_ref().to_path_buf(), None));
        self
    }

    /// Add configuration file with an explicit format
    pub fn add_file_with_format(mut self, path: impl AsRef<Path>, format: FileFormat) -> Self {
        self.config_files
            .push((path.as_ref().to_path_buf(), Some(format)));
        self
    }

    /// Add an in-memory layer on top of the files
    pub fn add_value(mut self, value: Value) -> Self {
        self.overrides.push(value);
        self
    }

    /// Build the settings
    pub fn build(self) -> Result<Settings> {
        let mut merged = serde_json::to_value(Settings::default())
            .map_err(|e| ConfigError::SerializationError(e.to_string()))?;

        for (path, format) in &self.config_files {
            let loader = match format {
                Some(format) => ConfigLoader::new(*format),
                None => ConfigLoader::auto(path)?,
            };
            debug!(target: targets::CONFIG, "Loading settings from {}", path.display());
            merge(&mut merged, loader.load_file(path)?);
        }

        for value in self.overrides {
            merge(&mut merged, value);
        }

        if self.load_dotenv
            && let Some(layer) = dotenv_layer(&self.env_loader, self.dotenv_path.as_deref())?
        {
            merge(&mut merged, layer);
        }

        if self.load_env {
            merge(&mut merged, self.env_loader.overrides()?);
        }

        let settings = Settings::from_value(merged)?;
        info!(
            target: targets::CONFIG,
            "Settings loaded (cache_ttl={}s, samples={})",
            settings.client.cache_ttl_secs,
            settings.experiments.samples
        );
        Ok(settings)
    }
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn dotenv_layer(loader: &EnvLoader, path: Option<&Path>) -> Result<Option<Value>> {
    let iter = match path {
        Some(path) => dotenvy::from_path_iter(path)
            .map_err(|e| ConfigError::LoadError(format!("{}: {}", path.display(), e)))?,
        None => match dotenvy::from_path_iter(".env") {
            Ok(iter) => iter,
            // Missing ./.env is not an error
            Err(_) => return Ok(None),
        },
    };

    let mut pairs = Vec::new();
    for item in iter {
        pairs.push(item.map_err(|e| ConfigError::ParseError(e.to_string()))?);
    }
    Ok(Some(nest(loader.filter(pairs))))
}

/// Deep-merge `overlay` into `base`; objects merge key by key, anything else
/// replaces.
pub fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
