// Configuration file loaders

use crate::env::nest;
use crate::{ConfigError, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileFormat {
    Json,
    Toml,
    Env,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(FileFormat::Json),
            "toml" => Some(FileFormat::Toml),
            "env" => Some(FileFormat::Env),
            _ => None,
        }
    }

    /// Detect the format of `path`, treating a bare `.env` file as Env
    pub fn from_path(path: &Path) -> Option<Self> {
        if path.file_name().and_then(|name| name.to_str()) == Some(".env") {
            return Some(FileFormat::Env);
        }
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

/// Configuration file loader
pub struct ConfigLoader {
    format: FileFormat,
}

impl ConfigLoader {
    pub fn new(format: FileFormat) -> Self {
        Self { format }
    }

    /// Auto-detect format from file extension
    pub fn auto(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = FileFormat::from_path(path).ok_or_else(|| {
            ConfigError::LoadError(format!("Unsupported configuration file: {}", path.display()))
        })?;

        Ok(Self::new(format))
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    /// Load configuration from file
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Value> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::LoadError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        self.parse(&content)
    }

    /// Parse configuration from string
    pub fn parse(&self, content: &str) -> Result<Value> {
        match self.format {
            FileFormat::Json => self.parse_json(content),
            FileFormat::Toml => self.parse_toml(content),
            FileFormat::Env => self.parse_env(content),
        }
    }

    fn parse_json(&self, content: &str) -> Result<Value> {
        serde_json::from_str(content)
            .map_err(|e| ConfigError::ParseError(format!("JSON parse error: {}", e)))
    }

    fn parse_toml(&self, content: &str) -> Result<Value> {
        let toml_value: toml::Value = toml::from_str(content)
            .map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))?;

        serde_json::to_value(toml_value)
            .map_err(|e| ConfigError::ParseError(format!("TOML to JSON conversion error: {}", e)))
    }

    /// Dotenv syntax; keys use the same `section__field` nesting as
    /// environment variables, with or without the `FLAGSHIP_` prefix.
    fn parse_env(&self, content: &str) -> Result<Value> {
        let mut pairs = Vec::new();

        for item in dotenvy::from_read_iter(content.as_bytes()) {
            let (key, value) =
                item.map_err(|e| ConfigError::ParseError(format!("dotenv parse error: {}", e)))?;
            let key = key.strip_prefix("FLAGSHIP_").unwrap_or(&key).to_lowercase();
            pairs.push((key, value));
        }

        Ok(nest(pairs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json() {
        let loader = ConfigLoader::new(FileFormat::Json);
        let json = r#"{"client": {"cache_ttl_secs": 120}}"#;

        let result = loader.parse(json).unwrap();
        assert_eq!(result["client"]["cache_ttl_secs"], 120);
    }

    #[test]
    fn test_parse_toml() {
        let loader = ConfigLoader::new(FileFormat::Toml);
        let toml = r#"
            [experiments]
            samples = 5000
            seed = 3
        "#;

        let result = loader.parse(toml).unwrap();
        assert_eq!(result["experiments"]["samples"], 5000);
    }

    #[test]
    fn test_parse_env() {
        let loader = ConfigLoader::new(FileFormat::Env);
        let env = r#"
# Comment
FLAGSHIP_CLIENT__TIMEOUT_SECS=9
CLIENT__ENABLE_DEBUG_LOGS=true
EXPERIMENTS__INTERVAL_LEVEL="0.9"
"#;

        let result = loader.parse(env).unwrap();
        assert_eq!(result["client"]["timeout_secs"], 9);
        assert_eq!(result["client"]["enable_debug_logs"], true);
        assert_eq!(result["experiments"]["interval_level"], 0.9);
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let loader = ConfigLoader::new(FileFormat::Json);
        assert!(matches!(loader.parse("{"), Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(FileFormat::from_extension("json"), Some(FileFormat::Json));
        assert_eq!(FileFormat::from_extension("TOML"), Some(FileFormat::Toml));
        assert_eq!(FileFormat::from_extension("unknown"), None);
        assert_eq!(FileFormat::from_path(Path::new(".env")), Some(FileFormat::Env));
        assert_eq!(
            FileFormat::from_path(Path::new("conf/flagship.toml")),
            Some(FileFormat::Toml)
        );
        assert!(ConfigLoader::auto("settings.yaml").is_err());
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let loader = ConfigLoader::new(FileFormat::Json);
        assert!(matches!(
            loader.load_file("/nonexistent/flagship.json"),
            Err(ConfigError::LoadError(_))
        ));
    }
}
