// Environment variable loading

use crate::{ConfigError, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::env;

/// Prefix for every Flagship environment variable
pub const ENV_PREFIX: &str = "FLAGSHIP";

/// Separator between nested setting sections in a variable name
pub const NESTING_SEPARATOR: &str = "__";

/// Environment variable loader
///
/// `FLAGSHIP_CLIENT__CACHE_TTL_SECS=600` becomes the key path
/// `client.cache_ttl_secs`.
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    /// Create a new environment loader
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Loader for `FLAGSHIP_*` variables
    pub fn flagship() -> Self {
        Self::new(Some(ENV_PREFIX.to_string()))
    }

    /// Load all matching environment variables with the prefix stripped
    pub fn load(&self) -> Result<HashMap<String, String>> {
        Ok(self.filter(env::vars()))
    }

    /// Keep the pairs carrying this loader's prefix, keyed in lowercase
    pub fn filter<I>(&self, vars: I) -> HashMap<String, String>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut config = HashMap::new();

        for (key, value) in vars {
            match self.prefix {
                Some(ref prefix) => {
                    if let Some(rest) = key.strip_prefix(prefix.as_str())
                        && let Some(trimmed) = rest.strip_prefix('_')
                        && !trimmed.is_empty()
                    {
                        config.insert(trimmed.to_lowercase(), value);
                    }
                }
                None => {
                    config.insert(key.to_lowercase(), value);
                }
            }
        }

        config
    }

    /// Load a specific environment variable
    pub fn load_var(&self, key: &str) -> Result<String> {
        let full_key = if let Some(ref prefix) = self.prefix {
            format!("{}_{}", prefix, key.to_uppercase())
        } else {
            key.to_uppercase()
        };

        env::var(&full_key).map_err(ConfigError::EnvError)
    }

    /// Load with default value
    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }

    /// Environment variables as a nested settings tree
    pub fn overrides(&self) -> Result<Value> {
        Ok(nest(self.load()?))
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::flagship()
    }
}

/// Turn flat `section__field` keys into a nested JSON object.
///
/// Scalars are typed when they parse as a number or boolean; everything else
/// stays a string.
pub fn nest<I>(pairs: I) -> Value
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut root = Map::new();

    'pairs: for (key, raw) in pairs {
        let mut path: Vec<&str> = key.split(NESTING_SEPARATOR).collect();
        let Some(leaf) = path.pop() else { continue };

        let mut node = &mut root;
        for section in path {
            let entry = node
                .entry(section.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            let Value::Object(next) = entry else {
                continue 'pairs;
            };
            node = next;
        }
        node.insert(leaf.to_string(), scalar(&raw));
    }

    Value::Object(root)
}

fn scalar(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw.trim()) {
        Ok(value @ (Value::Bool(_) | Value::Number(_))) => value,
        _ => Value::String(raw.to_string()),
    }
}
