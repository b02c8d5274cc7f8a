//! User attributes and targeting rules.
//!
//! A rule set constrains up to four dimensions: `country`, `deviceType`,
//! `userAgent` and any number of custom properties. Every present dimension
//! must pass (AND); within a dimension any acceptable value is enough (OR).

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Scalar or list attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Boolean(bool),
    Number(f64),
    String(String),
    List(Vec<AttributeValue>),
}

impl AttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert a loose JSON value; `null` and objects have no attribute form.
    /// Lists keep only their convertible items.
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Self::Boolean(b)),
            Value::Number(n) => n.as_f64().map(Self::Number),
            Value::String(s) => Some(Self::String(s)),
            Value::Array(items) => Some(Self::List(
                items.into_iter().filter_map(Self::from_json).collect(),
            )),
            Value::Null | Value::Object(_) => None,
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl<T: Into<AttributeValue>> From<Vec<T>> for AttributeValue {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

/// Attributes of the user being evaluated
///
/// Deserialization never fails on a bad field: a non-string typed field
/// becomes `None`, and custom properties that are `null` or objects are
/// dropped. Targeting then treats them as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAttributes {
    #[serde(default, deserialize_with = "lenient_id")]
    pub user_id: String,

    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub country: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub device_type: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_agent: Option<String>,

    #[serde(default, deserialize_with = "lenient_properties")]
    pub custom_properties: HashMap<String, AttributeValue>,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

fn lenient_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_string(deserializer)?.unwrap_or_default())
}

fn lenient_properties<'de, D>(deserializer: D) -> Result<HashMap<String, AttributeValue>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Object(map) = Value::deserialize(deserializer)? else {
        return Ok(HashMap::new());
    };
    Ok(map
        .into_iter()
        .filter_map(|(key, value)| AttributeValue::from_json(value).map(|v| (key, v)))
        .collect())
}

impl UserAttributes {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Self::default()
        }
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn with_device_type(mut self, device_type: impl Into<String>) -> Self {
        self.device_type = Some(device_type.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.custom_properties.insert(key.into(), value.into());
        self
    }

    /// Apply a loose key/value update.
    ///
    /// Known fields (`userId`, `country`, `deviceType`, `userAgent`, in camel
    /// or snake case) overwrite the typed field when given a string; every
    /// other key lands in `custom_properties`.
    pub fn apply_update(&mut self, updates: HashMap<String, AttributeValue>) {
        for (key, value) in updates {
            let slot = match key.as_str() {
                "userId" | "user_id" => {
                    if let AttributeValue::String(s) = value {
                        self.user_id = s;
                    }
                    continue;
                }
                "country" => &mut self.country,
                "deviceType" | "device_type" => &mut self.device_type,
                "userAgent" | "user_agent" => &mut self.user_agent,
                _ => {
                    self.custom_properties.insert(key, value);
                    continue;
                }
            };
            *slot = match value {
                AttributeValue::String(s) => Some(s),
                _ => None,
            };
        }
    }
}

/// Expected value(s) for one custom property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleValue {
    /// Membership: the attribute must equal one of these
    AnyOf(Vec<AttributeValue>),
    /// Equality with a single expected value
    Equals(AttributeValue),
}

impl RuleValue {
    /// An empty membership list places no constraint, like an empty
    /// `country` list.
    pub fn is_unconstrained(&self) -> bool {
        matches!(self, RuleValue::AnyOf(allowed) if allowed.is_empty())
    }

    fn accepts(&self, actual: &AttributeValue) -> bool {
        match self {
            RuleValue::AnyOf(allowed) => allowed.contains(actual),
            RuleValue::Equals(expected) => expected == actual,
        }
    }
}

/// Targeting rule set attached to a flag
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetingRules {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<Vec<String>>,

    /// Case-insensitive substring patterns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_properties: Option<HashMap<String, RuleValue>>,
}

impl TargetingRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_countries<I, S>(mut self, countries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.country = Some(countries.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_device_types<I, S>(mut self, device_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.device_type = Some(device_types.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_user_agents<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.user_agent = Some(patterns.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, expected: RuleValue) -> Self {
        self.custom_properties
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), expected);
        self
    }

    /// True when no dimension carries a constraint.
    pub fn is_empty(&self) -> bool {
        constraint(&self.country).is_none()
            && constraint(&self.device_type).is_none()
            && constraint(&self.user_agent).is_none()
            && self
                .custom_properties
                .as_ref()
                .is_none_or(|props| props.values().all(RuleValue::is_unconstrained))
    }

    /// Evaluate the rule set against a user.
    pub fn matches(&self, attributes: &UserAttributes) -> bool {
        if let Some(allowed) = constraint(&self.country) {
            match present(&attributes.country) {
                Some(country) if allowed.iter().any(|c| c == country) => {}
                _ => return false,
            }
        }

        if let Some(allowed) = constraint(&self.device_type) {
            match present(&attributes.device_type) {
                Some(device) if allowed.iter().any(|d| d == device) => {}
                _ => return false,
            }
        }

        if let Some(patterns) = constraint(&self.user_agent) {
            let Some(agent) = present(&attributes.user_agent) else {
                return false;
            };
            let agent = agent.to_lowercase();
            if !patterns
                .iter()
                .any(|pattern| agent.contains(&pattern.to_lowercase()))
            {
                return false;
            }
        }

        if let Some(props) = &self.custom_properties {
            for (key, expected) in props {
                if expected.is_unconstrained() {
                    continue;
                }
                match attributes.custom_properties.get(key) {
                    Some(actual) if expected.accepts(actual) => {}
                    _ => return false,
                }
            }
        }

        true
    }
}

/// An empty list places no constraint on its dimension.
fn constraint(values: &Option<Vec<String>>) -> Option<&[String]> {
    values.as_deref().filter(|v| !v.is_empty())
}

/// Blank attribute strings count as missing.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}
