//! Variants and variant selection.

use crate::error::{FeatureError, Result};
use serde::{Deserialize, Serialize};

/// Payload served for a variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariantValue {
    Boolean(bool),
    Number(f64),
    String(String),
    Json(serde_json::Value),
}

impl VariantValue {
    pub fn boolean(value: bool) -> Self {
        Self::Boolean(value)
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    pub fn number(value: f64) -> Self {
        Self::Number(value)
    }

    pub fn json(value: serde_json::Value) -> Self {
        Self::Json(value)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Loose truthiness used by `is_enabled` style checks.
    ///
    /// `false`, `0`, `NaN`, the empty string and JSON `null` are falsy.
    pub fn truthy(&self) -> bool {
        match self {
            Self::Boolean(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::String(s) => !s.is_empty(),
            Self::Json(value) => match value {
                serde_json::Value::Null => false,
                serde_json::Value::Bool(b) => *b,
                serde_json::Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
                serde_json::Value::String(s) => !s.is_empty(),
                _ => true,
            },
        }
    }
}

impl From<bool> for VariantValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<&str> for VariantValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for VariantValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<f64> for VariantValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// One arm of a flag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    /// Variant key reported in evaluation results
    pub key: String,

    /// Payload served to users in this variant
    pub value: VariantValue,

    /// Relative traffic weight; when any variant sets one, selection is weighted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl Variant {
    pub fn new(key: impl Into<String>, value: impl Into<VariantValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            weight: None,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }
}

/// Pick a variant for a bucket in `0..100`.
///
/// A single variant is returned unconditionally. If any variant declares a
/// weight, the bucket is scaled onto the total weight and the first variant
/// whose cumulative weight reaches it wins; a zero total falls back to
/// `bucket mod len`. Without weights traffic is split evenly by
/// `bucket mod len`.
pub fn select_variant(variants: &[Variant], bucket: u8) -> Result<&Variant> {
    let (first, rest) = variants.split_first().ok_or(FeatureError::NoVariants)?;
    if rest.is_empty() {
        return Ok(first);
    }

    let equal_split = || &variants[bucket as usize % variants.len()];

    if variants.iter().all(|v| v.weight.is_none()) {
        return Ok(equal_split());
    }

    let total_weight: f64 = variants.iter().map(effective_weight).sum();
    if total_weight <= 0.0 {
        return Ok(equal_split());
    }

    let target = bucket as f64 * total_weight / 100.0;
    let mut cumulative = 0.0;
    for variant in variants {
        cumulative += effective_weight(variant);
        if cumulative >= target {
            return Ok(variant);
        }
    }

    // Float rounding can leave the target a hair above the final sum
    Ok(&variants[variants.len() - 1])
}

fn effective_weight(variant: &Variant) -> f64 {
    match variant.weight {
        Some(w) if w.is_finite() && w > 0.0 => w,
        _ => 0.0,
    }
}
