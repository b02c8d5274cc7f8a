//! Flag definitions and the evaluation state machine.

use crate::bucket::bucket;
use crate::error::{FeatureError, Result};
use crate::targeting::{TargetingRules, UserAttributes};
use crate::variant::{Variant, VariantValue, select_variant};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Feature flag definition as read from the flag store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flag {
    /// Unique flag key
    pub key: String,

    /// Ordered variants; the first one is the default/off variant
    pub variants: Vec<Variant>,

    /// Targeting rules (empty matches everyone)
    #[serde(default)]
    pub rules: TargetingRules,

    /// Percentage of buckets (0-100) that enter the rollout
    pub rollout_pct: u8,

    /// Per-flag salt decorrelating bucket assignment
    pub salt: String,

    /// Whether the flag is switched on
    pub is_active: bool,
}

impl Flag {
    /// Create an active flag at 100% rollout, salted with its own key.
    pub fn new(key: impl Into<String>, variants: Vec<Variant>) -> Self {
        let key = key.into();
        Self {
            salt: key.clone(),
            key,
            variants,
            rules: TargetingRules::default(),
            rollout_pct: 100,
            is_active: true,
        }
    }

    /// On/off flag with `off = false` and `on = true` split evenly.
    ///
    /// ```
    /// use flagship_features::{Flag, UserAttributes};
    ///
    /// let flag = Flag::boolean("new-ui").with_rollout(25);
    /// let result = flag.evaluate("user-123", &UserAttributes::new("user-123")).unwrap();
    /// assert!(result.value.as_bool().is_some());
    /// ```
    pub fn boolean(key: impl Into<String>) -> Self {
        Self::new(
            key,
            vec![
                Variant::new("off", false).with_weight(50.0),
                Variant::new("on", true).with_weight(50.0),
            ],
        )
    }

    pub fn with_rules(mut self, rules: TargetingRules) -> Self {
        self.rules = rules;
        self
    }

    /// Set the rollout percentage, clamped to 100.
    pub fn with_rollout(mut self, rollout_pct: u8) -> Self {
        self.rollout_pct = rollout_pct.min(100);
        self
    }

    pub fn with_salt(mut self, salt: impl Into<String>) -> Self {
        self.salt = salt.into();
        self
    }

    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    /// Check the definition invariants.
    pub fn validate(&self) -> Result<()> {
        if self.variants.is_empty() {
            return Err(FeatureError::NoVariants);
        }
        if self.rollout_pct > 100 {
            return Err(FeatureError::InvalidFlag(format!(
                "{}: rolloutPct {} exceeds 100",
                self.key, self.rollout_pct
            )));
        }
        if let Some(bad) = self
            .variants
            .iter()
            .find(|v| v.weight.is_some_and(|w| !w.is_finite() || w < 0.0))
        {
            return Err(FeatureError::InvalidFlag(format!(
                "{}: variant {} has a negative or non-finite weight",
                self.key, bad.key
            )));
        }
        Ok(())
    }

    /// Evaluate the flag for one user.
    ///
    /// Steps run strictly in order and the first that applies decides:
    /// disabled flag, targeting mismatch, bucket outside the rollout, then
    /// variant selection. Only the last produces an active result.
    ///
    /// Rollout and variant selection share one bucket per `(user_key, salt)`,
    /// so under a partial rollout only the low end of the weight space is
    /// reachable. A 20% rollout of a 50/50 flag serves the first variant to
    /// every rolled-in user until the rollout passes 50.
    pub fn evaluate(&self, user_key: &str, attributes: &UserAttributes) -> Result<FlagEvaluationResult> {
        let default = self.variants.first().ok_or(FeatureError::NoVariants)?;

        if !self.is_active {
            return Ok(self.fallback(default, EvaluationReason::FlagDisabled));
        }

        if !self.rules.matches(attributes) {
            return Ok(self.fallback(default, EvaluationReason::TargetingRulesNotMet));
        }

        let user_bucket = bucket(user_key, &self.salt);
        if user_bucket >= self.rollout_pct {
            return Ok(self.fallback(default, EvaluationReason::NotInRollout));
        }

        let variant = select_variant(&self.variants, user_bucket)?;

        Ok(FlagEvaluationResult {
            flag_key: self.key.clone(),
            variant: variant.key.clone(),
            value: variant.value.clone(),
            is_active: true,
            reason: EvaluationReason::Evaluated,
        })
    }

    fn fallback(&self, default: &Variant, reason: EvaluationReason) -> FlagEvaluationResult {
        FlagEvaluationResult {
            flag_key: self.key.clone(),
            variant: default.key.clone(),
            value: default.value.clone(),
            is_active: false,
            reason,
        }
    }
}

/// Why an evaluation ended where it did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationReason {
    FlagDisabled,
    TargetingRulesNotMet,
    NotInRollout,
    FlagNotFound,
    AccessDenied,
    Evaluated,
}

impl EvaluationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FlagDisabled => "flag_disabled",
            Self::TargetingRulesNotMet => "targeting_rules_not_met",
            Self::NotInRollout => "not_in_rollout",
            Self::FlagNotFound => "flag_not_found",
            Self::AccessDenied => "access_denied",
            Self::Evaluated => "evaluated",
        }
    }
}

impl fmt::Display for EvaluationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of evaluating a flag for a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagEvaluationResult {
    pub flag_key: String,
    /// Selected variant key
    pub variant: String,
    /// Payload of the selected variant
    pub value: VariantValue,
    /// True only when the selection came from a real rollout decision
    pub is_active: bool,
    pub reason: EvaluationReason,
}

impl FlagEvaluationResult {
    /// Default result for a flag the store does not know.
    pub fn not_found(flag_key: impl Into<String>) -> Self {
        Self::placeholder(flag_key, EvaluationReason::FlagNotFound)
    }

    /// Default result for a flag the caller may not read.
    pub fn access_denied(flag_key: impl Into<String>) -> Self {
        Self::placeholder(flag_key, EvaluationReason::AccessDenied)
    }

    fn placeholder(flag_key: impl Into<String>, reason: EvaluationReason) -> Self {
        Self {
            flag_key: flag_key.into(),
            variant: "control".to_string(),
            value: VariantValue::Boolean(false),
            is_active: false,
            reason,
        }
    }
}

/// Evaluation result paired with how long it took
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub result: FlagEvaluationResult,
    pub duration: Duration,
}
