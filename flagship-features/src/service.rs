//! Evaluation service: flag lookup, decision, and exposure emission.

use crate::error::{FeatureError, Result};
use crate::exposure::{ExposureEvent, ExposureSink, NoopExposureSink, emit};
use crate::flag::{Evaluation, EvaluationReason, Flag, FlagEvaluationResult};
use crate::store::FlagStore;
use crate::targeting::UserAttributes;
use flagship_log::{Fields, debug, error, targets};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Evaluates flags from a store for individual users.
///
/// Cheap to clone and safe to share across tasks; it holds no per-request
/// state.
#[derive(Clone)]
pub struct FlagService {
    store: Arc<dyn FlagStore>,
    sink: Arc<dyn ExposureSink>,
    store_timeout: Option<Duration>,
}

impl FlagService {
    pub fn new(store: Arc<dyn FlagStore>, sink: Arc<dyn ExposureSink>) -> Self {
        Self {
            store,
            sink,
            store_timeout: None,
        }
    }

    /// Service that never emits exposures.
    pub fn without_exposures(store: Arc<dyn FlagStore>) -> Self {
        Self::new(store, Arc::new(NoopExposureSink))
    }

    /// Bound every flag store read.
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = Some(timeout);
        self
    }

    /// Evaluate one flag for a user.
    ///
    /// Unknown flags and flags the store refuses produce `flag_not_found` and
    /// `access_denied` results rather than errors. An `evaluated` outcome
    /// schedules an exposure on the sink without waiting for it.
    pub async fn evaluate(
        &self,
        flag_key: &str,
        user_key: &str,
        attributes: &UserAttributes,
    ) -> Result<Evaluation> {
        let started = Instant::now();
        let result = match self.lookup(flag_key).await {
            Ok(Some(flag)) => self.evaluate_flag(&flag, user_key, attributes)?,
            Ok(None) => FlagEvaluationResult::not_found(flag_key),
            Err(FeatureError::AccessDenied(_)) => FlagEvaluationResult::access_denied(flag_key),
            Err(err) => return Err(err),
        };

        Ok(Evaluation {
            result,
            duration: started.elapsed(),
        })
    }

    /// Evaluate an already loaded flag and emit its exposure.
    pub fn evaluate_flag(
        &self,
        flag: &Flag,
        user_key: &str,
        attributes: &UserAttributes,
    ) -> Result<FlagEvaluationResult> {
        let result = flag.evaluate(user_key, attributes).inspect_err(|err| {
            error!(target: targets::EVALUATION, "Cannot evaluate flag {}: {}", flag.key, err);
        })?;

        debug!(
            target: targets::EVALUATION,
            fields: Fields::new()
                .with("flag", &result.flag_key)
                .with("variant", &result.variant)
                .with("reason", result.reason),
            "Flag evaluated"
        );

        if result.reason == EvaluationReason::Evaluated {
            emit(
                self.sink.clone(),
                ExposureEvent::new(user_key, &result.flag_key, &result.variant, attributes.clone()),
            );
        }

        Ok(result)
    }

    /// Evaluate several flags, or every visible flag when `flag_keys` is `None`.
    ///
    /// Flags with no variants are skipped and logged so one broken definition
    /// does not fail the whole batch.
    pub async fn evaluate_many(
        &self,
        flag_keys: Option<&[String]>,
        user_key: &str,
        attributes: &UserAttributes,
    ) -> Result<HashMap<String, FlagEvaluationResult>> {
        let mut results = HashMap::new();

        let flags = match flag_keys {
            None => self.list().await?,
            Some(keys) => {
                let mut flags = Vec::with_capacity(keys.len());
                for key in keys {
                    match self.lookup(key).await {
                        Ok(Some(flag)) => flags.push(flag),
                        Ok(None) => {
                            results.insert(key.clone(), FlagEvaluationResult::not_found(key));
                        }
                        Err(FeatureError::AccessDenied(_)) => {
                            results.insert(key.clone(), FlagEvaluationResult::access_denied(key));
                        }
                        Err(err) => return Err(err),
                    }
                }
                flags
            }
        };

        for flag in &flags {
            match self.evaluate_flag(flag, user_key, attributes) {
                Ok(result) => {
                    results.insert(flag.key.clone(), result);
                }
                Err(FeatureError::NoVariants) => continue,
                Err(err) => return Err(err),
            }
        }

        Ok(results)
    }

    async fn list(&self) -> Result<Vec<Flag>> {
        match self.store_timeout {
            Some(limit) => tokio::time::timeout(limit, self.store.list_flags())
                .await
                .map_err(|_| FeatureError::Store("timed out listing flags".to_string()))?,
            None => self.store.list_flags().await,
        }
    }

    async fn lookup(&self, flag_key: &str) -> Result<Option<Flag>> {
        match self.store_timeout {
            Some(limit) => tokio::time::timeout(limit, self.store.get_flag(flag_key))
                .await
                .map_err(|_| FeatureError::Store(format!("timed out reading flag {}", flag_key)))?,
            None => self.store.get_flag(flag_key).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exposure::MemoryExposureSink;
    use crate::store::InMemoryFlagStore;
    use crate::variant::Variant;
    use async_trait::async_trait;

    fn ab_flag(key: &str) -> Flag {
        Flag::new(
            key,
            vec![
                Variant::new("control", false).with_weight(50.0),
                Variant::new("treatment", true).with_weight(50.0),
            ],
        )
    }

    async fn wait_for(sink: &MemoryExposureSink, count: usize) {
        for _ in 0..100 {
            if sink.len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn test_missing_flag_returns_not_found() {
        let service = FlagService::without_exposures(Arc::new(InMemoryFlagStore::new()));
        let eval = service
            .evaluate("ghost", "u1", &UserAttributes::new("u1"))
            .await
            .unwrap();
        assert_eq!(eval.result.reason, EvaluationReason::FlagNotFound);
        assert_eq!(eval.result.variant, "control");
        assert!(!eval.result.is_active);
    }

    #[tokio::test]
    async fn test_restricted_flag_returns_access_denied() {
        let store = InMemoryFlagStore::with_flags([ab_flag("private")]);
        store.restrict("private");
        let service = FlagService::without_exposures(Arc::new(store));
        let eval = service
            .evaluate("private", "u1", &UserAttributes::new("u1"))
            .await
            .unwrap();
        assert_eq!(eval.result.reason, EvaluationReason::AccessDenied);
    }

    #[tokio::test]
    async fn test_evaluated_outcome_emits_exposure() {
        let sink = Arc::new(MemoryExposureSink::new());
        let store = Arc::new(InMemoryFlagStore::with_flags([ab_flag("checkout")]));
        let service = FlagService::new(store, sink.clone());

        let eval = service
            .evaluate("checkout", "u1", &UserAttributes::new("u1").with_country("US"))
            .await
            .unwrap();
        assert_eq!(eval.result.reason, EvaluationReason::Evaluated);

        wait_for(&sink, 1).await;
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].variant, eval.result.variant);
        assert_eq!(events[0].attributes.country.as_deref(), Some("US"));
    }

    #[tokio::test]
    async fn test_short_circuit_outcomes_emit_nothing() {
        let sink = Arc::new(MemoryExposureSink::new());
        let store = Arc::new(InMemoryFlagStore::with_flags([
            ab_flag("off").with_active(false),
            ab_flag("closed").with_rollout(0),
        ]));
        let service = FlagService::new(store, sink.clone());
        let attrs = UserAttributes::new("u1");

        service.evaluate("off", "u1", &attrs).await.unwrap();
        service.evaluate("closed", "u1", &attrs).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(sink.is_empty());
    }

    struct BrokenSink;

    #[async_trait]
    impl ExposureSink for BrokenSink {
        async fn record(&self, _event: ExposureEvent) -> Result<()> {
            Err(FeatureError::Exposure("unreachable".into()))
        }
    }

    #[tokio::test]
    async fn test_sink_failure_does_not_affect_result() {
        let store = Arc::new(InMemoryFlagStore::with_flags([ab_flag("checkout")]));
        let reference = ab_flag("checkout")
            .evaluate("u1", &UserAttributes::new("u1"))
            .unwrap();
        let service = FlagService::new(store, Arc::new(BrokenSink));
        let eval = service
            .evaluate("checkout", "u1", &UserAttributes::new("u1"))
            .await
            .unwrap();
        assert_eq!(eval.result, reference);
    }

    #[tokio::test]
    async fn test_evaluate_many_mixes_outcomes() {
        let store = InMemoryFlagStore::with_flags([
            ab_flag("a"),
            ab_flag("b").with_active(false),
            Flag::new("broken", vec![]),
            ab_flag("hidden"),
        ]);
        store.restrict("hidden");
        let service = FlagService::without_exposures(Arc::new(store));
        let keys: Vec<String> = ["a", "b", "broken", "hidden", "missing"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let results = service
            .evaluate_many(Some(&keys), "u1", &UserAttributes::new("u1"))
            .await
            .unwrap();

        assert_eq!(results["a"].reason, EvaluationReason::Evaluated);
        assert_eq!(results["b"].reason, EvaluationReason::FlagDisabled);
        assert!(!results.contains_key("broken"));
        assert_eq!(results["hidden"].reason, EvaluationReason::AccessDenied);
        assert_eq!(results["missing"].reason, EvaluationReason::FlagNotFound);
    }

    #[tokio::test]
    async fn test_evaluate_many_without_keys_lists_visible_flags() {
        let store = InMemoryFlagStore::with_flags([ab_flag("a"), ab_flag("b")]);
        let service = FlagService::without_exposures(Arc::new(store));
        let results = service
            .evaluate_many(None, "u1", &UserAttributes::new("u1"))
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
    }

    struct SlowStore;

    #[async_trait]
    impl FlagStore for SlowStore {
        async fn get_flag(&self, _key: &str) -> Result<Option<Flag>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(None)
        }

        async fn list_flags(&self) -> Result<Vec<Flag>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_store_timeout_surfaces_as_store_error() {
        let service = FlagService::without_exposures(Arc::new(SlowStore))
            .with_store_timeout(Duration::from_millis(10));
        let err = service
            .evaluate("slow", "u1", &UserAttributes::new("u1"))
            .await
            .unwrap_err();
        assert!(matches!(err, FeatureError::Store(_)));
    }
}
