//! Per-user caching client.
//!
//! Wraps a [`FlagService`] for one user: results are cached for the configured
//! TTL, can be refreshed in the background, and the cache is dropped whenever
//! the user's attributes change.

use crate::config::ClientConfig;
use crate::error::Result;
use crate::flag::FlagEvaluationResult;
use crate::service::FlagService;
use crate::targeting::{AttributeValue, UserAttributes};
use crate::variant::VariantValue;
use flagship_log::{debug, error, info, targets};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;

struct CachedResult {
    result: FlagEvaluationResult,
    stored_at: Instant,
}

struct ClientInner {
    user_key: String,
    attributes: RwLock<UserAttributes>,
    service: FlagService,
    config: ClientConfig,
    cache: RwLock<HashMap<String, CachedResult>>,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
}

/// Flag client bound to one user.
#[derive(Clone)]
pub struct FlagshipClient {
    inner: Arc<ClientInner>,
}

impl FlagshipClient {
    /// Every flag store read the client makes is bounded by
    /// [`ClientConfig::timeout`].
    pub fn new(
        user_key: impl Into<String>,
        attributes: UserAttributes,
        service: FlagService,
        config: ClientConfig,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                user_key: user_key.into(),
                attributes: RwLock::new(attributes),
                service: service.with_store_timeout(config.timeout()),
                config,
                cache: RwLock::new(HashMap::new()),
                refresh_task: Mutex::new(None),
            }),
        }
    }

    pub fn user_key(&self) -> &str {
        &self.inner.user_key
    }

    pub fn attributes(&self) -> UserAttributes {
        self.inner.attributes.read().clone()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Start the background refresh loop when a refresh interval is set.
    pub fn start(&self) {
        let Some(interval) = self.inner.config.refresh_interval() else {
            return;
        };

        let mut slot = self.inner.refresh_task.lock();
        if slot.is_some() {
            return;
        }

        // Holds only a Weak handle; the loop ends once the client is dropped
        let weak = Arc::downgrade(&self.inner);
        *slot = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let client = FlagshipClient { inner };
                if let Err(err) = client.refresh().await {
                    error!(target: targets::CLIENT, "Periodic refresh failed: {}", err);
                }
            }
        }));
        self.log("Started periodic refresh");
    }

    /// True while the background refresh task is alive.
    pub fn is_refreshing(&self) -> bool {
        self.inner
            .refresh_task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Stop background refresh and drop every cached result.
    pub fn stop(&self) {
        if let Some(task) = self.inner.refresh_task.lock().take() {
            task.abort();
        }
        self.inner.cache.write().clear();
        self.log("Client stopped");
    }

    /// Evaluate a flag, serving from cache while the entry is fresh.
    pub async fn get_flag(&self, flag_key: &str) -> Result<FlagEvaluationResult> {
        if let Some(cached) = self.cached(flag_key) {
            self.log(&format!("Cache hit for flag: {}", flag_key));
            return Ok(cached);
        }

        self.log(&format!("Cache miss for flag: {}", flag_key));
        let attributes = self.attributes();
        let evaluation = self
            .inner
            .service
            .evaluate(flag_key, &self.inner.user_key, &attributes)
            .await?;
        self.store(evaluation.result.clone());
        Ok(evaluation.result)
    }

    /// Evaluate several flags at once and cache every result.
    pub async fn get_flags(&self, flag_keys: &[String]) -> Result<HashMap<String, FlagEvaluationResult>> {
        let attributes = self.attributes();
        let results = self
            .inner
            .service
            .evaluate_many(Some(flag_keys), &self.inner.user_key, &attributes)
            .await?;
        for result in results.values() {
            self.store(result.clone());
        }
        self.log(&format!("Evaluated {} flags", results.len()));
        Ok(results)
    }

    /// True when the flag is actively rolled out to this user with a truthy value.
    pub async fn is_enabled(&self, flag_key: &str) -> Result<bool> {
        let result = self.get_flag(flag_key).await?;
        Ok(result.is_active && result.value.truthy())
    }

    /// The served value, or `None` when the user is outside the rollout.
    pub async fn get_variant(&self, flag_key: &str) -> Result<Option<VariantValue>> {
        let result = self.get_flag(flag_key).await?;
        Ok(result.is_active.then_some(result.value))
    }

    /// Merge attribute updates and invalidate the cache.
    pub fn update_user_attributes(&self, updates: HashMap<String, AttributeValue>) {
        self.inner.attributes.write().apply_update(updates);
        self.inner.cache.write().clear();
        self.log("User attributes updated, cache cleared");
    }

    /// Re-evaluate every cached flag.
    pub async fn refresh(&self) -> Result<()> {
        let keys: Vec<String> = {
            let mut cache = self.inner.cache.write();
            let keys = cache.keys().cloned().collect();
            cache.clear();
            keys
        };

        if !keys.is_empty() {
            self.get_flags(&keys).await?;
        }
        self.log("Manual refresh completed");
        Ok(())
    }

    /// Number of cached results, fresh or not.
    pub fn cached_len(&self) -> usize {
        self.inner.cache.read().len()
    }

    fn cached(&self, flag_key: &str) -> Option<FlagEvaluationResult> {
        let ttl = self.inner.config.cache_ttl();
        {
            let cache = self.inner.cache.read();
            match cache.get(flag_key) {
                Some(entry) if entry.stored_at.elapsed() <= ttl => return Some(entry.result.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        self.inner.cache.write().remove(flag_key);
        None
    }

    fn store(&self, result: FlagEvaluationResult) {
        self.inner.cache.write().insert(
            result.flag_key.clone(),
            CachedResult {
                result,
                stored_at: Instant::now(),
            },
        );
    }

    fn log(&self, message: &str) {
        if self.inner.config.enable_debug_logs {
            info!(target: targets::CLIENT, "{}", message);
        } else {
            debug!(target: targets::CLIENT, "{}", message);
        }
    }
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        if let Some(task) = self.refresh_task.get_mut().take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FeatureError;
    use crate::flag::{EvaluationReason, Flag};
    use crate::store::{FlagStore, InMemoryFlagStore};
    use crate::targeting::TargetingRules;
    use crate::variant::Variant;
    use async_trait::async_trait;
    use std::time::Duration;

    fn store() -> Arc<InMemoryFlagStore> {
        Arc::new(InMemoryFlagStore::with_flags([
            Flag::new("always-on", vec![Variant::new("on", true)]),
            Flag::new("color", vec![Variant::new("blue", "blue")]).with_active(false),
            Flag::new("us-only", vec![Variant::new("off", false), Variant::new("on", true)])
                .with_rules(TargetingRules::new().with_countries(["US"])),
        ]))
    }

    fn client(store: Arc<InMemoryFlagStore>, config: ClientConfig) -> FlagshipClient {
        FlagshipClient::new(
            "user-123",
            UserAttributes::new("user-123").with_country("DE"),
            FlagService::without_exposures(store),
            config,
        )
    }

    #[tokio::test]
    async fn test_is_enabled_and_get_variant() {
        let client = client(store(), ClientConfig::default());
        assert!(client.is_enabled("always-on").await.unwrap());
        assert!(!client.is_enabled("color").await.unwrap());
        assert_eq!(client.get_variant("color").await.unwrap(), None);
        assert_eq!(
            client.get_variant("always-on").await.unwrap(),
            Some(VariantValue::Boolean(true))
        );
    }

    #[tokio::test]
    async fn test_results_are_cached_until_ttl() {
        let store = store();
        let client = client(store.clone(), ClientConfig::default());

        assert!(client.is_enabled("always-on").await.unwrap());
        store.insert(Flag::new("always-on", vec![Variant::new("on", true)]).with_active(false));

        // Served from cache
        assert!(client.is_enabled("always-on").await.unwrap());

        client.refresh().await.unwrap();
        assert!(!client.is_enabled("always-on").await.unwrap());
    }

    #[tokio::test]
    async fn test_zero_ttl_always_reevaluates() {
        let store = store();
        let client = client(store.clone(), ClientConfig::builder().cache_ttl(0).build());
        assert!(client.is_enabled("always-on").await.unwrap());

        store.remove("always-on");
        tokio::time::sleep(Duration::from_millis(2)).await;
        let result = client.get_flag("always-on").await.unwrap();
        assert_eq!(result.reason, EvaluationReason::FlagNotFound);
    }

    #[tokio::test]
    async fn test_not_found_is_cached() {
        let client = client(store(), ClientConfig::default());
        let result = client.get_flag("nope").await.unwrap();
        assert_eq!(result.reason, EvaluationReason::FlagNotFound);
        assert_eq!(client.cached_len(), 1);
    }

    #[tokio::test]
    async fn test_attribute_update_clears_cache() {
        let client = client(store(), ClientConfig::default());
        assert!(!client.is_enabled("us-only").await.unwrap());
        assert_eq!(client.cached_len(), 1);

        let mut updates = HashMap::new();
        updates.insert("country".to_string(), AttributeValue::from("US"));
        client.update_user_attributes(updates);
        assert_eq!(client.cached_len(), 0);
        assert_eq!(client.attributes().country.as_deref(), Some("US"));

        let result = client.get_flag("us-only").await.unwrap();
        assert_ne!(result.reason, EvaluationReason::TargetingRulesNotMet);
    }

    #[tokio::test]
    async fn test_get_flags_fills_cache() {
        let client = client(store(), ClientConfig::default());
        let keys = vec!["always-on".to_string(), "color".to_string(), "ghost".to_string()];
        let results = client.get_flags(&keys).await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(client.cached_len(), 3);
    }

    #[tokio::test]
    async fn test_start_and_stop() {
        let client = client(store(), ClientConfig::builder().refresh_interval(1).build());
        client.start();
        client.start();
        assert!(client.is_refreshing());
        client.get_flag("always-on").await.unwrap();
        client.stop();
        assert!(!client.is_refreshing());
        assert_eq!(client.cached_len(), 0);
    }

    #[tokio::test]
    async fn test_zero_interval_never_starts() {
        let client = client(store(), ClientConfig::builder().refresh_interval(0).build());
        client.start();
        assert!(!client.is_refreshing());
    }

    async fn wait_for_cached(client: &FlagshipClient, flag_key: &str, active: bool) -> bool {
        for _ in 0..120 {
            if client.cached(flag_key).is_some_and(|r| r.is_active == active) {
                return true;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        false
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_refresh_updates_cache() {
        let store = store();
        let client = client(store.clone(), ClientConfig::builder().refresh_interval(60).build());
        assert!(client.is_enabled("always-on").await.unwrap());

        client.start();
        // Let the loop consume its immediate first tick
        tokio::task::yield_now().await;

        store.insert(Flag::new("always-on", vec![Variant::new("on", true)]).with_active(false));
        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(wait_for_cached(&client, "always-on", false).await);

        client.stop();
        assert!(!client.is_refreshing());

        // Once stopped, later store changes are not picked up
        assert!(!client.is_enabled("always-on").await.unwrap());
        store.insert(Flag::new("always-on", vec![Variant::new("on", true)]));
        tokio::time::advance(Duration::from_secs(180)).await;
        tokio::task::yield_now().await;
        assert!(client.cached("always-on").is_some_and(|r| !r.is_active));
    }

    struct SlowStore;

    #[async_trait]
    impl FlagStore for SlowStore {
        async fn get_flag(&self, _key: &str) -> Result<Option<Flag>> {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Ok(Some(Flag::new("slow", vec![Variant::new("on", true)])))
        }

        async fn list_flags(&self) -> Result<Vec<Flag>> {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Ok(Vec::new())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_reads_bounded_by_client_timeout() {
        let client = FlagshipClient::new(
            "user-123",
            UserAttributes::new("user-123"),
            FlagService::without_exposures(Arc::new(SlowStore)),
            ClientConfig::builder().timeout(1).build(),
        );

        let started = tokio::time::Instant::now();
        let err = client.get_flag("slow").await.unwrap_err();
        assert!(matches!(err, FeatureError::Store(_)));
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(client.cached_len(), 0);

        let generous = FlagshipClient::new(
            "user-123",
            UserAttributes::new("user-123"),
            FlagService::without_exposures(Arc::new(SlowStore)),
            ClientConfig::builder().timeout(5).build(),
        );
        assert!(generous.is_enabled("slow").await.unwrap());
    }
}
