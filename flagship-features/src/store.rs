//! Flag store abstraction.

use crate::error::{FeatureError, Result};
use crate::flag::Flag;
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};

/// Read access to flag definitions.
///
/// Implementations live outside the engine (database, config service, edge
/// cache). A store returns `Ok(None)` for unknown keys and
/// [`FeatureError::AccessDenied`] for flags the caller may not read.
#[async_trait]
pub trait FlagStore: Send + Sync {
    /// Fetch one flag by key.
    async fn get_flag(&self, key: &str) -> Result<Option<Flag>>;

    /// Fetch every flag visible to the caller.
    async fn list_flags(&self) -> Result<Vec<Flag>>;
}

/// In-process flag store.
#[derive(Default)]
pub struct InMemoryFlagStore {
    flags: DashMap<String, Flag>,
    hidden: DashSet<String>,
}

impl InMemoryFlagStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from an initial set of flags.
    pub fn with_flags(flags: impl IntoIterator<Item = Flag>) -> Self {
        let store = Self::new();
        for flag in flags {
            store.insert(flag);
        }
        store
    }

    /// Insert or replace a flag.
    pub fn insert(&self, flag: Flag) -> Option<Flag> {
        self.flags.insert(flag.key.clone(), flag)
    }

    pub fn remove(&self, key: &str) -> Option<Flag> {
        self.flags.remove(key).map(|(_, flag)| flag)
    }

    /// Hide a flag from readers of this store; lookups report access denied.
    pub fn restrict(&self, key: impl Into<String>) {
        self.hidden.insert(key.into());
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

#[async_trait]
impl FlagStore for InMemoryFlagStore {
    async fn get_flag(&self, key: &str) -> Result<Option<Flag>> {
        if self.hidden.contains(key) {
            return Err(FeatureError::AccessDenied(key.to_string()));
        }
        Ok(self.flags.get(key).map(|entry| entry.value().clone()))
    }

    async fn list_flags(&self) -> Result<Vec<Flag>> {
        let mut flags: Vec<Flag> = self
            .flags
            .iter()
            .filter(|entry| !self.hidden.contains(entry.key()))
            .map(|entry| entry.value().clone())
            .collect();
        flags.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_and_list() {
        let store = InMemoryFlagStore::with_flags([Flag::boolean("b"), Flag::boolean("a")]);
        assert_eq!(store.len(), 2);
        assert!(store.get_flag("a").await.unwrap().is_some());
        assert!(store.get_flag("zzz").await.unwrap().is_none());

        let keys: Vec<String> = store
            .list_flags()
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.key)
            .collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_restricted_flag_is_denied_and_unlisted() {
        let store = InMemoryFlagStore::with_flags([Flag::boolean("secret"), Flag::boolean("open")]);
        store.restrict("secret");

        assert!(matches!(
            store.get_flag("secret").await,
            Err(FeatureError::AccessDenied(_))
        ));
        assert_eq!(store.list_flags().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_insert_replaces_and_remove_deletes() {
        let store = InMemoryFlagStore::new();
        assert!(store.insert(Flag::boolean("f")).is_none());
        assert!(store.insert(Flag::boolean("f").with_rollout(10)).is_some());
        assert_eq!(store.get_flag("f").await.unwrap().unwrap().rollout_pct, 10);
        assert!(store.remove("f").is_some());
        assert!(store.is_empty());
    }
}
