//! Client configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for [`FlagshipClient`](crate::FlagshipClient)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Seconds between background refreshes of cached flags (0 disables)
    pub refresh_interval_secs: u64,
    /// Seconds a cached evaluation stays valid
    pub cache_ttl_secs: u64,
    /// Emit client debug logs
    pub enable_debug_logs: bool,
    /// Seconds allowed for one flag store round trip
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 60,
            cache_ttl_secs: 300,
            enable_debug_logs: false,
            timeout_secs: 5,
        }
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        (self.refresh_interval_secs > 0).then(|| Duration::from_secs(self.refresh_interval_secs))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Builder for ClientConfig
#[derive(Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn refresh_interval(mut self, secs: u64) -> Self {
        self.config.refresh_interval_secs = secs;
        self
    }

    pub fn cache_ttl(mut self, secs: u64) -> Self {
        self.config.cache_ttl_secs = secs;
        self
    }

    pub fn enable_debug_logs(mut self, enabled: bool) -> Self {
        self.config.enable_debug_logs = enabled;
        self
    }

    pub fn timeout(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs.max(1);
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}
