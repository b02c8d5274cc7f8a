//! Exposure events and sinks.
//!
//! An exposure records that a user was actually served a variant. Emission is
//! fire-and-forget: the evaluator hands the event to a sink on a background
//! task and never waits for, or reports, the outcome.

use crate::error::Result;
use crate::targeting::UserAttributes;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flagship_log::{Fields, debug, targets, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// A user was served a variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExposureEvent {
    pub user_key: String,
    pub flag_key: String,
    pub variant: String,
    pub attributes: UserAttributes,
    pub timestamp: DateTime<Utc>,
}

impl ExposureEvent {
    pub fn new(
        user_key: impl Into<String>,
        flag_key: impl Into<String>,
        variant: impl Into<String>,
        attributes: UserAttributes,
    ) -> Self {
        Self {
            user_key: user_key.into(),
            flag_key: flag_key.into(),
            variant: variant.into(),
            attributes,
            timestamp: Utc::now(),
        }
    }
}

/// Destination for exposure events
#[async_trait]
pub trait ExposureSink: Send + Sync {
    async fn record(&self, event: ExposureEvent) -> Result<()>;
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopExposureSink;

#[async_trait]
impl ExposureSink for NoopExposureSink {
    async fn record(&self, _event: ExposureEvent) -> Result<()> {
        Ok(())
    }
}

/// Sink that keeps events in memory.
///
/// Useful for tests and for feeding per-variant exposure counts into the
/// experiment engine within one process.
#[derive(Debug, Default)]
pub struct MemoryExposureSink {
    events: Mutex<Vec<ExposureEvent>>,
}

impl MemoryExposureSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ExposureEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Distinct exposed users per variant for one flag.
    pub fn unique_users_by_variant(&self, flag_key: &str) -> HashMap<String, u64> {
        let events = self.events.lock();
        let mut seen: HashMap<&str, std::collections::HashSet<&str>> = HashMap::new();
        for event in events.iter().filter(|e| e.flag_key == flag_key) {
            seen.entry(event.variant.as_str())
                .or_default()
                .insert(event.user_key.as_str());
        }
        seen.into_iter()
            .map(|(variant, users)| (variant.to_string(), users.len() as u64))
            .collect()
    }
}

#[async_trait]
impl ExposureSink for MemoryExposureSink {
    async fn record(&self, event: ExposureEvent) -> Result<()> {
        self.events.lock().push(event);
        Ok(())
    }
}

/// Hand an event to the sink without waiting.
///
/// Runs on the current tokio runtime; outside a runtime the event is dropped.
/// Sink failures are logged and swallowed.
pub fn emit(sink: Arc<dyn ExposureSink>, event: ExposureEvent) {
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        debug!(
            target: targets::EXPOSURE,
            "No async runtime; dropping exposure for {}", event.flag_key
        );
        return;
    };

    handle.spawn(async move {
        let fields = Fields::new()
            .with("flag", &event.flag_key)
            .with("variant", &event.variant);
        match sink.record(event).await {
            Ok(()) => debug!(target: targets::EXPOSURE, fields: fields, "Exposure recorded"),
            Err(err) => warn!(
                target: targets::EXPOSURE,
                fields: fields,
                "Failed to record exposure: {}", err
            ),
        }
    });
}
