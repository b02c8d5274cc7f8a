//! Batch orchestration of experiment computations.
//!
//! Each experiment runs on the blocking pool with its own sampler and an
//! optional deadline. Outcomes are reported per experiment, so one bad input
//! or slow computation never affects the others.

use crate::config::ExperimentConfig;
use crate::engine::{BayesianEngine, BayesianResult};
use crate::error::{ExperimentError, Result};
use crate::posterior::ExperimentData;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flagship_log::{Fields, info, targets, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Successful computation for one experiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentSummary {
    pub experiment_id: String,
    pub result: BayesianResult,
    pub computed_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// Set once the summary writer has marked the experiment stopped
    pub stopped: bool,
}

/// Per-experiment entry of a batch run
#[derive(Debug)]
pub struct ExperimentOutcome {
    pub experiment_id: String,
    pub result: Result<ExperimentSummary>,
}

impl ExperimentOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Persists computed results into the experiment record.
#[async_trait]
pub trait ExperimentSummaryWriter: Send + Sync {
    async fn write_summary(&self, experiment_id: &str, result: &BayesianResult) -> Result<()>;

    /// Mark the experiment stopped after a significant result.
    async fn mark_stopped(&self, experiment_id: &str) -> Result<()>;
}

/// Summary writer backed by process memory.
#[derive(Debug, Default)]
pub struct InMemorySummaryWriter {
    summaries: RwLock<HashMap<String, BayesianResult>>,
    stopped: RwLock<HashSet<String>>,
}

impl InMemorySummaryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summary(&self, experiment_id: &str) -> Option<BayesianResult> {
        self.summaries.read().get(experiment_id).cloned()
    }

    pub fn is_stopped(&self, experiment_id: &str) -> bool {
        self.stopped.read().contains(experiment_id)
    }

    pub fn len(&self) -> usize {
        self.summaries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.summaries.read().is_empty()
    }
}

#[async_trait]
impl ExperimentSummaryWriter for InMemorySummaryWriter {
    async fn write_summary(&self, experiment_id: &str, result: &BayesianResult) -> Result<()> {
        self.summaries
            .write()
            .insert(experiment_id.to_string(), result.clone());
        Ok(())
    }

    async fn mark_stopped(&self, experiment_id: &str) -> Result<()> {
        self.stopped.write().insert(experiment_id.to_string());
        Ok(())
    }
}

/// Runs experiment computations off the async executor.
///
/// Conversion counts must be real tracked conversions. The runner takes
/// [`ExperimentData`] as given and never derives conversions from exposures.
#[derive(Debug, Clone)]
pub struct ExperimentRunner {
    engine: Arc<BayesianEngine>,
}

impl ExperimentRunner {
    pub fn new(config: ExperimentConfig) -> Result<Self> {
        Ok(Self {
            engine: Arc::new(BayesianEngine::new(config)?),
        })
    }

    pub fn config(&self) -> &ExperimentConfig {
        self.engine.config()
    }

    /// Compute one experiment on the current thread.
    pub fn compute(&self, data: &ExperimentData) -> Result<BayesianResult> {
        self.engine.compute(data)
    }

    /// Compute every experiment concurrently, preserving input order.
    pub async fn compute_batch<I, S>(&self, items: I) -> Vec<ExperimentOutcome>
    where
        I: IntoIterator<Item = (S, ExperimentData)>,
        S: Into<String>,
    {
        let timeout = self.engine.config().timeout();
        let handles: Vec<_> = items
            .into_iter()
            .map(|(id, data)| {
                let id = id.into();
                let engine = Arc::clone(&self.engine);
                let handle = tokio::spawn(run_one(engine, id.clone(), data, timeout));
                (id, handle)
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (experiment_id, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(err) => Err(err.into()),
            };
            if let Err(err) = &result {
                warn!(
                    target: targets::EXPERIMENT,
                    fields: Fields::new().with("experiment", &experiment_id),
                    "Experiment computation failed: {}",
                    err
                );
            }
            outcomes.push(ExperimentOutcome {
                experiment_id,
                result,
            });
        }

        info!(
            target: targets::EXPERIMENT,
            fields: Fields::new()
                .with("experiments", outcomes.len())
                .with("failed", outcomes.iter().filter(|o| !o.is_ok()).count()),
            "Experiment batch finished"
        );
        outcomes
    }

    /// Compute a batch, write each summary, and mark significant
    /// experiments stopped.
    pub async fn compute_and_record<I, S>(
        &self,
        items: I,
        writer: &dyn ExperimentSummaryWriter,
    ) -> Vec<ExperimentOutcome>
    where
        I: IntoIterator<Item = (S, ExperimentData)>,
        S: Into<String>,
    {
        let mut outcomes = self.compute_batch(items).await;
        for outcome in &mut outcomes {
            let Ok(summary) = &mut outcome.result else {
                continue;
            };
            if let Err(err) = record(writer, summary).await {
                warn!(
                    target: targets::EXPERIMENT,
                    fields: Fields::new().with("experiment", &outcome.experiment_id),
                    "Failed to record experiment summary: {}",
                    err
                );
                outcome.result = Err(err);
            }
        }
        outcomes
    }
}

async fn run_one(
    engine: Arc<BayesianEngine>,
    experiment_id: String,
    data: ExperimentData,
    timeout: Option<Duration>,
) -> Result<ExperimentSummary> {
    let started = Instant::now();
    let work = tokio::task::spawn_blocking(move || engine.compute(&data));
    let joined = match timeout {
        Some(limit) => tokio::time::timeout(limit, work)
            .await
            .map_err(|_| ExperimentError::Timeout {
                experiment: experiment_id.clone(),
                after_ms: limit.as_millis() as u64,
            })?,
        None => work.await,
    };
    let result = joined??;

    Ok(ExperimentSummary {
        experiment_id,
        result,
        computed_at: Utc::now(),
        duration_ms: started.elapsed().as_millis() as u64,
        stopped: false,
    })
}

async fn record(writer: &dyn ExperimentSummaryWriter, summary: &mut ExperimentSummary) -> Result<()> {
    writer
        .write_summary(&summary.experiment_id, &summary.result)
        .await?;
    if summary.result.should_stop() {
        writer.mark_stopped(&summary.experiment_id).await?;
        summary.stopped = true;
        info!(
            target: targets::EXPERIMENT,
            fields: Fields::new()
                .with("experiment", &summary.experiment_id)
                .with("win_probability", summary.result.win_probability),
            "Experiment reached significance and was stopped"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::posterior::ArmData;

    fn data(control: (u64, u64), treatment: (u64, u64)) -> ExperimentData {
        ExperimentData::new(
            ArmData::new(control.0, control.1),
            ArmData::new(treatment.0, treatment.1),
        )
    }

    fn runner() -> ExperimentRunner {
        ExperimentRunner::new(ExperimentConfig::seeded(11)).unwrap()
    }

    struct FailingWriter;

    #[async_trait]
    impl ExperimentSummaryWriter for FailingWriter {
        async fn write_summary(&self, _: &str, _: &BayesianResult) -> Result<()> {
            Err(ExperimentError::Writer("record store offline".to_string()))
        }

        async fn mark_stopped(&self, _: &str) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_compute_sync() {
        let result = runner().compute(&data((1000, 120), (1000, 156))).unwrap();
        assert!(result.is_significant);
    }

    #[tokio::test]
    async fn test_batch_isolates_failures() {
        let outcomes = runner()
            .compute_batch(vec![
                ("exp-a", data((100, 10), (100, 12))),
                ("exp-bad", data((10, 20), (10, 1))),
                ("exp-c", data((1000, 120), (1000, 156))),
            ])
            .await;

        let ids: Vec<_> = outcomes.iter().map(|o| o.experiment_id.as_str()).collect();
        assert_eq!(ids, ["exp-a", "exp-bad", "exp-c"]);
        assert!(outcomes[0].is_ok());
        assert!(matches!(
            outcomes[1].result,
            Err(ExperimentError::InvalidData(_))
        ));
        let summary = outcomes[2].result.as_ref().unwrap();
        assert_eq!(summary.experiment_id, "exp-c");
        assert!(summary.result.is_significant);
        assert!(!summary.stopped);
    }

    #[tokio::test]
    async fn test_batch_timeout() {
        let config = ExperimentConfig::builder()
            .samples(2_000_000)
            .seed(1)
            .timeout(Duration::from_millis(1))
            .build()
            .unwrap();
        let runner = ExperimentRunner::new(config).unwrap();
        let outcomes = runner
            .compute_batch([("slow", data((1000, 100), (1000, 110)))])
            .await;
        match &outcomes[0].result {
            Err(ExperimentError::Timeout { experiment, after_ms }) => {
                assert_eq!(experiment, "slow");
                assert_eq!(*after_ms, 1);
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let outcomes = runner()
            .compute_batch(Vec::<(String, ExperimentData)>::new())
            .await;
        assert!(outcomes.is_empty());
    }

    #[tokio::test]
    async fn test_record_marks_significant_experiments_stopped() {
        let writer = InMemorySummaryWriter::new();
        let outcomes = runner()
            .compute_and_record(
                vec![
                    ("winner", data((1000, 120), (1000, 156))),
                    ("undecided", data((500, 50), (500, 50))),
                ],
                &writer,
            )
            .await;

        assert_eq!(writer.len(), 2);
        assert!(writer.is_stopped("winner"));
        assert!(!writer.is_stopped("undecided"));
        assert!(outcomes[0].result.as_ref().unwrap().stopped);
        assert!(!outcomes[1].result.as_ref().unwrap().stopped);
        assert!(writer.summary("undecided").is_some());
    }

    #[tokio::test]
    async fn test_writer_failure_reported_per_experiment() {
        let outcomes = runner()
            .compute_and_record([("exp", data((100, 10), (100, 10)))], &FailingWriter)
            .await;
        assert!(matches!(outcomes[0].result, Err(ExperimentError::Writer(_))));
    }
}
