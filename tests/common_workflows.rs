//! Integration tests for common Flagship workflows.
//!
//! These tests drive flag evaluation, exposure capture, and experiment
//! analysis together through the public API.

use flagship::flagship_experiments::{
    ArmData, ExperimentConfig, ExperimentData, ExperimentRunner, InMemorySummaryWriter,
};
use flagship::prelude::*;
use flagship::{MemoryExposureSink, bucket};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

fn checkout_flag() -> Flag {
    Flag::new(
        "checkout",
        vec![
            Variant::new("control", "old").with_weight(50.0),
            Variant::new("treatment", "new").with_weight(50.0),
        ],
    )
    .with_salt("x")
    .with_rollout(100)
}

async fn wait_for(sink: &MemoryExposureSink, count: usize) {
    for _ in 0..200 {
        if sink.len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

// =============================================================================
// Evaluation
// =============================================================================

#[test]
fn test_sticky_assignment() {
    let flag = checkout_flag();
    let user = UserAttributes::new("u1");

    let first = flag.evaluate("u1", &user).unwrap();
    assert_eq!(first.reason, EvaluationReason::Evaluated);
    assert!(first.is_active);

    for _ in 0..100 {
        let again = flag.evaluate("u1", &user).unwrap();
        assert_eq!(again.variant, first.variant);
        assert_eq!(again.value, first.value);
    }
}

#[test]
fn test_short_circuit_reasons() {
    let user = UserAttributes::new("u1").with_country("DE");

    let disabled = checkout_flag().with_active(false).evaluate("u1", &user).unwrap();
    assert_eq!(disabled.reason, EvaluationReason::FlagDisabled);
    assert!(!disabled.is_active);

    let targeted = checkout_flag()
        .with_rules(TargetingRules::new().with_countries(["US"]))
        .evaluate("u1", &user)
        .unwrap();
    assert_eq!(targeted.reason, EvaluationReason::TargetingRulesNotMet);

    let dark = checkout_flag().with_rollout(0).evaluate("u1", &user).unwrap();
    assert_eq!(dark.reason, EvaluationReason::NotInRollout);
    assert_eq!(dark.variant, "control");
}

#[test]
fn test_flags_bucket_independently() {
    let same = (0..2_000)
        .filter(|i| {
            let user = format!("user-{}", i);
            bucket(&user, "flag-a") == bucket(&user, "flag-b")
        })
        .count();
    // Independent uniform buckets agree about 1% of the time
    assert!(same < 60, "{} collisions", same);
}

#[tokio::test]
async fn test_client_serves_defaults_for_unknown_and_restricted_flags() {
    let store = Arc::new(InMemoryFlagStore::with_flags([checkout_flag()]));
    store.insert(Flag::boolean("internal-tools"));
    store.restrict("internal-tools");

    let client = FlagshipClient::new(
        "u1",
        UserAttributes::new("u1"),
        FlagService::without_exposures(store),
        ClientConfig::default(),
    );

    let missing = client.get_flag("nope").await.unwrap();
    assert_eq!(missing.reason, EvaluationReason::FlagNotFound);
    assert!(!client.is_enabled("nope").await.unwrap());

    let denied = client.get_flag("internal-tools").await.unwrap();
    assert_eq!(denied.reason, EvaluationReason::AccessDenied);
    assert_eq!(client.get_variant("internal-tools").await.unwrap(), None);

    assert!(client.get_variant("checkout").await.unwrap().is_some());
}

// =============================================================================
// Evaluation to experiment analysis
// =============================================================================

#[tokio::test]
async fn test_exposures_feed_experiment_analysis() {
    let store = Arc::new(InMemoryFlagStore::with_flags([checkout_flag()]));
    let sink = Arc::new(MemoryExposureSink::new());
    let service = FlagService::new(store, sink.clone());

    let mut assignments = HashMap::new();
    for i in 0..2_000 {
        let user_key = format!("user-{}", i);
        let evaluation = service
            .evaluate("checkout", &user_key, &UserAttributes::new(&user_key))
            .await
            .unwrap();
        assignments.insert(user_key, evaluation.result.variant);
    }
    wait_for(&sink, 2_000).await;

    let users = sink.unique_users_by_variant("checkout");
    assert_eq!(users.values().sum::<u64>(), 2_000);

    // Conversions are tracked separately from exposures; treatment converts
    // more often in this simulated population.
    let mut conversions: HashMap<&str, u64> = HashMap::new();
    for (user_key, variant) in &assignments {
        let threshold = if variant == "treatment" { 20 } else { 10 };
        if bucket(user_key, "purchase") < threshold {
            *conversions.entry(variant.as_str()).or_default() += 1;
        }
    }

    let data = ExperimentData::new(
        ArmData::new(users["control"], conversions["control"]),
        ArmData::new(users["treatment"], conversions["treatment"]),
    );

    let runner = ExperimentRunner::new(ExperimentConfig::seeded(2024)).unwrap();
    let writer = InMemorySummaryWriter::new();
    let outcomes = runner
        .compute_and_record([("checkout", data)], &writer)
        .await;

    let summary = outcomes[0].result.as_ref().unwrap();
    assert!(summary.result.win_probability > 0.95);
    assert!(summary.result.expected_lift > 0.0);
    assert!(summary.stopped);
    assert!(writer.is_stopped("checkout"));
}
