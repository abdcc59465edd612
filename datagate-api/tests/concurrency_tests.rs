//! Concurrency Tests for Admission
//!
//! Many callers, possibly behind different gateway instances, race on the
//! same resource. The queue's create-if-absent is the only serialization
//! point, and exactly one job must come out of the race.

use std::sync::Arc;

use datagate_api::{AppState, GatewayConfig, RawParams};
use datagate_core::{Admission, Outcome};
use datagate_test_utils::{MockCacheStore, MockJobQueue};
use futures_util::future::join_all;

type TestResult = Result<(), Box<dyn std::error::Error>>;

const CALLERS: usize = 64;

fn count_admissions(outcomes: &[Outcome]) -> (usize, usize) {
    outcomes.iter().fold((0, 0), |(new, existing), outcome| match outcome {
        Outcome::Pending {
            admission: Admission::NewlyQueued,
            ..
        } => (new + 1, existing),
        Outcome::Pending {
            admission: Admission::AlreadyQueued,
            ..
        } => (new, existing + 1),
        other => panic!("unexpected outcome: {:?}", other),
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_callers_create_one_job() -> TestResult {
    let cache = Arc::new(MockCacheStore::new());
    let queue = Arc::new(MockJobQueue::new());
    let state = AppState::new(&GatewayConfig::default(), cache, queue.clone())?;

    let params = RawParams::new()
        .with("dataset", "squad")
        .with("config", "plain_text")
        .with("split", "train");
    let tasks = (0..CALLERS).map(|_| {
        let state = state.clone();
        let params = params.clone();
        tokio::spawn(async move { state.serve("/first-rows", &params).await })
    });

    let mut outcomes = Vec::with_capacity(CALLERS);
    for joined in join_all(tasks).await {
        outcomes.push(joined?);
    }

    let (new, existing) = count_admissions(&outcomes);
    assert_eq!(new, 1);
    assert_eq!(existing, CALLERS - 1);
    assert_eq!(queue.inner().len()?, 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn independent_gateways_share_one_job() -> TestResult {
    let cache = Arc::new(MockCacheStore::new());
    let queue = Arc::new(MockJobQueue::new());
    let gateways = (0..4)
        .map(|_| AppState::new(&GatewayConfig::default(), cache.clone(), queue.clone()))
        .collect::<Result<Vec<_>, _>>()?;

    let params = RawParams::new().with("dataset", "openai/gsm8k");
    let tasks = (0..CALLERS).map(|i| {
        let state = gateways[i % gateways.len()].clone();
        let params = params.clone();
        tokio::spawn(async move { state.serve("/splits", &params).await })
    });

    let mut outcomes = Vec::with_capacity(CALLERS);
    for joined in join_all(tasks).await {
        outcomes.push(joined?);
    }

    let (new, _) = count_admissions(&outcomes);
    assert_eq!(new, 1);
    let jobs = queue.inner().jobs()?;
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].namespace, "openai");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn distinct_keys_each_get_a_job() -> TestResult {
    let (state, _cache, queue) = AppState::in_memory(&GatewayConfig::default())?;

    let handles = (0..64).map(|i| {
        let state = state.clone();
        let params = RawParams::new().with("dataset", format!("dataset-{}", i % 16));
        tokio::spawn(async move { state.serve("/splits", &params).await })
    });

    let mut outcomes = Vec::new();
    for joined in join_all(handles).await {
        outcomes.push(joined?);
    }

    let (new, existing) = count_admissions(&outcomes);
    assert_eq!(new, 16);
    assert_eq!(existing, 48);
    assert_eq!(queue.len()?, 16);
    Ok(())
}
