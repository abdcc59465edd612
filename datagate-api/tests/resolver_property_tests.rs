//! Property-Based Tests for Resource Resolution
//!
//! **Property: deterministic keys**
//! Resolving the same parameters twice yields byte-equal keys, and
//! parameters the step does not need never change the key.
//!
//! **Property: validation before I/O**
//! A malformed dataset or selector is refused without contacting any store.

use std::sync::Arc;

use datagate_api::{AppState, EndpointConfig, GatewayConfig, RawParams, ResourceResolver};
use datagate_core::{Outcome, ProcessingGraph, ResolveError};
use datagate_test_utils::generators::*;
use datagate_test_utils::{MockCacheStore, MockJobQueue};
use proptest::prelude::*;
use tokio::runtime::Runtime;

fn resolver() -> ResourceResolver {
    let graph = ProcessingGraph::builtin();
    let endpoints = EndpointConfig::for_graph(&graph);
    ResourceResolver::new(graph, endpoints)
}

fn test_runtime() -> Result<Runtime, TestCaseError> {
    Runtime::new().map_err(|e| TestCaseError::fail(format!("Failed to create runtime: {}", e)))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_resolution_is_deterministic(
        dataset in arb_dataset_name(),
        config in arb_config_name(),
        split in arb_split_name(),
    ) {
        let params = RawParams::new()
            .with("dataset", dataset.clone())
            .with("config", config.clone())
            .with("split", split.clone());
        let r = resolver();

        let first = r.resolve("/first-rows", &params);
        let second = r.resolve("/first-rows", &params);
        prop_assert!(first.is_ok(), "{:?}", first);
        prop_assert_eq!(&first, &second);

        let keys = first.map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(keys.len(), 1);
        let id = keys[0].id();
        prop_assert_eq!(id.dataset(), dataset.as_str());
        prop_assert_eq!(id.config(), Some(config.as_str()));
        prop_assert_eq!(id.split(), Some(split.as_str()));
    }

    #[test]
    fn prop_extra_params_do_not_change_key(
        dataset in arb_dataset_name(),
        config in arb_config_name(),
        noise in "[a-z]{1,8}",
    ) {
        let r = resolver();
        let bare = r.resolve("/splits", &RawParams::new().with("dataset", dataset.clone()));
        let noisy = r.resolve(
            "/splits",
            &RawParams::new()
                .with("dataset", dataset)
                .with("config", config)
                .with(format!("x-{}", noise), "1"),
        );
        prop_assert_eq!(bare, noisy);
    }

    #[test]
    fn prop_malformed_dataset_is_refused(dataset in arb_malformed_dataset()) {
        let result = resolver().resolve("/splits", &RawParams::new().with("dataset", dataset));
        let refused = matches!(
            result,
            Err(ResolveError::MissingField { .. }) | Err(ResolveError::MalformedField { .. })
        );
        prop_assert!(refused, "accepted: {:?}", result);
    }

    #[test]
    fn prop_malformed_selector_never_reaches_a_store(
        dataset in arb_dataset_name(),
        split in arb_malformed_selector(),
    ) {
        let rt = test_runtime()?;
        let cache = Arc::new(MockCacheStore::new());
        let queue = Arc::new(MockJobQueue::new());
        let state = AppState::new(&GatewayConfig::default(), cache.clone(), queue.clone())
            .map_err(|e| TestCaseError::fail(e.to_string()))?;

        let params = RawParams::new()
            .with("dataset", dataset)
            .with("config", "default")
            .with("split", split);
        let outcome = rt.block_on(state.serve("/first-rows", &params));

        prop_assert!(matches!(outcome, Outcome::InvalidRequest(_)), "{:?}", outcome);
        prop_assert_eq!(cache.get_count(), 0);
        prop_assert_eq!(queue.call_count(), 0);
    }
}
