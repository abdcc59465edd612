//! Resource identifier resolution.
//!
//! Turns an endpoint name and its raw query parameters into the resource
//! keys the orchestrator works with. Pure: no store is contacted, and the
//! same inputs always produce the same keys.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use datagate_core::{InputType, ProcessingGraph, ProcessingStep, ResolveError, ResourceId, ResourceKey};

use crate::config::EndpointConfig;
use crate::validation::{validate_dataset_name, validate_selector, ValidateNonEmpty};

/// Raw request parameters, as received from the client.
///
/// Deserializes from a query string map, so an HTTP adapter can extract it
/// directly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct RawParams {
    params: BTreeMap<String, String>,
}

impl RawParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

impl<K, V> FromIterator<(K, V)> for RawParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            params: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Maps endpoints and parameters to resource keys.
#[derive(Debug, Clone)]
pub struct ResourceResolver {
    graph: Arc<ProcessingGraph>,
    endpoints: Arc<EndpointConfig>,
}

impl ResourceResolver {
    pub fn new(graph: ProcessingGraph, endpoints: EndpointConfig) -> Self {
        Self {
            graph: Arc::new(graph),
            endpoints: Arc::new(endpoints),
        }
    }

    pub fn graph(&self) -> &ProcessingGraph {
        &self.graph
    }

    /// Keys for every step behind `endpoint`, primary step first.
    pub fn resolve(
        &self,
        endpoint: &str,
        params: &RawParams,
    ) -> Result<Vec<ResourceKey>, ResolveError> {
        let steps = self
            .endpoints
            .steps_for(endpoint)
            .filter(|steps| !steps.is_empty())
            .ok_or_else(|| ResolveError::UnknownEndpoint {
                endpoint: endpoint.to_string(),
            })?;
        steps
            .iter()
            .map(|step| self.resolve_step(step, params))
            .collect()
    }

    /// Key for one processing step.
    pub fn resolve_step(&self, step: &str, params: &RawParams) -> Result<ResourceKey, ResolveError> {
        let step = self
            .graph
            .get(step)
            .ok_or_else(|| ResolveError::UnknownStep {
                step: step.to_string(),
            })?;
        let id = resource_id(step, params)?;
        Ok(ResourceKey::new(id, step.version.clone()))
    }

    /// Keys for every dataset-level step of the graph, used to decide whether
    /// a dataset is fully served. Only `dataset` is read.
    pub fn dataset_keys(&self, params: &RawParams) -> Result<Vec<ResourceKey>, ResolveError> {
        let dataset = required(params, "dataset")?;
        validate_dataset_name(dataset)?;
        Ok(self
            .graph
            .steps()
            .filter(|step| step.input_type == InputType::Dataset)
            .map(|step| {
                ResourceKey::new(
                    ResourceId::for_dataset(&step.name, dataset),
                    step.version.clone(),
                )
            })
            .collect())
    }
}

/// Build the identity from the fields the step's input type requires.
/// Other parameters are ignored.
fn resource_id(step: &ProcessingStep, params: &RawParams) -> Result<ResourceId, ResolveError> {
    let dataset = required(params, "dataset")?;
    validate_dataset_name(dataset)?;

    match step.input_type {
        InputType::Dataset => Ok(ResourceId::for_dataset(&step.name, dataset)),
        InputType::Config => {
            let config = required(params, "config")?;
            validate_selector("config", config)?;
            Ok(ResourceId::for_config(&step.name, dataset, config))
        }
        InputType::Split => {
            let config = required(params, "config")?;
            validate_selector("config", config)?;
            let split = required(params, "split")?;
            validate_selector("split", split)?;
            Ok(ResourceId::for_split(&step.name, dataset, config, split))
        }
    }
}

fn required<'a>(params: &'a RawParams, field: &str) -> Result<&'a str, ResolveError> {
    let value = params.get(field);
    value.validate_non_empty(field)?;
    value.ok_or_else(|| ResolveError::missing(field))
}
