//! Processing steps and the graph of steps the gateway knows about.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ContentVersion;

/// Version every built-in step starts at.
pub const DEFAULT_STEP_VERSION: &str = "1.0.0";

/// Granularity of the resource a step computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Dataset,
    Config,
    Split,
}

impl InputType {
    /// Request parameters that must be present for this input type.
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            InputType::Dataset => &["dataset"],
            InputType::Config => &["dataset", "config"],
            InputType::Split => &["dataset", "config", "split"],
        }
    }
}

/// A named kind of computation whose result is cacheable per resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingStep {
    pub name: String,
    pub input_type: InputType,
    /// Content version a cached result must match to be served.
    pub version: ContentVersion,
}

impl ProcessingStep {
    pub fn new(name: impl Into<String>, input_type: InputType) -> Self {
        Self {
            name: name.into(),
            input_type,
            version: ContentVersion::new(DEFAULT_STEP_VERSION),
        }
    }

    pub fn with_version(mut self, version: impl Into<ContentVersion>) -> Self {
        self.version = version.into();
        self
    }
}

/// The set of processing steps, keyed by name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProcessingGraph {
    steps: BTreeMap<String, ProcessingStep>,
}

impl ProcessingGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_step(mut self, step: ProcessingStep) -> Self {
        self.steps.insert(step.name.clone(), step);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ProcessingStep> {
        self.steps.get(name)
    }

    pub fn steps(&self) -> impl Iterator<Item = &ProcessingStep> {
        self.steps.values()
    }

    /// Override the required version of a step. Returns false if the step is unknown.
    pub fn set_version(&mut self, name: &str, version: ContentVersion) -> bool {
        match self.steps.get_mut(name) {
            Some(step) => {
                step.version = version;
                true
            }
            None => false,
        }
    }

    /// The dataset viewer steps served out of the box.
    pub fn builtin() -> Self {
        Self::new()
            .with_step(ProcessingStep::new("/config-names", InputType::Dataset))
            .with_step(ProcessingStep::new(
                "/split-names-from-streaming",
                InputType::Config,
            ))
            .with_step(ProcessingStep::new("/splits", InputType::Dataset))
            .with_step(ProcessingStep::new("/first-rows", InputType::Split))
            .with_step(ProcessingStep::new(
                "/parquet-and-dataset-info",
                InputType::Dataset,
            ))
            .with_step(ProcessingStep::new("/parquet", InputType::Dataset))
            .with_step(ProcessingStep::new("/dataset-info", InputType::Dataset))
            .with_step(ProcessingStep::new("/sizes", InputType::Dataset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_fields() {
        assert_eq!(InputType::Dataset.required_fields(), &["dataset"]);
        assert_eq!(InputType::Config.required_fields(), &["dataset", "config"]);
        assert_eq!(
            InputType::Split.required_fields(),
            &["dataset", "config", "split"]
        );
    }

    #[test]
    fn test_builtin_graph() {
        let graph = ProcessingGraph::builtin();
        assert_eq!(graph.steps().count(), 8);
        let first_rows = graph.get("/first-rows").map(|s| s.input_type);
        assert_eq!(first_rows, Some(InputType::Split));
        assert!(graph.get("/unknown").is_none());
        assert!(graph
            .steps()
            .all(|s| s.version.as_str() == DEFAULT_STEP_VERSION));
    }

    #[test]
    fn test_set_version() {
        let mut graph = ProcessingGraph::builtin();
        assert!(graph.set_version("/splits", ContentVersion::new("2.0.0")));
        assert!(!graph.set_version("/nope", ContentVersion::new("2.0.0")));
        assert_eq!(
            graph.get("/splits").map(|s| s.version.as_str()),
            Some("2.0.0")
        );
    }
}
