//! Resource identity: what a request asks for, and at which version.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ContentVersion;

/// Identity of one cacheable unit of work, independent of version.
///
/// A split selector is only ever present together with a config selector;
/// the constructors make the other combinations unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId {
    step: String,
    dataset: String,
    config: Option<String>,
    split: Option<String>,
}

impl ResourceId {
    /// Dataset-level resource.
    pub fn for_dataset(step: impl Into<String>, dataset: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            dataset: dataset.into(),
            config: None,
            split: None,
        }
    }

    /// Config-level resource.
    pub fn for_config(
        step: impl Into<String>,
        dataset: impl Into<String>,
        config: impl Into<String>,
    ) -> Self {
        Self {
            step: step.into(),
            dataset: dataset.into(),
            config: Some(config.into()),
            split: None,
        }
    }

    /// Split-level resource.
    pub fn for_split(
        step: impl Into<String>,
        dataset: impl Into<String>,
        config: impl Into<String>,
        split: impl Into<String>,
    ) -> Self {
        Self {
            step: step.into(),
            dataset: dataset.into(),
            config: Some(config.into()),
            split: Some(split.into()),
        }
    }

    pub fn step(&self) -> &str {
        &self.step
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub fn config(&self) -> Option<&str> {
        self.config.as_deref()
    }

    pub fn split(&self) -> Option<&str> {
        self.split.as_deref()
    }

    /// User or organization owning the dataset; canonical datasets are their
    /// own namespace.
    pub fn namespace(&self) -> &str {
        match self.dataset.split_once('/') {
            Some((namespace, _)) => namespace,
            None => &self.dataset,
        }
    }

    /// Queue-wide identifier: at most one live job may carry it.
    pub fn unicity_id(&self) -> String {
        format!(
            "Job[{}][{}][{}][{}]",
            self.step,
            self.dataset,
            self.config.as_deref().unwrap_or("None"),
            self.split.as_deref().unwrap_or("None"),
        )
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} dataset={}", self.step, self.dataset)?;
        if let Some(config) = &self.config {
            write!(f, " config={}", config)?;
        }
        if let Some(split) = &self.split {
            write!(f, " split={}", split)?;
        }
        Ok(())
    }
}

/// A resource identity pinned to the content version currently required for
/// its processing step. Derived per request, never stored by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
    id: ResourceId,
    version: ContentVersion,
}

impl ResourceKey {
    pub fn new(id: ResourceId, version: ContentVersion) -> Self {
        Self { id, version }
    }

    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    pub fn version(&self) -> &ContentVersion {
        &self.version
    }

    pub fn step(&self) -> &str {
        self.id.step()
    }

    pub fn unicity_id(&self) -> String {
        self.id.unicity_id()
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} version={}", self.id, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unicity_id_renders_absent_parts_as_none() {
        let id = ResourceId::for_dataset("/splits", "squad");
        assert_eq!(id.unicity_id(), "Job[/splits][squad][None][None]");

        let id = ResourceId::for_split("/first-rows", "user/ds", "default", "train");
        assert_eq!(id.unicity_id(), "Job[/first-rows][user/ds][default][train]");
    }

    #[test]
    fn test_namespace() {
        assert_eq!(ResourceId::for_dataset("/splits", "squad").namespace(), "squad");
        assert_eq!(
            ResourceId::for_dataset("/splits", "openai/gsm8k").namespace(),
            "openai"
        );
    }

    #[test]
    fn test_keys_differ_by_version_but_share_identity() {
        let id = ResourceId::for_config("/split-names-from-streaming", "squad", "plain_text");
        let a = ResourceKey::new(id.clone(), ContentVersion::new("1.0.0"));
        let b = ResourceKey::new(id, ContentVersion::new("2.0.0"));
        assert_ne!(a, b);
        assert_eq!(a.id(), b.id());
        assert_eq!(a.unicity_id(), b.unicity_id());
    }

    proptest::proptest! {
        #[test]
        fn prop_namespace_is_dataset_prefix(ns in "[a-z0-9]{1,10}", name in "[a-z0-9_.-]{1,10}") {
            let qualified = ResourceId::for_dataset("/splits", format!("{}/{}", ns, name));
            proptest::prop_assert_eq!(qualified.namespace(), ns.as_str());
            let canonical = ResourceId::for_dataset("/splits", name.clone());
            proptest::prop_assert_eq!(canonical.namespace(), name.as_str());
        }
    }

    #[test]
    fn test_display() {
        let key = ResourceKey::new(
            ResourceId::for_split("/first-rows", "squad", "plain_text", "train"),
            ContentVersion::new("1.0.0"),
        );
        assert_eq!(
            key.to_string(),
            "/first-rows dataset=squad config=plain_text split=train version=1.0.0"
        );
    }
}
