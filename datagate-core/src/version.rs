//! Content versions attached to cached results and required by processing steps.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dotted version string (`"1.2.0"`) identifying the schema/content revision
/// a processing step produces.
///
/// Two versions match when both parse and share the same major component.
/// An unparseable version never matches anything, itself included.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentVersion(String);

impl ContentVersion {
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Major component, if the version starts with a numeric segment.
    pub fn major(&self) -> Option<u64> {
        self.0.split('.').next()?.parse().ok()
    }

    pub fn matches(&self, required: &ContentVersion) -> bool {
        match (self.major(), required.major()) {
            (Some(ours), Some(theirs)) => ours == theirs,
            _ => false,
        }
    }
}

impl fmt::Display for ContentVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContentVersion {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ContentVersion {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_major_parsing() {
        assert_eq!(ContentVersion::new("1.0.0").major(), Some(1));
        assert_eq!(ContentVersion::new("12.3").major(), Some(12));
        assert_eq!(ContentVersion::new("7").major(), Some(7));
        assert_eq!(ContentVersion::new("not a version").major(), None);
        assert_eq!(ContentVersion::new("").major(), None);
    }

    #[test]
    fn test_matches_on_major_only() {
        let required = ContentVersion::new("2.0.0");
        assert!(ContentVersion::new("2.0.0").matches(&required));
        assert!(ContentVersion::new("2.4.1").matches(&required));
        assert!(!ContentVersion::new("1.9.9").matches(&required));
        assert!(!ContentVersion::new("3.0.0").matches(&required));
    }

    #[test]
    fn test_unparseable_never_matches() {
        let garbage = ContentVersion::new("latest");
        assert!(!garbage.matches(&garbage));
        assert!(!ContentVersion::new("1.0.0").matches(&garbage));
    }

    #[test]
    fn test_serde_is_transparent() -> Result<(), serde_json::Error> {
        let json = serde_json::to_string(&ContentVersion::new("1.0.1"))?;
        assert_eq!(json, "\"1.0.1\"");
        Ok(())
    }
}
