//! Validation Traits
//!
//! Checks applied to raw request parameters before they become part of a
//! resource key. Every failure is a [`ResolveError`]; nothing is trimmed or
//! case-folded, so a value either passes byte-for-byte or is refused.

use once_cell::sync::Lazy;
use regex::Regex;

use datagate_core::ResolveError;

use crate::constants::{MAX_DATASET_NAME_LEN, MAX_SELECTOR_LEN};

/// `name` or `namespace/name`, each segment starting with an alphanumeric.
static DATASET_NAME: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| {
    Regex::new(r"^(?:[A-Za-z0-9][A-Za-z0-9._-]*/)?[A-Za-z0-9][A-Za-z0-9._-]*$")
});

/// Trait for validating non-empty parameters.
pub trait ValidateNonEmpty {
    /// Validate that the value is present and not whitespace-only.
    ///
    /// # Errors
    /// Returns `ResolveError::MissingField` otherwise.
    fn validate_non_empty(&self, field_name: &str) -> Result<(), ResolveError>;
}

impl ValidateNonEmpty for str {
    fn validate_non_empty(&self, field_name: &str) -> Result<(), ResolveError> {
        if self.trim().is_empty() {
            return Err(ResolveError::missing(field_name));
        }
        Ok(())
    }
}

impl ValidateNonEmpty for String {
    fn validate_non_empty(&self, field_name: &str) -> Result<(), ResolveError> {
        self.as_str().validate_non_empty(field_name)
    }
}

impl<T: ValidateNonEmpty + ?Sized> ValidateNonEmpty for Option<&T> {
    fn validate_non_empty(&self, field_name: &str) -> Result<(), ResolveError> {
        match self {
            Some(value) => value.validate_non_empty(field_name),
            None => Err(ResolveError::missing(field_name)),
        }
    }
}

/// Validate a dataset name: `name` or `namespace/name`.
pub fn validate_dataset_name(value: &str) -> Result<(), ResolveError> {
    const FIELD: &str = "dataset";
    value.validate_non_empty(FIELD)?;
    if value.chars().count() > MAX_DATASET_NAME_LEN {
        return Err(ResolveError::malformed(
            FIELD,
            format!("longer than {} characters", MAX_DATASET_NAME_LEN),
        ));
    }
    let pattern = DATASET_NAME
        .as_ref()
        .map_err(|e| ResolveError::malformed(FIELD, format!("name pattern unavailable: {}", e)))?;
    if !pattern.is_match(value) {
        return Err(ResolveError::malformed(
            FIELD,
            "expected 'name' or 'namespace/name' made of letters, digits, '.', '_' and '-'",
        ));
    }
    if value.contains("..") {
        return Err(ResolveError::malformed(FIELD, "must not contain '..'"));
    }
    Ok(())
}

/// Validate a config or split name.
pub fn validate_selector(field: &str, value: &str) -> Result<(), ResolveError> {
    value.validate_non_empty(field)?;
    if value.chars().count() > MAX_SELECTOR_LEN {
        return Err(ResolveError::malformed(
            field,
            format!("longer than {} characters", MAX_SELECTOR_LEN),
        ));
    }
    if value.starts_with(char::is_whitespace) || value.ends_with(char::is_whitespace) {
        return Err(ResolveError::malformed(
            field,
            "must not start or end with whitespace",
        ));
    }
    if value.chars().any(char::is_control) {
        return Err(ResolveError::malformed(
            field,
            "must not contain control characters",
        ));
    }
    if value.contains(['/', '\\']) {
        return Err(ResolveError::malformed(field, "must not contain '/' or '\\'"));
    }
    Ok(())
}
