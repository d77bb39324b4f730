//! Shared catalog traits and id helpers

use once_cell::sync::Lazy;
use regex::Regex;

static ACTION_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._\-/:@]*$").expect("action id pattern is valid")
});

static SLUG_SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("slug pattern is valid"));

/// Trait for types that can be validated
#[allow(clippy::missing_errors_doc)]
pub trait Validate {
    /// Type of validation error
    type Error;

    /// Validates this type
    fn validate(&self) -> std::result::Result<(), Self::Error>;
}

/// Returns true if `id` is usable as a catalog action reference
#[must_use]
pub fn is_valid_action_id(id: &str) -> bool {
    ACTION_ID.is_match(id)
}

/// Lowercases a name and joins its alphanumeric runs with `-`
#[must_use]
pub fn slugify(name: &str) -> String {
    SLUG_SEPARATORS
        .replace_all(&name.to_lowercase(), "-")
        .trim_matches('-')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_ids() {
        assert!(is_valid_action_id("cid/go-build"));
        assert!(is_valid_action_id("builtin://actions/go-build"));
        assert!(!is_valid_action_id(""));
        assert!(!is_valid_action_id("has space"));
        assert!(!is_valid_action_id("/leading"));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Api Service"), "api-service");
        assert_eq!(slugify("  web/UI__v2 "), "web-ui-v2");
        assert_eq!(slugify("---"), "");
    }
}
