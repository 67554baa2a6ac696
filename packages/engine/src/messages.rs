//! Message resolution
//!
//! Error codes and notices are turned into display text by the host through
//! [`MessageResolver`]. The engine composes messages but never interprets them.

use regex::{Captures, Regex};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Resolves a message code into display text.
pub trait MessageResolver: Send + Sync {
    /// Resolve `code`, filling `args` into its pattern. Falls back to
    /// `default` when the code is unknown.
    fn message(&self, code: &str, args: &[String], default: Option<&str>) -> String;
}

/// Message source backed by a code -> pattern map.
///
/// Patterns use positional slots `{0}`, `{1}`, ... for arguments. Unknown codes
/// resolve to the default message, or to the code itself when there is none.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct MapMessageResolver {
    messages: HashMap<String, String>,
}

impl MapMessageResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message pattern, builder style.
    pub fn with(mut self, code: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.insert(code, pattern);
        self
    }

    pub fn insert(&mut self, code: impl Into<String>, pattern: impl Into<String>) {
        self.messages.insert(code.into(), pattern.into());
    }
}

impl FromIterator<(String, String)> for MapMessageResolver {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            messages: iter.into_iter().collect(),
        }
    }
}

impl MessageResolver for MapMessageResolver {
    fn message(&self, code: &str, args: &[String], default: Option<&str>) -> String {
        let pattern = self
            .messages
            .get(code)
            .map(|s| s.as_str())
            .or(default)
            .unwrap_or(code);
        fill_arguments(pattern, args)
    }
}

/// `{n}` argument slot.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static ARGUMENT_SLOT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\d+)\}").expect("valid regex"));

/// Replace `{n}` slots with the matching argument in one pass.
///
/// Slots without an argument stay; argument text is never expanded again.
pub fn fill_arguments(pattern: &str, args: &[String]) -> String {
    ARGUMENT_SLOT
        .replace_all(pattern, |caps: &Captures<'_>| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|i| args.get(i))
                .map_or_else(|| caps[0].to_string(), |arg| arg.clone())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_code_with_arguments() {
        let resolver = MapMessageResolver::new()
            .with("registrationapp.createdPatientMessage", "Created patient {0}");
        assert_eq!(
            resolver.message(
                "registrationapp.createdPatientMessage",
                &["Jane Doe".to_string()],
                None
            ),
            "Created patient Jane Doe"
        );
    }

    #[test]
    fn test_fallbacks() {
        let resolver = MapMessageResolver::new();
        assert_eq!(
            resolver.message("Person.gender.required", &[], Some("Gender is required")),
            "Gender is required"
        );
        assert_eq!(
            resolver.message("Person.gender.required", &[], None),
            "Person.gender.required"
        );
    }

    #[test]
    fn test_argument_text_not_expanded_again() {
        assert_eq!(
            fill_arguments("{0} / {1}", &["{1}".to_string(), "B".to_string()]),
            "{1} / B"
        );
    }

    #[test]
    fn test_missing_argument_slot_left_in_place() {
        assert_eq!(
            fill_arguments("{0} exceeds {1}", &["address1".to_string()]),
            "address1 exceeds {1}"
        );
    }

    #[test]
    fn test_deserialize_from_json_map() {
        let resolver: MapMessageResolver =
            serde_json::from_str(r#"{"error.failed.validation": "Please fix the errors"}"#)
                .unwrap();
        assert_eq!(
            resolver.message("error.failed.validation", &[], None),
            "Please fix the errors"
        );
    }
}
