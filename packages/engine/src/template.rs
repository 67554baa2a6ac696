//! Redirect URL templating
//!
//! Fills `{{name}}` placeholders in an operator-configured URL template.
//! Substitution is a single pass: replacement text is never scanned for
//! further placeholders, and placeholders without a substitution are left
//! exactly as written.
//!
//! # Example
//!
//! ```
//! use registration_engine::template::render;
//! use std::collections::HashMap;
//!
//! let substitutions = HashMap::from([("patientId", "42")]);
//! assert_eq!(render("/patient/{{patientId}}", &substitutions), "/patient/42");
//! let none: HashMap<&str, &str> = HashMap::new();
//! assert_eq!(render("/x/{{missing}}", &none), "/x/{{missing}}");
//! ```

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;

/// `{{name}}` placeholder; names cannot contain braces.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static PLACEHOLDER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([^{}]+)\}\}").expect("valid regex"));

/// Replace every `{{name}}` whose name is in `substitutions`.
pub fn render<S: AsRef<str>>(template: &str, substitutions: &HashMap<&str, S>) -> String {
    PLACEHOLDER_PATTERN
        .replace_all(template, |caps: &Captures<'_>| {
            match substitutions.get(&caps[1]) {
                Some(value) => value.as_ref().to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Placeholder names used in a template, in order of appearance.
pub fn placeholders(template: &str) -> Vec<&str> {
    PLACEHOLDER_PATTERN
        .captures_iter(template)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect()
}
