//! Form structure builder
//!
//! Turns the raw `sections` array of an app configuration into a typed,
//! navigable [`FormStructure`]: sections contain questions, questions contain
//! fields, and every field carries a [`FragmentReference`] naming the widget
//! fragment that renders it.
//!
//! # Example
//!
//! ```
//! use registration_engine::FormStructure;
//! use serde_json::json;
//!
//! let config = json!({
//!     "sections": [{
//!         "id": "contactInfo",
//!         "questions": [{
//!             "fields": [{
//!                 "formFieldName": "phoneNumber",
//!                 "type": "personAttribute",
//!                 "uuid": "14d4f066-15f5-102d-96e4-000c29c2a5d7",
//!                 "widget": { "providerName": "uicommons", "fragmentId": "field/text" }
//!             }]
//!         }]
//!     }]
//! });
//!
//! let structure = FormStructure::build(&config)?;
//! let field = structure.find_field("phoneNumber").unwrap();
//! assert_eq!(field.fragment_reference().unwrap().fragment_id(), "field/text");
//! # Ok::<(), registration_engine::RegistrationError>(())
//! ```
//!
//! # Policy
//!
//! - Section order is kept exactly as configured.
//! - Unknown keys on sections, questions and fields are kept in `extra` and
//!   never rejected, so newer configurations still load.
//! - A field without a usable widget (`providerName` and `fragmentId`, both
//!   non-empty strings) fails the build immediately rather than producing a
//!   form that breaks at render time.

use crate::config;
use crate::error::{RegistrationError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;

/// Key naming the widget's rendering provider.
pub const PROVIDER_NAME_KEY: &str = "providerName";

/// Key naming the widget's fragment.
pub const FRAGMENT_ID_KEY: &str = "fragmentId";

/// Key under which a field's resolved fragment reference is serialized.
pub const FRAGMENT_REQUEST_KEY: &str = "fragmentRequest";

/// Treat an explicit `null` the same as a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Resolved pairing of rendering provider and fragment id.
///
/// Computed once per field while the structure is built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FragmentReference {
    provider_name: String,
    fragment_id: String,
}

impl FragmentReference {
    pub fn new(provider_name: impl Into<String>, fragment_id: impl Into<String>) -> Self {
        Self {
            provider_name: provider_name.into(),
            fragment_id: fragment_id.into(),
        }
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    pub fn fragment_id(&self) -> &str {
        &self.fragment_id
    }
}

impl std::fmt::Display for FragmentReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.provider_name, self.fragment_id)
    }
}

/// Raw widget configuration of a field.
///
/// Besides `providerName` and `fragmentId` it may carry any options the
/// fragment understands; those are passed through untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WidgetDescriptor(serde_json::Map<String, serde_json::Value>);

impl WidgetDescriptor {
    pub fn new(config: serde_json::Map<String, serde_json::Value>) -> Self {
        Self(config)
    }

    pub fn provider_name(&self) -> Option<&str> {
        self.non_empty_str(PROVIDER_NAME_KEY)
    }

    pub fn fragment_id(&self) -> Option<&str> {
        self.non_empty_str(FRAGMENT_ID_KEY)
    }

    /// Get any widget option by key.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    fn non_empty_str(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
    }
}

/// Leaf input of the form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    /// Request parameter name under which the submitted value arrives
    pub form_field_name: String,
    #[serde(default)]
    pub label: Option<String>,
    /// Type tag selecting the binding strategy (e.g. "personAttribute")
    #[serde(rename = "type", default)]
    pub field_type: Option<String>,
    /// External identifier, e.g. the person attribute type uuid
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub widget: Option<WidgetDescriptor>,
    #[serde(skip_deserializing, rename = "fragmentRequest")]
    fragment_reference: Option<FragmentReference>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Field {
    /// The fragment that renders this field; always set on built structures.
    pub fn fragment_reference(&self) -> Option<&FragmentReference> {
        self.fragment_reference.as_ref()
    }

    /// Type tag, if the field is not a plain core field.
    pub fn type_tag(&self) -> Option<&str> {
        self.field_type.as_deref()
    }

    fn resolve_fragment(&mut self) -> Result<()> {
        let missing = |key: &str| RegistrationError::MissingWidgetKey {
            field: self.form_field_name.clone(),
            key: key.to_string(),
        };

        let widget = self.widget.as_ref().ok_or_else(|| missing("widget"))?;
        let provider_name = widget
            .provider_name()
            .ok_or_else(|| missing(PROVIDER_NAME_KEY))?;
        let fragment_id = widget
            .fragment_id()
            .ok_or_else(|| missing(FRAGMENT_ID_KEY))?;

        self.fragment_reference = Some(FragmentReference::new(provider_name, fragment_id));
        // Only the reference resolved here may reach the renderer
        if self.extra.remove(FRAGMENT_REQUEST_KEY).is_some() {
            tracing::warn!(
                field = %self.form_field_name,
                "Ignoring configured fragmentRequest; it is derived from the widget"
            );
        }
        Ok(())
    }
}

/// Ordered group of fields; may be empty.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub legend: Option<String>,
    #[serde(default)]
    pub header: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub fields: Vec<Field>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Named group of questions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    /// Extension point the section is contributed to; opaque to the engine.
    /// Built sections without one get [`config::SECTION_EXTENSION_POINT`].
    #[serde(default)]
    pub extension_point: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub questions: Vec<Question>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Section {
    /// Fields of all questions in this section, in order.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.questions.iter().flat_map(|q| q.fields.iter())
    }
}

/// Root of the built form: sections in configured order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FormStructure {
    sections: Vec<Section>,
}

impl FormStructure {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a form structure from a raw configuration document.
    ///
    /// # Errors
    ///
    /// - `MissingSections` if the root has no `sections` array
    /// - `InvalidSection` if a section cannot be read structurally
    /// - `MissingWidgetKey` if a field's widget lacks `providerName` or `fragmentId`
    /// - `LoadError` if an array exceeds [`config::MAX_ARRAY_SIZE`]
    pub fn build(raw_config: &serde_json::Value) -> Result<Self> {
        let raw_sections = raw_config
            .get(config::SECTIONS_KEY)
            .and_then(|v| v.as_array())
            .ok_or(RegistrationError::MissingSections)?;

        if raw_sections.len() > config::MAX_ARRAY_SIZE {
            return Err(RegistrationError::LoadError(format!(
                "Too many sections ({}, max {})",
                raw_sections.len(),
                config::MAX_ARRAY_SIZE
            )));
        }

        let mut structure = Self::new();
        for (index, raw_section) in raw_sections.iter().enumerate() {
            let mut section = Section::deserialize(raw_section).map_err(|e| {
                RegistrationError::InvalidSection {
                    index,
                    reason: e.to_string(),
                }
            })?;

            check_section_sizes(index, &section)?;
            section
                .extension_point
                .get_or_insert_with(|| config::SECTION_EXTENSION_POINT.to_string());

            for question in &mut section.questions {
                for field in &mut question.fields {
                    field.resolve_fragment()?;
                }
            }

            structure.add_section(section);
        }

        structure.warn_on_duplicate_names();

        tracing::debug!(
            sections = structure.sections.len(),
            fields = structure.field_count(),
            "Built form structure"
        );

        Ok(structure)
    }

    pub fn add_section(&mut self, section: Section) {
        self.sections.push(section);
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Find a section by its configured id.
    pub fn section(&self, id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id.as_deref() == Some(id))
    }

    /// All fields, flattened across sections and questions in document order.
    pub fn fields(&self) -> Vec<&Field> {
        self.sections.iter().flat_map(|s| s.fields()).collect()
    }

    pub fn field_count(&self) -> usize {
        self.sections.iter().map(|s| s.fields().count()).sum()
    }

    /// Find a field by its form field name.
    pub fn find_field(&self, form_field_name: &str) -> Option<&Field> {
        self.sections
            .iter()
            .flat_map(|s| s.fields())
            .find(|f| f.form_field_name == form_field_name)
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    fn warn_on_duplicate_names(&self) {
        let mut seen = HashSet::new();
        for field in self.sections.iter().flat_map(|s| s.fields()) {
            if !seen.insert(field.form_field_name.as_str()) {
                tracing::warn!(
                    field = %field.form_field_name,
                    "Form field name used more than once; submitted value is shared"
                );
            }
        }
    }
}

fn check_section_sizes(index: usize, section: &Section) -> Result<()> {
    let too_many = |what: &str, count: usize| RegistrationError::InvalidSection {
        index,
        reason: format!("too many {what} ({count}, max {})", config::MAX_ARRAY_SIZE),
    };

    if section.questions.len() > config::MAX_ARRAY_SIZE {
        return Err(too_many("questions", section.questions.len()));
    }
    for question in &section.questions {
        if question.fields.len() > config::MAX_ARRAY_SIZE {
            return Err(too_many("fields", question.fields.len()));
        }
    }
    Ok(())
}
