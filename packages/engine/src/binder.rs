//! Field binder for dynamic form fields
//!
//! Maps submitted values of configured fields onto a [`Patient`]. Binding is
//! dispatched on the field's type tag through a [`BindingRegistry`], so new
//! field kinds are added by registering a strategy, not by changing the binder.
//!
//! A field is skipped, never failed, when:
//! - its submitted value is absent, empty or whitespace-only
//! - it has no type tag or no strategy is registered for its tag
//! - the strategy cannot resolve it (e.g. a retired attribute type)
//!
//! Skips are reported in the [`BindReport`] and logged; one stale configuration
//! entry must not block a registration.

use crate::config;
use crate::directory::AttributeTypeDirectory;
use crate::entity::{non_blank, AttributeValue, Patient, PersonAttribute, SubmittedValues};
use crate::structure::Field;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Why a field did not change the patient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No submitted value, or only whitespace
    Blank,
    /// Field has no type tag (core fields are bound elsewhere)
    Untyped,
    /// No strategy registered for this type tag
    NoStrategy(String),
    /// Field lacks the external identifier its strategy needs
    MissingIdentifier,
    /// Identifier is not known to the attribute-type directory
    UnknownAttributeType(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Blank => write!(f, "blank value"),
            SkipReason::Untyped => write!(f, "no type tag"),
            SkipReason::NoStrategy(tag) => write!(f, "no strategy for type '{tag}'"),
            SkipReason::MissingIdentifier => write!(f, "missing uuid"),
            SkipReason::UnknownAttributeType(uuid) => {
                write!(f, "unknown attribute type '{uuid}'")
            }
        }
    }
}

/// Result of applying one strategy to one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindOutcome {
    Bound,
    Skipped(SkipReason),
}

/// Attaches a submitted value to a patient for one kind of field.
pub trait FieldBindingStrategy: Send + Sync {
    /// Bind a non-blank value. Must leave the patient untouched when skipping.
    fn bind(&self, patient: &mut Patient, field: &Field, value: &str) -> BindOutcome;
}

/// Registry mapping type tags to binding strategies.
pub struct BindingRegistry {
    strategies: HashMap<String, Box<dyn FieldBindingStrategy>>,
}

impl BindingRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    /// Register a strategy for a type tag, replacing any previous one.
    pub fn register(
        &mut self,
        type_tag: impl Into<String>,
        strategy: impl FieldBindingStrategy + 'static,
    ) {
        self.strategies.insert(type_tag.into(), Box::new(strategy));
    }

    /// Get the strategy for a type tag.
    pub fn get(&self, type_tag: &str) -> Option<&dyn FieldBindingStrategy> {
        self.strategies.get(type_tag).map(|s| s.as_ref())
    }

    #[must_use]
    pub fn has_strategy(&self, type_tag: &str) -> bool {
        self.strategies.contains_key(type_tag)
    }

    /// Return set of all registered type tags.
    #[must_use]
    pub fn registered_tags(&self) -> HashSet<&str> {
        self.strategies.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for BindingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Stores a field as a person attribute whose type is looked up by uuid.
pub struct PersonAttributeStrategy {
    directory: Arc<dyn AttributeTypeDirectory>,
}

impl PersonAttributeStrategy {
    pub fn new(directory: Arc<dyn AttributeTypeDirectory>) -> Self {
        Self { directory }
    }
}

impl FieldBindingStrategy for PersonAttributeStrategy {
    fn bind(&self, patient: &mut Patient, field: &Field, value: &str) -> BindOutcome {
        let Some(uuid) = field.uuid.as_deref().filter(|u| !u.trim().is_empty()) else {
            return BindOutcome::Skipped(SkipReason::MissingIdentifier);
        };

        let Some(attribute_type) = self.directory.get_by_uuid(uuid) else {
            tracing::debug!(
                directory = self.directory.name(),
                uuid,
                "Attribute type not found"
            );
            return BindOutcome::Skipped(SkipReason::UnknownAttributeType(uuid.to_string()));
        };

        // A value that does not fit the format is kept as text rather than lost
        let typed = attribute_type.format.parse(value).unwrap_or_else(|| {
            tracing::warn!(
                field = %field.form_field_name,
                format = attribute_type.format.as_str(),
                "Attribute value does not match its format; storing as text"
            );
            AttributeValue::Text(value.to_string())
        });

        patient.add_attribute(PersonAttribute {
            attribute_type,
            raw_value: value.to_string(),
            value: typed,
        });
        BindOutcome::Bound
    }
}

/// Create a registry with the built-in strategies.
#[must_use]
pub fn create_default_registry(directory: Arc<dyn AttributeTypeDirectory>) -> BindingRegistry {
    let mut registry = BindingRegistry::new();
    registry.register(
        config::PERSON_ATTRIBUTE_TYPE,
        PersonAttributeStrategy::new(directory),
    );
    registry
}

/// A field that was not bound, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedField {
    pub form_field_name: String,
    pub reason: SkipReason,
}

/// Summary of one binding pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BindReport {
    pub bound: Vec<String>,
    pub skipped: Vec<SkippedField>,
}

impl BindReport {
    /// Skipped fields whose value was present but could not be stored.
    pub fn dropped(&self) -> impl Iterator<Item = &SkippedField> {
        self.skipped
            .iter()
            .filter(|s| !matches!(s.reason, SkipReason::Blank | SkipReason::Untyped))
    }
}

/// Applies submitted values of dynamic fields to a patient.
pub struct FieldBinder {
    registry: BindingRegistry,
}

impl FieldBinder {
    pub fn new(registry: BindingRegistry) -> Self {
        tracing::debug!(tags = ?registry.registered_tags(), "Created field binder");
        Self { registry }
    }

    pub fn registry(&self) -> &BindingRegistry {
        &self.registry
    }

    /// Bind every field, in order, from the submitted values.
    pub fn bind(
        &self,
        patient: &mut Patient,
        submitted: &SubmittedValues,
        fields: &[&Field],
    ) -> BindReport {
        let mut report = BindReport::default();

        for field in fields {
            let outcome = self.bind_field(patient, submitted, field);
            match outcome {
                BindOutcome::Bound => {
                    tracing::debug!(field = %field.form_field_name, "Bound field");
                    report.bound.push(field.form_field_name.clone());
                }
                BindOutcome::Skipped(reason) => {
                    match &reason {
                        SkipReason::Blank | SkipReason::Untyped => {}
                        SkipReason::NoStrategy(_) => {
                            tracing::debug!(
                                field = %field.form_field_name,
                                %reason,
                                "Skipped field"
                            );
                        }
                        _ => {
                            tracing::warn!(
                                field = %field.form_field_name,
                                %reason,
                                "Dropped field value"
                            );
                        }
                    }
                    report.skipped.push(SkippedField {
                        form_field_name: field.form_field_name.clone(),
                        reason,
                    });
                }
            }
        }

        report
    }

    fn bind_field(
        &self,
        patient: &mut Patient,
        submitted: &SubmittedValues,
        field: &Field,
    ) -> BindOutcome {
        let Some(value) = non_blank(submitted, &field.form_field_name) else {
            return BindOutcome::Skipped(SkipReason::Blank);
        };

        let Some(tag) = field.type_tag() else {
            return BindOutcome::Skipped(SkipReason::Untyped);
        };

        match self.registry.get(tag) {
            Some(strategy) => strategy.bind(patient, field, value),
            None => BindOutcome::Skipped(SkipReason::NoStrategy(tag.to_string())),
        }
    }
}
