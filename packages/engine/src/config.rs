//! Configuration constants and display settings for the registration engine
//!
//! Centralized values used throughout the engine for:
//! - Size limits on configuration documents (prevent oversized or hostile input)
//! - Well-known configuration keys and placeholder names
//! - Model attribute names handed to the renderer
//! - Message codes resolved through the host's message source

use serde::{Deserialize, Serialize};

/// Maximum configuration document size in bytes (1 MB).
///
/// Registration app descriptors are typically a few KB.
pub const MAX_CONFIG_SIZE: usize = 1_000_000;

/// Maximum number of sections, questions per section, or fields per question.
pub const MAX_ARRAY_SIZE: usize = 1_000;

/// Key of the sections array at the configuration root.
pub const SECTIONS_KEY: &str = "sections";

/// Key of the redirect template used after a successful registration.
pub const AFTER_CREATED_URL_KEY: &str = "afterCreatedUrl";

/// Placeholder filled with the new patient's id in the redirect template.
pub const PATIENT_ID_PLACEHOLDER: &str = "patientId";

/// Extension point under which registration sections are contributed.
pub const SECTION_EXTENSION_POINT: &str = "org.openmrs.module.registrationapp.section";

/// Type tag of fields stored as person attributes.
pub const PERSON_ATTRIBUTE_TYPE: &str = "personAttribute";

/// Model attribute names handed to the renderer.
pub mod model {
    pub const FORM_STRUCTURE: &str = "formStructure";
    pub const NAME_TEMPLATE: &str = "nameTemplate";
    pub const ADDRESS_TEMPLATE: &str = "addressTemplate";
    pub const ENABLE_OVERRIDE_OF_ADDRESS_PORTLET: &str = "enableOverrideOfAddressPortlet";
    pub const ERRORS: &str = "errors";
}

/// Message codes resolved through the host's [`crate::MessageResolver`].
pub mod messages {
    /// Leading summary line of a validation report.
    pub const FAILED_VALIDATION: &str = "error.failed.validation";
    /// Info notice queued after a successful registration; takes the display name.
    pub const CREATED_PATIENT: &str = "registrationapp.createdPatientMessage";
}

/// Host-provided display metadata passed through to the renderer.
///
/// The templates are opaque to the engine; they are forwarded unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DisplaySettings {
    /// Name layout template (e.g. given/family ordering)
    pub name_template: serde_json::Value,
    /// Address layout template
    pub address_template: serde_json::Value,
    /// Whether the address hierarchy widget replaces the default address portlet
    pub enable_override_of_address_portlet: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            name_template: serde_json::json!({ "codeName": "givenFamily" }),
            address_template: serde_json::Value::Null,
            enable_override_of_address_portlet: false,
        }
    }
}
