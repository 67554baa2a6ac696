//! Attribute-type directory
//!
//! Person attribute fields carry the uuid of an attribute type. The directory
//! resolves that uuid into a [`PersonAttributeType`] when a submission is bound.
//! The engine only reads from a directory; it never creates or changes entries.
//!
//! # Example
//!
//! ```
//! use registration_engine::{AttributeFormat, AttributeTypeDirectory,
//!     InMemoryAttributeTypeDirectory, PersonAttributeType};
//!
//! let directory = InMemoryAttributeTypeDirectory::new(
//!     "person-service",
//!     vec![PersonAttributeType::new("phone-uuid", "Telephone Number", AttributeFormat::Text)],
//! );
//!
//! assert!(directory.get_by_uuid("phone-uuid").is_some());
//! assert!(directory.get_by_uuid("retired-uuid").is_none());
//! ```

use crate::entity::PersonAttributeType;
use std::collections::HashMap;

/// Lookup of person attribute types by uuid.
pub trait AttributeTypeDirectory: Send + Sync {
    /// Name of this directory, used in log output.
    fn name(&self) -> &str;

    /// Get the attribute type with the given uuid, or `None` if unknown.
    fn get_by_uuid(&self, uuid: &str) -> Option<PersonAttributeType>;
}

/// Directory holding a fixed set of attribute types.
///
/// Uuids are matched case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAttributeTypeDirectory {
    name: String,
    /// Data: lowercase uuid -> attribute type
    types: HashMap<String, PersonAttributeType>,
}

impl InMemoryAttributeTypeDirectory {
    pub fn new(name: impl Into<String>, types: Vec<PersonAttributeType>) -> Self {
        let types = types
            .into_iter()
            .map(|t| (t.uuid.to_lowercase(), t))
            .collect();
        Self {
            name: name.into(),
            types,
        }
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl AttributeTypeDirectory for InMemoryAttributeTypeDirectory {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_by_uuid(&self, uuid: &str) -> Option<PersonAttributeType> {
        self.types.get(&uuid.to_lowercase()).cloned()
    }
}
