//! Registration Engine
//!
//! Core of a configurable patient registration page. The form is not fixed at
//! build time: an app configuration declares ordered sections, questions and
//! fields, and this library provides:
//! - Building a typed, navigable form structure from that configuration
//! - Binding submitted values onto a patient, including dynamic attribute fields
//! - Validating the patient and composing an ordered error report
//! - Filling the post-registration redirect template
//!
//! # Example
//!
//! ```ignore
//! use registration_engine::{FlashMessages, PostOutcome, RegistrationPage, StaticSession};
//!
//! let page = RegistrationPage::new(loader, directory, messages, registration);
//! let session = StaticSession::authenticated(Some("Registration Desk"));
//!
//! let model = page.get("registrationapp.basicRegistration", &session)?;
//!
//! let mut flash = FlashMessages::new();
//! let outcome = page.post("registrationapp.basicRegistration", &submitted, &session, &mut flash)?;
//! if let PostOutcome::Redirect { location, .. } = outcome {
//!     println!("redirect to {location}");
//! }
//! ```

pub mod app;
pub mod binder;
pub mod config;
pub mod directory;
pub mod entity;
pub mod error;
pub mod messages;
pub mod service;
pub mod structure;
pub mod template;
pub mod validation;

// Re-export commonly used items
pub use app::{AppDescriptor, ConfigLoader, DirectoryConfigLoader, InMemoryConfigLoader};
pub use binder::{
    create_default_registry, BindOutcome, BindReport, BindingRegistry, FieldBinder,
    FieldBindingStrategy, PersonAttributeStrategy, SkipReason, SkippedField,
};
pub use config::DisplaySettings;
pub use directory::{AttributeTypeDirectory, InMemoryAttributeTypeDirectory};
pub use entity::{
    AttributeFormat, AttributeValue, CoreBinding, Patient, PatientId, PersonAddress,
    PersonAttribute, PersonAttributeType, PersonName, SubmittedValues,
};
pub use error::{CollaboratorError, RegistrationError, Result};
pub use messages::{MapMessageResolver, MessageResolver};
pub use service::{
    FlashMessages, InMemoryRegistration, ModelValue, PageModel, PostOutcome,
    RegistrationCollaborator, RegistrationPage, SessionContext, StaticSession,
};
pub use structure::{
    FormStructure, FragmentReference, Field, Question, Section, WidgetDescriptor,
};
pub use validation::{
    ObjectError, PatientValidator, ValidationAggregator, ValidationResult, Validator,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
