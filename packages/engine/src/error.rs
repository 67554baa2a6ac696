//! Error types for the registration engine

use thiserror::Error;

/// Boxed error produced by an external collaborator.
pub type CollaboratorError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for registration operations
#[derive(Error, Debug)]
pub enum RegistrationError {
    /// The configuration root has no `sections` array
    #[error("Configuration error: no 'sections' list at the configuration root")]
    MissingSections,

    /// A section, question or field could not be read from the configuration
    #[error("Configuration error: invalid section at index {index}: {reason}")]
    InvalidSection { index: usize, reason: String },

    /// A field's widget descriptor lacks a required key
    #[error("Configuration error: widget of field '{field}' is missing '{key}'")]
    MissingWidgetKey { field: String, key: String },

    /// A required top-level configuration value is absent or has the wrong type
    #[error("Configuration error: app '{app_id}' has no string value for '{key}'")]
    MissingConfigValue { app_id: String, key: String },

    /// Failed to load an application descriptor
    #[error("Failed to load app configuration: {0}")]
    LoadError(String),

    /// No application descriptor is known under this id
    #[error("App not found: {0}")]
    AppNotFound(String),

    /// YAML parsing error
    #[error("YAML parse error: {0}")]
    YamlError(#[from] serde_yaml_ng::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// The session collaborator refused the request
    #[error("Authentication required: {0}")]
    AuthenticationRequired(String),

    /// Failure reported by the registration collaborator, passed through as-is
    #[error(transparent)]
    Registration(CollaboratorError),
}

impl RegistrationError {
    /// Whether this error stems from malformed or incomplete configuration.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            RegistrationError::MissingSections
                | RegistrationError::InvalidSection { .. }
                | RegistrationError::MissingWidgetKey { .. }
                | RegistrationError::MissingConfigValue { .. }
        )
    }
}

/// Result type alias for registration operations
pub type Result<T> = std::result::Result<T, RegistrationError>;
