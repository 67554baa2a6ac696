//! Application descriptor loading
//!
//! An [`AppDescriptor`] is one configured registration app: an id plus the raw,
//! untyped configuration document the form is built from. Descriptors are read
//! from JSON or YAML, with size limits enforced before parsing.
//!
//! The [`ConfigLoader`] trait is the seam through which the page controller
//! obtains a descriptor on every request. Loaders do not cache, so an edited
//! configuration is picked up by the next request.

use crate::config;
use crate::error::{RegistrationError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// App ids usable as file stems: letters, digits, dot, dash, underscore.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static APP_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.-]*$").expect("valid regex"));

/// A configured registration application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppDescriptor {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Raw configuration document (`sections`, `afterCreatedUrl`, ...)
    #[serde(default)]
    pub config: serde_json::Value,
}

impl AppDescriptor {
    /// Create a descriptor from an id and an already parsed configuration.
    pub fn new(id: impl Into<String>, config: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            description: None,
            config,
        }
    }

    /// Load a descriptor from a `.json`, `.yaml` or `.yml` file.
    ///
    /// # Errors
    ///
    /// Returns `RegistrationError::LoadError` if the file cannot be read, is too
    /// large, or has an unsupported extension.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        tracing::debug!(path = %path_ref.display(), "Loading app descriptor");

        let metadata = fs::metadata(path_ref).map_err(|_| {
            RegistrationError::LoadError("Failed to access app configuration file".to_string())
        })?;

        let file_size = metadata.len() as usize;
        if file_size > config::MAX_CONFIG_SIZE {
            tracing::warn!(
                size = file_size,
                max = config::MAX_CONFIG_SIZE,
                "App configuration file exceeds size limit"
            );
            return Err(RegistrationError::LoadError(format!(
                "File exceeds maximum size limit ({} bytes)",
                config::MAX_CONFIG_SIZE
            )));
        }

        let content = fs::read_to_string(path_ref).map_err(|_| {
            RegistrationError::LoadError("Failed to read app configuration file".to_string())
        })?;

        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&content),
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content),
            _ => Err(RegistrationError::LoadError(
                "Unsupported app configuration file extension".to_string(),
            )),
        }
    }

    /// Parse a descriptor from a JSON string.
    pub fn from_json_str(content: &str) -> Result<Self> {
        check_size(content)?;
        let app: Self = serde_json::from_str(content)?;
        tracing::debug!(app_id = %app.id, "Parsed app descriptor");
        Ok(app)
    }

    /// Parse a descriptor from a YAML string.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        check_size(content)?;
        let app: Self = serde_yaml_ng::from_str(content)?;
        tracing::debug!(app_id = %app.id, "Parsed app descriptor");
        Ok(app)
    }

    /// Get a top-level configuration value by key.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.config.get(key)
    }

    /// Get a top-level configuration value that must be a string.
    pub fn require_str(&self, key: &str) -> Result<&str> {
        self.get(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| RegistrationError::MissingConfigValue {
                app_id: self.id.clone(),
                key: key.to_string(),
            })
    }

    /// The redirect template used after a patient has been created.
    pub fn after_created_url(&self) -> Result<&str> {
        self.require_str(config::AFTER_CREATED_URL_KEY)
    }
}

fn check_size(content: &str) -> Result<()> {
    if content.len() > config::MAX_CONFIG_SIZE {
        tracing::warn!(
            size = content.len(),
            max = config::MAX_CONFIG_SIZE,
            "App configuration exceeds size limit"
        );
        return Err(RegistrationError::LoadError(format!(
            "App configuration exceeds maximum size limit ({} bytes)",
            config::MAX_CONFIG_SIZE
        )));
    }
    Ok(())
}

/// Source of app descriptors, consulted once per request.
pub trait ConfigLoader: Send + Sync {
    /// Load the descriptor for the given app id.
    fn load(&self, app_id: &str) -> Result<AppDescriptor>;
}

/// Loader backed by descriptors held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryConfigLoader {
    apps: HashMap<String, AppDescriptor>,
}

impl InMemoryConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a descriptor, keyed by its id.
    pub fn insert(&mut self, app: AppDescriptor) {
        self.apps.insert(app.id.clone(), app);
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }
}

impl ConfigLoader for InMemoryConfigLoader {
    fn load(&self, app_id: &str) -> Result<AppDescriptor> {
        self.apps
            .get(app_id)
            .cloned()
            .ok_or_else(|| RegistrationError::AppNotFound(app_id.to_string()))
    }
}

/// Loader reading `<root>/<app_id>.json`, `.yaml` or `.yml` on every call.
#[derive(Debug, Clone)]
pub struct DirectoryConfigLoader {
    root: PathBuf,
}

impl DirectoryConfigLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ConfigLoader for DirectoryConfigLoader {
    fn load(&self, app_id: &str) -> Result<AppDescriptor> {
        if !APP_ID_PATTERN.is_match(app_id) || app_id.contains("..") {
            return Err(RegistrationError::AppNotFound(app_id.to_string()));
        }

        for ext in ["json", "yaml", "yml"] {
            let path = self.root.join(format!("{app_id}.{ext}"));
            if path.is_file() {
                return AppDescriptor::from_file(&path);
            }
        }

        Err(RegistrationError::AppNotFound(app_id.to_string()))
    }
}
