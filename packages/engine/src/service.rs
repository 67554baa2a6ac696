//! Registration page controller
//!
//! Ties the engine together for the two requests a registration page serves:
//!
//! - **get**: load the app configuration, build the form structure and hand it
//!   to the renderer together with the display settings.
//! - **post**: rebuild the structure from the current configuration, bind the
//!   core fields, validate, bind the dynamic fields, register the patient and
//!   produce the redirect location.
//!
//! Every request loads and builds its own structure; nothing is cached between
//! requests, so configuration edits apply to the next request.
//!
//! # Example
//!
//! ```ignore
//! let page = RegistrationPage::new(loader, directory, messages, registration);
//! let mut flash = FlashMessages::new();
//! match page.post("registrationapp.basicRegistration", &submitted, &session, &mut flash)? {
//!     PostOutcome::Redirect { location, .. } => respond_redirect(location),
//!     PostOutcome::Redisplay(model) => render_form(model, flash.take_error_message()),
//! }
//! ```

use crate::app::ConfigLoader;
use crate::binder::{create_default_registry, BindingRegistry, FieldBinder};
use crate::config::{self, DisplaySettings};
use crate::directory::AttributeTypeDirectory;
use crate::entity::{CoreBinding, Patient, PatientId, SubmittedValues};
use crate::error::{CollaboratorError, RegistrationError, Result};
use crate::messages::MessageResolver;
use crate::structure::FormStructure;
use crate::template;
use crate::validation::{ValidationAggregator, ValidationResult};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

// =============================================================================
// External collaborators
// =============================================================================

/// Session of the user submitting the form.
pub trait SessionContext {
    /// Fail unless the session belongs to an authenticated user.
    fn require_authentication(&self) -> Result<()>;

    /// Location the user is logged in at, passed on to registration.
    fn session_location(&self) -> Option<String>;
}

/// Persists a new patient and assigns its id.
pub trait RegistrationCollaborator: Send + Sync {
    /// Register the patient; the returned patient carries the assigned id.
    fn register_patient(
        &self,
        patient: Patient,
        location: Option<&str>,
    ) -> std::result::Result<Patient, CollaboratorError>;
}

/// Session with a fixed authentication state.
#[derive(Debug, Clone, Default)]
pub struct StaticSession {
    pub authenticated: bool,
    pub location: Option<String>,
}

impl StaticSession {
    pub fn authenticated(location: Option<&str>) -> Self {
        Self {
            authenticated: true,
            location: location.map(str::to_string),
        }
    }
}

impl SessionContext for StaticSession {
    fn require_authentication(&self) -> Result<()> {
        if self.authenticated {
            Ok(())
        } else {
            Err(RegistrationError::AuthenticationRequired(
                "no authenticated user in session".to_string(),
            ))
        }
    }

    fn session_location(&self) -> Option<String> {
        self.location.clone()
    }
}

/// Registration keeping patients in memory with sequential ids starting at 1.
#[derive(Debug, Default)]
pub struct InMemoryRegistration {
    next_id: AtomicU64,
    patients: Mutex<Vec<Patient>>,
}

impl InMemoryRegistration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all registered patients.
    pub fn patients(&self) -> Vec<Patient> {
        self.patients
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

impl RegistrationCollaborator for InMemoryRegistration {
    fn register_patient(
        &self,
        mut patient: Patient,
        location: Option<&str>,
    ) -> std::result::Result<Patient, CollaboratorError> {
        let id = PatientId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        patient.id = Some(id);
        tracing::debug!(patient_id = %id, location = ?location, "Registered patient");
        self.patients
            .lock()
            .map_err(|_| "patient store is poisoned")?
            .push(patient.clone());
        Ok(patient)
    }
}

// =============================================================================
// Session-scoped messages
// =============================================================================

/// Messages shown once on the next render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlashMessages {
    error: Option<String>,
    info: Option<String>,
}

impl FlashMessages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_error_message(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn flash_info(&mut self, message: impl Into<String>) {
        self.info = Some(message.into());
    }

    /// Take the pending error message; a second call returns `None`.
    pub fn take_error_message(&mut self) -> Option<String> {
        self.error.take()
    }

    /// Take the pending info message; a second call returns `None`.
    pub fn take_info_message(&mut self) -> Option<String> {
        self.info.take()
    }
}

// =============================================================================
// Page model
// =============================================================================

/// Value handed to the renderer under a model attribute name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ModelValue {
    FormStructure(FormStructure),
    Errors(ValidationResult),
    Json(serde_json::Value),
    Flag(bool),
}

/// Named values handed to the renderer.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct PageModel {
    attributes: BTreeMap<String, ModelValue>,
}

impl PageModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_attribute(&mut self, name: impl Into<String>, value: ModelValue) {
        self.attributes.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ModelValue> {
        self.attributes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(|k| k.as_str())
    }

    pub fn form_structure(&self) -> Option<&FormStructure> {
        match self.get(config::model::FORM_STRUCTURE) {
            Some(ModelValue::FormStructure(structure)) => Some(structure),
            _ => None,
        }
    }

    pub fn errors(&self) -> Option<&ValidationResult> {
        match self.get(config::model::ERRORS) {
            Some(ModelValue::Errors(errors)) => Some(errors),
            _ => None,
        }
    }
}

// =============================================================================
// Controller
// =============================================================================

/// Result of a form submission.
#[derive(Debug, Clone, PartialEq)]
pub enum PostOutcome {
    /// Patient registered; continue at `location`
    Redirect {
        location: String,
        patient_id: PatientId,
    },
    /// Validation failed; render the form again with this model
    Redisplay(PageModel),
}

/// Controller serving the configurable registration page.
pub struct RegistrationPage {
    loader: Arc<dyn ConfigLoader>,
    binder: FieldBinder,
    validation: ValidationAggregator,
    messages: Arc<dyn MessageResolver>,
    registration: Arc<dyn RegistrationCollaborator>,
    display: DisplaySettings,
}

impl RegistrationPage {
    /// Controller with the default binding strategies and patient validation.
    pub fn new(
        loader: Arc<dyn ConfigLoader>,
        directory: Arc<dyn AttributeTypeDirectory>,
        messages: Arc<dyn MessageResolver>,
        registration: Arc<dyn RegistrationCollaborator>,
    ) -> Self {
        Self {
            loader,
            binder: FieldBinder::new(create_default_registry(directory)),
            validation: ValidationAggregator::default(),
            messages,
            registration,
            display: DisplaySettings::default(),
        }
    }

    /// Replace the binding strategies.
    pub fn with_binding_registry(mut self, registry: BindingRegistry) -> Self {
        self.binder = FieldBinder::new(registry);
        self
    }

    /// Replace the validators.
    pub fn with_validation(mut self, validation: ValidationAggregator) -> Self {
        self.validation = validation;
        self
    }

    pub fn with_display_settings(mut self, display: DisplaySettings) -> Self {
        self.display = display;
        self
    }

    /// Serve the empty registration form.
    pub fn get(&self, app_id: &str, session: &dyn SessionContext) -> Result<PageModel> {
        session.require_authentication()?;
        let structure = self.load_structure(app_id)?;
        Ok(self.page_model(structure))
    }

    /// Process a submitted registration form.
    ///
    /// # Errors
    ///
    /// Configuration errors, authentication refusal and registration failures
    /// are returned as errors. Validation failures are not: they produce
    /// [`PostOutcome::Redisplay`] and leave the composed report in `flash`.
    pub fn post(
        &self,
        app_id: &str,
        submitted: &SubmittedValues,
        session: &dyn SessionContext,
        flash: &mut FlashMessages,
    ) -> Result<PostOutcome> {
        session.require_authentication()?;

        let app = self.loader.load(app_id)?;
        let structure = FormStructure::build(&app.config).inspect_err(|e| {
            tracing::warn!(app_id = %app_id, error = %e, "Invalid registration form configuration");
        })?;
        let redirect_template = app.after_created_url()?;
        for name in template::placeholders(redirect_template) {
            if name != config::PATIENT_ID_PLACEHOLDER {
                tracing::warn!(
                    app_id = %app_id,
                    placeholder = name,
                    "Redirect template placeholder has no substitution"
                );
            }
        }

        let mut patient = CoreBinding::from_submitted(submitted).into_patient();

        let result = self.validation.validate(&patient);
        if result.has_errors() {
            flash.set_error_message(ValidationAggregator::format(
                &result,
                self.messages.as_ref(),
            ));
            let mut model = self.page_model(structure);
            model.add_attribute(config::model::ERRORS, ModelValue::Errors(result));
            return Ok(PostOutcome::Redisplay(model));
        }

        let report = self.binder.bind(&mut patient, submitted, &structure.fields());
        tracing::debug!(
            app_id = %app_id,
            bound = report.bound.len(),
            dropped = report.dropped().count(),
            "Bound dynamic fields"
        );

        let location = session.session_location();
        let registered = self
            .registration
            .register_patient(patient, location.as_deref())
            .map_err(RegistrationError::Registration)?;
        let patient_id = registered.id.ok_or_else(|| {
            RegistrationError::Registration("registration returned a patient without id".into())
        })?;

        flash.flash_info(self.messages.message(
            config::messages::CREATED_PATIENT,
            &[registered.display_name()],
            None,
        ));

        let substitutions =
            HashMap::from([(config::PATIENT_ID_PLACEHOLDER, patient_id.to_string())]);
        let location = template::render(redirect_template, &substitutions);

        Ok(PostOutcome::Redirect {
            location,
            patient_id,
        })
    }

    fn load_structure(&self, app_id: &str) -> Result<FormStructure> {
        let app = self.loader.load(app_id)?;
        FormStructure::build(&app.config).inspect_err(|e| {
            tracing::warn!(app_id = %app_id, error = %e, "Invalid registration form configuration");
        })
    }

    fn page_model(&self, structure: FormStructure) -> PageModel {
        let mut model = PageModel::new();
        model.add_attribute(
            config::model::FORM_STRUCTURE,
            ModelValue::FormStructure(structure),
        );
        model.add_attribute(
            config::model::NAME_TEMPLATE,
            ModelValue::Json(self.display.name_template.clone()),
        );
        model.add_attribute(
            config::model::ADDRESS_TEMPLATE,
            ModelValue::Json(self.display.address_template.clone()),
        );
        model.add_attribute(
            config::model::ENABLE_OVERRIDE_OF_ADDRESS_PORTLET,
            ModelValue::Flag(self.display.enable_override_of_address_portlet),
        );
        model
    }
}
