//! World struct for Cucumber BDD tests
//!
//! Contains the test state that persists across steps in a scenario.

use chrono::NaiveDate;
use cucumber::World;
use registration_engine::{
    AppDescriptor, FlashMessages, InMemoryAttributeTypeDirectory, InMemoryConfigLoader,
    InMemoryRegistration, MapMessageResolver, PageModel, PatientValidator, PersonAttributeType,
    PostOutcome, RegistrationError, RegistrationPage, StaticSession, SubmittedValues,
    ValidationAggregator,
};
use std::fmt;
use std::sync::Arc;

pub const APP_ID: &str = "registrationapp.basicRegistration";

/// Test world that holds state across steps in a Cucumber scenario.
#[derive(World)]
#[world(init = Self::new)]
pub struct RegistrationWorld {
    /// App configuration served to the page
    pub app_config: serde_json::Value,
    /// Person attribute types known to the directory
    pub attribute_types: Vec<PersonAttributeType>,
    /// Message code -> pattern
    pub messages: MapMessageResolver,
    /// Values submitted with the form
    pub submitted: SubmittedValues,
    /// Registration store shared with the page
    pub registration: Arc<InMemoryRegistration>,
    /// Session messages produced by the last submission
    pub flash: FlashMessages,
    /// Model from the last form request
    pub model: Option<PageModel>,
    /// Outcome of the last submission (if successful)
    pub outcome: Option<PostOutcome>,
    /// Last error (if the request failed)
    pub error: Option<RegistrationError>,
}

impl fmt::Debug for RegistrationWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationWorld")
            .field("app_config", &self.app_config)
            .field("submitted", &self.submitted)
            .field("model", &self.model)
            .field("outcome", &self.outcome)
            .field("error", &self.error.as_ref().map(|e| e.to_string()))
            .field(
                "registration",
                &format!("<{} patients>", self.registration.patients().len()),
            )
            .finish()
    }
}

impl Default for RegistrationWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistrationWorld {
    pub fn new() -> Self {
        Self {
            app_config: serde_json::json!({}),
            attribute_types: Vec::new(),
            messages: MapMessageResolver::new(),
            submitted: SubmittedValues::new(),
            registration: Arc::new(InMemoryRegistration::new()),
            flash: FlashMessages::new(),
            model: None,
            outcome: None,
            error: None,
        }
    }

    /// Build a page over the current scenario state.
    ///
    /// The page is rebuilt for every request, the way a fresh configuration
    /// load would see any edit made between requests.
    fn page(&self) -> RegistrationPage {
        let mut loader = InMemoryConfigLoader::new();
        loader.insert(AppDescriptor::new(APP_ID, self.app_config.clone()));
        let reference_date = NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date");

        RegistrationPage::new(
            Arc::new(loader),
            Arc::new(InMemoryAttributeTypeDirectory::new(
                "scenario",
                self.attribute_types.clone(),
            )),
            Arc::new(self.messages.clone()),
            self.registration.clone(),
        )
        .with_validation(
            ValidationAggregator::empty()
                .with_validator(PatientValidator::with_reference_date(reference_date)),
        )
    }

    /// Request the empty form and store the model or error
    pub fn request_form(&mut self) {
        let session = StaticSession::authenticated(None);
        match self.page().get(APP_ID, &session) {
            Ok(model) => {
                self.model = Some(model);
                self.error = None;
            }
            Err(e) => {
                self.model = None;
                self.error = Some(e);
            }
        }
    }

    /// Submit the form and store the outcome or error
    pub fn submit_form(&mut self) {
        let session = StaticSession::authenticated(Some("Registration Desk"));
        let page = self.page();
        match page.post(APP_ID, &self.submitted, &session, &mut self.flash) {
            Ok(outcome) => {
                if let PostOutcome::Redisplay(model) = &outcome {
                    self.model = Some(model.clone());
                }
                self.outcome = Some(outcome);
                self.error = None;
            }
            Err(e) => {
                self.outcome = None;
                self.error = Some(e);
            }
        }
    }

    /// Get error message if the request failed
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|e| e.to_string())
    }
}
