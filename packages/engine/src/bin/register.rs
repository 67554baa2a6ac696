//! CLI binary for rendering or submitting a registration form via stdin.
//!
//! Usage:
//!   echo '{"mode": "submit", "app": {...}, "params": {...}}' | cargo run --bin register
//!
//! Input (JSON on stdin):
//!   - mode: "render" | "submit"
//!   - app: Object: app descriptor (`id` plus `config` with `sections`, `afterCreatedUrl`)
//!   - params: Optional<Object>: submitted form values (scalars are stringified)
//!   - attribute_types: Optional<Vec<Object>>: person attribute types (`uuid`, `name`, `format`)
//!   - messages: Optional<Object>: message code -> pattern
//!   - display: Optional<Object>: display settings for the renderer
//!   - location: Optional<String>: session location passed to registration
//!   - reference_date: Optional<String>: date for birthdate checks (YYYY-MM-DD)
//!
//! Output (JSON on stdout):
//!   - model: Optional<Object>: page model for the renderer (render, or failed submit)
//!   - redirect: Optional<String>: redirect location after a successful submit
//!   - patient: Optional<Object>: the registered patient
//!   - error_message: Optional<String>: composed validation report
//!   - info_message: Optional<String>: notice queued for the next render
//!   - error: Optional<String>: error message if the request failed

use registration_engine::{
    AppDescriptor, DisplaySettings, FlashMessages, InMemoryAttributeTypeDirectory,
    InMemoryConfigLoader, InMemoryRegistration, MapMessageResolver, PageModel, Patient,
    PatientValidator, PersonAttributeType, PostOutcome, RegistrationPage, StaticSession,
    SubmittedValues, ValidationAggregator,
};
use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(serde::Deserialize)]
#[serde(rename_all = "lowercase")]
enum Mode {
    Render,
    Submit,
}

#[derive(serde::Deserialize)]
struct RegisterRequest {
    mode: Mode,
    app: AppDescriptor,
    #[serde(default)]
    params: HashMap<String, serde_json::Value>,
    #[serde(default)]
    attribute_types: Vec<PersonAttributeType>,
    #[serde(default)]
    messages: MapMessageResolver,
    #[serde(default)]
    display: DisplaySettings,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    reference_date: Option<String>,
}

#[derive(Default, serde::Serialize)]
struct RegisterResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<PageModel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    patient: Option<Patient>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    info_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn fail(msg: String) -> ! {
    let resp = RegisterResponse {
        error: Some(msg),
        ..RegisterResponse::default()
    };
    println!("{}", serde_json::to_string(&resp).unwrap_or_default());
    std::process::exit(1);
}

fn param_to_string(v: &serde_json::Value) -> Option<String> {
    match v {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let mut input = String::new();
    if let Err(e) = std::io::stdin().read_to_string(&mut input) {
        fail(format!("Failed to read stdin: {e}"));
    }

    let request: RegisterRequest = match serde_json::from_str(&input) {
        Ok(r) => r,
        Err(e) => fail(format!("Failed to parse request JSON: {e}")),
    };

    let validator = match request.reference_date.as_deref() {
        Some(date) => match chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d") {
            Ok(d) => PatientValidator::with_reference_date(d),
            Err(_) => fail(format!(
                "Invalid date format '{date}': expected YYYY-MM-DD"
            )),
        },
        None => PatientValidator::new(),
    };

    let app_id = request.app.id.clone();
    let mut loader = InMemoryConfigLoader::new();
    loader.insert(request.app);

    let registration = Arc::new(InMemoryRegistration::new());
    let page = RegistrationPage::new(
        Arc::new(loader),
        Arc::new(InMemoryAttributeTypeDirectory::new(
            "request",
            request.attribute_types,
        )),
        Arc::new(request.messages),
        registration.clone(),
    )
    .with_validation(ValidationAggregator::empty().with_validator(validator))
    .with_display_settings(request.display);

    let session = StaticSession::authenticated(request.location.as_deref());

    let response = match request.mode {
        Mode::Render => match page.get(&app_id, &session) {
            Ok(model) => RegisterResponse {
                model: Some(model),
                ..RegisterResponse::default()
            },
            Err(e) => fail(format!("{e}")),
        },
        Mode::Submit => {
            let submitted: SubmittedValues = request
                .params
                .iter()
                .filter_map(|(k, v)| param_to_string(v).map(|s| (k.clone(), s)))
                .collect();
            let mut flash = FlashMessages::new();
            match page.post(&app_id, &submitted, &session, &mut flash) {
                Ok(PostOutcome::Redirect { location, .. }) => RegisterResponse {
                    redirect: Some(location),
                    patient: registration.patients().pop(),
                    info_message: flash.take_info_message(),
                    ..RegisterResponse::default()
                },
                Ok(PostOutcome::Redisplay(model)) => RegisterResponse {
                    model: Some(model),
                    error_message: flash.take_error_message(),
                    ..RegisterResponse::default()
                },
                Err(e) => fail(format!("{e}")),
            }
        }
    };

    println!("{}", serde_json::to_string(&response).unwrap_or_default());
}
