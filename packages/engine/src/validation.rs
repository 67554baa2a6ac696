//! Validation of the assembled patient
//!
//! Validators inspect the patient as populated by the core bindings and add
//! [`ObjectError`]s to a [`ValidationResult`]. Failures are data: the caller
//! decides whether to redisplay the form or continue.
//!
//! [`ValidationAggregator::format`] turns a result into one report: a summary
//! line followed by a `<ul>` list with one `<li>` per error, in the order the
//! validators produced them.

use crate::config;
use crate::entity::Patient;
use crate::messages::MessageResolver;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;

/// Maximum stored length of a name or address part.
pub const MAX_FIELD_LENGTH: usize = 255;

/// Oldest plausible age in years.
pub const MAX_AGE_YEARS: i32 = 140;

/// Accepted gender codes.
pub const GENDER_CODES: [&str; 4] = ["M", "F", "O", "U"];

/// A single validation error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectError {
    /// Message code resolved through the [`MessageResolver`]
    pub code: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_message: Option<String>,
    /// Property path of the offending value, if the error concerns one field
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// Ordered collection of validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ValidationResult {
    errors: Vec<ObjectError>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error on the object as a whole.
    pub fn reject(&mut self, code: impl Into<String>, default_message: impl Into<String>) {
        self.errors.push(ObjectError {
            code: code.into(),
            arguments: Vec::new(),
            default_message: Some(default_message.into()),
            field: None,
        });
    }

    /// Record an error on a single field.
    pub fn reject_value(
        &mut self,
        field: impl Into<String>,
        code: impl Into<String>,
        arguments: Vec<String>,
        default_message: impl Into<String>,
    ) {
        self.errors.push(ObjectError {
            code: code.into(),
            arguments,
            default_message: Some(default_message.into()),
            field: Some(field.into()),
        });
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ObjectError] {
        &self.errors
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Errors recorded against the given field.
    pub fn field_errors<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a ObjectError> {
        self.errors
            .iter()
            .filter(move |e| e.field.as_deref() == Some(field))
    }
}

/// Checks a patient and records any problems.
pub trait Validator: Send + Sync {
    fn validate(&self, patient: &Patient, errors: &mut ValidationResult);
}

/// Core identity checks for a new patient.
///
/// - gender present and one of [`GENDER_CODES`]
/// - birthdate present, not in the future, not older than [`MAX_AGE_YEARS`]
/// - at least one name; every name has a given and a family name
/// - at most one preferred name
/// - name and address parts no longer than [`MAX_FIELD_LENGTH`]
#[derive(Debug, Clone, Default)]
pub struct PatientValidator {
    reference_date: Option<NaiveDate>,
}

impl PatientValidator {
    /// Validator comparing birthdates against today's date.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validator comparing birthdates against a fixed date.
    pub fn with_reference_date(date: NaiveDate) -> Self {
        Self {
            reference_date: Some(date),
        }
    }

    fn today(&self) -> NaiveDate {
        self.reference_date
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    fn validate_gender(&self, patient: &Patient, errors: &mut ValidationResult) {
        match patient.gender.as_deref() {
            None => errors.reject_value(
                "gender",
                "Person.gender.required",
                vec![],
                "Gender is required",
            ),
            Some(gender) if !GENDER_CODES.contains(&gender) => errors.reject_value(
                "gender",
                "Person.gender.invalid",
                vec![gender.to_string()],
                "Gender {0} is not a valid choice",
            ),
            Some(_) => {}
        }
    }

    fn validate_birthdate(&self, patient: &Patient, errors: &mut ValidationResult) {
        let Some(birthdate) = patient.birthdate else {
            errors.reject_value(
                "birthdate",
                "Person.birthdate.required",
                vec![],
                "Birthdate is required",
            );
            return;
        };

        let today = self.today();
        if birthdate > today {
            errors.reject_value(
                "birthdate",
                "error.date.future",
                vec![],
                "Birthdate cannot be in the future",
            );
        } else if today.year() - birthdate.year() > MAX_AGE_YEARS {
            errors.reject_value(
                "birthdate",
                "error.date.nonsensical",
                vec![MAX_AGE_YEARS.to_string()],
                "Birthdate is more than {0} years ago",
            );
        }
    }

    fn validate_names(&self, patient: &Patient, errors: &mut ValidationResult) {
        let names = patient.names();
        if names.iter().all(|n| n.is_blank()) {
            errors.reject(
                "Patient.names.length",
                "Patient must have at least one name",
            );
            return;
        }

        for (i, name) in names.iter().enumerate() {
            if name.given_name.is_none() {
                errors.reject_value(
                    format!("names[{i}].givenName"),
                    "Patient.names.required.given.family",
                    vec![],
                    "Given name is required",
                );
            }
            if name.family_name.is_none() {
                errors.reject_value(
                    format!("names[{i}].familyName"),
                    "Patient.names.required.given.family",
                    vec![],
                    "Family name is required",
                );
            }
            let parts = [
                ("givenName", &name.given_name),
                ("middleName", &name.middle_name),
                ("familyName", &name.family_name),
                ("familyName2", &name.family_name2),
            ];
            for (key, part) in parts {
                check_length(errors, &format!("names[{i}].{key}"), part.as_deref());
            }
        }

        if names.iter().filter(|n| n.preferred).count() > 1 {
            errors.reject(
                "Person.names.preferred.multiple",
                "Only one name can be preferred",
            );
        }
    }

    fn validate_addresses(&self, patient: &Patient, errors: &mut ValidationResult) {
        for (i, address) in patient.addresses().iter().enumerate() {
            for (key, part) in address.parts() {
                check_length(errors, &format!("addresses[{i}].{key}"), part);
            }
        }
    }
}

fn check_length(errors: &mut ValidationResult, field: &str, value: Option<&str>) {
    if value.is_some_and(|v| v.chars().count() > MAX_FIELD_LENGTH) {
        errors.reject_value(
            field,
            "error.exceededMaxLengthOfField",
            vec![field.to_string(), MAX_FIELD_LENGTH.to_string()],
            "{0} exceeds the maximum length of {1}",
        );
    }
}

impl Validator for PatientValidator {
    fn validate(&self, patient: &Patient, errors: &mut ValidationResult) {
        self.validate_gender(patient, errors);
        self.validate_birthdate(patient, errors);
        self.validate_names(patient, errors);
        self.validate_addresses(patient, errors);
    }
}

/// Runs registered validators and composes their errors into a report.
pub struct ValidationAggregator {
    validators: Vec<Box<dyn Validator>>,
}

impl ValidationAggregator {
    /// Aggregator without validators.
    pub fn empty() -> Self {
        Self {
            validators: Vec::new(),
        }
    }

    /// Add a validator; validators run in the order they were added.
    pub fn with_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    pub fn validate(&self, patient: &Patient) -> ValidationResult {
        let mut result = ValidationResult::new();
        for validator in &self.validators {
            validator.validate(patient, &mut result);
        }
        if result.has_errors() {
            tracing::debug!(errors = result.error_count(), "Patient failed validation");
        }
        result
    }

    /// Compose a single report: summary line, then one list item per error.
    pub fn format(result: &ValidationResult, resolver: &dyn MessageResolver) -> String {
        let mut report = escape_html(&resolver.message(
            config::messages::FAILED_VALIDATION,
            &[],
            None,
        ));
        report.push_str("<ul>");
        for error in result.errors() {
            let message =
                resolver.message(&error.code, &error.arguments, error.default_message.as_deref());
            report.push_str("<li>");
            report.push_str(&escape_html(&message));
            report.push_str("</li>");
        }
        report.push_str("</ul>");
        report
    }
}

impl Default for ValidationAggregator {
    /// Aggregator running the [`PatientValidator`] against today's date.
    fn default() -> Self {
        Self::empty().with_validator(PatientValidator::new())
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
