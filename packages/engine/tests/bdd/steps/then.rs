//! Then step definitions
//!
//! Steps that verify outcomes and assertions.

use cucumber::then;
use registration_engine::{ModelValue, PostOutcome};

use crate::helpers::table::parse_list;
use crate::world::RegistrationWorld;

// =============================================================================
// Form structure steps
// =============================================================================

#[then(expr = "the form has sections {string}")]
fn assert_section_order(world: &mut RegistrationWorld, expected: String) {
    let model = world.model.as_ref().unwrap_or_else(|| {
        panic!(
            "Expected a page model, got error: {:?}",
            world.error_message()
        )
    });
    let structure = model.form_structure().expect("model has a form structure");
    let ids: Vec<String> = structure
        .sections()
        .iter()
        .map(|s| s.id.clone().unwrap_or_default())
        .collect();
    assert_eq!(ids, parse_list(&expected));
}

#[then(expr = "section {string} has fields {string}")]
fn assert_section_fields(world: &mut RegistrationWorld, section_id: String, expected: String) {
    let structure = world
        .model
        .as_ref()
        .and_then(|m| m.form_structure())
        .expect("model has a form structure");
    let section = structure
        .section(&section_id)
        .unwrap_or_else(|| panic!("Section '{}' not found", section_id));
    let names: Vec<String> = section
        .fields()
        .map(|f| f.form_field_name.clone())
        .collect();
    assert_eq!(names, parse_list(&expected));
}

#[then(expr = "field {string} renders fragment {string} from provider {string}")]
fn assert_fragment_reference(
    world: &mut RegistrationWorld,
    field_name: String,
    fragment_id: String,
    provider_name: String,
) {
    let structure = world
        .model
        .as_ref()
        .and_then(|m| m.form_structure())
        .expect("model has a form structure");
    let field = structure
        .find_field(&field_name)
        .unwrap_or_else(|| panic!("Field '{}' not found", field_name));
    let fragment = field
        .fragment_reference()
        .expect("field has a fragment reference");
    assert_eq!(fragment.fragment_id(), fragment_id);
    assert_eq!(fragment.provider_name(), provider_name);
}

#[then(expr = "the address portlet override is {string}")]
fn assert_address_override(world: &mut RegistrationWorld, expected: String) {
    let model = world.model.as_ref().expect("a page model");
    let expected = expected == "enabled";
    assert_eq!(
        model.get("enableOverrideOfAddressPortlet"),
        Some(&ModelValue::Flag(expected))
    );
}

// =============================================================================
// Submission steps
// =============================================================================

#[then(expr = "the user is redirected to {string}")]
fn assert_redirect(world: &mut RegistrationWorld, expected: String) {
    match &world.outcome {
        Some(PostOutcome::Redirect { location, .. }) => assert_eq!(location, &expected),
        other => panic!(
            "Expected a redirect, got {:?} (error: {:?})",
            other,
            world.error_message()
        ),
    }
}

#[then("the form is redisplayed")]
fn assert_redisplayed(world: &mut RegistrationWorld) {
    assert!(
        matches!(world.outcome, Some(PostOutcome::Redisplay(_))),
        "Expected the form to be redisplayed, got {:?} (error: {:?})",
        world.outcome,
        world.error_message()
    );
}

#[then(expr = "{int} patient(s) is/are registered")]
fn assert_registered_count(world: &mut RegistrationWorld, expected: usize) {
    assert_eq!(world.registration.patients().len(), expected);
}

#[then("no patient is registered")]
fn assert_nothing_registered(world: &mut RegistrationWorld) {
    assert!(world.registration.patients().is_empty());
}

#[then(expr = "the registered patient has attribute {string} with value {string}")]
fn assert_attribute_value(world: &mut RegistrationWorld, uuid: String, expected: String) {
    let patients = world.registration.patients();
    let patient = patients.last().expect("a registered patient");
    let attribute = patient
        .attribute(&uuid)
        .unwrap_or_else(|| panic!("Attribute '{}' not found on {:?}", uuid, patient));
    assert_eq!(attribute.raw_value, expected);
}

#[then(expr = "the registered patient attribute {string} is stored as {string}")]
fn assert_attribute_format(world: &mut RegistrationWorld, uuid: String, expected: String) {
    let patients = world.registration.patients();
    let patient = patients.last().expect("a registered patient");
    let attribute = patient
        .attribute(&uuid)
        .unwrap_or_else(|| panic!("Attribute '{}' not found on {:?}", uuid, patient));
    let value = serde_json::to_value(&attribute.value).expect("attribute value serializes");
    assert_eq!(value["format"], expected.as_str());
}

#[then(expr = "the registered patient has {int} attribute(s)")]
fn assert_attribute_count(world: &mut RegistrationWorld, expected: usize) {
    let patients = world.registration.patients();
    let patient = patients.last().expect("a registered patient");
    assert_eq!(patient.attributes().len(), expected);
}

#[then(expr = "the info message is {string}")]
fn assert_info_message(world: &mut RegistrationWorld, expected: String) {
    assert_eq!(world.flash.take_info_message(), Some(expected));
}

#[then(expr = "the error message is {string}")]
fn assert_error_message(world: &mut RegistrationWorld, expected: String) {
    assert_eq!(world.flash.take_error_message(), Some(expected));
}

#[then(expr = "the model lists {int} validation error(s)")]
fn assert_model_error_count(world: &mut RegistrationWorld, expected: usize) {
    let errors = world
        .model
        .as_ref()
        .and_then(|m| m.errors())
        .expect("model carries validation errors");
    assert_eq!(errors.error_count(), expected);
}

// =============================================================================
// Failure steps
// =============================================================================

#[then("the request fails with a configuration error")]
fn assert_configuration_error(world: &mut RegistrationWorld) {
    let error = world.error.as_ref().expect("request should have failed");
    assert!(
        error.is_configuration_error(),
        "Expected a configuration error, got: {}",
        error
    );
}

#[then(expr = "the failure mentions {string}")]
fn assert_failure_mentions(world: &mut RegistrationWorld, expected: String) {
    let message = world.error_message().expect("request should have failed");
    assert!(
        message.contains(&expected),
        "Expected error containing '{}', got: {}",
        expected,
        message
    );
}
