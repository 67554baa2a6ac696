//! Given step definitions
//!
//! Steps that set up the initial state for scenarios.

use cucumber::{gherkin::Step, given};

use crate::helpers::table::{
    parse_table_to_attribute_types, parse_table_to_messages, parse_table_to_submitted,
};
use crate::world::RegistrationWorld;

// =============================================================================
// Configuration steps
// =============================================================================

#[given("the registration app configuration:")]
fn set_app_config(world: &mut RegistrationWorld, step: &Step) {
    let docstring = step
        .docstring
        .as_ref()
        .expect("configuration step needs a JSON docstring");
    world.app_config = serde_json::from_str(docstring).expect("configuration must be valid JSON");
}

#[given(expr = "the widget of field {string} has no {string}")]
fn remove_widget_key(world: &mut RegistrationWorld, field_name: String, key: String) {
    let sections = world.app_config["sections"]
        .as_array_mut()
        .expect("configuration has sections");
    for section in sections {
        for question in section["questions"].as_array_mut().into_iter().flatten() {
            for field in question["fields"].as_array_mut().into_iter().flatten() {
                if field["formFieldName"] == field_name.as_str() {
                    if let Some(widget) = field["widget"].as_object_mut() {
                        widget.remove(&key);
                    }
                }
            }
        }
    }
}

#[given("the person attribute types:")]
fn set_attribute_types(world: &mut RegistrationWorld, step: &Step) {
    world.attribute_types = parse_table_to_attribute_types(step);
}

#[given("the messages:")]
fn set_messages(world: &mut RegistrationWorld, step: &Step) {
    for (code, message) in parse_table_to_messages(step) {
        world.messages.insert(code, message);
    }
}

// =============================================================================
// Submission steps
// =============================================================================

#[given("the submitted values:")]
fn set_submitted_values(world: &mut RegistrationWorld, step: &Step) {
    world.submitted = parse_table_to_submitted(step);
}

#[given(expr = "the submitted value {string} is removed")]
fn remove_submitted_value(world: &mut RegistrationWorld, field_name: String) {
    world.submitted.remove(&field_name);
}
