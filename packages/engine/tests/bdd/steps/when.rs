//! When step definitions
//!
//! Steps that trigger the action under test.

use cucumber::when;

use crate::world::RegistrationWorld;

#[when("the registration form is requested")]
fn request_form(world: &mut RegistrationWorld) {
    world.request_form();
}

#[when("the registration form is submitted")]
fn submit_form(world: &mut RegistrationWorld) {
    world.submit_form();
}
