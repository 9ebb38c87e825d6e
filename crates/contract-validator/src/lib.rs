//! Contract Validator
//!
//! Checks a flat `user_data` object against a wizard's data contract before
//! any browsing session is opened. Every violation is collected so the caller
//! can fix all of them in one round trip.

pub mod errors;
pub mod validator;

pub use errors::{FieldHint, Violation};
pub use validator::{validate, ContractValidator, ValidationOutcome};
