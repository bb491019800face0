//! Statement validation.

pub mod validator;

pub use validator::{CypherValidator, check_identifier};
