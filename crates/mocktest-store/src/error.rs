//! Account error types.

use thiserror::Error;

/// Errors raised by the user directory.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email or wrong password.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Signup with an email that already has an account.
    #[error("an account with email {0} already exists")]
    EmailTaken(String),

    /// Signup with a blank name, email or password.
    #[error("{0} must not be empty")]
    MissingField(&'static str),
}
