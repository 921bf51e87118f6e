//! Core error types.
//!
//! Repository implementations and the attempt session return these so the
//! presentation layer can tell a missing record (redirect the user) from a
//! rejected completion (show the prior result) without string matching.

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

use crate::model::Role;

/// Convenience alias used across the core crate.
pub type Result<T> = std::result::Result<T, CoreError>;

/// The kind of record a [`CoreError::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Subject,
    Test,
    Question,
    Attempt,
    User,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Subject => write!(f, "subject"),
            EntityKind::Test => write!(f, "test"),
            EntityKind::Question => write!(f, "question"),
            EntityKind::Attempt => write!(f, "attempt"),
            EntityKind::User => write!(f, "user"),
        }
    }
}

/// Errors raised by the scoring core and by repository implementations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A referenced record could not be resolved.
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    /// Completing an attempt that is already completed or whose test is gone.
    #[error("cannot complete attempt {attempt_id}: {reason}")]
    InvalidCompletion { attempt_id: Uuid, reason: String },

    /// A test with zero questions.
    #[error("test {0} has no questions")]
    DegenerateTest(String),

    /// A question that breaks the option/answer-key invariants.
    #[error("invalid question {id}: {reason}")]
    InvalidQuestion { id: String, reason: String },

    /// A selection for a question outside the test or an out-of-range option.
    #[error("invalid answer for question {question_id}: option {option}")]
    InvalidAnswer { question_id: String, option: usize },

    /// Results were requested for an attempt that has not been submitted.
    #[error("attempt {0} is still in progress")]
    AttemptInProgress(Uuid),

    /// The user's role does not permit the operation.
    #[error("user {user_id} lacks the {required} role")]
    RoleMismatch { user_id: String, required: Role },
}

impl CoreError {
    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Returns `true` if the error means a referenced record is missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::NotFound { .. })
    }

    /// Returns `true` if a completion was refused rather than performed.
    pub fn is_invalid_completion(&self) -> bool {
        matches!(self, CoreError::InvalidCompletion { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message() {
        let err = CoreError::not_found(EntityKind::Test, "python-test");
        assert_eq!(err.to_string(), "test not found: python-test");
        assert!(err.is_not_found());
        assert!(!err.is_invalid_completion());
    }

    #[test]
    fn role_mismatch_message() {
        let err = CoreError::RoleMismatch {
            user_id: "2".into(),
            required: Role::Learner,
        };
        assert_eq!(err.to_string(), "user 2 lacks the learner role");
    }
}
