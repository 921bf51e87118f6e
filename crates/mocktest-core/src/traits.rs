//! Core trait definitions for storage and session observation.
//!
//! The scorer and the timer never touch storage directly: everything that
//! reads or writes subjects, tests, questions or attempts goes through
//! [`Repository`]. `mocktest-store` provides the in-memory implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::model::{AnswerMap, Attempt, Question, Subject, Test};
use crate::scoring::Outcome;

// ---------------------------------------------------------------------------
// Repository trait
// ---------------------------------------------------------------------------

/// Storage seam for reference data and attempts.
#[async_trait]
pub trait Repository: Send + Sync {
    /// All subjects in display order.
    async fn subjects(&self) -> Result<Vec<Subject>>;

    /// All tests in display order.
    async fn tests(&self) -> Result<Vec<Test>>;

    /// Look up a test by id.
    async fn test(&self, test_id: &str) -> Result<Test>;

    /// The test belonging to a subject.
    async fn test_for_subject(&self, subject_id: &str) -> Result<Test>;

    /// Resolve question ids in the order given.
    ///
    /// Fails with `NotFound` if any id does not resolve.
    async fn questions(&self, ids: &[String]) -> Result<Vec<Question>>;

    /// Every question belonging to a subject, in bank order.
    async fn questions_for_subject(&self, subject_id: &str) -> Result<Vec<Question>>;

    /// Insert or fully replace a question. Returns the stored question,
    /// with an id assigned if the input had none.
    async fn upsert_question(&self, question: Question) -> Result<Question>;

    /// Record a new in-progress attempt.
    async fn create_attempt(&self, test_id: &str, user_id: &str) -> Result<Attempt>;

    /// Transition an attempt to `Completed` via [`Attempt::complete`],
    /// scoring `answers` against the test's resolved `questions`.
    ///
    /// Implementations perform the check and the write atomically and
    /// reject an attempt that is already completed.
    async fn complete_attempt(
        &self,
        attempt_id: Uuid,
        answers: AnswerMap,
        questions: Vec<Question>,
        ended_at: DateTime<Utc>,
    ) -> Result<Attempt>;

    /// Look up an attempt by id.
    async fn attempt(&self, attempt_id: Uuid) -> Result<Attempt>;

    /// Attempts made by one user, oldest first.
    async fn attempts_for_user(&self, user_id: &str) -> Result<Vec<Attempt>>;

    /// Every stored attempt, oldest first.
    async fn attempts(&self) -> Result<Vec<Attempt>>;
}

// ---------------------------------------------------------------------------
// Session observation
// ---------------------------------------------------------------------------

/// How an attempt came to be completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// The learner submitted.
    Manual,
    /// The countdown reached zero.
    Forced,
}

/// Progress reporting for an attempt session.
pub trait SessionReporter: Send + Sync {
    fn on_started(&self, attempt: &Attempt, test: &Test);
    fn on_answer(&self, question_id: &str, option: usize);
    fn on_completed(&self, attempt: &Attempt, submission: Submission, outcomes: &[Outcome]);
}

/// No-op session reporter.
pub struct NoopReporter;

impl SessionReporter for NoopReporter {
    fn on_started(&self, _: &Attempt, _: &Test) {}
    fn on_answer(&self, _: &str, _: usize) {}
    fn on_completed(&self, _: &Attempt, _: Submission, _: &[Outcome]) {}
}
