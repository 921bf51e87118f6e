//! Attempt session orchestrator.
//!
//! Ties one in-progress attempt to its countdown. Manual submission and
//! forced submission both end in [`complete_attempt`], and the timer is
//! cancelled before the store is touched so a late tick cannot trigger a
//! second completion.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{oneshot, watch};
use uuid::Uuid;

use crate::error::{CoreError, EntityKind, Result};
use crate::model::{AnswerMap, Attempt, Question, Role, Test, User};
use crate::scoring::classify;
use crate::timer::SessionTimer;
use crate::traits::{NoopReporter, Repository, SessionReporter, Submission};

/// The single completion operation.
///
/// Resolves the attempt's test and question set and asks the repository
/// to perform the `InProgress → Completed` transition, which scores the
/// answers against that set and keeps it on the attempt.
/// A completed attempt, or one whose test has disappeared, is rejected
/// with [`CoreError::InvalidCompletion`].
pub async fn complete_attempt(
    repo: &dyn Repository,
    attempt_id: Uuid,
    answers: AnswerMap,
    ended_at: DateTime<Utc>,
) -> Result<Attempt> {
    let attempt = repo.attempt(attempt_id).await?;
    if attempt.is_completed() {
        return Err(CoreError::InvalidCompletion {
            attempt_id,
            reason: "attempt is already completed".into(),
        });
    }

    let test = match repo.test(&attempt.test_id).await {
        Ok(test) => test,
        Err(e) if e.is_not_found() => {
            return Err(CoreError::InvalidCompletion {
                attempt_id,
                reason: format!("test {} no longer exists", attempt.test_id),
            })
        }
        Err(e) => return Err(e),
    };
    let questions = repo.questions(&test.questions).await?;

    let completed = repo
        .complete_attempt(attempt_id, answers, questions, ended_at)
        .await?;
    tracing::info!(
        attempt = %attempt_id,
        test = %test.id,
        score = completed.score().unwrap_or_default(),
        "attempt completed"
    );
    Ok(completed)
}

/// One learner working through one test.
pub struct AttemptSession {
    repo: Arc<dyn Repository>,
    reporter: Arc<dyn SessionReporter>,
    attempt: Attempt,
    test: Test,
    questions: Vec<Question>,
    answers: AnswerMap,
    timer: SessionTimer,
    expiry: Option<oneshot::Receiver<()>>,
    announced: bool,
    completed: Option<Attempt>,
}

impl AttemptSession {
    /// Resolve a test and its questions and record a new attempt.
    ///
    /// The countdown does not run until [`start`](Self::start) is called.
    pub async fn begin(repo: Arc<dyn Repository>, test_id: &str, user: &User) -> Result<Self> {
        user.require(Role::Learner)?;

        let test = repo.test(test_id).await?;
        let questions = repo.questions(&test.questions).await?;
        if test.is_degenerate() {
            tracing::warn!(test = %test.id, "starting an attempt on a test with no questions");
        }

        let attempt = repo.create_attempt(&test.id, &user.id).await?;
        tracing::info!(attempt = %attempt.id, test = %test.id, user = %user.id, "attempt created");

        Ok(Self {
            timer: SessionTimer::new(test.time_limit_secs()),
            repo,
            reporter: Arc::new(NoopReporter),
            attempt,
            test,
            questions,
            answers: AnswerMap::new(),
            expiry: None,
            announced: false,
            completed: None,
        })
    }

    /// Begin an attempt on the test of a subject.
    pub async fn begin_for_subject(
        repo: Arc<dyn Repository>,
        subject_id: &str,
        user: &User,
    ) -> Result<Self> {
        let test = repo.test_for_subject(subject_id).await?;
        Self::begin(repo, &test.id, user).await
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn SessionReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Start (or resume) the countdown. Returns `false` if it was already
    /// running, has run out, or the attempt is completed.
    pub fn start(&mut self) -> bool {
        if self.completed.is_some() {
            return false;
        }

        let (tx, rx) = oneshot::channel();
        let started = self.timer.start(move || {
            let _ = tx.send(());
        });
        if !started {
            return false;
        }
        self.expiry = Some(rx);

        if !self.announced {
            self.announced = true;
            self.reporter.on_started(&self.attempt, &self.test);
        }
        true
    }

    /// Stop the countdown without completing the attempt.
    pub fn suspend(&mut self) {
        self.timer.cancel();
        self.expiry = None;
    }

    /// Select an option for a question, replacing any earlier selection.
    pub fn select(&mut self, question_id: &str, option: usize) -> Result<()> {
        if self.completed.is_some() {
            return Err(self.closed("attempt is already completed"));
        }
        if self.timer.is_expired() {
            return Err(self.closed("time limit reached"));
        }

        let question = self
            .questions
            .iter()
            .find(|q| q.id == question_id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Question, question_id))?;
        if !question.has_option(option) {
            return Err(CoreError::InvalidAnswer {
                question_id: question_id.to_string(),
                option,
            });
        }

        tracing::debug!(question = question_id, option, "answer selected");
        self.answers.insert(question_id.to_string(), option);
        self.reporter.on_answer(question_id, option);
        Ok(())
    }

    fn closed(&self, reason: &str) -> CoreError {
        CoreError::InvalidCompletion {
            attempt_id: self.attempt.id,
            reason: reason.to_string(),
        }
    }

    /// Resolves once the countdown reaches zero. Never resolves if the
    /// countdown is not running. Safe to use as a `select!` branch.
    pub async fn expired(&mut self) {
        if let Some(rx) = self.expiry.as_mut() {
            let fired = rx.await.is_ok();
            self.expiry = None;
            if fired {
                return;
            }
        }
        std::future::pending::<()>().await
    }

    /// Learner-initiated submission.
    pub async fn submit(&mut self) -> Result<Attempt> {
        self.finish(Submission::Manual).await
    }

    /// Submission triggered by the countdown.
    pub async fn force_submit(&mut self) -> Result<Attempt> {
        self.finish(Submission::Forced).await
    }

    /// Wait for the countdown and submit whatever has been selected.
    pub async fn run_until_expired(&mut self) -> Result<Attempt> {
        self.expired().await;
        self.force_submit().await
    }

    async fn finish(&mut self, submission: Submission) -> Result<Attempt> {
        if self.completed.is_some() {
            return Err(self.closed("attempt is already completed"));
        }

        self.suspend();
        let attempt = complete_attempt(
            self.repo.as_ref(),
            self.attempt.id,
            self.answers.clone(),
            Utc::now(),
        )
        .await?;

        let outcomes: Vec<_> = attempt
            .scored_questions()
            .unwrap_or_default()
            .iter()
            .map(|q| classify(q, attempt.answers()))
            .collect();
        self.reporter.on_completed(&attempt, submission, &outcomes);
        self.completed = Some(attempt.clone());
        Ok(attempt)
    }

    pub fn attempt_id(&self) -> Uuid {
        self.attempt.id
    }

    pub fn test(&self) -> &Test {
        &self.test
    }

    /// Questions in test order.
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    pub fn is_completed(&self) -> bool {
        self.completed.is_some()
    }

    /// The completed attempt, once submitted.
    pub fn completed(&self) -> Option<&Attempt> {
        self.completed.as_ref()
    }

    pub fn remaining_secs(&self) -> u64 {
        self.timer.remaining_secs()
    }

    pub fn time_display(&self) -> String {
        self.timer.display()
    }

    pub fn is_time_warning(&self) -> bool {
        self.timer.is_warning()
    }

    /// Observe the countdown.
    pub fn timer_updates(&self) -> watch::Receiver<u64> {
        self.timer.subscribe()
    }
}
