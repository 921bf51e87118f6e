//! In-memory repository.
//!
//! Subjects and tests are fixed once the store is built. Questions can be
//! edited and attempts accumulate; both sit behind their own lock so an
//! attempt's completion check and write happen under a single guard.

use std::collections::HashSet;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use mocktest_core::error::{CoreError, EntityKind, Result};
use mocktest_core::model::{AnswerMap, Attempt, Question, QuestionBank, Subject, Test};
use mocktest_core::parser::{has_errors, validate_question_bank, Severity};
use mocktest_core::traits::Repository;

/// A [`Repository`] over plain vectors.
#[derive(Debug)]
pub struct InMemoryStore {
    subjects: Vec<Subject>,
    tests: Vec<Test>,
    questions: RwLock<Vec<Question>>,
    attempts: RwLock<Vec<Attempt>>,
}

impl InMemoryStore {
    /// Build a store from a question bank, refusing banks with validation
    /// errors. Warnings are logged.
    pub fn from_bank(bank: QuestionBank) -> anyhow::Result<Self> {
        let findings = validate_question_bank(&bank);
        for finding in &findings {
            let id = finding.entity_id.as_deref().unwrap_or("-");
            match finding.severity {
                Severity::Warning => tracing::warn!(entity = id, "{}", finding.message),
                Severity::Error => tracing::error!(entity = id, "{}", finding.message),
            }
        }
        if has_errors(&findings) {
            let count = findings
                .iter()
                .filter(|f| f.severity == Severity::Error)
                .count();
            anyhow::bail!("question bank has {count} validation error(s)");
        }

        tracing::debug!(
            subjects = bank.subjects.len(),
            tests = bank.tests.len(),
            questions = bank.questions.len(),
            "store loaded"
        );
        Ok(Self {
            subjects: bank.subjects,
            tests: bank.tests,
            questions: RwLock::new(bank.questions),
            attempts: RwLock::new(Vec::new()),
        })
    }

    /// Replace the editable collections with previously saved ones.
    ///
    /// Saved questions override bank questions with the same id and are
    /// appended otherwise. They pass the same checks as
    /// [`upsert_question`](Repository::upsert_question): a known subject,
    /// and no move away from the subject of the question they replace.
    /// Nothing is applied unless every saved question passes. Attempts
    /// pointing at unknown tests are dropped.
    pub async fn restore(
        &self,
        questions: Vec<Question>,
        attempts: Vec<Attempt>,
    ) -> anyhow::Result<()> {
        {
            let mut stored = self.questions.write().await;
            for question in &questions {
                self.check_placement(question, &stored)
                    .with_context(|| format!("saved question {} is invalid", question.id))?;
            }
            for question in questions {
                match stored.iter_mut().find(|q| q.id == question.id) {
                    Some(slot) => *slot = question,
                    None => stored.push(question),
                }
            }
        }

        let (known, unknown): (Vec<_>, Vec<_>) = attempts
            .into_iter()
            .partition(|a| self.tests.iter().any(|t| t.id == a.test_id));
        for attempt in &unknown {
            tracing::warn!(
                attempt = %attempt.id,
                test = %attempt.test_id,
                "dropping attempt for unknown test"
            );
        }
        *self.attempts.write().await = known;
        Ok(())
    }

    /// Copies of the editable collections, for persisting.
    pub async fn export(&self) -> (Vec<Question>, Vec<Attempt>) {
        (
            self.questions.read().await.clone(),
            self.attempts.read().await.clone(),
        )
    }

    fn subject_exists(&self, subject_id: &str) -> bool {
        self.subjects.iter().any(|s| s.id == subject_id)
    }

    /// A question may be stored if it is valid, its subject exists, and it
    /// keeps the subject of any stored question with the same id. Tests
    /// only reference questions of their own subject.
    fn check_placement(&self, question: &Question, stored: &[Question]) -> Result<()> {
        if !self.subject_exists(&question.subject) {
            return Err(CoreError::not_found(EntityKind::Subject, &question.subject));
        }
        question.validate()?;
        match stored.iter().find(|q| q.id == question.id) {
            Some(existing) if existing.subject != question.subject => {
                Err(CoreError::InvalidQuestion {
                    id: question.id.clone(),
                    reason: format!("belongs to subject {}", existing.subject),
                })
            }
            _ => Ok(()),
        }
    }
}

/// First `{subject}-{n}` id not already taken.
fn next_question_id(subject: &str, questions: &[Question]) -> String {
    let taken: HashSet<&str> = questions.iter().map(|q| q.id.as_str()).collect();
    let mut n = questions.iter().filter(|q| q.subject == subject).count() + 1;
    loop {
        let id = format!("{subject}-{n}");
        if !taken.contains(id.as_str()) {
            return id;
        }
        n += 1;
    }
}

#[async_trait]
impl Repository for InMemoryStore {
    async fn subjects(&self) -> Result<Vec<Subject>> {
        Ok(self.subjects.clone())
    }

    async fn tests(&self) -> Result<Vec<Test>> {
        Ok(self.tests.clone())
    }

    async fn test(&self, test_id: &str) -> Result<Test> {
        self.tests
            .iter()
            .find(|t| t.id == test_id)
            .cloned()
            .ok_or_else(|| CoreError::not_found(EntityKind::Test, test_id))
    }

    async fn test_for_subject(&self, subject_id: &str) -> Result<Test> {
        if !self.subject_exists(subject_id) {
            return Err(CoreError::not_found(EntityKind::Subject, subject_id));
        }
        self.tests
            .iter()
            .find(|t| t.subject == subject_id)
            .cloned()
            .ok_or_else(|| {
                CoreError::not_found(EntityKind::Test, format!("test for {subject_id}"))
            })
    }

    async fn questions(&self, ids: &[String]) -> Result<Vec<Question>> {
        let stored = self.questions.read().await;
        ids.iter()
            .map(|id| {
                stored
                    .iter()
                    .find(|q| &q.id == id)
                    .cloned()
                    .ok_or_else(|| CoreError::not_found(EntityKind::Question, id))
            })
            .collect()
    }

    async fn questions_for_subject(&self, subject_id: &str) -> Result<Vec<Question>> {
        if !self.subject_exists(subject_id) {
            return Err(CoreError::not_found(EntityKind::Subject, subject_id));
        }
        Ok(self
            .questions
            .read()
            .await
            .iter()
            .filter(|q| q.subject == subject_id)
            .cloned()
            .collect())
    }

    async fn upsert_question(&self, mut question: Question) -> Result<Question> {
        let mut stored = self.questions.write().await;
        if question.id.trim().is_empty() && self.subject_exists(&question.subject) {
            question.id = next_question_id(&question.subject, &stored);
        }
        self.check_placement(&question, &stored)?;

        match stored.iter_mut().find(|q| q.id == question.id) {
            Some(slot) => {
                *slot = question.clone();
                tracing::info!(question = %question.id, "question updated");
            }
            None => {
                stored.push(question.clone());
                tracing::info!(question = %question.id, "question created");
            }
        }
        Ok(question)
    }

    async fn create_attempt(&self, test_id: &str, user_id: &str) -> Result<Attempt> {
        let test = self.test(test_id).await?;
        let attempt = Attempt::start(&test.id, user_id, Utc::now());
        self.attempts.write().await.push(attempt.clone());
        Ok(attempt)
    }

    async fn complete_attempt(
        &self,
        attempt_id: Uuid,
        answers: AnswerMap,
        questions: Vec<Question>,
        ended_at: DateTime<Utc>,
    ) -> Result<Attempt> {
        let mut attempts = self.attempts.write().await;
        let attempt = attempts
            .iter_mut()
            .find(|a| a.id == attempt_id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Attempt, attempt_id.to_string()))?;
        attempt.complete(ended_at, answers, questions)?;
        Ok(attempt.clone())
    }

    async fn attempt(&self, attempt_id: Uuid) -> Result<Attempt> {
        self.attempts
            .read()
            .await
            .iter()
            .find(|a| a.id == attempt_id)
            .cloned()
            .ok_or_else(|| CoreError::not_found(EntityKind::Attempt, attempt_id.to_string()))
    }

    async fn attempts_for_user(&self, user_id: &str) -> Result<Vec<Attempt>> {
        Ok(self
            .attempts
            .read()
            .await
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn attempts(&self) -> Result<Vec<Attempt>> {
        Ok(self.attempts.read().await.clone())
    }
}
