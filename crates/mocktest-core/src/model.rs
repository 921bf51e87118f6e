//! Core data model types for mocktest.
//!
//! Subjects, questions and tests make up a question bank; users take tests
//! and leave attempts behind.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::scoring;

/// Submitted answers: question id → selected option index (0-based).
pub type AnswerMap = BTreeMap<String, usize>;

/// A topic area grouping questions and exactly one test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    /// Unique identifier (e.g. "python").
    pub id: String,
    /// Display name.
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Illustrative image reference.
    #[serde(default)]
    pub image_url: String,
}

/// A single multiple-choice question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Unique identifier (e.g. "python-3").
    pub id: String,
    /// Owning subject id.
    pub subject: String,
    /// Prompt text.
    pub text: String,
    /// Answer options in display order.
    pub options: Vec<String>,
    /// 0-based index of the correct option.
    pub correct_answer: usize,
}

impl Question {
    /// Check the option/answer-key invariants.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| CoreError::InvalidQuestion {
            id: self.id.clone(),
            reason: reason.to_string(),
        };

        if self.subject.trim().is_empty() {
            return Err(invalid("subject is empty"));
        }
        if self.text.trim().is_empty() {
            return Err(invalid("text is empty"));
        }
        if self.options.len() < 2 {
            return Err(invalid("at least two options are required"));
        }
        if self.options.iter().any(|o| o.trim().is_empty()) {
            return Err(invalid("options must not be empty"));
        }
        if !self.has_option(self.correct_answer) {
            return Err(CoreError::InvalidQuestion {
                id: self.id.clone(),
                reason: format!(
                    "correct answer {} is out of range for {} options",
                    self.correct_answer,
                    self.options.len()
                ),
            });
        }
        Ok(())
    }

    /// Whether `index` addresses one of this question's options.
    pub fn has_option(&self, index: usize) -> bool {
        index < self.options.len()
    }

    /// Case-insensitive match against the text and every option.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.text.to_lowercase().contains(&query)
            || self
                .options
                .iter()
                .any(|o| o.to_lowercase().contains(&query))
    }
}

/// A timed test over a fixed, ordered set of questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Test {
    pub id: String,
    /// Owning subject id.
    pub subject: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Time limit in minutes.
    pub time_limit_minutes: u32,
    /// Question ids in display order.
    pub questions: Vec<String>,
}

impl Test {
    /// The time limit in whole seconds.
    pub fn time_limit_secs(&self) -> u64 {
        u64::from(self.time_limit_minutes) * 60
    }

    pub fn time_limit(&self) -> Duration {
        Duration::from_secs(self.time_limit_secs())
    }

    /// A test with no questions cannot be meaningfully scored.
    pub fn is_degenerate(&self) -> bool {
        self.questions.is_empty()
    }
}

/// The two user roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[serde(alias = "student")]
    Learner,
    #[serde(alias = "faculty")]
    Instructor,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Learner => write!(f, "learner"),
            Role::Instructor => write!(f, "instructor"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "learner" | "student" => Ok(Role::Learner),
            "instructor" | "faculty" => Ok(Role::Instructor),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// An authenticated user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl User {
    /// Fail with [`CoreError::RoleMismatch`] unless the user has `role`.
    pub fn require(&self, role: Role) -> Result<()> {
        if self.role == role {
            Ok(())
        } else {
            Err(CoreError::RoleMismatch {
                user_id: self.id.clone(),
                required: role,
            })
        }
    }
}

/// Lifecycle of an attempt. `InProgress → Completed`, one way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttemptState {
    InProgress {
        #[serde(default)]
        answers: AnswerMap,
    },
    Completed {
        ended_at: DateTime<Utc>,
        answers: AnswerMap,
        /// Percentage score, 0–100, computed from `questions`.
        score: u32,
        /// The question set as it stood when the attempt was scored, in
        /// test order. Reviews classify against this, not the live bank.
        questions: Vec<Question>,
    },
}

/// One learner's run through one test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    pub id: Uuid,
    pub test_id: String,
    pub user_id: String,
    pub started_at: DateTime<Utc>,
    #[serde(flatten)]
    pub state: AttemptState,
}

impl Attempt {
    /// Start a new attempt with no answers.
    pub fn start(test_id: &str, user_id: &str, started_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            test_id: test_id.to_string(),
            user_id: user_id.to_string(),
            started_at,
            state: AttemptState::InProgress {
                answers: AnswerMap::new(),
            },
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.state, AttemptState::Completed { .. })
    }

    pub fn answers(&self) -> &AnswerMap {
        match &self.state {
            AttemptState::InProgress { answers } | AttemptState::Completed { answers, .. } => {
                answers
            }
        }
    }

    pub fn score(&self) -> Option<u32> {
        match self.state {
            AttemptState::Completed { score, .. } => Some(score),
            AttemptState::InProgress { .. } => None,
        }
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        match self.state {
            AttemptState::Completed { ended_at, .. } => Some(ended_at),
            AttemptState::InProgress { .. } => None,
        }
    }

    /// The questions the score was computed from, once completed.
    pub fn scored_questions(&self) -> Option<&[Question]> {
        match &self.state {
            AttemptState::Completed { questions, .. } => Some(questions),
            AttemptState::InProgress { .. } => None,
        }
    }

    /// Wall-clock time between start and completion.
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.ended_at().map(|end| end - self.started_at)
    }

    /// Perform the one-way transition to `Completed`, scoring `answers`
    /// against `questions` (the test's resolved question set, in order).
    ///
    /// A second call is rejected and leaves the stored score untouched.
    pub fn complete(
        &mut self,
        ended_at: DateTime<Utc>,
        answers: AnswerMap,
        questions: Vec<Question>,
    ) -> Result<u32> {
        if self.is_completed() {
            return Err(CoreError::InvalidCompletion {
                attempt_id: self.id,
                reason: "attempt is already completed".into(),
            });
        }
        let score = scoring::score(&questions, &answers);
        self.state = AttemptState::Completed {
            ended_at,
            answers,
            score,
            questions,
        };
        Ok(score)
    }
}

/// A parsed question bank: the static reference data a store is seeded from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionBank {
    #[serde(default)]
    pub subjects: Vec<Subject>,
    #[serde(default)]
    pub tests: Vec<Test>,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl QuestionBank {
    /// Append another bank's records to this one.
    pub fn merge(&mut self, other: QuestionBank) {
        self.subjects.extend(other.subjects);
        self.tests.extend(other.tests);
        self.questions.extend(other.questions);
    }
}
