//! Attempt result reports with JSON persistence and markdown rendering.

use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, EntityKind, Result};
use crate::model::{Attempt, Test};
use crate::scoring::{breakdown, review, Breakdown, Outcome, QuestionReview};
use crate::statistics::Bucket;
use crate::traits::Repository;

/// Everything the results view shows for one completed attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptReport {
    pub attempt_id: Uuid,
    pub test_id: String,
    pub test_title: String,
    pub subject: String,
    pub user_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub score: u32,
    pub bucket: Bucket,
    pub breakdown: Breakdown,
    /// Per-question review in test order.
    pub questions: Vec<QuestionReview>,
}

impl AttemptReport {
    /// Re-derive the review of a completed attempt.
    ///
    /// Classification runs against the question set captured when the
    /// attempt was scored, so later edits to the bank leave the review and
    /// the stored score in agreement.
    pub fn build(attempt: &Attempt, test: &Test) -> Result<Self> {
        let (Some(ended_at), Some(score), Some(questions)) = (
            attempt.ended_at(),
            attempt.score(),
            attempt.scored_questions(),
        ) else {
            return Err(CoreError::AttemptInProgress(attempt.id));
        };

        Ok(Self {
            attempt_id: attempt.id,
            test_id: test.id.clone(),
            test_title: test.title.clone(),
            subject: test.subject.clone(),
            user_id: attempt.user_id.clone(),
            started_at: attempt.started_at,
            ended_at,
            score,
            bucket: Bucket::of(f64::from(score)),
            breakdown: breakdown(questions, attempt.answers()),
            questions: review(questions, attempt.answers()),
        })
    }

    /// Load and build the report for one of `user_id`'s attempts.
    ///
    /// An attempt owned by someone else is reported as not found.
    pub async fn load(repo: &dyn Repository, user_id: &str, attempt_id: Uuid) -> Result<Self> {
        let attempt = repo.attempt(attempt_id).await?;
        if attempt.user_id != user_id {
            return Err(CoreError::not_found(EntityKind::Attempt, attempt_id.to_string()));
        }
        let test = repo.test(&attempt.test_id).await?;
        Self::build(&attempt, &test)
    }

    /// Time taken, formatted as `{m}m {s}s`.
    pub fn duration_display(&self) -> String {
        let secs = (self.ended_at - self.started_at).num_seconds().max(0);
        format!("{}m {}s", secs / 60, secs % 60)
    }

    /// Write the review as pretty JSON, creating parent directories.
    pub fn save_json(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("cannot create {}", dir.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("cannot write {}", path.display()))
    }

    /// Read a review written by [`save_json`](Self::save_json).
    pub fn load_json(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("{} is not an attempt report", path.display()))
    }

    /// Format the report as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!("## {}\n\n", self.test_title));
        md.push_str(&format!(
            "**Score:** {}% ({})\n\n{}\n\n",
            self.score,
            self.bucket,
            self.bucket.message()
        ));
        md.push_str(&format!(
            "**Summary:** {} correct, {} incorrect, {} skipped of {} (time taken {})\n\n",
            self.breakdown.correct,
            self.breakdown.incorrect,
            self.breakdown.skipped,
            self.breakdown.total,
            self.duration_display()
        ));

        md.push_str("| # | Question | Your answer | Correct answer | Result |\n");
        md.push_str("|---|----------|-------------|----------------|--------|\n");
        for (i, q) in self.questions.iter().enumerate() {
            let option = |idx: usize| q.options.get(idx).cloned().unwrap_or_default();
            let selected = q.selected.map(option).unwrap_or_else(|| "-".into());
            let result = match q.outcome {
                Outcome::Correct => "correct",
                Outcome::Incorrect => "incorrect",
                Outcome::Skipped => "skipped",
            };
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                i + 1,
                q.text,
                selected,
                option(q.correct_answer),
                result
            ));
        }

        md
    }
}
