//! Answer classification and percentage scoring.
//!
//! Submission and review both go through [`classify`], so the score stored
//! on an attempt and the question-by-question breakdown shown later can
//! never disagree.

use serde::{Deserialize, Serialize};

use crate::model::{AnswerMap, Question};

/// How a single question was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Correct,
    Incorrect,
    Skipped,
}

/// Classify one question against the submitted answers.
///
/// `Skipped` when the answer map has no entry for the question, `Correct`
/// when the entry equals the answer key, `Incorrect` otherwise.
pub fn classify(question: &Question, answers: &AnswerMap) -> Outcome {
    match answers.get(&question.id) {
        None => Outcome::Skipped,
        Some(&selected) if selected == question.correct_answer => Outcome::Correct,
        Some(_) => Outcome::Incorrect,
    }
}

/// Correct / incorrect / skipped counts for one test.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakdown {
    pub correct: usize,
    pub incorrect: usize,
    pub skipped: usize,
    /// Number of questions on the test.
    pub total: usize,
}

impl Breakdown {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Correct => self.correct += 1,
            Outcome::Incorrect => self.incorrect += 1,
            Outcome::Skipped => self.skipped += 1,
        }
    }

    /// `round(100 × correct / total)`; 0 for a test without questions.
    pub fn percentage(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        (100.0 * self.correct as f64 / self.total as f64).round() as u32
    }
}

/// A reviewed question: what was picked, what was right, and the outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionReview {
    pub question_id: String,
    pub text: String,
    pub options: Vec<String>,
    pub selected: Option<usize>,
    pub correct_answer: usize,
    pub outcome: Outcome,
}

/// Classify every question in order.
///
/// `questions` is a test's question set already resolved and in test order,
/// as returned by `Repository::questions`, which fails on unknown ids. An
/// attempt's [`scored_questions`](crate::model::Attempt::scored_questions)
/// is the set it was scored against.
pub fn review(questions: &[Question], answers: &AnswerMap) -> Vec<QuestionReview> {
    questions
        .iter()
        .map(|q| QuestionReview {
            question_id: q.id.clone(),
            text: q.text.clone(),
            options: q.options.clone(),
            selected: answers.get(&q.id).copied(),
            correct_answer: q.correct_answer,
            outcome: classify(q, answers),
        })
        .collect()
}

/// Count outcomes across a resolved question set.
pub fn breakdown(questions: &[Question], answers: &AnswerMap) -> Breakdown {
    let mut counts = Breakdown {
        total: questions.len(),
        ..Breakdown::default()
    };
    for q in questions {
        counts.record(classify(q, answers));
    }
    counts
}

/// Percentage score for a set of answers against a resolved question set.
pub fn score(questions: &[Question], answers: &AnswerMap) -> u32 {
    if questions.is_empty() {
        tracing::warn!("scoring an empty question set as 0%");
    }
    breakdown(questions, answers).percentage()
}
