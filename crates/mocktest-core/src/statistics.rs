//! Performance buckets and aggregate statistics across attempts.
//!
//! Everything here is a pure function of the attempts and reference data it
//! is handed; the repository decides what "all attempts" means.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, EntityKind, Result};
use crate::model::{Attempt, Role, Subject, Test, User};

/// One of four fixed performance tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Excellent,
    Good,
    Average,
    NeedsImprovement,
}

impl Bucket {
    /// All buckets, best first.
    pub const ALL: [Bucket; 4] = [
        Bucket::Excellent,
        Bucket::Good,
        Bucket::Average,
        Bucket::NeedsImprovement,
    ];

    /// Bucket a percentage. Lower bounds are inclusive: 90, 70, 50, 0.
    pub fn of(score: f64) -> Self {
        if score >= 90.0 {
            Bucket::Excellent
        } else if score >= 70.0 {
            Bucket::Good
        } else if score >= 50.0 {
            Bucket::Average
        } else {
            Bucket::NeedsImprovement
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Bucket::Excellent => "Excellent (90-100%)",
            Bucket::Good => "Good (70-89%)",
            Bucket::Average => "Average (50-69%)",
            Bucket::NeedsImprovement => "Needs Improvement (0-49%)",
        }
    }

    /// Feedback shown to a learner with a score in this bucket.
    pub fn message(&self) -> &'static str {
        match self {
            Bucket::Excellent => "Excellent! You've mastered this subject!",
            Bucket::Good => "Great job! You're doing well!",
            Bucket::Average => "Good effort! Keep practicing to improve.",
            Bucket::NeedsImprovement => "More practice needed. Don't give up!",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bucket::Excellent => write!(f, "excellent"),
            Bucket::Good => write!(f, "good"),
            Bucket::Average => write!(f, "average"),
            Bucket::NeedsImprovement => write!(f, "needs improvement"),
        }
    }
}

/// Count of scores per bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    pub excellent: usize,
    pub good: usize,
    pub average: usize,
    pub needs_improvement: usize,
}

impl Distribution {
    pub fn from_scores(scores: impl IntoIterator<Item = f64>) -> Self {
        let mut dist = Distribution::default();
        for s in scores {
            dist.add(Bucket::of(s));
        }
        dist
    }

    pub fn add(&mut self, bucket: Bucket) {
        match bucket {
            Bucket::Excellent => self.excellent += 1,
            Bucket::Good => self.good += 1,
            Bucket::Average => self.average += 1,
            Bucket::NeedsImprovement => self.needs_improvement += 1,
        }
    }

    pub fn get(&self, bucket: Bucket) -> usize {
        match bucket {
            Bucket::Excellent => self.excellent,
            Bucket::Good => self.good,
            Bucket::Average => self.average,
            Bucket::NeedsImprovement => self.needs_improvement,
        }
    }

    pub fn total(&self) -> usize {
        self.excellent + self.good + self.average + self.needs_improvement
    }
}

/// One learner's results as seen by an instructor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerPerformance {
    pub user_id: String,
    pub name: String,
    pub email: String,
    /// Completed attempts across all tests.
    pub tests_taken: usize,
    /// Mean of `subject_scores`; `None` when the learner has no results.
    pub average_score: Option<f64>,
    /// Score of the most recently completed attempt per subject.
    pub subject_scores: BTreeMap<String, u32>,
}

impl LearnerPerformance {
    pub fn subject_score(&self, subject_id: &str) -> Option<u32> {
        self.subject_scores.get(subject_id).copied()
    }
}

fn test_index(tests: &[Test]) -> HashMap<&str, &Test> {
    tests.iter().map(|t| (t.id.as_str(), t)).collect()
}

fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Build per-learner performance rows from every stored attempt.
///
/// Instructors are skipped; in-progress attempts are ignored. An attempt
/// pointing at a test that no longer exists is an error.
pub fn learner_performance(
    users: &[User],
    tests: &[Test],
    attempts: &[Attempt],
) -> Result<Vec<LearnerPerformance>> {
    let tests = test_index(tests);

    let mut rows = Vec::new();
    for user in users.iter().filter(|u| u.role == Role::Learner) {
        let mut latest: BTreeMap<String, &Attempt> = BTreeMap::new();
        let mut tests_taken = 0;

        for attempt in attempts
            .iter()
            .filter(|a| a.user_id == user.id && a.is_completed())
        {
            let test = tests
                .get(attempt.test_id.as_str())
                .ok_or_else(|| CoreError::not_found(EntityKind::Test, &attempt.test_id))?;
            tests_taken += 1;

            let slot = latest.entry(test.subject.clone()).or_insert(attempt);
            if attempt.ended_at() > slot.ended_at() {
                *slot = attempt;
            }
        }

        let subject_scores: BTreeMap<String, u32> = latest
            .into_iter()
            .filter_map(|(subject, a)| a.score().map(|s| (subject, s)))
            .collect();
        let average_score = mean(subject_scores.values().map(|&s| f64::from(s)));

        rows.push(LearnerPerformance {
            user_id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            tests_taken,
            average_score,
            subject_scores,
        });
    }
    Ok(rows)
}

/// Aggregate view of one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectStats {
    pub subject_id: String,
    pub name: String,
    /// Mean of the present subject scores; `None` when nobody has one.
    pub average_score: Option<f64>,
    /// Learners with a score for the subject, as a rounded percentage.
    pub participation_rate: u32,
    /// Learners with a score for the subject.
    pub participants: usize,
    pub distribution: Distribution,
}

/// Average and participation for one subject.
///
/// Learners without a score for the subject are left out of the average
/// and the distribution rather than counted as zero.
pub fn aggregate_by_subject(subject: &Subject, learners: &[LearnerPerformance]) -> SubjectStats {
    let scores: Vec<f64> = learners
        .iter()
        .filter_map(|l| l.subject_score(&subject.id))
        .map(f64::from)
        .collect();

    let participation_rate = if learners.is_empty() {
        0
    } else {
        (100.0 * scores.len() as f64 / learners.len() as f64).round() as u32
    };

    SubjectStats {
        subject_id: subject.id.clone(),
        name: subject.name.clone(),
        average_score: mean(scores.iter().copied()),
        participation_rate,
        participants: scores.len(),
        distribution: Distribution::from_scores(scores),
    }
}

/// Bucket learners by overall average, or by a single subject's score.
pub fn performance_distribution(
    learners: &[LearnerPerformance],
    subject_id: Option<&str>,
) -> Distribution {
    Distribution::from_scores(learners.iter().filter_map(|l| match subject_id {
        Some(subject) => l.subject_score(subject).map(f64::from),
        None => l.average_score,
    }))
}

/// Class-level headline numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassOverview {
    pub learners: usize,
    /// Learners with at least one completed attempt.
    pub active_learners: usize,
    pub tests_taken: usize,
    /// Mean of learner averages, rounded.
    pub class_average: Option<u32>,
}

pub fn class_overview(learners: &[LearnerPerformance]) -> ClassOverview {
    ClassOverview {
        learners: learners.len(),
        active_learners: learners.iter().filter(|l| l.tests_taken > 0).count(),
        tests_taken: learners.iter().map(|l| l.tests_taken).sum(),
        class_average: mean(learners.iter().filter_map(|l| l.average_score))
            .map(|m| m.round() as u32),
    }
}

/// Case-insensitive learner search over name and email.
pub fn search_learners<'a>(
    learners: &'a [LearnerPerformance],
    query: &str,
) -> Vec<&'a LearnerPerformance> {
    let query = query.to_lowercase();
    learners
        .iter()
        .filter(|l| {
            l.name.to_lowercase().contains(&query) || l.email.to_lowercase().contains(&query)
        })
        .collect()
}

/// A learner's own summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerDashboard {
    /// Rounded mean of the learner's completed attempts per subject.
    pub subject_averages: BTreeMap<String, u32>,
    /// Rounded mean of `subject_averages`.
    pub overall_average: Option<u32>,
    pub completed_attempts: usize,
    /// Tests the learner has not started yet.
    pub pending_tests: Vec<String>,
}

pub fn learner_dashboard(
    user_id: &str,
    tests: &[Test],
    attempts: &[Attempt],
) -> Result<LearnerDashboard> {
    let index = test_index(tests);
    let mine: Vec<&Attempt> = attempts.iter().filter(|a| a.user_id == user_id).collect();

    let mut per_subject: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for attempt in mine.iter().filter(|a| a.is_completed()) {
        let test = index
            .get(attempt.test_id.as_str())
            .ok_or_else(|| CoreError::not_found(EntityKind::Test, &attempt.test_id))?;
        if let Some(score) = attempt.score() {
            per_subject
                .entry(test.subject.clone())
                .or_default()
                .push(f64::from(score));
        }
    }

    let subject_averages: BTreeMap<String, u32> = per_subject
        .into_iter()
        .filter_map(|(subject, scores)| mean(scores).map(|m| (subject, m.round() as u32)))
        .collect();
    let overall_average =
        mean(subject_averages.values().map(|&s| f64::from(s))).map(|m| m.round() as u32);

    let pending_tests = tests
        .iter()
        .filter(|t| !mine.iter().any(|a| a.test_id == t.id))
        .map(|t| t.id.clone())
        .collect();

    Ok(LearnerDashboard {
        subject_averages,
        overall_average,
        completed_attempts: mine.iter().filter(|a| a.is_completed()).count(),
        pending_tests,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnswerMap, Question};
    use chrono::{Duration, TimeZone, Utc};

    fn learner(id: &str, scores: &[(&str, u32)]) -> LearnerPerformance {
        let subject_scores: BTreeMap<String, u32> =
            scores.iter().map(|(s, v)| (s.to_string(), *v)).collect();
        let average_score = mean(subject_scores.values().map(|&s| f64::from(s)));
        LearnerPerformance {
            user_id: id.into(),
            name: format!("Learner {id}"),
            email: format!("{id}@example.com"),
            tests_taken: subject_scores.len(),
            average_score,
            subject_scores,
        }
    }

    fn subject(id: &str) -> Subject {
        Subject {
            id: id.into(),
            name: id.to_uppercase(),
            description: String::new(),
            image_url: String::new(),
        }
    }

    fn test(id: &str, subject: &str) -> Test {
        Test {
            id: id.into(),
            subject: subject.into(),
            title: id.into(),
            description: String::new(),
            time_limit_minutes: 10,
            questions: vec![format!("{subject}-1")],
        }
    }

    fn user(id: &str, role: Role) -> User {
        User {
            id: id.into(),
            name: format!("User {id}"),
            email: format!("user{id}@example.com"),
            role,
        }
    }

    /// A completed attempt on a 100-question set with `score` answered
    /// correctly, so the stored percentage equals `score`.
    fn completed(test_id: &str, user_id: &str, minutes_after: i64, score: u32) -> Attempt {
        let questions: Vec<Question> = (0..100)
            .map(|i| Question {
                id: format!("q{i}"),
                subject: "any".into(),
                text: format!("Question {i}"),
                options: vec!["yes".into(), "no".into()],
                correct_answer: 0,
            })
            .collect();
        let answers: AnswerMap = questions
            .iter()
            .take(score as usize)
            .map(|q| (q.id.clone(), 0))
            .collect();

        let start = Utc.with_ymd_and_hms(2025, 4, 5, 10, 0, 0).unwrap();
        let mut a = Attempt::start(test_id, user_id, start);
        let stored = a
            .complete(start + Duration::minutes(minutes_after), answers, questions)
            .unwrap();
        assert_eq!(stored, score);
        a
    }

    #[test]
    fn bucket_boundaries() {
        assert_eq!(Bucket::of(100.0), Bucket::Excellent);
        assert_eq!(Bucket::of(90.0), Bucket::Excellent);
        assert_eq!(Bucket::of(89.0), Bucket::Good);
        assert_eq!(Bucket::of(70.0), Bucket::Good);
        assert_eq!(Bucket::of(69.0), Bucket::Average);
        assert_eq!(Bucket::of(50.0), Bucket::Average);
        assert_eq!(Bucket::of(49.0), Bucket::NeedsImprovement);
        assert_eq!(Bucket::of(0.0), Bucket::NeedsImprovement);
        assert_eq!(Bucket::of(89.99), Bucket::Good);
    }

    #[test]
    fn subject_aggregate_excludes_absent_scores() {
        let learners = vec![
            learner("a", &[("python", 90)]),
            learner("b", &[("python", 85)]),
            learner("c", &[]),
        ];
        let stats = aggregate_by_subject(&subject("python"), &learners);
        assert_eq!(stats.average_score, Some(87.5));
        assert_eq!(stats.participation_rate, 67);
        assert_eq!(stats.participants, 2);
        assert_eq!(stats.distribution.excellent, 1);
        assert_eq!(stats.distribution.good, 1);
    }

    #[test]
    fn subject_aggregate_keeps_zero_scores() {
        let learners = vec![learner("a", &[("dbms", 0)]), learner("b", &[("dbms", 100)])];
        let stats = aggregate_by_subject(&subject("dbms"), &learners);
        assert_eq!(stats.average_score, Some(50.0));
        assert_eq!(stats.participation_rate, 100);
    }

    #[test]
    fn subject_aggregate_with_no_learners() {
        let stats = aggregate_by_subject(&subject("python"), &[]);
        assert_eq!(stats.average_score, None);
        assert_eq!(stats.participation_rate, 0);
    }

    #[test]
    fn distribution_overall_and_by_subject() {
        let learners = vec![
            learner("a", &[("python", 95), ("dbms", 85)]),
            learner("b", &[("python", 40)]),
            learner("c", &[]),
        ];
        let overall = performance_distribution(&learners, None);
        assert_eq!(overall.excellent, 1);
        assert_eq!(overall.needs_improvement, 1);
        assert_eq!(overall.total(), 2);

        let dbms = performance_distribution(&learners, Some("dbms"));
        assert_eq!(dbms.good, 1);
        assert_eq!(dbms.total(), 1);
    }

    #[test]
    fn learner_rows_use_latest_attempt_per_subject() {
        let users = vec![
            user("1", Role::Learner),
            user("2", Role::Instructor),
            user("3", Role::Learner),
        ];
        let tests = vec![test("python-test", "python"), test("dbms-test", "dbms")];
        let attempts = vec![
            completed("python-test", "1", 30, 80),
            completed("python-test", "1", 5, 40),
            completed("dbms-test", "1", 9, 90),
            Attempt::start("dbms-test", "3", Utc::now()),
        ];

        let rows = learner_performance(&users, &tests, &attempts).unwrap();
        assert_eq!(rows.len(), 2);
        let first = &rows[0];
        assert_eq!(first.tests_taken, 3);
        assert_eq!(first.subject_score("python"), Some(80));
        assert_eq!(first.average_score, Some(85.0));

        let idle = &rows[1];
        assert_eq!(idle.tests_taken, 0);
        assert_eq!(idle.average_score, None);

        let overview = class_overview(&rows);
        assert_eq!(overview.learners, 2);
        assert_eq!(overview.active_learners, 1);
        assert_eq!(overview.tests_taken, 3);
        assert_eq!(overview.class_average, Some(85));
    }

    #[test]
    fn learner_rows_fail_on_missing_test() {
        let users = vec![user("1", Role::Learner)];
        let attempts = vec![completed("gone-test", "1", 5, 50)];
        let err = learner_performance(&users, &[], &attempts).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn search_by_name_or_email() {
        let mut alice = learner("4", &[]);
        alice.name = "Alice Johnson".into();
        let mut john = learner("3", &[]);
        john.email = "john@example.com".into();
        let rows = vec![alice, john];
        assert_eq!(search_learners(&rows, "ALICE").len(), 1);
        assert_eq!(search_learners(&rows, "john@").len(), 1);
        assert_eq!(search_learners(&rows, "example").len(), 2);
    }

    #[test]
    fn dashboard_averages_and_pending_tests() {
        let tests = vec![
            test("python-test", "python"),
            test("dbms-test", "dbms"),
            test("datastructure-test", "datastructure"),
        ];
        let attempts = vec![
            completed("python-test", "1", 5, 90),
            completed("python-test", "1", 6, 71),
            completed("dbms-test", "1", 5, 60),
            completed("dbms-test", "2", 5, 10),
        ];
        let dash = learner_dashboard("1", &tests, &attempts).unwrap();
        assert_eq!(dash.subject_averages.get("python"), Some(&81));
        assert_eq!(dash.subject_averages.get("dbms"), Some(&60));
        assert_eq!(dash.overall_average, Some(71));
        assert_eq!(dash.completed_attempts, 3);
        assert_eq!(dash.pending_tests, vec!["datastructure-test".to_string()]);
    }
}
