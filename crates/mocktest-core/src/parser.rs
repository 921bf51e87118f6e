//! TOML question bank parser.
//!
//! Loads subjects, tests and questions from TOML files and directories, and
//! validates the result against the bank invariants.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::CoreError;
use crate::model::{Question, QuestionBank, Subject, Test};

/// Intermediate TOML structure for parsing question bank files.
#[derive(Debug, Deserialize)]
struct TomlBankFile {
    #[serde(default)]
    subjects: Vec<TomlSubject>,
    #[serde(default)]
    tests: Vec<TomlTest>,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlSubject {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    image_url: String,
}

#[derive(Debug, Deserialize)]
struct TomlTest {
    id: String,
    subject: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default = "default_time_limit")]
    time_limit_minutes: u32,
    /// Explicit question ids; defaults to every question of the subject.
    #[serde(default)]
    questions: Option<Vec<String>>,
}

fn default_time_limit() -> u32 {
    10
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    id: String,
    subject: String,
    text: String,
    options: Vec<String>,
    correct_answer: usize,
}

/// Parse a single TOML file into a `QuestionBank`.
pub fn parse_question_bank(path: &Path) -> Result<QuestionBank> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read question bank: {}", path.display()))?;

    parse_question_bank_str(&content, path)
}

/// Parse a TOML string into a `QuestionBank`.
pub fn parse_question_bank_str(content: &str, source_path: &Path) -> Result<QuestionBank> {
    let parsed: TomlBankFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let questions: Vec<Question> = parsed
        .questions
        .into_iter()
        .map(|q| Question {
            id: q.id,
            subject: q.subject,
            text: q.text,
            options: q.options,
            correct_answer: q.correct_answer,
        })
        .collect();

    let tests = parsed
        .tests
        .into_iter()
        .map(|t| {
            let question_ids = t.questions.unwrap_or_else(|| {
                questions
                    .iter()
                    .filter(|q| q.subject == t.subject)
                    .map(|q| q.id.clone())
                    .collect()
            });
            Test {
                id: t.id,
                subject: t.subject,
                title: t.title,
                description: t.description,
                time_limit_minutes: t.time_limit_minutes,
                questions: question_ids,
            }
        })
        .collect();

    let subjects = parsed
        .subjects
        .into_iter()
        .map(|s| Subject {
            id: s.id,
            name: s.name,
            description: s.description,
            image_url: s.image_url,
        })
        .collect();

    Ok(QuestionBank {
        subjects,
        tests,
        questions,
    })
}

/// Recursively load all `.toml` question bank files from a directory.
pub fn load_bank_directory(dir: &Path) -> Result<Vec<QuestionBank>> {
    let mut banks = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.path());

    for entry in entries {
        let path = entry.path();

        if path.is_dir() {
            banks.extend(load_bank_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_question_bank(&path) {
                Ok(bank) => banks.push(bank),
                Err(e) => {
                    tracing::warn!("skipping {}: {}", path.display(), e);
                }
            }
        }
    }

    Ok(banks)
}

/// Load a bank from a file, or merge every bank found under a directory.
pub fn load_question_bank(path: &Path) -> Result<QuestionBank> {
    if path.is_dir() {
        let mut merged = QuestionBank::default();
        for bank in load_bank_directory(path)? {
            merged.merge(bank);
        }
        Ok(merged)
    } else {
        parse_question_bank(path)
    }
}

/// How serious a validation finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The bank can be used but something looks off.
    Warning,
    /// The bank breaks an invariant and must not be loaded.
    Error,
}

/// A finding from question bank validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The subject, test or question id (if applicable).
    pub entity_id: Option<String>,
    /// Warning message.
    pub message: String,
    pub severity: Severity,
}

impl ValidationWarning {
    fn error(id: &str, message: impl Into<String>) -> Self {
        Self {
            entity_id: Some(id.to_string()),
            message: message.into(),
            severity: Severity::Error,
        }
    }

    fn warning(id: &str, message: impl Into<String>) -> Self {
        Self {
            entity_id: Some(id.to_string()),
            message: message.into(),
            severity: Severity::Warning,
        }
    }
}

/// Whether any finding is an error.
pub fn has_errors(warnings: &[ValidationWarning]) -> bool {
    warnings.iter().any(|w| w.severity == Severity::Error)
}

fn duplicates<'a>(kind: &str, ids: impl Iterator<Item = &'a str>) -> Vec<ValidationWarning> {
    let mut seen = HashSet::new();
    ids.filter(|id| !seen.insert(*id))
        .map(|id| ValidationWarning::error(id, format!("duplicate {kind} ID: {id}")))
        .collect()
}

/// Validate a question bank for broken invariants and common issues.
pub fn validate_question_bank(bank: &QuestionBank) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    warnings.extend(duplicates("subject", bank.subjects.iter().map(|s| s.id.as_str())));
    warnings.extend(duplicates("test", bank.tests.iter().map(|t| t.id.as_str())));
    warnings.extend(duplicates("question", bank.questions.iter().map(|q| q.id.as_str())));

    let subjects: HashSet<&str> = bank.subjects.iter().map(|s| s.id.as_str()).collect();
    let questions: HashMap<&str, &Question> =
        bank.questions.iter().map(|q| (q.id.as_str(), q)).collect();

    for question in &bank.questions {
        if let Err(e) = question.validate() {
            warnings.push(ValidationWarning::error(&question.id, e.to_string()));
        }
        if !subjects.contains(question.subject.as_str()) {
            warnings.push(ValidationWarning::error(
                &question.id,
                format!("unknown subject: {}", question.subject),
            ));
        }
    }

    for test in &bank.tests {
        if !subjects.contains(test.subject.as_str()) {
            warnings.push(ValidationWarning::error(
                &test.id,
                format!("unknown subject: {}", test.subject),
            ));
        }
        if test.time_limit_minutes == 0 {
            warnings.push(ValidationWarning::error(&test.id, "time limit must be positive"));
        }
        if test.is_degenerate() {
            warnings.push(ValidationWarning::error(
                &test.id,
                CoreError::DegenerateTest(test.id.clone()).to_string(),
            ));
        }
        for id in &test.questions {
            match questions.get(id.as_str()) {
                None => warnings.push(ValidationWarning::error(
                    &test.id,
                    format!("references unknown question: {id}"),
                )),
                Some(q) if q.subject != test.subject => {
                    warnings.push(ValidationWarning::error(
                        &test.id,
                        format!("question {id} belongs to subject {}", q.subject),
                    ))
                }
                Some(_) => {}
            }
        }
    }

    for subject in &bank.subjects {
        let test_count = bank
            .tests
            .iter()
            .filter(|t| t.subject == subject.id)
            .count();
        if test_count != 1 {
            warnings.push(ValidationWarning::warning(
                &subject.id,
                format!("expected exactly one test, found {test_count}"),
            ));
        }
        if !bank.questions.iter().any(|q| q.subject == subject.id) {
            warnings.push(ValidationWarning::warning(&subject.id, "subject has no questions"));
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const VALID_TOML: &str = r#"
[[subjects]]
id = "python"
name = "Python"
description = "Test your Python programming language skills"

[[tests]]
id = "python-test"
subject = "python"
title = "Python Assessment"
time_limit_minutes = 10

[[questions]]
id = "python-1"
subject = "python"
text = "What is the output of print(2**3)?"
options = ["6", "8", "9", "Error"]
correct_answer = 1

[[questions]]
id = "python-2"
subject = "python"
text = "Which of the following is not a Python data type?"
options = ["List", "Dictionary", "Array", "Tuple"]
correct_answer = 2
"#;

    #[test]
    fn parse_valid_toml() {
        let bank = parse_question_bank_str(VALID_TOML, &PathBuf::from("bank.toml")).unwrap();
        assert_eq!(bank.subjects.len(), 1);
        assert_eq!(bank.questions.len(), 2);
        assert_eq!(bank.tests[0].questions, vec!["python-1", "python-2"]);
        assert_eq!(bank.tests[0].time_limit_secs(), 600);
        assert!(validate_question_bank(&bank).is_empty());
    }

    #[test]
    fn explicit_question_list_is_kept() {
        let toml = VALID_TOML.replace(
            "time_limit_minutes = 10",
            "time_limit_minutes = 5\nquestions = [\"python-2\"]",
        );
        let bank = parse_question_bank_str(&toml, &PathBuf::from("bank.toml")).unwrap();
        assert_eq!(bank.tests[0].questions, vec!["python-2"]);
        assert_eq!(bank.tests[0].time_limit_minutes, 5);
    }

    #[test]
    fn validate_bad_answer_key() {
        let toml = VALID_TOML.replace("correct_answer = 2", "correct_answer = 7");
        let bank = parse_question_bank_str(&toml, &PathBuf::from("bank.toml")).unwrap();
        let warnings = validate_question_bank(&bank);
        assert!(has_errors(&warnings));
        assert!(warnings.iter().any(|w| w.message.contains("out of range")));
    }

    #[test]
    fn validate_degenerate_test() {
        let toml = r#"
[[subjects]]
id = "empty"
name = "Empty"

[[tests]]
id = "empty-test"
subject = "empty"
title = "Nothing here"
"#;
        let bank = parse_question_bank_str(toml, &PathBuf::from("bank.toml")).unwrap();
        let warnings = validate_question_bank(&bank);
        assert!(warnings
            .iter()
            .any(|w| w.severity == Severity::Error && w.message.contains("no questions")));
    }

    #[test]
    fn validate_references() {
        let toml = VALID_TOML.replace(
            "time_limit_minutes = 10",
            "time_limit_minutes = 10\nquestions = [\"python-1\", \"python-99\"]",
        ) + r#"
[[questions]]
id = "python-1"
subject = "dbms"
text = "Duplicate"
options = ["a", "b"]
correct_answer = 0
"#;
        let bank = parse_question_bank_str(&toml, &PathBuf::from("bank.toml")).unwrap();
        let warnings = validate_question_bank(&bank);
        assert!(warnings.iter().any(|w| w.message.contains("duplicate question")));
        assert!(warnings.iter().any(|w| w.message.contains("python-99")));
        assert!(warnings.iter().any(|w| w.message.contains("unknown subject: dbms")));
    }

    #[test]
    fn subject_without_test_is_a_warning() {
        let toml = VALID_TOML.to_string()
            + r#"
[[subjects]]
id = "dbms"
name = "Database Management"
"#;
        let bank = parse_question_bank_str(&toml, &PathBuf::from("bank.toml")).unwrap();
        let warnings = validate_question_bank(&bank);
        assert!(!has_errors(&warnings));
        assert!(warnings
            .iter()
            .any(|w| w.entity_id.as_deref() == Some("dbms") && w.message.contains("found 0")));
    }

    #[test]
    fn parse_malformed_toml() {
        let bad = "this is not [valid toml }{";
        let result = parse_question_bank_str(bad, &PathBuf::from("bad.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn load_directory_merges() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("python.toml"), VALID_TOML).unwrap();
        std::fs::write(dir.path().join("broken.toml"), "not = [valid").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let banks = load_bank_directory(dir.path()).unwrap();
        assert_eq!(banks.len(), 1);

        let merged = load_question_bank(dir.path()).unwrap();
        assert_eq!(merged.questions.len(), 2);
    }
}
