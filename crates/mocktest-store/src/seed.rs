//! Bundled question bank and demo accounts.

use std::path::Path;

use anyhow::Result;

use mocktest_core::model::{QuestionBank, Role, User};
use mocktest_core::parser::parse_question_bank_str;

use crate::auth::Account;

const BUNDLED_BANK: &str = include_str!("../seed/question-bank.toml");

/// Password shared by every seeded account.
pub const DEMO_PASSWORD: &str = "password";

/// The bundled bank: Python, Data Structure and Database Management, ten
/// questions and one 10-minute test each.
pub fn default_bank() -> Result<QuestionBank> {
    parse_question_bank_str(BUNDLED_BANK, Path::new("<bundled question bank>"))
}

/// Raw TOML of the bundled bank, for `mocktest init`.
pub fn bundled_bank_toml() -> &'static str {
    BUNDLED_BANK
}

/// Demo learner and instructor plus two more learners.
pub fn default_accounts() -> Vec<Account> {
    [
        ("1", "Student Demo", "student@example.com", Role::Learner),
        ("2", "Faculty Demo", "faculty@example.com", Role::Instructor),
        ("3", "John Smith", "john@example.com", Role::Learner),
        ("4", "Alice Johnson", "alice@example.com", Role::Learner),
    ]
    .into_iter()
    .map(|(id, name, email, role)| Account {
        user: User {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            role,
        },
        password: DEMO_PASSWORD.into(),
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mocktest_core::parser::{has_errors, validate_question_bank};

    #[test]
    fn bundled_bank_is_valid() {
        let bank = default_bank().unwrap();
        assert_eq!(bank.subjects.len(), 3);
        assert_eq!(bank.tests.len(), 3);
        assert_eq!(bank.questions.len(), 30);

        let warnings = validate_question_bank(&bank);
        assert!(warnings.is_empty(), "unexpected issues: {warnings:?}");
        assert!(!has_errors(&warnings));
    }

    #[test]
    fn each_test_has_its_subjects_questions_in_order() {
        let bank = default_bank().unwrap();
        for test in &bank.tests {
            assert_eq!(test.time_limit_minutes, 10);
            assert_eq!(test.questions.len(), 10);
            assert_eq!(test.questions[0], format!("{}-1", test.subject));
            assert_eq!(test.questions[9], format!("{}-10", test.subject));
        }
    }

    #[test]
    fn seeded_answer_keys() {
        let bank = default_bank().unwrap();
        let key = |id: &str| {
            bank.questions
                .iter()
                .find(|q| q.id == id)
                .map(|q| q.correct_answer)
                .unwrap()
        };
        assert_eq!(key("python-1"), 1);
        assert_eq!(key("datastructure-4"), 3);
        assert_eq!(key("dbms-10"), 1);
    }
}
