//! The `mocktest validate` command.

use std::path::PathBuf;

use anyhow::Result;

use mocktest_core::parser::{load_question_bank, validate_question_bank, Severity};
use mocktest_store::seed::default_bank;

pub fn execute(bank_path: Option<PathBuf>) -> Result<()> {
    let bank = match &bank_path {
        Some(path) => load_question_bank(path)?,
        None => default_bank()?,
    };

    println!(
        "Question bank: {} subjects, {} tests, {} questions",
        bank.subjects.len(),
        bank.tests.len(),
        bank.questions.len()
    );

    let findings = validate_question_bank(&bank);
    let mut errors = 0;
    for f in &findings {
        let prefix = f
            .entity_id
            .as_ref()
            .map(|id| format!("  [{id}]"))
            .unwrap_or_else(|| "  ".to_string());
        let label = match f.severity {
            Severity::Warning => "WARNING",
            Severity::Error => {
                errors += 1;
                "ERROR"
            }
        };
        println!("{prefix} {label}: {}", f.message);
    }

    if findings.is_empty() {
        println!("Question bank valid.");
    } else {
        println!("\n{} issue(s) found.", findings.len());
    }
    anyhow::ensure!(errors == 0, "question bank has {errors} error(s)");

    Ok(())
}
