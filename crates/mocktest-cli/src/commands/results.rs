//! The `mocktest results` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};
use uuid::Uuid;

use mocktest_core::report::AttemptReport;
use mocktest_core::scoring::Outcome;
use mocktest_core::traits::Repository;

use super::{authenticate, load_state, option_letter, Credentials, GlobalOpts};

pub async fn execute(
    global: &GlobalOpts,
    auth: Credentials,
    attempt: Option<String>,
    format: String,
    output: Option<PathBuf>,
) -> Result<()> {
    let state = load_state(global).await?;
    let user = authenticate(&state, &auth, None)?;

    let Some(attempt) = attempt else {
        return list_attempts(state.store.as_ref(), &user.id).await;
    };
    let attempt_id: Uuid = attempt
        .parse()
        .with_context(|| format!("invalid attempt id: {attempt}"))?;
    let report = AttemptReport::load(state.store.as_ref(), &user.id, attempt_id).await?;

    match format.as_str() {
        "markdown" | "md" => {
            println!("{}", report.to_markdown());
        }
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => print_review(&report),
    }

    if let Some(path) = output {
        report.save_json(&path)?;
        eprintln!("Review saved to: {}", path.display());
    }

    Ok(())
}

async fn list_attempts(repo: &dyn Repository, user_id: &str) -> Result<()> {
    let attempts = repo.attempts_for_user(user_id).await?;
    if attempts.is_empty() {
        println!("No attempts yet. Run `mocktest take` to start one.");
        return Ok(());
    }
    let tests = repo.tests().await?;

    let mut table = Table::new();
    table.set_header(vec!["Attempt", "Test", "Started", "Status", "Score"]);
    for attempt in &attempts {
        let title = tests
            .iter()
            .find(|t| t.id == attempt.test_id)
            .map(|t| t.title.as_str())
            .unwrap_or(attempt.test_id.as_str());
        let (status, score) = match attempt.score() {
            Some(score) => ("completed", format!("{score}%")),
            None => ("in progress", "-".to_string()),
        };
        table.add_row(vec![
            Cell::new(attempt.id),
            Cell::new(title),
            Cell::new(attempt.started_at.format("%Y-%m-%d %H:%M")),
            Cell::new(status),
            Cell::new(score),
        ]);
    }

    println!("{table}");
    Ok(())
}

fn print_review(report: &AttemptReport) {
    println!("{}", report.test_title);
    println!("Score: {}% ({})", report.score, report.bucket.label());
    println!("{}", report.bucket.message());
    println!(
        "Correct: {}  Incorrect: {}  Skipped: {}  Time taken: {}",
        report.breakdown.correct,
        report.breakdown.incorrect,
        report.breakdown.skipped,
        report.duration_display()
    );

    for (i, q) in report.questions.iter().enumerate() {
        let mark = match q.outcome {
            Outcome::Correct => "correct",
            Outcome::Incorrect => "incorrect",
            Outcome::Skipped => "skipped",
        };
        println!("\n{}. {} [{mark}]", i + 1, q.text);
        for (j, option) in q.options.iter().enumerate() {
            let tag = match (q.selected == Some(j), q.correct_answer == j) {
                (true, true) => "  <- your answer, correct",
                (true, false) => "  <- your answer",
                (false, true) => "  <- correct answer",
                (false, false) => "",
            };
            println!("   {}) {option}{tag}", option_letter(j));
        }
    }
}
