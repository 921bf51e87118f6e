//! The `mocktest dashboard` command.

use anyhow::Result;
use comfy_table::{Cell, Table};

use mocktest_core::model::Role;
use mocktest_core::statistics::{learner_dashboard, Bucket};
use mocktest_core::traits::Repository;

use super::{authenticate, load_state, Credentials, GlobalOpts};

pub async fn execute(global: &GlobalOpts, auth: Credentials) -> Result<()> {
    let state = load_state(global).await?;
    let user = authenticate(&state, &auth, Some(Role::Learner))?;

    let subjects = state.store.subjects().await?;
    let tests = state.store.tests().await?;
    let attempts = state.store.attempts_for_user(&user.id).await?;
    let dashboard = learner_dashboard(&user.id, &tests, &attempts)?;

    println!("Welcome, {}", user.name);
    println!(
        "Completed attempts: {}  Overall average: {}",
        dashboard.completed_attempts,
        dashboard
            .overall_average
            .map(|a| format!("{a}%"))
            .unwrap_or_else(|| "-".into())
    );

    if !dashboard.subject_averages.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Subject", "Average", "Level"]);
        for (subject_id, average) in &dashboard.subject_averages {
            let name = subjects
                .iter()
                .find(|s| &s.id == subject_id)
                .map(|s| s.name.as_str())
                .unwrap_or(subject_id.as_str());
            table.add_row(vec![
                Cell::new(name),
                Cell::new(format!("{average}%")),
                Cell::new(Bucket::of(f64::from(*average)).label()),
            ]);
        }
        println!("\n{table}");
    }

    if dashboard.pending_tests.is_empty() {
        println!("\nYou have attempted every test.");
    } else {
        println!("\nNot attempted yet:");
        for test_id in &dashboard.pending_tests {
            if let Some(test) = tests.iter().find(|t| &t.id == test_id) {
                println!("  {} ({})", test.title, test.subject);
            }
        }
    }

    Ok(())
}
