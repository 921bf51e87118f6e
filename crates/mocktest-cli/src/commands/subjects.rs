//! The `mocktest subjects` command.

use anyhow::Result;
use comfy_table::{Cell, Table};

use mocktest_core::timer::format_remaining;
use mocktest_core::traits::Repository;

use super::{load_state, GlobalOpts};

pub async fn execute(global: &GlobalOpts) -> Result<()> {
    let state = load_state(global).await?;
    let subjects = state.store.subjects().await?;
    let tests = state.store.tests().await?;

    let mut table = Table::new();
    table.set_header(vec!["Subject", "Name", "Test", "Questions", "Time", "Description"]);

    for subject in &subjects {
        let test = tests.iter().find(|t| t.subject == subject.id);
        table.add_row(vec![
            Cell::new(&subject.id),
            Cell::new(&subject.name),
            Cell::new(test.map(|t| t.title.as_str()).unwrap_or("-")),
            Cell::new(test.map(|t| t.questions.len()).unwrap_or(0)),
            Cell::new(
                test.map(|t| format_remaining(t.time_limit_secs()))
                    .unwrap_or_else(|| "-".into()),
            ),
            Cell::new(&subject.description),
        ]);
    }

    println!("{table}");
    Ok(())
}
