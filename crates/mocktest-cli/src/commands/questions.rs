//! The `mocktest questions` command.

use anyhow::Result;
use comfy_table::{Cell, Table};

use mocktest_core::model::Role;
use mocktest_core::traits::Repository;

use super::{authenticate, load_state, option_letter, Credentials, GlobalOpts};

pub async fn execute(
    global: &GlobalOpts,
    auth: Credentials,
    subject: String,
    search: Option<String>,
) -> Result<()> {
    let state = load_state(global).await?;
    authenticate(&state, &auth, Some(Role::Instructor))?;
    let subject = state.subject(&subject).await?;

    let mut questions = state.store.questions_for_subject(&subject.id).await?;
    if let Some(query) = &search {
        questions.retain(|q| q.matches(query));
    }

    if questions.is_empty() {
        println!("No questions found for {}.", subject.name);
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Question", "Options", "Answer"]);
    for q in &questions {
        let options = q
            .options
            .iter()
            .enumerate()
            .map(|(i, o)| format!("{}) {o}", option_letter(i)))
            .collect::<Vec<_>>()
            .join("\n");
        table.add_row(vec![
            Cell::new(&q.id),
            Cell::new(&q.text),
            Cell::new(options),
            Cell::new(option_letter(q.correct_answer)),
        ]);
    }

    println!("{table}");
    println!("{} question(s) in {}", questions.len(), subject.name);
    Ok(())
}
