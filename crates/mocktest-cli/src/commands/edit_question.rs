//! The `mocktest edit-question` command.

use anyhow::Result;

use mocktest_core::model::{Question, Role};
use mocktest_core::traits::Repository;

use super::{
    authenticate, load_state, option_letter, parse_option_letter, Credentials, GlobalOpts,
};

pub async fn execute(
    global: &GlobalOpts,
    auth: Credentials,
    subject: String,
    id: Option<String>,
    text: String,
    options: Vec<String>,
    correct: String,
) -> Result<()> {
    let correct_answer = parse_option_letter(&correct)?;

    let state = load_state(global).await?;
    authenticate(&state, &auth, Some(Role::Instructor))?;
    let subject = state.subject(&subject).await?;

    let question = Question {
        id: id.unwrap_or_default(),
        subject: subject.id.clone(),
        text,
        options,
        correct_answer,
    };
    let saved = state.store.upsert_question(question).await?;
    state.save().await?;

    println!("Saved question {} in {}", saved.id, subject.name);
    println!("{}", saved.text);
    for (i, option) in saved.options.iter().enumerate() {
        let marker = if i == saved.correct_answer { '*' } else { ' ' };
        println!(" {marker} {}) {option}", option_letter(i));
    }
    Ok(())
}
