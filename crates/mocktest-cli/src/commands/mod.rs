//! Subcommand implementations and the helpers they share.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use mocktest_core::model::{Role, User};
use mocktest_store::{load_config_from, AppState};

pub mod dashboard;
pub mod edit_question;
pub mod init;
pub mod performance;
pub mod questions;
pub mod results;
pub mod signup;
pub mod subjects;
pub mod take;
pub mod validate;

/// Options accepted by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalOpts {
    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// State file path (overrides the config)
    #[arg(long, global = true)]
    pub state: Option<PathBuf>,
}

/// Login for commands that act as a user.
#[derive(Args, Debug, Clone)]
pub struct Credentials {
    #[arg(long)]
    pub email: String,

    #[arg(long)]
    pub password: String,
}

/// Load config, question bank and saved state.
pub async fn load_state(global: &GlobalOpts) -> Result<AppState> {
    let mut config = load_config_from(global.config.as_deref())?;
    if let Some(state) = &global.state {
        config.state_file = state.clone();
    }
    AppState::load(config).await
}

/// Log in, optionally requiring a role.
pub fn authenticate(state: &AppState, auth: &Credentials, role: Option<Role>) -> Result<User> {
    let user = state.login(&auth.email, &auth.password)?;
    if let Some(role) = role {
        user.require(role)
            .with_context(|| format!("this command is for {role}s"))?;
    }
    Ok(user)
}

/// `A`, `B`, ... for option indices.
pub fn option_letter(index: usize) -> char {
    u8::try_from(index)
        .ok()
        .filter(|i| *i < 26)
        .map(|i| char::from(b'A' + i))
        .unwrap_or('?')
}

/// Parse an option letter (case-insensitive) into an index.
pub fn parse_option_letter(s: &str) -> Result<usize> {
    let s = s.trim();
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => {
            Ok(usize::from(c.to_ascii_uppercase() as u8 - b'A'))
        }
        _ => anyhow::bail!("invalid option '{s}': expected a letter such as A or B"),
    }
}

/// Percentage with one decimal, or `-` when absent.
pub fn fmt_percent(value: Option<f64>) -> String {
    value
        .map(|v| format!("{v:.1}%"))
        .unwrap_or_else(|| "-".to_string())
}
