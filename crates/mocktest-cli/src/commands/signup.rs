//! The `mocktest signup` command.

use anyhow::Result;

use mocktest_core::model::Role;

use super::{load_state, GlobalOpts};

pub async fn execute(
    global: &GlobalOpts,
    name: String,
    email: String,
    password: String,
    role: String,
) -> Result<()> {
    let role: Role = role.parse().map_err(anyhow::Error::msg)?;
    let mut state = load_state(global).await?;

    let user = state.users.signup(&name, &email, &password, role)?;
    state.save().await?;

    println!("Created {} account for {} (id {})", user.role, user.email, user.id);
    Ok(())
}
