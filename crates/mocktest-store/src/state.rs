//! Application state assembled from config, question bank and snapshot.

use std::sync::Arc;

use anyhow::{Context, Result};

use mocktest_core::model::{Subject, User};
use mocktest_core::parser::load_question_bank;
use mocktest_core::statistics::{learner_performance, LearnerPerformance};
use mocktest_core::traits::Repository;

use crate::auth::UserDirectory;
use crate::config::MocktestConfig;
use crate::memory::InMemoryStore;
use crate::seed::{default_accounts, default_bank};
use crate::snapshot::Snapshot;

/// Everything a command needs: the repository, the accounts and the
/// config they were loaded with.
pub struct AppState {
    pub config: MocktestConfig,
    pub store: Arc<InMemoryStore>,
    pub users: UserDirectory,
}

impl AppState {
    /// Load the configured (or bundled) bank and apply the saved snapshot.
    pub async fn load(config: MocktestConfig) -> Result<Self> {
        let bank = match &config.question_bank {
            Some(path) => load_question_bank(path)
                .with_context(|| format!("failed to load question bank {}", path.display()))?,
            None => default_bank()?,
        };
        let store = InMemoryStore::from_bank(bank)?;

        let mut users = UserDirectory::new(default_accounts());
        if let Some(snapshot) = Snapshot::load(&config.state_file)? {
            tracing::debug!(path = %config.state_file.display(), "restoring state");
            if !snapshot.users.is_empty() {
                users = UserDirectory::new(snapshot.users);
            }
            store
                .restore(snapshot.questions, snapshot.attempts)
                .await
                .context("failed to restore saved state")?;
        }

        Ok(Self {
            config,
            store: Arc::new(store),
            users,
        })
    }

    /// The store behind the repository trait.
    pub fn repo(&self) -> Arc<dyn Repository> {
        self.store.clone()
    }

    /// Persist accounts, questions and attempts unless persistence is off.
    pub async fn save(&self) -> Result<()> {
        if !self.config.persist {
            return Ok(());
        }
        let (questions, attempts) = self.store.export().await;
        Snapshot::new(self.users.accounts().to_vec(), questions, attempts)
            .save(&self.config.state_file)
    }

    pub fn login(&self, email: &str, password: &str) -> Result<User> {
        Ok(self.users.login(email, password)?)
    }

    /// Resolve a subject by id or case-insensitive name.
    pub async fn subject(&self, key: &str) -> Result<Subject> {
        let subjects = self.store.subjects().await?;
        subjects
            .into_iter()
            .find(|s| s.id == key || s.name.eq_ignore_ascii_case(key))
            .with_context(|| format!("unknown subject: {key}"))
    }

    /// Per-learner performance over every stored attempt.
    pub async fn performance(&self) -> Result<Vec<LearnerPerformance>> {
        let tests = self.store.tests().await?;
        let attempts = self.store.attempts().await?;
        Ok(learner_performance(&self.users.users(), &tests, &attempts)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mocktest_core::model::Role;

    fn config_in(dir: &std::path::Path) -> MocktestConfig {
        MocktestConfig {
            state_file: dir.join("state.json"),
            ..MocktestConfig::default()
        }
    }

    #[tokio::test]
    async fn state_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = AppState::load(config_in(dir.path())).await.unwrap();
        let user = state
            .users
            .signup("Dana Lee", "dana@example.com", "secret", Role::Learner)
            .unwrap();
        let attempt = state.store.create_attempt("python-test", &user.id).await.unwrap();
        state.save().await.unwrap();

        let reloaded = AppState::load(config_in(dir.path())).await.unwrap();
        assert_eq!(reloaded.login("dana@example.com", "secret").unwrap(), user);
        assert_eq!(reloaded.store.attempt(attempt.id).await.unwrap(), attempt);
    }

    #[tokio::test]
    async fn persist_off_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = MocktestConfig {
            persist: false,
            ..config_in(dir.path())
        };
        let state = AppState::load(config).await.unwrap();
        state.save().await.unwrap();
        assert!(!dir.path().join("state.json").exists());
    }

    #[tokio::test]
    async fn subject_lookup_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::load(config_in(dir.path())).await.unwrap();
        assert_eq!(state.subject("Data Structure").await.unwrap().id, "datastructure");
        assert_eq!(state.subject("dbms").await.unwrap().id, "dbms");
        assert!(state.subject("rust").await.is_err());
    }

    #[tokio::test]
    async fn fresh_state_has_empty_performance() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::load(config_in(dir.path())).await.unwrap();
        let rows = state.performance().await.unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.tests_taken == 0 && r.average_score.is_none()));
    }
}
