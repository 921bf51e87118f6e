//! JSON snapshot of everything that changes between runs.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mocktest_core::model::{Attempt, Question};

use crate::auth::Account;

/// Current snapshot layout. Version 2 keeps the scored question set on
/// completed attempts.
pub const SNAPSHOT_VERSION: u32 = 2;

#[derive(Deserialize)]
struct VersionHeader {
    version: u32,
}

/// Accounts, questions and attempts as saved on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    #[serde(default)]
    pub users: Vec<Account>,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub attempts: Vec<Attempt>,
}

impl Snapshot {
    pub fn new(users: Vec<Account>, questions: Vec<Question>, attempts: Vec<Attempt>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            users,
            questions,
            attempts,
        }
    }

    /// Write the snapshot as pretty JSON, creating parent directories.
    ///
    /// The file is written next to its destination and renamed into place.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize state")?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .with_context(|| format!("failed to write state to {}", tmp.display()))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("failed to move state into {}", path.display()))?;
        tracing::debug!(path = %path.display(), attempts = self.attempts.len(), "state saved");
        Ok(())
    }

    /// Read a snapshot. A missing file is `None`.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read state from {}", path.display()))?;
        let header: VersionHeader = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse state file {}", path.display()))?;
        anyhow::ensure!(
            header.version == SNAPSHOT_VERSION,
            "unsupported state file version {} in {}",
            header.version,
            path.display()
        );
        let snapshot = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse state file {}", path.display()))?;
        Ok(Some(snapshot))
    }
}
