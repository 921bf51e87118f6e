//! mocktest configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Top-level mocktest configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MocktestConfig {
    /// Question bank file or directory. The bundled bank is used when unset.
    #[serde(default)]
    pub question_bank: Option<PathBuf>,
    /// Where users, questions and attempts are saved between runs.
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
    /// Write the state file after commands that change something.
    #[serde(default = "default_persist")]
    pub persist: bool,
}

fn default_state_file() -> PathBuf {
    PathBuf::from(".mocktest/state.json")
}
fn default_persist() -> bool {
    true
}

impl Default for MocktestConfig {
    fn default() -> Self {
        Self {
            question_bank: None,
            state_file: default_state_file(),
            persist: default_persist(),
        }
    }
}

/// Expand `${VAR}` references from the environment in one pass.
///
/// Unset variables expand to nothing. Expanded values are not rescanned, and
/// an unterminated `${` is kept as written.
fn resolve_env_vars(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(open) = rest.find("${") {
        let Some(len) = rest[open + 2..].find('}') else {
            break;
        };
        out.push_str(&rest[..open]);
        let name = &rest[open + 2..open + 2 + len];
        out.push_str(&std::env::var(name).unwrap_or_default());
        rest = &rest[open + 3 + len..];
    }
    out.push_str(rest);
    out
}

fn resolve_path(path: &Path) -> PathBuf {
    PathBuf::from(resolve_env_vars(&path.to_string_lossy()))
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `mocktest.toml` in the current directory
/// 2. `~/.config/mocktest/config.toml`
///
/// Environment variable overrides: `MOCKTEST_QUESTION_BANK`, `MOCKTEST_STATE_FILE`.
pub fn load_config() -> Result<MocktestConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<MocktestConfig> {
    let mut config = match find_config(path)? {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            toml::from_str::<MocktestConfig>(&content)
                .with_context(|| format!("invalid config in {}", path.display()))?
        }
        None => MocktestConfig::default(),
    };

    if let Some(bank) = std::env::var_os("MOCKTEST_QUESTION_BANK") {
        config.question_bank = Some(PathBuf::from(bank));
    }
    if let Some(state) = std::env::var_os("MOCKTEST_STATE_FILE") {
        config.state_file = PathBuf::from(state);
    }

    config.question_bank = config.question_bank.as_deref().map(resolve_path);
    config.state_file = resolve_path(&config.state_file);
    Ok(config)
}

fn find_config(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        anyhow::ensure!(path.exists(), "config file not found: {}", path.display());
        return Ok(Some(path.to_path_buf()));
    }
    let local = PathBuf::from("mocktest.toml");
    if local.exists() {
        return Ok(Some(local));
    }
    Ok(user_config_dir()
        .map(|dir| dir.join("config.toml"))
        .filter(|p| p.exists()))
}

fn user_config_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config").join("mocktest"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_env_references() {
        std::env::set_var("_MOCKTEST_TEST_VAR", "hello");
        std::env::set_var("_MOCKTEST_NESTED_VAR", "${_MOCKTEST_TEST_VAR}");
        assert_eq!(resolve_env_vars("${_MOCKTEST_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("a_${_MOCKTEST_TEST_VAR}_b_${_MOCKTEST_TEST_VAR}"),
            "a_hello_b_hello"
        );
        assert_eq!(
            resolve_env_vars("${_MOCKTEST_NESTED_VAR}"),
            "${_MOCKTEST_TEST_VAR}"
        );
        assert_eq!(resolve_env_vars("x/${_MOCKTEST_UNSET_VAR}/y"), "x//y");
        assert_eq!(resolve_env_vars("${unterminated"), "${unterminated");
        std::env::remove_var("_MOCKTEST_TEST_VAR");
        std::env::remove_var("_MOCKTEST_NESTED_VAR");
    }

    #[test]
    fn default_config() {
        let config = MocktestConfig::default();
        assert_eq!(config.question_bank, None);
        assert_eq!(config.state_file, PathBuf::from(".mocktest/state.json"));
        assert!(config.persist);
    }

    #[test]
    fn parse_partial_config() {
        let config: MocktestConfig = toml::from_str(r#"question_bank = "banks/""#).unwrap();
        assert_eq!(config.question_bank, Some(PathBuf::from("banks/")));
        assert_eq!(config.state_file, default_state_file());
        assert!(config.persist);
    }

    #[test]
    fn explicit_path_is_loaded_and_expanded() {
        std::env::set_var("_MOCKTEST_STATE_DIR", "/tmp/mocktest-state");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mocktest.toml");
        std::fs::write(
            &path,
            "state_file = \"${_MOCKTEST_STATE_DIR}/state.json\"\npersist = false\n",
        )
        .unwrap();

        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(
            config.state_file,
            PathBuf::from("/tmp/mocktest-state/state.json")
        );
        assert!(!config.persist);
        std::env::remove_var("_MOCKTEST_STATE_DIR");
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        let err = load_config_from(Some(Path::new("/nonexistent/mocktest.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }
}
