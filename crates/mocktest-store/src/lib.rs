//! Storage, accounts and configuration for mocktest.
//!
//! Implements the `Repository` trait over in-memory collections, keeps the
//! user directory, and loads the bundled seed bank, user configuration and
//! the JSON state snapshot that carries both across process runs.

pub mod auth;
pub mod config;
pub mod error;
pub mod memory;
pub mod seed;
pub mod snapshot;
pub mod state;

pub use auth::{Account, UserDirectory};
pub use config::{load_config, load_config_from, MocktestConfig};
pub use error::AuthError;
pub use memory::InMemoryStore;
pub use state::AppState;
