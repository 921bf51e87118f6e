//! Scoring, countdown timer, statistics and storage traits for mocktest.
//!
//! This crate defines the data model, the repository seam, and the logic
//! that turns a learner's answers into a score and an instructor's view of
//! many attempts into aggregate statistics.

pub mod error;
pub mod model;
pub mod parser;
pub mod report;
pub mod scoring;
pub mod session;
pub mod statistics;
pub mod timer;
pub mod traits;

pub use error::{CoreError, EntityKind, Result};
