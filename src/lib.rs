//! Log analyzer
//!
//! Indexes test-run logs into a search backend and classifies unclassified
//! test items by voting over the most similar historical log lines.

pub mod api;
pub mod config;
pub mod error;
pub mod messaging;
pub mod metrics;
pub mod models;
pub mod search;

pub use error::{AppError, Result};
