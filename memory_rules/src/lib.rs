//! # Memory Rules
//!
//! The "Rulebook" crate - identifiers, closed vocabularies, declarative
//! keyword tables and tunable parameters for the story memory engine.
//! This crate is the single source of truth for *what* the engine looks
//! for and does not contain any processing logic.

pub mod config;
pub mod ids;
pub mod kinds;
pub mod rules;

pub use config::*;
pub use ids::*;
pub use kinds::*;
pub use rules::*;

use thiserror::Error;

/// Errors raised while loading rule tables or engine configuration.
#[derive(Debug, Error)]
pub enum RulesError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid rule table: {0}")]
    Invalid(String),
}
