//! # Memory Core (The Cortex)
//!
//! The "brain" of the story memory system. This crate decomposes a narrative
//! into memory compartments, replays the work as a virtual-time event log,
//! and consolidates what it learned into a persisted, cross-session pattern
//! store.
//!
//! ## Core Components
//!
//! - **extraction**: Rule-based feature extraction and association scoring
//! - **layered**: The eight in-session memory compartments
//! - **events**: Virtual-time event records for external replay
//! - **scheduler**: Runs one processing pass over a text
//! - **knowledge_base**: Persisted sessions, cross-story patterns, consolidated knowledge
//! - **storage**: Key-value backends the knowledge base flushes to
//! - **probe**: Read-only queries over a finished memory state
//! - **engine**: The facade tying a pass to the persisted store
//!
//! ## Design Philosophy
//!
//! - **Deterministic**: Identical text, tables and random source give identical output
//! - **Total**: Extraction never fails on arbitrary input; it returns empty results
//! - **Explicit state**: The persisted store is constructed and injected, never global

pub mod engine;
pub mod error;
pub mod events;
pub mod extraction;
pub mod knowledge_base;
pub mod layered;
pub mod probe;
pub mod scheduler;
pub mod storage;

pub use engine::*;
pub use error::*;
pub use events::*;
pub use extraction::*;
pub use knowledge_base::*;
pub use layered::*;
pub use scheduler::*;
pub use storage::*;

pub use memory_rules;
