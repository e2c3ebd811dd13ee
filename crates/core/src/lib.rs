// crates/core/src/lib.rs
//! Core domain types for the Rehearse offline client
//!
//! This crate holds the entity model shared by the storage and sync layers:
//! - `Scenario`: a practice scenario definition
//! - `Session`: a recorded practice session (transcript + score)
//! - `Progress`: aggregated practice statistics
//! - `SyncMeta`: per-entity dirty/synced bookkeeping

pub mod types;

pub use types::{
    Entity, EntityId, EntityKind, Progress, Scenario, ScenarioDifficulty, Session, SyncMeta,
};
