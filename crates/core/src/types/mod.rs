// crates/core/src/types/mod.rs
//! Domain types organized by responsibility:
//! - `scenario`: practice scenario definitions
//! - `session`: recorded practice sessions
//! - `progress`: aggregated practice statistics
//! - `common`: entity identifiers, kinds, and sync metadata

mod common;
mod progress;
mod scenario;
mod session;

pub use common::{EntityId, EntityKind, SyncMeta};
pub use progress::Progress;
pub use scenario::{Scenario, ScenarioDifficulty};
pub use session::Session;

use serde::{Deserialize, Serialize};

/// A domain entity, one of the three synced collections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entity {
    Scenario(Scenario),
    Session(Session),
    Progress(Progress),
}

impl Entity {
    /// Returns the collection this entity belongs to
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Scenario(_) => EntityKind::Scenario,
            Self::Session(_) => EntityKind::Session,
            Self::Progress(_) => EntityKind::Progress,
        }
    }

    /// Returns the entity's stable identifier
    pub fn id(&self) -> EntityId {
        match self {
            Self::Scenario(s) => s.id,
            Self::Session(s) => s.id,
            Self::Progress(p) => p.id,
        }
    }
}
