// crates/core/src/types/progress.rs
//! Aggregated practice progress model

use crate::types::EntityId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregated practice counters for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub id: EntityId,
    pub scenarios_completed: u32,
    pub sessions_recorded: u32,
    /// Sessions that carried a score; divisor for the rolling average
    pub scored_sessions: u32,
    pub total_practice_secs: u64,
    /// Rolling average score across scored sessions
    pub average_score: Option<f32>,
    pub updated_at: DateTime<Utc>,
}

impl Progress {
    /// Creates an empty progress record
    pub fn new() -> Self {
        Self {
            id: EntityId::new(),
            scenarios_completed: 0,
            sessions_recorded: 0,
            scored_sessions: 0,
            total_practice_secs: 0,
            average_score: None,
            updated_at: Utc::now(),
        }
    }

    /// Folds a finished session into the counters
    pub fn record_session(&mut self, duration_secs: u32, score: Option<u8>) {
        self.sessions_recorded += 1;
        self.total_practice_secs += u64::from(duration_secs);
        if let Some(score) = score {
            self.scored_sessions += 1;
            let prior = self.average_score.unwrap_or(0.0);
            let n = self.scored_sessions as f32;
            self.average_score = Some(prior + (f32::from(score) - prior) / n);
        }
        self.updated_at = Utc::now();
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::new()
    }
}
