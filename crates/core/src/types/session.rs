// crates/core/src/types/session.rs
//! Recorded practice session domain model

use crate::types::EntityId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A recorded practice session against a scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: EntityId,
    /// Scenario this session was recorded against
    pub scenario_id: EntityId,
    /// Transcribed speech, if transcription completed
    pub transcript: Option<String>,
    /// Score in [0, 100], if scoring completed
    pub score: Option<u8>,
    /// Recording length in seconds
    pub duration_secs: u32,
    /// Approximate size of the buffered recording payload in bytes.
    /// Consulted by the quota guard before offline buffering.
    pub payload_bytes: u64,
    pub recorded_at: DateTime<Utc>,
}

impl Session {
    /// Creates a new empty session for a scenario
    pub fn new(scenario_id: EntityId) -> Self {
        Self {
            id: EntityId::new(),
            scenario_id,
            transcript: None,
            score: None,
            duration_secs: 0,
            payload_bytes: 0,
            recorded_at: Utc::now(),
        }
    }

    /// Attaches a transcript
    pub fn with_transcript(mut self, transcript: String) -> Self {
        self.transcript = Some(transcript);
        self
    }

    /// Attaches a score, clamped to 100
    pub fn with_score(mut self, score: u8) -> Self {
        self.score = Some(score.min(100));
        self
    }

    /// Returns true if the session has been scored
    pub fn is_scored(&self) -> bool {
        self.score.is_some()
    }
}
