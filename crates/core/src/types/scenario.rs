// crates/core/src/types/scenario.rs
//! Practice scenario domain model

use crate::types::EntityId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Scenario difficulty level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioDifficulty {
    Beginner,
    Intermediate,
    Advanced,
}

/// A practice scenario: the prompt material a user rehearses against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: EntityId,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub difficulty: ScenarioDifficulty,
    /// Ordered prompts presented during a session
    pub prompts: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Scenario {
    /// Creates a new scenario with a title
    pub fn new(title: String) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new(),
            title,
            description: None,
            category: None,
            difficulty: ScenarioDifficulty::Beginner,
            prompts: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the difficulty level
    pub fn with_difficulty(mut self, difficulty: ScenarioDifficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    /// Appends a prompt and bumps the update timestamp
    pub fn add_prompt(&mut self, prompt: String) {
        self.prompts.push(prompt);
        self.updated_at = Utc::now();
    }
}
