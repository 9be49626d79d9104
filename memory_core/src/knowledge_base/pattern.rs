//! Cross-story patterns - recurring features reinforced across sessions.

use chrono::{DateTime, Duration, Utc};
use memory_rules::{PatternType, ReinforcementConfig, SessionId};
use serde::{Deserialize, Serialize};

use crate::layered::persisted_instant;

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::default()
}

/// One sighting of a pattern in one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternOccurrence {
    pub session_id: SessionId,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub strength: f32,
}

/// A feature observed across passes, identified by `(type, pattern)`.
///
/// Strength only grows: each re-occurrence adds the reinforcement
/// increment up to the cap. There is no decay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossStoryPattern {
    #[serde(rename = "type")]
    pub pattern_type: PatternType,
    pub pattern: String,
    #[serde(default)]
    pub occurrences: Vec<PatternOccurrence>,
    #[serde(default)]
    pub strength: f32,
    #[serde(with = "chrono::serde::ts_milliseconds", default = "epoch")]
    pub first_seen: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds", default = "epoch")]
    pub last_seen: DateTime<Utc>,
}

impl CrossStoryPattern {
    /// A pattern seen for the first time; its strength is the seed strength.
    pub fn first_sighting(
        pattern_type: PatternType,
        pattern: impl Into<String>,
        occurrence: PatternOccurrence,
        now: DateTime<Utc>,
    ) -> Self {
        let now = persisted_instant(now);
        Self {
            pattern_type,
            pattern: pattern.into(),
            strength: occurrence.strength,
            occurrences: vec![occurrence],
            first_seen: now,
            last_seen: now,
        }
    }

    pub fn is(&self, pattern_type: PatternType, pattern: &str) -> bool {
        self.pattern_type == pattern_type && self.pattern == pattern
    }

    /// Append an occurrence and strengthen.
    pub fn reinforce(
        &mut self,
        occurrence: PatternOccurrence,
        reinforcement: &ReinforcementConfig,
        now: DateTime<Utc>,
    ) {
        self.occurrences.push(occurrence);
        self.strength = reinforcement.reinforce(self.strength);
        self.last_seen = persisted_instant(now);
    }

    /// Number of recorded occurrences.
    pub fn connections(&self) -> usize {
        self.occurrences.len()
    }

    /// Whether the pattern was last seen strictly less than `window` ago.
    pub fn seen_within(&self, window: Duration, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.last_seen) < window
    }

    pub fn occurs_in(&self, session: &SessionId) -> bool {
        self.occurrences.iter().any(|o| &o.session_id == session)
    }
}
