//! Stored sessions and their heuristic titles.

use chrono::{DateTime, Utc};
use memory_rules::SessionId;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::layered::{persisted_instant, MemoryState};

use super::CrossStoryPattern;

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::default()
}

/// A capitalized two-word name such as "Sarah Chen".
static FULL_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z][a-z]+ [A-Z][a-z]+\b").expect("valid name pattern"));

/// One processed text and the memory state it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSession {
    pub id: SessionId,
    #[serde(with = "chrono::serde::ts_milliseconds", default = "epoch")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub story_title: String,
    #[serde(default)]
    pub story_text: String,
    #[serde(default)]
    pub memory_state: MemoryState,
    /// Reserved; never populated by ingestion.
    #[serde(default)]
    pub patterns: Vec<CrossStoryPattern>,
}

impl StoredSession {
    pub fn new(
        id: SessionId,
        timestamp: DateTime<Utc>,
        story_title: String,
        story_text: impl Into<String>,
        memory_state: MemoryState,
    ) -> Self {
        Self {
            id,
            timestamp: persisted_instant(timestamp),
            story_title,
            story_text: story_text.into(),
            memory_state,
            patterns: Vec::new(),
        }
    }
}

/// Derive a short title from the first sentence of a text.
///
/// Preference order: "Name at Location", "Name's Experience",
/// "Location Visit", then the first six words followed by "...".
/// Location terms match case-insensitively on word boundaries and keep
/// the casing found in the text.
pub fn story_title(text: &str, locations: &[String]) -> String {
    let first = text.split(['.', '!', '?']).next().unwrap_or_default();

    let name = FULL_NAME.find(first).map(|m| m.as_str());
    let location = location_pattern(locations)
        .and_then(|re| re.find(first).map(|m| m.as_str().to_string()));

    match (name, location) {
        (Some(name), Some(location)) => format!("{} at {}", name, location),
        (Some(name), None) => format!("{}'s Experience", name),
        (None, Some(location)) => format!("{} Visit", location),
        (None, None) => {
            let words: Vec<&str> = first.split(' ').take(6).collect();
            format!("{}...", words.join(" "))
        }
    }
}

fn location_pattern(locations: &[String]) -> Option<Regex> {
    if locations.is_empty() {
        return None;
    }
    let alternatives: Vec<String> = locations.iter().map(|l| regex::escape(l)).collect();
    RegexBuilder::new(&format!(r"\b(?:{})\b", alternatives.join("|")))
        .case_insensitive(true)
        .build()
        .map_err(|e| tracing::warn!("Title location pattern rejected: {}", e))
        .ok()
}
