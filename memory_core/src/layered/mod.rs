//! Layered Memory - the eight compartments built during one processing pass.
//!
//! The compartments are:
//! - **short-term**: the first few perceived sentences, cleared on decay
//! - **working**: entities and actions under active processing
//! - **long-term**: consolidated working items, by category
//! - **episodic**: templated episodes stamped with wall-clock time
//! - **semantic**: concepts filed by category
//! - **associative**: retained concept links
//! - **procedural**: recognized procedures
//! - **flash**: the most recently consolidated items, newest first

use chrono::{DateTime, SubsecRound, Utc};
use memory_rules::ConnectionType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::extraction::EpisodeCandidate;

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::default()
}

/// Wall-clock instants are persisted at millisecond precision.
pub(crate) fn persisted_instant(at: DateTime<Utc>) -> DateTime<Utc> {
    at.trunc_subsecs(3)
}

/// An encoded episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodicRecord {
    pub event: String,
    pub context: String,
    /// Wall-clock time of encoding, unrelated to the event's virtual timestamp.
    #[serde(with = "chrono::serde::ts_milliseconds", default = "epoch")]
    pub timestamp: DateTime<Utc>,
}

/// A retained link between a working item and a semantic concept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Association {
    pub concept1: String,
    pub concept2: String,
    /// Always above the retention threshold that admitted it.
    pub strength: f32,
}

/// A link from an in-session item to persisted knowledge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossStoryLink {
    pub current_item: String,
    pub linked_pattern: String,
    pub connection_type: ConnectionType,
    pub strength: f32,
}

/// Snapshot of all compartments.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MemoryState {
    pub short_term: Vec<String>,
    pub working_memory: Vec<String>,
    pub long_term: BTreeMap<String, Vec<String>>,
    pub episodic: Vec<EpisodicRecord>,
    pub semantic: BTreeMap<String, Vec<String>>,
    pub associative: Vec<Association>,
    pub procedural: Vec<String>,
    pub flash: Vec<String>,
    pub cross_story_links: Vec<CrossStoryLink>,
}

impl MemoryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// All semantic concepts, category by category.
    pub fn semantic_concepts(&self) -> impl Iterator<Item = &String> {
        self.semantic.values().flatten()
    }

    /// Categories holding at least one concept.
    pub fn semantic_clusters(&self) -> impl Iterator<Item = &String> {
        self.semantic
            .iter()
            .filter(|(_, concepts)| !concepts.is_empty())
            .map(|(category, _)| category)
    }
}

/// Builds a [`MemoryState`] during one pass, enforcing the flash bound.
#[derive(Debug, Clone)]
pub struct LayeredMemoryStore {
    state: MemoryState,
    flash_capacity: usize,
}

impl LayeredMemoryStore {
    /// Create empty compartments with the given flash capacity.
    pub fn new(flash_capacity: usize) -> Self {
        Self {
            state: MemoryState::new(),
            flash_capacity,
        }
    }

    pub fn state(&self) -> &MemoryState {
        &self.state
    }

    pub fn into_state(self) -> MemoryState {
        self.state
    }

    pub fn perceive(&mut self, sentence: impl Into<String>) {
        self.state.short_term.push(sentence.into());
    }

    pub fn hold(&mut self, item: impl Into<String>) {
        self.state.working_memory.push(item.into());
    }

    /// File a concept under its semantic category.
    pub fn file_concept(&mut self, category: &str, concept: impl Into<String>) {
        self.state
            .semantic
            .entry(category.to_string())
            .or_default()
            .push(concept.into());
    }

    pub fn record_episode(&mut self, episode: &EpisodeCandidate, now: DateTime<Utc>) {
        self.state.episodic.push(EpisodicRecord {
            event: episode.event.clone(),
            context: episode.context.clone(),
            timestamp: persisted_instant(now),
        });
    }

    pub fn associate(&mut self, a: impl Into<String>, b: impl Into<String>, strength: f32) {
        self.state.associative.push(Association {
            concept1: a.into(),
            concept2: b.into(),
            strength,
        });
    }

    pub fn learn_procedure(&mut self, procedure: impl Into<String>) {
        self.state.procedural.push(procedure.into());
    }

    pub fn link(&mut self, link: CrossStoryLink) {
        self.state.cross_story_links.push(link);
    }

    /// Move an item into long-term storage and to the front of flash.
    ///
    /// Flash keeps only the newest `flash_capacity` items.
    pub fn consolidate(&mut self, category: &str, item: impl Into<String>) {
        let item = item.into();
        self.state
            .long_term
            .entry(category.to_string())
            .or_default()
            .push(item.clone());

        self.state.flash.insert(0, item);
        self.state.flash.truncate(self.flash_capacity);
    }

    /// Short-term memories fade entirely.
    pub fn decay_short_term(&mut self) {
        self.state.short_term.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flash_is_bounded_newest_first() {
        let mut store = LayeredMemoryStore::new(5);
        for i in 0..8 {
            store.consolidate("general", format!("item-{}", i));
        }

        let state = store.state();
        assert_eq!(
            state.flash,
            vec!["item-7", "item-6", "item-5", "item-4", "item-3"]
        );
        assert_eq!(state.long_term["general"].len(), 8);
    }

    #[test]
    fn test_file_concept_groups_by_category() {
        let mut store = LayeredMemoryStore::new(5);
        store.file_concept("habits", "coffee culture");
        store.file_concept("habits", "morning routine");
        store.file_concept("empty", "x");
        store.state.semantic.get_mut("empty").unwrap().clear();

        let state = store.state();
        assert_eq!(state.semantic["habits"], vec!["coffee culture", "morning routine"]);
        assert_eq!(state.semantic_concepts().count(), 2);
        assert_eq!(state.semantic_clusters().collect::<Vec<_>>(), vec!["habits"]);
    }

    #[test]
    fn test_decay_clears_short_term_only() {
        let mut store = LayeredMemoryStore::new(5);
        store.perceive("A sentence");
        store.hold("sarah");
        store.decay_short_term();

        assert!(store.state().short_term.is_empty());
        assert_eq!(store.state().working_memory, vec!["sarah"]);
    }

    #[test]
    fn test_state_json_is_camel_case() {
        let mut store = LayeredMemoryStore::new(5);
        store.hold("sarah");
        store.link(CrossStoryLink {
            current_item: "sarah".into(),
            linked_pattern: "sarah (2 previous occurrences)".into(),
            connection_type: ConnectionType::EntityRecognition,
            strength: 0.2,
        });

        let json = serde_json::to_value(store.state()).unwrap();
        assert!(json.get("workingMemory").is_some());
        assert!(json.get("crossStoryLinks").is_some());
        assert_eq!(
            json["crossStoryLinks"][0]["connectionType"],
            "entity_recognition"
        );
    }

    #[test]
    fn test_partial_state_deserializes() {
        let state: MemoryState =
            serde_json::from_str(r#"{"flash":["a"],"episodic":[{"event":"e","context":"c"}]}"#)
                .unwrap();
        assert_eq!(state.flash, vec!["a"]);
        assert_eq!(state.episodic[0].timestamp, epoch());
        assert!(state.semantic.is_empty());
    }
}
