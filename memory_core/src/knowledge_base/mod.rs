//! Knowledge Base module - everything that persists across passes.
//!
//! The persisted blob consists of:
//! - **Sessions**: one stored snapshot per processed text, FIFO-capped
//! - **Patterns**: recurring features reinforced across sessions
//! - **Consolidated knowledge**: running counters per canonical term
//! - **User profile**: preferences carried along for consumers

mod aggregator;
mod migrate;
mod pattern;
mod session;
mod store;

pub use aggregator::*;
pub use pattern::*;
pub use session::*;
pub use store::*;

use memory_rules::{KnowledgeKind, ReinforcementConfig};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::{MemoryError, Result};

/// Shared behaviour of the four consolidated-knowledge entry kinds.
pub trait KnowledgeEntry {
    fn count(&self) -> u32;
    fn strength(&self) -> f32;
    /// Free-text notes (contexts, variations, descriptions or associations).
    fn notes(&self) -> &[String];
    /// Record one more sighting.
    fn observe(&mut self, note: String, reinforcement: &ReinforcementConfig);
}

macro_rules! knowledge_entry {
    ($(#[$meta:meta])* $name:ident, $notes:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
        #[serde(default)]
        pub struct $name {
            pub count: u32,
            pub $notes: Vec<String>,
            pub strength: f32,
        }

        impl KnowledgeEntry for $name {
            fn count(&self) -> u32 {
                self.count
            }

            fn strength(&self) -> f32 {
                self.strength
            }

            fn notes(&self) -> &[String] {
                &self.$notes
            }

            fn observe(&mut self, note: String, reinforcement: &ReinforcementConfig) {
                self.count += 1;
                self.$notes.push(note);
                self.strength = reinforcement.reinforce(self.strength);
            }
        }
    };
}

knowledge_entry!(
    /// A canonical entity and the contexts it was seen in.
    EntityKnowledge,
    contexts
);
knowledge_entry!(
    /// A learned behavior and the stories it varied across.
    BehaviorKnowledge,
    variations
);
knowledge_entry!(
    /// A location and how it was described.
    LocationKnowledge,
    descriptions
);
knowledge_entry!(
    /// A concept and the categories it was associated with.
    ConceptKnowledge,
    associations
);

/// Running, persisted counters of everything observed across passes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsolidatedKnowledge {
    pub entities: BTreeMap<String, EntityKnowledge>,
    pub behaviors: BTreeMap<String, BehaviorKnowledge>,
    pub locations: BTreeMap<String, LocationKnowledge>,
    pub concepts: BTreeMap<String, ConceptKnowledge>,
}

impl ConsolidatedKnowledge {
    /// Count and strength of a key in one of the four maps.
    pub fn lookup(&self, kind: KnowledgeKind, key: &str) -> Option<(u32, f32)> {
        fn read<E: KnowledgeEntry>(map: &BTreeMap<String, E>, key: &str) -> Option<(u32, f32)> {
            map.get(key).map(|e| (e.count(), e.strength()))
        }

        match kind {
            KnowledgeKind::Entities => read(&self.entities, key),
            KnowledgeKind::Behaviors => read(&self.behaviors, key),
            KnowledgeKind::Locations => read(&self.locations, key),
            KnowledgeKind::Concepts => read(&self.concepts, key),
        }
    }

    /// Record a sighting, creating the entry on first sight.
    pub fn observe(
        &mut self,
        kind: KnowledgeKind,
        key: &str,
        note: String,
        reinforcement: &ReinforcementConfig,
    ) {
        fn bump<E: KnowledgeEntry + Default>(
            map: &mut BTreeMap<String, E>,
            key: &str,
            note: String,
            reinforcement: &ReinforcementConfig,
        ) {
            map.entry(key.to_string())
                .or_default()
                .observe(note, reinforcement);
        }

        match kind {
            KnowledgeKind::Entities => bump(&mut self.entities, key, note, reinforcement),
            KnowledgeKind::Behaviors => bump(&mut self.behaviors, key, note, reinforcement),
            KnowledgeKind::Locations => bump(&mut self.locations, key, note, reinforcement),
            KnowledgeKind::Concepts => bump(&mut self.concepts, key, note, reinforcement),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
            && self.behaviors.is_empty()
            && self.locations.is_empty()
            && self.concepts.is_empty()
    }
}

fn default_memory_style() -> String {
    "comprehensive".to_string()
}

/// Consumer-facing preferences stored alongside the knowledge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserProfile {
    pub preferred_scenarios: Vec<String>,
    pub learning_patterns: Vec<String>,
    pub memory_style: String,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            preferred_scenarios: Vec::new(),
            learning_patterns: Vec::new(),
            memory_style: default_memory_style(),
        }
    }
}

/// The complete persisted blob; also the export/import file format.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersistentMemory {
    pub all_sessions: Vec<StoredSession>,
    pub cross_story_patterns: Vec<CrossStoryPattern>,
    pub consolidated_knowledge: ConsolidatedKnowledge,
    pub user_profile: UserProfile,
}

impl PersistentMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and migrate a JSON blob.
    ///
    /// Fails only when the text is not JSON or not an object. Every field
    /// is then decoded on its own: missing or mistyped fields take their
    /// empty default, and undecodable list elements or map entries are
    /// dropped individually.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| MemoryError::MalformedImport(e.to_string()))?;
        Self::from_json_value(&value)
    }

    pub fn from_json_value(value: &Value) -> Result<Self> {
        let root = value.as_object().ok_or_else(|| {
            MemoryError::MalformedImport(format!(
                "expected a JSON object, found {}",
                kind_of(value)
            ))
        })?;

        let knowledge = root.get("consolidatedKnowledge");
        let profile = root.get("userProfile");
        let defaults = UserProfile::default();

        Ok(Self {
            all_sessions: migrate::list(root.get("allSessions"), "allSessions"),
            cross_story_patterns: migrate::list(
                root.get("crossStoryPatterns"),
                "crossStoryPatterns",
            ),
            consolidated_knowledge: ConsolidatedKnowledge {
                entities: migrate::map(migrate::field(knowledge, "entities"), "entities"),
                behaviors: migrate::map(migrate::field(knowledge, "behaviors"), "behaviors"),
                locations: migrate::map(migrate::field(knowledge, "locations"), "locations"),
                concepts: migrate::map(migrate::field(knowledge, "concepts"), "concepts"),
            },
            user_profile: UserProfile {
                preferred_scenarios: migrate::list(
                    migrate::field(profile, "preferredScenarios"),
                    "preferredScenarios",
                ),
                learning_patterns: migrate::list(
                    migrate::field(profile, "learningPatterns"),
                    "learningPatterns",
                ),
                memory_style: migrate::string(migrate::field(profile, "memoryStyle"))
                    .unwrap_or(defaults.memory_style),
            },
        })
    }

    /// Pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_blob_shape() {
        let json = serde_json::to_value(PersistentMemory::new()).unwrap();
        assert_eq!(json["allSessions"], serde_json::json!([]));
        assert_eq!(json["consolidatedKnowledge"]["behaviors"], serde_json::json!({}));
        assert_eq!(json["userProfile"]["memoryStyle"], "comprehensive");
    }

    #[test]
    fn test_observe_reinforces_and_caps() {
        let reinforcement = ReinforcementConfig::default();
        let mut knowledge = ConsolidatedKnowledge::default();

        for _ in 0..15 {
            knowledge.observe(KnowledgeKind::Entities, "coffee", "morning".into(), &reinforcement);
        }

        let entry = &knowledge.entities["coffee"];
        assert_eq!(entry.count, 15);
        assert_eq!(entry.contexts.len(), 15);
        assert_eq!(entry.strength, 1.0);
        assert_eq!(
            knowledge.lookup(KnowledgeKind::Entities, "coffee"),
            Some((15, 1.0))
        );
        assert_eq!(knowledge.lookup(KnowledgeKind::Concepts, "coffee"), None);
    }

    #[test]
    fn test_each_kind_uses_its_note_field() {
        let reinforcement = ReinforcementConfig::default();
        let mut knowledge = ConsolidatedKnowledge::default();
        knowledge.observe(KnowledgeKind::Behaviors, "b", "v".into(), &reinforcement);
        knowledge.observe(KnowledgeKind::Locations, "l", "d".into(), &reinforcement);
        knowledge.observe(KnowledgeKind::Concepts, "c", "a".into(), &reinforcement);

        let json = serde_json::to_value(&knowledge).unwrap();
        assert_eq!(json["behaviors"]["b"]["variations"], serde_json::json!(["v"]));
        assert_eq!(json["locations"]["l"]["descriptions"], serde_json::json!(["d"]));
        assert_eq!(json["concepts"]["c"]["associations"], serde_json::json!(["a"]));
    }

    #[test]
    fn test_migrate_fills_missing_fields() {
        let blob = PersistentMemory::from_json_str(r#"{"allSessions":[]}"#).unwrap();
        assert_eq!(blob, PersistentMemory::new());
    }

    #[test]
    fn test_migrate_tolerates_mistyped_fields() {
        let blob = PersistentMemory::from_json_str(
            r#"{
                "allSessions": null,
                "crossStoryPatterns": "oops",
                "consolidatedKnowledge": {"entities": [], "concepts": {"x": {"count": 2}}},
                "userProfile": {"memoryStyle": 7, "learningPatterns": ["visual", 3]}
            }"#,
        )
        .unwrap();

        assert!(blob.all_sessions.is_empty());
        assert!(blob.cross_story_patterns.is_empty());
        assert!(blob.consolidated_knowledge.entities.is_empty());
        assert_eq!(blob.consolidated_knowledge.concepts["x"].count, 2);
        assert_eq!(blob.consolidated_knowledge.concepts["x"].strength, 0.0);
        assert_eq!(blob.user_profile.memory_style, "comprehensive");
        assert_eq!(blob.user_profile.learning_patterns, vec!["visual"]);
    }

    #[test]
    fn test_migrate_rejects_non_objects() {
        for text in ["not json", "[]", "42", "null"] {
            let err = PersistentMemory::from_json_str(text).unwrap_err();
            assert!(matches!(err, MemoryError::MalformedImport(_)), "{}", text);
        }
    }
}
