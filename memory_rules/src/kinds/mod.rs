//! Closed vocabularies: memory compartments, event actions, pattern and
//! connection types.

use serde::{Deserialize, Serialize};

/// The compartment (or cross-story facility) an event acts upon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemoryKind {
    #[serde(rename = "Short-Term Memory")]
    ShortTerm,
    #[serde(rename = "Working Memory")]
    Working,
    #[serde(rename = "Long-Term Memory")]
    LongTerm,
    #[serde(rename = "Episodic Memory")]
    Episodic,
    #[serde(rename = "Semantic Memory")]
    Semantic,
    #[serde(rename = "Associative Memory")]
    Associative,
    #[serde(rename = "Procedural Memory")]
    Procedural,
    #[serde(rename = "Flash Memory")]
    Flash,
    #[serde(rename = "Cross-Story Memory")]
    CrossStoryMemory,
    #[serde(rename = "Cross-Story Association")]
    CrossStoryAssociation,
    #[serde(rename = "Cross-Story Consolidation")]
    CrossStoryConsolidation,
}

impl MemoryKind {
    /// Human-readable name, identical to the serialized form.
    pub fn label(&self) -> &'static str {
        match self {
            MemoryKind::ShortTerm => "Short-Term Memory",
            MemoryKind::Working => "Working Memory",
            MemoryKind::LongTerm => "Long-Term Memory",
            MemoryKind::Episodic => "Episodic Memory",
            MemoryKind::Semantic => "Semantic Memory",
            MemoryKind::Associative => "Associative Memory",
            MemoryKind::Procedural => "Procedural Memory",
            MemoryKind::Flash => "Flash Memory",
            MemoryKind::CrossStoryMemory => "Cross-Story Memory",
            MemoryKind::CrossStoryAssociation => "Cross-Story Association",
            MemoryKind::CrossStoryConsolidation => "Cross-Story Consolidation",
        }
    }

    /// Whether this is one of the eight in-session compartments.
    pub fn is_compartment(&self) -> bool {
        !matches!(
            self,
            MemoryKind::CrossStoryMemory
                | MemoryKind::CrossStoryAssociation
                | MemoryKind::CrossStoryConsolidation
        )
    }
}

impl std::fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// What a scheduled event did to its compartment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    Store,
    Retrieve,
    Process,
    Associate,
    Consolidate,
    CrossReference,
}

/// Kinds of cross-story patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    RecurringEntity,
    BehavioralSequence,
    SemanticCluster,
    TemporalPattern,
    EmotionalTheme,
}

impl PatternType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternType::RecurringEntity => "recurring_entity",
            PatternType::BehavioralSequence => "behavioral_sequence",
            PatternType::SemanticCluster => "semantic_cluster",
            PatternType::TemporalPattern => "temporal_pattern",
            PatternType::EmotionalTheme => "emotional_theme",
        }
    }
}

impl std::fmt::Display for PatternType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an in-session item links to persisted knowledge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    EntityRecognition,
    SemanticReinforcement,
    EpisodicPattern,
    /// Anything written by a newer or hand-edited blob.
    #[serde(other)]
    Other,
}

/// The four running counters of consolidated knowledge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeKind {
    Entities,
    Behaviors,
    Locations,
    Concepts,
}

impl KnowledgeKind {
    pub const ALL: [KnowledgeKind; 4] = [
        KnowledgeKind::Entities,
        KnowledgeKind::Behaviors,
        KnowledgeKind::Locations,
        KnowledgeKind::Concepts,
    ];
}
