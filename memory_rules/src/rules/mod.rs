//! Declarative rule tables driving feature extraction and pattern mining.
//!
//! Every table is plain data so callers can load their own from TOML or
//! substitute minimal tables in tests. Terms are matched against
//! lowercased text, so loading normalizes them to lowercase.

mod tables;

pub use tables::*;

use tables::owned;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::RulesError;

/// Entity vocabulary, scanned in `names`, `places`, `objects` order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityVocabulary {
    pub names: Vec<String>,
    pub places: Vec<String>,
    pub objects: Vec<String>,
}

impl EntityVocabulary {
    /// All terms in scan order.
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.names
            .iter()
            .chain(self.places.iter())
            .chain(self.objects.iter())
    }
}

/// The complete set of vocabularies and keyword tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSet {
    /// Entities picked up into working memory.
    pub entities: EntityVocabulary,
    /// Action words picked up into working memory.
    pub actions: Vec<String>,
    pub concepts: Vec<ConceptRule>,
    pub episodes: Vec<EpisodeTemplate>,
    pub procedures: Vec<ProcedureRule>,
    /// Known concept pairs for association scoring.
    pub relationships: Vec<RelationshipPair>,
    /// Terms mined as `recurring_entity` patterns.
    pub recurring_entities: Vec<String>,
    /// Keyword sets mined as `behavioral_sequence` patterns.
    pub behaviors: Vec<BehaviorRule>,
    /// Canonical entities folded into consolidated knowledge.
    pub knowledge_entities: Vec<KnowledgeEntityRule>,
    /// Location terms used for session titles and location knowledge.
    pub title_locations: Vec<String>,
    /// Category for concepts with no explicit rule.
    pub default_category: String,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            entities: EntityVocabulary {
                names: owned(&[
                    "sarah", "marcus", "mother", "chen", "martinez", "rodriguez", "patel", "kim",
                ]),
                places: owned(&[
                    "coffee shop",
                    "maple street",
                    "corner table",
                    "library",
                    "gym",
                    "kitchen",
                    "bookstore",
                    "subway",
                ]),
                objects: owned(&[
                    "laptop", "latte", "cortado", "report", "flowers", "backpack", "recipe",
                    "metrocard",
                ]),
            },
            actions: owned(&[
                "walked",
                "entered",
                "remembered",
                "noticed",
                "sat",
                "opened",
                "typing",
                "work",
                "climbed",
                "measured",
                "calculated",
                "tapped",
            ]),
            concepts: vec![
                ConceptRule::new("coffee culture", "habits", &["coffee", "latte", "cortado"]),
                ConceptRule::new("morning routine", "habits", &["morning", "routine"]),
                ConceptRule::new("work habits", "professional", &["work", "report", "laptop"]),
                ConceptRule::new("academic learning", "education", &["study", "exam", "library"]),
                ConceptRule::new("fitness routine", "habits", &["gym", "exercise", "fitness"]),
                ConceptRule::new("culinary skills", "skills", &["recipe", "cooking", "kitchen"]),
                ConceptRule::new(
                    "family relationships",
                    "personal",
                    &["family", "grandmother", "mother"],
                ),
            ],
            episodes: vec![
                EpisodeTemplate::new(
                    "Coffee shop experience",
                    "Professional routine with personal connections",
                    &["coffee"],
                ),
                EpisodeTemplate::new(
                    "Academic study session",
                    "Learning environment with anxiety management",
                    &["study", "library"],
                ),
                EpisodeTemplate::new(
                    "Culinary creation",
                    "Family tradition and cultural heritage",
                    &["cooking", "recipe"],
                ),
                EpisodeTemplate::new(
                    "Fitness training",
                    "Physical development and professional application",
                    &["gym", "exercise"],
                ),
            ],
            procedures: vec![
                ProcedureRule::all_of("coffee shop routine", &["coffee", "routine"]),
                ProcedureRule::all_of("study organization system", &["study", "organize"]),
                ProcedureRule::all_of("cooking methodology", &["recipe", "steps"]),
                ProcedureRule::all_of("exercise sequence", &["gym", "routine"]),
                ProcedureRule::any_of("transit navigation", &["commute", "subway"]),
            ],
            relationships: vec![
                RelationshipPair::new("coffee", "morning routine"),
                RelationshipPair::new("work", "professional"),
                RelationshipPair::new("study", "academic learning"),
                RelationshipPair::new("gym", "fitness routine"),
                RelationshipPair::new("cooking", "culinary skills"),
                RelationshipPair::new("family", "personal"),
            ],
            recurring_entities: owned(&[
                "coffee", "sarah", "maria", "alex", "emma", "julia", "david",
            ]),
            behaviors: vec![
                BehaviorRule::new(
                    "morning routine",
                    &["morning", "routine", "coffee", "arrived", "usual"],
                ),
                BehaviorRule::new(
                    "work session",
                    &["laptop", "work", "report", "typing", "computer"],
                ),
                BehaviorRule::new(
                    "study routine",
                    &["study", "notes", "exam", "library", "review"],
                ),
                BehaviorRule::new(
                    "exercise routine",
                    &["gym", "workout", "exercise", "training", "fitness"],
                ),
                BehaviorRule::new(
                    "cooking process",
                    &["recipe", "cook", "ingredients", "kitchen", "prepare"],
                ),
            ],
            knowledge_entities: vec![
                KnowledgeEntityRule::new("coffee", &["morning", "cafe", "routine", "drink"]),
                KnowledgeEntityRule::new("work", &["laptop", "report", "office", "professional"]),
                KnowledgeEntityRule::new("study", &["library", "exam", "notes", "learning"]),
                KnowledgeEntityRule::new("exercise", &["gym", "training", "fitness", "workout"]),
            ],
            title_locations: owned(&[
                "coffee shop",
                "library",
                "gym",
                "kitchen",
                "bookstore",
                "train",
                "subway",
            ]),
            default_category: "general".to_string(),
        }
    }
}

impl RuleSet {
    /// A rule set with every table empty.
    pub fn empty() -> Self {
        Self {
            entities: EntityVocabulary::default(),
            actions: Vec::new(),
            concepts: Vec::new(),
            episodes: Vec::new(),
            procedures: Vec::new(),
            relationships: Vec::new(),
            recurring_entities: Vec::new(),
            behaviors: Vec::new(),
            knowledge_entities: Vec::new(),
            title_locations: Vec::new(),
            default_category: "general".to_string(),
        }
    }

    /// Parse a rule set from TOML. Missing tables take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, RulesError> {
        let mut rules: RuleSet = toml::from_str(content)?;
        rules.normalize();
        rules.validate()?;
        Ok(rules)
    }

    /// Load a rule set from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RulesError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Load from a file, falling back to the built-in tables.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path.as_ref()) {
            Ok(rules) => rules,
            Err(e) => {
                tracing::info!(
                    "Rule file {} not loaded ({}), using built-in tables",
                    path.as_ref().display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Semantic category for a concept.
    pub fn category_for(&self, concept: &str) -> &str {
        self.concepts
            .iter()
            .find(|rule| rule.concept == concept)
            .map(|rule| rule.category.as_str())
            .unwrap_or(self.default_category.as_str())
    }

    /// Lowercase every matchable term.
    fn normalize(&mut self) {
        fn lower(terms: &mut [String]) {
            for t in terms.iter_mut() {
                *t = t.to_lowercase();
            }
        }

        lower(&mut self.entities.names);
        lower(&mut self.entities.places);
        lower(&mut self.entities.objects);
        lower(&mut self.actions);
        lower(&mut self.recurring_entities);
        lower(&mut self.title_locations);
        for rule in &mut self.concepts {
            lower(&mut rule.triggers);
        }
        for rule in &mut self.episodes {
            lower(&mut rule.triggers);
        }
        for rule in &mut self.procedures {
            lower(&mut rule.triggers);
        }
        for rule in &mut self.behaviors {
            lower(&mut rule.keywords);
        }
        for rule in &mut self.knowledge_entities {
            rule.name = rule.name.to_lowercase();
            lower(&mut rule.contexts);
        }
        for pair in &mut self.relationships {
            pair.left = pair.left.to_lowercase();
            pair.right = pair.right.to_lowercase();
        }
    }

    fn validate(&self) -> Result<(), RulesError> {
        let blank = |t: &String| t.trim().is_empty();

        if self.entities.iter().any(blank) || self.actions.iter().any(blank) {
            return Err(RulesError::Invalid("blank vocabulary term".into()));
        }
        for rule in &self.procedures {
            let needed = rule.required_matches();
            if needed == 0 || needed > rule.triggers.len() {
                return Err(RulesError::Invalid(format!(
                    "procedure '{}' needs {} of {} triggers",
                    rule.procedure,
                    needed,
                    rule.triggers.len()
                )));
            }
        }
        for rule in &self.behaviors {
            if rule.min_matches == 0 || rule.min_matches > rule.keywords.len() {
                return Err(RulesError::Invalid(format!(
                    "behavior '{}' needs {} of {} keywords",
                    rule.behavior,
                    rule.min_matches,
                    rule.keywords.len()
                )));
            }
        }
        if self.default_category.trim().is_empty() {
            return Err(RulesError::Invalid("empty default category".into()));
        }
        Ok(())
    }
}
