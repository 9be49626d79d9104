//! Individual rule entries making up a [`RuleSet`](super::RuleSet).

use serde::{Deserialize, Serialize};

/// True if `text` contains any of `terms`.
pub fn contains_any(text: &str, terms: &[String]) -> bool {
    terms.iter().any(|t| text.contains(t.as_str()))
}

/// Number of `terms` contained in `text`.
pub fn count_present(text: &str, terms: &[String]) -> usize {
    terms.iter().filter(|t| text.contains(t.as_str())).count()
}

/// A concept that fires when any trigger term is present, filed under a
/// semantic category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptRule {
    pub concept: String,
    pub category: String,
    pub triggers: Vec<String>,
}

impl ConceptRule {
    pub fn new(concept: &str, category: &str, triggers: &[&str]) -> Self {
        Self {
            concept: concept.to_string(),
            category: category.to_string(),
            triggers: owned(triggers),
        }
    }

    /// Check the rule against already-lowercased text.
    pub fn fires(&self, lower: &str) -> bool {
        contains_any(lower, &self.triggers)
    }
}

/// A literal episode emitted when any trigger term is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeTemplate {
    pub event: String,
    pub context: String,
    pub triggers: Vec<String>,
}

impl EpisodeTemplate {
    pub fn new(event: &str, context: &str, triggers: &[&str]) -> Self {
        Self {
            event: event.to_string(),
            context: context.to_string(),
            triggers: owned(triggers),
        }
    }

    pub fn fires(&self, lower: &str) -> bool {
        contains_any(lower, &self.triggers)
    }
}

/// A procedure recognized when enough of its triggers co-occur.
///
/// Without an explicit `min_matches` every trigger must be present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcedureRule {
    pub procedure: String,
    pub triggers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_matches: Option<usize>,
}

impl ProcedureRule {
    /// A rule requiring all of `triggers`.
    pub fn all_of(procedure: &str, triggers: &[&str]) -> Self {
        Self {
            procedure: procedure.to_string(),
            triggers: owned(triggers),
            min_matches: None,
        }
    }

    /// A rule requiring any one of `triggers`.
    pub fn any_of(procedure: &str, triggers: &[&str]) -> Self {
        Self {
            procedure: procedure.to_string(),
            triggers: owned(triggers),
            min_matches: Some(1),
        }
    }

    pub fn required_matches(&self) -> usize {
        self.min_matches.unwrap_or(self.triggers.len())
    }

    pub fn fires(&self, lower: &str) -> bool {
        !self.triggers.is_empty() && count_present(lower, &self.triggers) >= self.required_matches()
    }
}

fn default_behavior_matches() -> usize {
    2
}

/// A behavioral sequence detected from a keyword set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorRule {
    pub behavior: String,
    pub keywords: Vec<String>,
    #[serde(default = "default_behavior_matches")]
    pub min_matches: usize,
}

impl BehaviorRule {
    pub fn new(behavior: &str, keywords: &[&str]) -> Self {
        Self {
            behavior: behavior.to_string(),
            keywords: owned(keywords),
            min_matches: default_behavior_matches(),
        }
    }

    pub fn detected(&self, lower: &str) -> bool {
        count_present(lower, &self.keywords) >= self.min_matches
    }
}

/// A canonical entity tracked in consolidated knowledge, with the context
/// vocabulary used to tag each sighting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntityRule {
    pub name: String,
    pub contexts: Vec<String>,
}

impl KnowledgeEntityRule {
    pub fn new(name: &str, contexts: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            contexts: owned(contexts),
        }
    }

    /// First context term present in the text, if any.
    pub fn context_in<'a>(&'a self, lower: &str) -> Option<&'a str> {
        self.contexts
            .iter()
            .find(|c| lower.contains(c.as_str()))
            .map(|c| c.as_str())
    }
}

/// A known relationship between two concept fragments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipPair {
    pub left: String,
    pub right: String,
}

impl RelationshipPair {
    pub fn new(left: &str, right: &str) -> Self {
        Self {
            left: left.to_string(),
            right: right.to_string(),
        }
    }

    /// Order-insensitive containment match.
    pub fn matches(&self, a: &str, b: &str) -> bool {
        (a.contains(&self.left) && b.contains(&self.right))
            || (a.contains(&self.right) && b.contains(&self.left))
    }
}

pub(crate) fn owned(terms: &[&str]) -> Vec<String> {
    terms.iter().map(|t| t.to_string()).collect()
}
