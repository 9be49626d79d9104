//! Feature Extractor - derives entities, actions, concepts, episodes and
//! procedures from raw text.
//!
//! Extraction works as follows:
//! 1. **Normalize**: Lowercase the input once
//! 2. **Scan**: Test every vocabulary term for substring containment
//! 3. **Gate**: Concepts and episodes fire on any trigger term
//! 4. **Co-occur**: Procedures need several triggers present together
//!
//! Output order always follows table order, so identical text and tables
//! give identical results.

mod association;

pub use association::*;

use memory_rules::RuleSet;
use serde::{Deserialize, Serialize};

/// An episode produced by a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeCandidate {
    pub event: String,
    pub context: String,
}

/// Everything the extractor found in one text.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Extraction {
    pub entities: Vec<String>,
    pub actions: Vec<String>,
    pub concepts: Vec<String>,
    pub episodes: Vec<EpisodeCandidate>,
    pub procedures: Vec<String>,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
            && self.actions.is_empty()
            && self.concepts.is_empty()
            && self.episodes.is_empty()
            && self.procedures.is_empty()
    }
}

/// Rule-based feature extractor over a fixed [`RuleSet`].
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    rules: RuleSet,
}

impl FeatureExtractor {
    /// Create an extractor over the given tables.
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    /// Create an extractor over the built-in tables.
    pub fn with_defaults() -> Self {
        Self::new(RuleSet::default())
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Run every sub-extractor over `text`.
    pub fn extract(&self, text: &str) -> Extraction {
        let lower = text.to_lowercase();
        Extraction {
            entities: self.entities_in(&lower),
            actions: self.actions_in(&lower),
            concepts: self.concepts_in(&lower),
            episodes: self.episodes_in(&lower),
            procedures: self.procedures_in(&lower),
        }
    }

    pub fn entities(&self, text: &str) -> Vec<String> {
        self.entities_in(&text.to_lowercase())
    }

    pub fn actions(&self, text: &str) -> Vec<String> {
        self.actions_in(&text.to_lowercase())
    }

    pub fn concepts(&self, text: &str) -> Vec<String> {
        self.concepts_in(&text.to_lowercase())
    }

    pub fn episodes(&self, text: &str) -> Vec<EpisodeCandidate> {
        self.episodes_in(&text.to_lowercase())
    }

    pub fn procedures(&self, text: &str) -> Vec<String> {
        self.procedures_in(&text.to_lowercase())
    }

    /// Semantic category a concept is filed under.
    pub fn categorize(&self, concept: &str) -> &str {
        self.rules.category_for(concept)
    }

    fn entities_in(&self, lower: &str) -> Vec<String> {
        self.rules
            .entities
            .iter()
            .filter(|term| lower.contains(term.as_str()))
            .cloned()
            .collect()
    }

    fn actions_in(&self, lower: &str) -> Vec<String> {
        self.rules
            .actions
            .iter()
            .filter(|term| lower.contains(term.as_str()))
            .cloned()
            .collect()
    }

    fn concepts_in(&self, lower: &str) -> Vec<String> {
        self.rules
            .concepts
            .iter()
            .filter(|rule| rule.fires(lower))
            .map(|rule| rule.concept.clone())
            .collect()
    }

    fn episodes_in(&self, lower: &str) -> Vec<EpisodeCandidate> {
        self.rules
            .episodes
            .iter()
            .filter(|template| template.fires(lower))
            .map(|template| EpisodeCandidate {
                event: template.event.clone(),
                context: template.context.clone(),
            })
            .collect()
    }

    fn procedures_in(&self, lower: &str) -> Vec<String> {
        self.rules
            .procedures
            .iter()
            .filter(|rule| rule.fires(lower))
            .map(|rule| rule.procedure.clone())
            .collect()
    }
}

/// Split text into trimmed, non-empty sentences on runs of `.`, `!`, `?`.
pub fn sentences(text: &str) -> Vec<&str> {
    text.split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// The first sentence mentioning `term` (case-insensitive), trimmed and
/// cut to `max_chars` characters with a trailing ellipsis.
pub fn context_snippet(text: &str, term: &str, max_chars: usize) -> String {
    let term = term.to_lowercase();
    text.split(['.', '!', '?'])
        .find(|s| s.to_lowercase().contains(&term))
        .map(|s| format!("{}...", truncate_chars(s.trim(), max_chars)))
        .unwrap_or_default()
}

/// The first `max_chars` characters of `s`.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memory_rules::{ConceptRule, ProcedureRule};

    const CAFE_STORY: &str = "Sarah walked into the coffee shop on Maple Street. \
        She ordered her usual latte and opened her laptop at the corner table. \
        Her morning routine always started with work on the quarterly report.";

    #[test]
    fn test_entities_in_vocabulary_order() {
        let extractor = FeatureExtractor::with_defaults();
        let entities = extractor.entities(CAFE_STORY);
        assert_eq!(
            entities,
            vec![
                "sarah",
                "coffee shop",
                "maple street",
                "corner table",
                "laptop",
                "latte",
                "report"
            ]
        );
    }

    #[test]
    fn test_actions() {
        let extractor = FeatureExtractor::with_defaults();
        assert_eq!(extractor.actions(CAFE_STORY), vec!["walked", "opened", "work"]);
    }

    #[test]
    fn test_concepts_and_categories() {
        let extractor = FeatureExtractor::with_defaults();
        let concepts = extractor.concepts(CAFE_STORY);
        assert_eq!(concepts, vec!["coffee culture", "morning routine", "work habits"]);
        assert_eq!(extractor.categorize("work habits"), "professional");
    }

    #[test]
    fn test_episode_is_literal_template() {
        let extractor = FeatureExtractor::with_defaults();
        let episodes = extractor.episodes("Just a COFFEE.");
        assert_eq!(episodes.len(), 1);
        assert_eq!(episodes[0].event, "Coffee shop experience");
        assert_eq!(episodes[0].context, "Professional routine with personal connections");
    }

    #[test]
    fn test_procedures_need_co_occurrence() {
        let extractor = FeatureExtractor::with_defaults();
        assert!(extractor.procedures("coffee, coffee, coffee").is_empty());
        assert_eq!(
            extractor.procedures("My coffee routine, then the subway."),
            vec!["coffee shop routine", "transit navigation"]
        );
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let extractor = FeatureExtractor::with_defaults();
        assert_eq!(extractor.extract(CAFE_STORY), extractor.extract(CAFE_STORY));
    }

    #[test]
    fn test_extraction_total_on_odd_input() {
        let extractor = FeatureExtractor::with_defaults();
        for text in ["", "   ", "!!!???...", "ß漢字🙂", "\u{0}\u{FFFF}"] {
            assert!(extractor.extract(text).is_empty(), "unexpected output for {:?}", text);
        }
    }

    #[test]
    fn test_minimal_tables() {
        let mut rules = RuleSet::empty();
        rules.entities.names = vec!["ada".to_string()];
        rules.concepts = vec![ConceptRule::new("engines", "machines", &["engine"])];
        rules.procedures = vec![ProcedureRule::all_of("programming", &["engine", "notes"])];

        let extractor = FeatureExtractor::new(rules);
        let out = extractor.extract("Ada wrote notes on the analytical engine.");

        assert_eq!(out.entities, vec!["ada"]);
        assert!(out.actions.is_empty());
        assert_eq!(out.concepts, vec!["engines"]);
        assert_eq!(out.procedures, vec!["programming"]);
        assert_eq!(extractor.categorize("engines"), "machines");
    }

    #[test]
    fn test_sentences() {
        assert_eq!(
            sentences("One. Two!  Three?? ...Four"),
            vec!["One", "Two", "Three", "Four"]
        );
        assert!(sentences("...").is_empty());
    }

    #[test]
    fn test_context_snippet() {
        let text = "It rained. Sarah brought coffee to the office. Then home.";
        assert_eq!(
            context_snippet(text, "COFFEE", 100),
            "Sarah brought coffee to the office..."
        );
        assert_eq!(context_snippet(text, "coffee", 5), "Sarah...");
        assert_eq!(context_snippet(text, "tea", 100), "");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("ab", 10), "ab");
    }
}
