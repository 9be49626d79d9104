//! Folding sessions into consolidated knowledge.

use memory_rules::{KnowledgeEntityRule, KnowledgeKind, ReinforcementConfig, RuleSet};
use tracing::debug;

use crate::extraction::context_snippet;

use super::{ConsolidatedKnowledge, StoredSession};

const DESCRIPTION_CHARS: usize = 100;

/// Updates the four consolidated-knowledge maps from one session.
///
/// - entities: canonical entities present in the text, noted with their
///   first matching context term (or the default category)
/// - behaviors: procedures the session learned, noted with its title
/// - locations: location terms present in the text, noted with the first
///   sentence mentioning them
/// - concepts: concepts filed in the session, noted with their category
#[derive(Debug, Clone)]
pub struct ConsolidatedKnowledgeAggregator {
    entities: Vec<KnowledgeEntityRule>,
    locations: Vec<String>,
    default_context: String,
    reinforcement: ReinforcementConfig,
}

impl ConsolidatedKnowledgeAggregator {
    pub fn new(rules: &RuleSet, reinforcement: ReinforcementConfig) -> Self {
        Self {
            entities: rules.knowledge_entities.clone(),
            locations: rules.title_locations.clone(),
            default_context: rules.default_category.clone(),
            reinforcement,
        }
    }

    pub fn update(&self, knowledge: &mut ConsolidatedKnowledge, session: &StoredSession) {
        let lower = session.story_text.to_lowercase();
        let mut observed = 0usize;

        for rule in self.entities.iter().filter(|r| lower.contains(&r.name)) {
            let context = rule
                .context_in(&lower)
                .unwrap_or(self.default_context.as_str())
                .to_string();
            knowledge.observe(KnowledgeKind::Entities, &rule.name, context, &self.reinforcement);
            observed += 1;
        }

        for procedure in &session.memory_state.procedural {
            knowledge.observe(
                KnowledgeKind::Behaviors,
                procedure,
                session.story_title.clone(),
                &self.reinforcement,
            );
            observed += 1;
        }

        for location in self.locations.iter().filter(|l| lower.contains(l.as_str())) {
            let description = context_snippet(&session.story_text, location, DESCRIPTION_CHARS);
            knowledge.observe(KnowledgeKind::Locations, location, description, &self.reinforcement);
            observed += 1;
        }

        for (category, concepts) in &session.memory_state.semantic {
            for concept in concepts {
                knowledge.observe(
                    KnowledgeKind::Concepts,
                    concept,
                    category.clone(),
                    &self.reinforcement,
                );
                observed += 1;
            }
        }

        debug!(session = %session.id, observed, "Consolidated knowledge updated");
    }
}
