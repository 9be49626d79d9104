//! Event Scheduler - runs one processing pass over a text.
//!
//! A pass walks through ordered virtual-time stages, writing into a
//! [`LayeredMemoryStore`] and logging one [`MemoryEvent`] per step:
//! 1. **History**: announce accessible past sessions
//! 2. **Perception**: first sentences into short-term memory
//! 3. **Working memory**: entities, then actions
//! 4. **Semantic**: concepts filed by category
//! 5. **Episodic**: templated episodes, compared against past sessions
//! 6. **Associative**: working items linked to concepts, then to patterns
//! 7. **Procedural**: recognized procedures
//! 8. **Consolidation**: working items into long-term and flash, then decay
//!
//! The existing knowledge is only read; the caller commits the finished
//! state to the pattern store.

use chrono::{DateTime, Utc};
use memory_rules::{ConnectionType, EngineConfig, EventAction, MemoryKind, RuleSet};
use rand::Rng;
use tracing::debug;

use crate::events::{CrossStoryConnection, EventLog, MemoryEvent};
use crate::extraction::{sentences, truncate_chars, AssociationScorer, Extraction, FeatureExtractor};
use crate::knowledge_base::{CrossStoryPattern, KnowledgeEntry, PersistentMemory};
use crate::layered::{CrossStoryLink, LayeredMemoryStore, MemoryState};

const PERCEPTION_PREVIEW_CHARS: usize = 40;

/// Schedules the events of a processing pass.
#[derive(Debug, Clone)]
pub struct EventScheduler {
    extractor: FeatureExtractor,
    scorer: AssociationScorer,
    config: EngineConfig,
}

impl EventScheduler {
    pub fn new(rules: RuleSet, config: EngineConfig) -> Self {
        let scorer = AssociationScorer::from_rules(&rules, &config);
        Self {
            extractor: FeatureExtractor::new(rules),
            scorer,
            config,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(RuleSet::default(), EngineConfig::default())
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run a pass, stamping episodes with the current wall clock.
    pub fn run<R: Rng + ?Sized>(
        &self,
        text: &str,
        knowledge: &PersistentMemory,
        rng: &mut R,
    ) -> (Vec<MemoryEvent>, MemoryState) {
        self.run_at(text, knowledge, rng, Utc::now())
    }

    /// Run a pass with an explicit wall clock for episode records.
    pub fn run_at<R: Rng + ?Sized>(
        &self,
        text: &str,
        knowledge: &PersistentMemory,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> (Vec<MemoryEvent>, MemoryState) {
        let extraction = self.extractor.extract(text);
        let mut pass = Pass {
            scheduler: self,
            knowledge,
            extraction: &extraction,
            log: EventLog::new(),
            store: LayeredMemoryStore::new(self.config.capacity.flash),
        };

        pass.history();
        pass.perception(text);
        pass.working_memory();
        pass.semantic();
        pass.episodic(now);
        pass.associative(rng);
        pass.cross_association();
        pass.procedural();
        pass.consolidation();

        debug!(
            events = pass.log.len(),
            entities = extraction.entities.len(),
            concepts = extraction.concepts.len(),
            links = pass.store.state().cross_story_links.len(),
            "Processing pass scheduled"
        );

        (pass.log.into_events(), pass.store.into_state())
    }
}

/// Token-overlap similarity of two episode labels.
///
/// Words of `a` (duplicates included) that appear in `b`, divided by the
/// longer word count.
pub fn episode_similarity(a: &str, b: &str) -> f32 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    let words_a: Vec<&str> = a.split(' ').collect();
    let words_b: Vec<&str> = b.split(' ').collect();

    let shared = words_a.iter().filter(|w| words_b.contains(w)).count();
    shared as f32 / words_a.len().max(words_b.len()) as f32
}

fn connection_to(pattern: &CrossStoryPattern) -> CrossStoryConnection {
    CrossStoryConnection {
        pattern: pattern.pattern.clone(),
        previous_occurrences: pattern.occurrences.len(),
        strength: pattern.strength,
    }
}

fn connection_to_entry<E: KnowledgeEntry>(key: &str, entry: &E) -> CrossStoryConnection {
    CrossStoryConnection {
        pattern: key.to_string(),
        previous_occurrences: entry.count() as usize,
        strength: entry.strength(),
    }
}

/// State of one pass in progress.
struct Pass<'a> {
    scheduler: &'a EventScheduler,
    knowledge: &'a PersistentMemory,
    extraction: &'a Extraction,
    log: EventLog,
    store: LayeredMemoryStore,
}

impl Pass<'_> {
    fn config(&self) -> &EngineConfig {
        &self.scheduler.config
    }

    fn history(&mut self) {
        let sessions = self.knowledge.all_sessions.len();
        if sessions == 0 {
            return;
        }
        self.log.emit(
            self.config().schedule.history.at(0),
            MemoryKind::CrossStoryMemory,
            EventAction::CrossReference,
            format!("Accessing {} previous memory sessions", sessions),
            "Loading patterns, entities, and knowledge from past experiences",
            None,
        );
    }

    fn perception(&mut self, text: &str) {
        let window = self.config().schedule.perception;
        let threshold = self.config().recall.perception_pattern_threshold;
        let limit = self.config().capacity.short_term_sentences;

        for (i, sentence) in sentences(text).into_iter().take(limit).enumerate() {
            self.store.perceive(sentence);

            let lower = sentence.to_lowercase();
            let recognized: Vec<&CrossStoryPattern> = self
                .knowledge
                .cross_story_patterns
                .iter()
                .filter(|p| lower.contains(&p.pattern.to_lowercase()) && p.strength > threshold)
                .collect();

            let details = if recognized.is_empty() {
                "Raw sensory input captured in short-term buffer".to_string()
            } else {
                format!(
                    "Raw input captured. Recognized {} familiar patterns.",
                    recognized.len()
                )
            };

            self.log.emit(
                window.at(i),
                MemoryKind::ShortTerm,
                EventAction::Store,
                format!(
                    "Initial perception: \"{}...\"",
                    truncate_chars(sentence, PERCEPTION_PREVIEW_CHARS)
                ),
                details,
                recognized.first().map(|p| connection_to(p)),
            );
        }
    }

    fn working_memory(&mut self) {
        let window = self.config().schedule.working;
        let known = &self.knowledge.consolidated_knowledge.entities;

        for (i, entity) in self.extraction.entities.iter().enumerate() {
            self.store.hold(entity.as_str());
            let history = known.get(entity);

            let details = match history {
                Some(h) => format!(
                    "Active manipulation and analysis. Previously seen {} times.",
                    h.count
                ),
                None => "Active manipulation and analysis of perceived information".to_string(),
            };

            self.log.emit(
                window.at(i),
                MemoryKind::Working,
                EventAction::Process,
                format!("Processing entity: {}", entity),
                details,
                history.map(|h| connection_to_entry(entity, h)),
            );

            if let Some(h) = history {
                self.store.link(CrossStoryLink {
                    current_item: entity.clone(),
                    linked_pattern: format!("{} ({} previous occurrences)", entity, h.count),
                    connection_type: ConnectionType::EntityRecognition,
                    strength: h.strength,
                });
            }
        }

        let offset = self.extraction.entities.len();
        for (i, action) in self.extraction.actions.iter().enumerate() {
            self.store.hold(action.as_str());
            self.log.emit(
                window.at(offset + i),
                MemoryKind::Working,
                EventAction::Process,
                format!("Processing action: {}", action),
                "Analyzing behavioral patterns and sequences",
                None,
            );
        }
    }

    fn semantic(&mut self) {
        let window = self.config().schedule.semantic;
        let known = &self.knowledge.consolidated_knowledge.concepts;

        for (i, concept) in self.extraction.concepts.iter().enumerate() {
            let category = self.scheduler.extractor.categorize(concept);
            self.store.file_concept(category, concept.as_str());
            let existing = known.get(concept);

            let details = match existing {
                Some(c) => format!(
                    "Building on existing knowledge base. Concept reinforced {} times.",
                    c.count
                ),
                None => "Integrating factual information into knowledge base".to_string(),
            };

            self.log.emit(
                window.at(i),
                MemoryKind::Semantic,
                EventAction::Store,
                format!("Storing knowledge: {} → {}", concept, category),
                details,
                existing.map(|c| connection_to_entry(concept, c)),
            );

            if let Some(c) = existing {
                self.store.link(CrossStoryLink {
                    current_item: concept.clone(),
                    linked_pattern: format!("{} knowledge network", concept),
                    connection_type: ConnectionType::SemanticReinforcement,
                    strength: c.strength,
                });
            }
        }
    }

    fn episodic(&mut self, now: DateTime<Utc>) {
        let window = self.config().schedule.episodic;
        let recall = self.config().recall.clone();

        for (i, episode) in self.extraction.episodes.iter().enumerate() {
            self.store.record_episode(episode, now);

            let similar = self
                .knowledge
                .all_sessions
                .iter()
                .flat_map(|s| s.memory_state.episodic.iter())
                .filter(|past| {
                    episode_similarity(&episode.event, &past.event)
                        > recall.episode_similarity_threshold
                })
                .count();

            let (details, connection) = if similar == 0 {
                (format!("Context: {}", episode.context), None)
            } else {
                (
                    format!(
                        "Context: {}. Similar to {} previous experiences.",
                        episode.context, similar
                    ),
                    Some(CrossStoryConnection {
                        pattern: format!("{} (pattern)", episode.event),
                        previous_occurrences: similar,
                        strength: recall.episode_annotation_strength,
                    }),
                )
            };

            self.log.emit(
                window.at(i),
                MemoryKind::Episodic,
                EventAction::Store,
                format!("Encoding episode: {}", episode.event),
                details,
                connection,
            );

            if similar > 0 {
                self.store.link(CrossStoryLink {
                    current_item: episode.event.clone(),
                    linked_pattern: format!("Similar experiences ({})", similar),
                    connection_type: ConnectionType::EpisodicPattern,
                    strength: (similar as f32 * recall.episode_link_step).min(1.0),
                });
            }
        }
    }

    /// Concepts in the order their categories were first filed.
    fn concepts_by_category(&self) -> Vec<&str> {
        let mut categories: Vec<&str> = Vec::new();
        for concept in &self.extraction.concepts {
            let category = self.scheduler.extractor.categorize(concept);
            if !categories.contains(&category) {
                categories.push(category);
            }
        }

        categories
            .into_iter()
            .flat_map(|category| {
                self.extraction
                    .concepts
                    .iter()
                    .filter(move |c| self.scheduler.extractor.categorize(c) == category)
                    .map(String::as_str)
            })
            .collect()
    }

    fn associative<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let window = self.config().schedule.associative;
        let working = self.store.state().working_memory.clone();
        let concepts: Vec<String> = self
            .concepts_by_category()
            .into_iter()
            .map(str::to_string)
            .collect();

        for (i, item) in working.iter().enumerate() {
            for (j, concept) in concepts.iter().enumerate() {
                let Some(strength) = self.scheduler.scorer.associate(item, concept, rng) else {
                    continue;
                };

                self.store.associate(item.as_str(), concept.as_str(), strength);
                self.log.emit(
                    window.at(i * concepts.len() + j),
                    MemoryKind::Associative,
                    EventAction::Associate,
                    format!("Linking: {} ↔ {}", item, concept),
                    format!("Association strength: {:.2}", strength),
                    None,
                );
            }
        }
    }

    fn cross_association(&mut self) {
        let window = self.config().schedule.cross_association;
        let patterns = &self.knowledge.cross_story_patterns;
        if patterns.is_empty() {
            return;
        }

        let working = self.store.state().working_memory.clone();
        for (i, item) in working.iter().enumerate() {
            let item_lower = item.to_lowercase();
            let related: Vec<&CrossStoryPattern> = patterns
                .iter()
                .filter(|p| {
                    let pattern_lower = p.pattern.to_lowercase();
                    item_lower.contains(&pattern_lower) || pattern_lower.contains(&item_lower)
                })
                .collect();

            let Some(first) = related.first() else {
                continue;
            };

            self.log.emit(
                window.at(i),
                MemoryKind::CrossStoryAssociation,
                EventAction::CrossReference,
                format!("Cross-linking: {} with historical patterns", item),
                format!("Found {} connections to previous stories", related.len()),
                Some(connection_to(first)),
            );
        }
    }

    fn procedural(&mut self) {
        let window = self.config().schedule.procedural;
        let known = &self.knowledge.consolidated_knowledge.behaviors;

        for (i, procedure) in self.extraction.procedures.iter().enumerate() {
            self.store.learn_procedure(procedure.as_str());
            let history = known.get(procedure);

            let details = match history {
                Some(b) => format!(
                    "Reinforcing behavioral sequence. Previously practiced {} times.",
                    b.count
                ),
                None => "Encoding behavioral sequence for future execution".to_string(),
            };

            self.log.emit(
                window.at(i),
                MemoryKind::Procedural,
                EventAction::Store,
                format!("Learning procedure: {}", procedure),
                details,
                history.map(|b| connection_to_entry(procedure, b)),
            );
        }
    }

    fn consolidation(&mut self) {
        let schedule = self.config().schedule.clone();
        let category = self.scheduler.extractor.rules().default_category.clone();
        let working = self.store.state().working_memory.clone();

        for (i, item) in working.iter().enumerate() {
            self.store.consolidate(&category, item.as_str());
            self.log.emit(
                schedule.consolidation.at(i),
                MemoryKind::LongTerm,
                EventAction::Consolidate,
                format!("Consolidating: {}", item),
                "Transfer from working to long-term storage + cross-story integration",
                None,
            );
        }

        self.log.emit(
            schedule.cross_consolidation.at(0),
            MemoryKind::CrossStoryConsolidation,
            EventAction::Consolidate,
            "Integrating with persistent memory store",
            "Creating lasting connections between this story and previous experiences",
            None,
        );

        self.log.emit(
            schedule.decay.at(0),
            MemoryKind::ShortTerm,
            EventAction::Process,
            "Memory decay process",
            "Short-term memories naturally fade, but cross-story patterns persist",
            None,
        );
        self.store.decay_short_term();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge_base::{EntityKnowledge, PatternOccurrence, StoredSession};
    use crate::layered::EpisodicRecord;
    use chrono::TimeZone;
    use memory_rules::{PatternType, SessionId};
    use rand::rngs::mock::StepRng;

    const CAFE_STORY: &str = "Sarah walked into the coffee shop on Maple Street. \
        She ordered her usual latte and opened her laptop at the corner table. \
        Her morning routine always started with work on the quarterly report.";

    fn low_rng() -> StepRng {
        StepRng::new(0, 0)
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000).unwrap()
    }

    fn run(text: &str, knowledge: &PersistentMemory) -> (Vec<MemoryEvent>, MemoryState) {
        EventScheduler::with_defaults().run_at(text, knowledge, &mut low_rng(), fixed_now())
    }

    fn pattern(pattern_type: PatternType, name: &str, strength: f32) -> CrossStoryPattern {
        let mut p = CrossStoryPattern::first_sighting(
            pattern_type,
            name,
            PatternOccurrence {
                session_id: SessionId::from_raw("s0"),
                context: String::new(),
                strength,
            },
            fixed_now(),
        );
        p.strength = strength;
        p
    }

    #[test]
    fn test_episode_similarity() {
        assert_eq!(episode_similarity("Coffee shop experience", "coffee shop experience"), 1.0);
        let partial = episode_similarity("Coffee shop experience", "Coffee break");
        assert!((partial - 1.0 / 3.0).abs() < 1e-6);
        assert_eq!(episode_similarity("Fitness training", "Culinary creation"), 0.0);
    }

    #[test]
    fn test_first_pass_compartments() {
        let (_, state) = run(CAFE_STORY, &PersistentMemory::new());

        assert!(state.short_term.is_empty());
        assert_eq!(
            state.working_memory,
            vec![
                "sarah",
                "coffee shop",
                "maple street",
                "corner table",
                "laptop",
                "latte",
                "report",
                "walked",
                "opened",
                "work"
            ]
        );
        assert_eq!(state.semantic["habits"], vec!["coffee culture", "morning routine"]);
        assert_eq!(state.semantic["professional"], vec!["work habits"]);
        assert_eq!(state.episodic.len(), 1);
        assert_eq!(state.episodic[0].timestamp, fixed_now());
        assert_eq!(state.procedural, vec!["coffee shop routine"]);
        assert_eq!(state.long_term["general"].len(), 10);
        assert_eq!(state.flash, vec!["work", "opened", "walked", "report", "latte"]);
        assert!(state.cross_story_links.is_empty());
    }

    #[test]
    fn test_only_strong_associations_retained() {
        let (_, state) = run(CAFE_STORY, &PersistentMemory::new());
        assert!(!state.associative.is_empty());
        assert!(state.associative.iter().all(|a| a.strength > 0.3));

        // "coffee shop" shares a token with "coffee culture".
        assert!(state.associative.iter().any(|a| {
            a.concept1 == "coffee shop" && a.concept2 == "coffee culture" && a.strength == 0.8
        }));
        // "work" matches the work/professional relationship pair.
        assert!(state
            .associative
            .iter()
            .any(|a| a.concept1 == "work" && a.concept2 == "work habits"));
    }

    #[test]
    fn test_high_random_fallback_is_retained() {
        let scheduler = EventScheduler::with_defaults();
        let mut rng = StepRng::new(u64::MAX, 0);
        let (_, state) = scheduler.run_at(
            "Sarah and her mother.",
            &PersistentMemory::new(),
            &mut rng,
            fixed_now(),
        );

        // "sarah" ↔ "family relationships" only scores through the fallback.
        assert!(state
            .associative
            .iter()
            .any(|a| a.concept1 == "sarah" && a.concept2 == "family relationships"));
    }

    #[test]
    fn test_event_order_and_windows() {
        let (events, _) = run(CAFE_STORY, &PersistentMemory::new());

        assert!(events.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert!(events.windows(2).all(|w| w[0].id < w[1].id));

        let first = &events[0];
        assert_eq!(first.memory_type, MemoryKind::ShortTerm);
        assert_eq!(first.timestamp, 100);
        assert_eq!(
            first.content,
            "Initial perception: \"Sarah walked into the coffee shop on Map...\""
        );

        let last = events.last().unwrap();
        assert_eq!(last.timestamp, 11500);
        assert_eq!(last.content, "Memory decay process");
        assert_eq!(events[events.len() - 2].memory_type, MemoryKind::CrossStoryConsolidation);

        let working: Vec<u64> = events
            .iter()
            .filter(|e| e.memory_type == MemoryKind::Working)
            .map(|e| e.timestamp)
            .collect();
        assert_eq!(working[0], 800);
        assert!(working.iter().all(|t| (800..=1600).contains(t)));
    }

    #[test]
    fn test_no_history_event_without_sessions() {
        let (events, _) = run(CAFE_STORY, &PersistentMemory::new());
        assert!(events.iter().all(|e| e.memory_type != MemoryKind::CrossStoryMemory));
    }

    #[test]
    fn test_history_annotations() {
        let mut knowledge = PersistentMemory::new();
        let mut past = MemoryState::new();
        past.episodic.push(EpisodicRecord {
            event: "Coffee shop experience".into(),
            context: String::new(),
            timestamp: fixed_now(),
        });
        knowledge.all_sessions.push(StoredSession::new(
            SessionId::from_raw("s0"),
            fixed_now(),
            "Old".into(),
            "old coffee",
            past,
        ));
        knowledge.consolidated_knowledge.entities.insert(
            "sarah".into(),
            EntityKnowledge {
                count: 3,
                contexts: vec![],
                strength: 0.3,
            },
        );
        knowledge
            .cross_story_patterns
            .push(pattern(PatternType::RecurringEntity, "coffee", 0.9));

        let (events, state) = run(CAFE_STORY, &knowledge);

        assert_eq!(events[0].memory_type, MemoryKind::CrossStoryMemory);
        assert_eq!(events[0].timestamp, 50);
        assert_eq!(events[0].content, "Accessing 1 previous memory sessions");

        let perception = &events[1];
        assert_eq!(
            perception.details,
            "Raw input captured. Recognized 1 familiar patterns."
        );
        assert_eq!(perception.cross_story_connection.as_ref().unwrap().pattern, "coffee");

        let sarah = events
            .iter()
            .find(|e| e.content == "Processing entity: sarah")
            .unwrap();
        assert!(sarah.details.ends_with("Previously seen 3 times."));

        let link_types: Vec<ConnectionType> =
            state.cross_story_links.iter().map(|l| l.connection_type).collect();
        assert_eq!(
            link_types,
            vec![ConnectionType::EntityRecognition, ConnectionType::EpisodicPattern]
        );
        assert_eq!(state.cross_story_links[0].linked_pattern, "sarah (3 previous occurrences)");
        assert!((state.cross_story_links[1].strength - 0.2).abs() < 1e-6);

        let cross: Vec<&MemoryEvent> = events
            .iter()
            .filter(|e| e.memory_type == MemoryKind::CrossStoryAssociation)
            .collect();
        assert_eq!(cross.len(), 1);
        assert_eq!(cross[0].content, "Cross-linking: coffee shop with historical patterns");
    }

    #[test]
    fn test_weak_patterns_not_recognized() {
        let mut knowledge = PersistentMemory::new();
        knowledge
            .cross_story_patterns
            .push(pattern(PatternType::RecurringEntity, "coffee", 0.4));

        let (events, _) = run(CAFE_STORY, &knowledge);
        assert!(events
            .iter()
            .filter(|e| e.memory_type == MemoryKind::ShortTerm)
            .all(|e| e.cross_story_connection.is_none()));
    }

    #[test]
    fn test_empty_text() {
        let (events, state) = run("", &PersistentMemory::new());
        assert_eq!(events.len(), 2);
        assert_eq!(state, MemoryState::new());
    }
}
