//! Cross-Session Pattern Store - the persisted, process-wide memory.

use chrono::{DateTime, Duration, Utc};
use memory_rules::{EngineConfig, PatternType, RuleSet, SessionId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::extraction::context_snippet;
use crate::layered::MemoryState;
use crate::storage::{StorageBackend, DEFAULT_STORAGE_KEY};

use super::{
    story_title, ConsolidatedKnowledgeAggregator, CrossStoryPattern, PatternOccurrence,
    PersistentMemory, StoredSession,
};

const CONTEXT_CHARS: usize = 100;

/// Summary of one active cross-story pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSummary {
    pub pattern: String,
    #[serde(rename = "type")]
    pub pattern_type: PatternType,
    pub strength: f32,
    /// Number of recorded occurrences.
    pub connections: usize,
    /// Seen within the recent-activity window.
    pub recent_activity: bool,
    /// Whether the queried session contributed an occurrence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_session: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternStrength {
    pub pattern: String,
    pub strength: f32,
}

/// Sessions stored on one UTC calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthPoint {
    /// `YYYY-MM-DD`
    pub date: String,
    pub sessions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStatistics {
    pub total_sessions: usize,
    pub total_patterns: usize,
    pub strongest_connections: Vec<PatternStrength>,
    pub memory_growth: Vec<GrowthPoint>,
}

/// Accumulates sessions and cross-story patterns across passes.
///
/// Loaded from its backend on [`open`](Self::open) and written back after
/// every mutating call. Storage failures never surface from mutations:
/// reads fall back to an empty blob, failed writes are logged and the
/// in-memory state stays authoritative.
pub struct CrossSessionPatternStore<S: StorageBackend> {
    backend: S,
    key: String,
    memory: PersistentMemory,
    rules: RuleSet,
    config: EngineConfig,
    aggregator: ConsolidatedKnowledgeAggregator,
}

impl<S: StorageBackend> CrossSessionPatternStore<S> {
    /// Load the store from `backend` under the default key.
    pub fn open(backend: S, rules: RuleSet, config: EngineConfig) -> Self {
        Self::open_with_key(backend, DEFAULT_STORAGE_KEY, rules, config)
    }

    pub fn open_with_key(
        backend: S,
        key: impl Into<String>,
        rules: RuleSet,
        config: EngineConfig,
    ) -> Self {
        let key = key.into();
        let memory = load_memory(&backend, &key);
        let aggregator = ConsolidatedKnowledgeAggregator::new(&rules, config.reinforcement.clone());

        Self {
            backend,
            key,
            memory,
            rules,
            config,
            aggregator,
        }
    }

    /// Flush and hand back the backend.
    pub fn close(mut self) -> S {
        self.persist();
        self.backend
    }

    /// Write the blob to the backend.
    pub fn flush(&mut self) -> Result<()> {
        let json = serde_json::to_string(&self.memory)?;
        self.backend.save(&self.key, &json)
    }

    fn persist(&mut self) {
        if let Err(e) = self.flush() {
            error!(key = %self.key, error = %e, "Failed to save persistent memory");
        }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Read-only view of the persisted blob.
    pub fn knowledge(&self) -> &PersistentMemory {
        &self.memory
    }

    /// Independent copy of the persisted blob.
    pub fn existing_knowledge(&self) -> PersistentMemory {
        self.memory.clone()
    }

    /// Ingest one finished pass.
    pub fn add_session(&mut self, text: &str, state: &MemoryState) -> SessionId {
        self.add_session_at(text, state, Utc::now())
    }

    pub fn add_session_at(
        &mut self,
        text: &str,
        state: &MemoryState,
        now: DateTime<Utc>,
    ) -> SessionId {
        let id = SessionId::stamped(now);
        let title = story_title(text, &self.rules.title_locations);
        let session = StoredSession::new(id.clone(), now, title, text, state.clone());

        let (created, reinforced) = self.update_patterns(&session, now);
        self.aggregator
            .update(&mut self.memory.consolidated_knowledge, &session);
        self.memory.all_sessions.push(session);

        let max = self.config.capacity.max_sessions;
        let len = self.memory.all_sessions.len();
        if len > max {
            self.memory.all_sessions.drain(..len - max);
        }

        info!(
            session = %id,
            created,
            reinforced,
            sessions = self.memory.all_sessions.len(),
            "Stored memory session"
        );
        self.persist();
        id
    }

    /// Reinforce or create each mined pattern. Returns (created, reinforced).
    fn update_patterns(&mut self, session: &StoredSession, now: DateTime<Utc>) -> (usize, usize) {
        let mut created = 0;
        let mut reinforced = 0;

        for (pattern_type, pattern, occurrence) in self.mine_patterns(session) {
            match self
                .memory
                .cross_story_patterns
                .iter_mut()
                .find(|p| p.is(pattern_type, &pattern))
            {
                Some(existing) => {
                    existing.reinforce(occurrence, &self.config.reinforcement, now);
                    debug!(
                        %pattern_type,
                        %pattern,
                        strength = existing.strength,
                        "Reinforced pattern"
                    );
                    reinforced += 1;
                }
                None => {
                    debug!(%pattern_type, %pattern, strength = occurrence.strength, "New pattern");
                    self.memory.cross_story_patterns.push(CrossStoryPattern::first_sighting(
                        pattern_type,
                        pattern,
                        occurrence,
                        now,
                    ));
                    created += 1;
                }
            }
        }

        (created, reinforced)
    }

    /// Candidate patterns in a session: recurring entities, behavioral
    /// sequences, then semantic clusters.
    fn mine_patterns(
        &self,
        session: &StoredSession,
    ) -> Vec<(PatternType, String, PatternOccurrence)> {
        let lower = session.story_text.to_lowercase();
        let seeds = &self.config.pattern_seed;
        let mut mined = Vec::new();

        let mut push = |pattern_type: PatternType, pattern: &str, context: String| {
            let strength = seeds.seed_for(pattern_type).unwrap_or_default();
            mined.push((
                pattern_type,
                pattern.to_string(),
                PatternOccurrence {
                    session_id: session.id.clone(),
                    context,
                    strength,
                },
            ));
        };

        for entity in self.rules.recurring_entities.iter().filter(|e| lower.contains(e.as_str())) {
            let context = context_snippet(&session.story_text, entity, CONTEXT_CHARS);
            push(PatternType::RecurringEntity, entity, context);
        }

        for rule in self.rules.behaviors.iter().filter(|b| b.detected(&lower)) {
            let context = format!("Behavioral pattern: {}", rule.behavior);
            push(PatternType::BehavioralSequence, &rule.behavior, context);
        }

        for cluster in self.clusters_in_filing_order(session, &lower) {
            let context = format!("Semantic domain: {}", cluster);
            push(PatternType::SemanticCluster, cluster, context);
        }

        mined
    }

    /// Non-empty semantic categories of a session, in the order a pass over
    /// its text first files them. Categories the text does not explain
    /// follow in map order.
    fn clusters_in_filing_order<'s>(
        &self,
        session: &'s StoredSession,
        lower: &str,
    ) -> Vec<&'s str> {
        let present: Vec<&'s str> = session
            .memory_state
            .semantic_clusters()
            .map(String::as_str)
            .collect();

        let mut ordered: Vec<&'s str> = Vec::with_capacity(present.len());
        for rule in self.rules.concepts.iter().filter(|r| r.fires(lower)) {
            let category = self.rules.category_for(&rule.concept);
            if let Some(cluster) = present.iter().find(|c| **c == category) {
                if !ordered.contains(cluster) {
                    ordered.push(*cluster);
                }
            }
        }
        for cluster in present {
            if !ordered.contains(&cluster) {
                ordered.push(cluster);
            }
        }
        ordered
    }

    /// Patterns above the minimum strength, strongest first.
    ///
    /// With a session given, each summary also says whether that session
    /// contributed an occurrence.
    pub fn cross_story_connections(&self, session: Option<&SessionId>) -> Vec<ConnectionSummary> {
        self.cross_story_connections_at(session, Utc::now())
    }

    pub fn cross_story_connections_at(
        &self,
        session: Option<&SessionId>,
        now: DateTime<Utc>,
    ) -> Vec<ConnectionSummary> {
        let window = Duration::hours(self.config.connections.recent_window_hours);
        let mut summaries: Vec<ConnectionSummary> = self
            .memory
            .cross_story_patterns
            .iter()
            .filter(|p| p.strength > self.config.connections.min_strength)
            .map(|p| ConnectionSummary {
                pattern: p.pattern.clone(),
                pattern_type: p.pattern_type,
                strength: p.strength,
                connections: p.connections(),
                recent_activity: p.seen_within(window, now),
                in_session: session.map(|id| p.occurs_in(id)),
            })
            .collect();

        summaries.sort_by(|a, b| b.strength.total_cmp(&a.strength));
        summaries
    }

    /// Stored sessions, most recent first.
    pub fn session_history(&self) -> Vec<StoredSession> {
        self.memory.all_sessions.iter().rev().cloned().collect()
    }

    pub fn statistics(&self) -> MemoryStatistics {
        let mut ranked: Vec<&CrossStoryPattern> = self.memory.cross_story_patterns.iter().collect();
        ranked.sort_by(|a, b| b.strength.total_cmp(&a.strength));

        let strongest_connections = ranked
            .into_iter()
            .take(self.config.capacity.strongest_connections)
            .map(|p| PatternStrength {
                pattern: p.pattern.clone(),
                strength: p.strength,
            })
            .collect();

        let mut by_date: BTreeMap<String, usize> = BTreeMap::new();
        for session in &self.memory.all_sessions {
            *by_date
                .entry(session.timestamp.format("%Y-%m-%d").to_string())
                .or_default() += 1;
        }

        MemoryStatistics {
            total_sessions: self.memory.all_sessions.len(),
            total_patterns: self.memory.cross_story_patterns.len(),
            strongest_connections,
            memory_growth: by_date
                .into_iter()
                .map(|(date, sessions)| GrowthPoint { date, sessions })
                .collect(),
        }
    }

    /// The blob as pretty-printed JSON.
    pub fn export_json(&self) -> Result<String> {
        self.memory.to_json_pretty()
    }

    /// Replace the blob with an imported one.
    ///
    /// Fails with [`MemoryError::MalformedImport`](crate::MemoryError::MalformedImport)
    /// if the text is not a JSON object, leaving the current state untouched.
    pub fn import_json(&mut self, json: &str) -> Result<()> {
        match PersistentMemory::from_json_str(json) {
            Ok(memory) => {
                self.memory = memory;
                info!(
                    sessions = self.memory.all_sessions.len(),
                    patterns = self.memory.cross_story_patterns.len(),
                    "Imported memory data"
                );
                self.persist();
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Failed to import memory data");
                Err(e)
            }
        }
    }

    /// Forget everything and persist the empty blob.
    pub fn clear_all_memory(&mut self) {
        self.memory = PersistentMemory::new();
        info!("Cleared all persistent memory");
        self.persist();
    }
}

fn load_memory<S: StorageBackend>(backend: &S, key: &str) -> PersistentMemory {
    match backend.load(key) {
        Ok(Some(json)) => match PersistentMemory::from_json_str(&json) {
            Ok(memory) => {
                info!(
                    key,
                    sessions = memory.all_sessions.len(),
                    patterns = memory.cross_story_patterns.len(),
                    "Loaded persistent memory"
                );
                memory
            }
            Err(e) => {
                warn!(key, error = %e, "Stored memory unreadable, starting empty");
                PersistentMemory::new()
            }
        },
        Ok(None) => {
            info!(key, "No stored memory, starting empty");
            PersistentMemory::new()
        }
        Err(e) => {
            warn!(key, error = %e, "Failed to load persistent memory, starting empty");
            PersistentMemory::new()
        }
    }
}
