//! Memory Engine - one call per text: run a pass, commit it, report back.

use chrono::{DateTime, Utc};
use memory_rules::{EngineConfig, RuleSet, SessionId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::events::MemoryEvent;
use crate::knowledge_base::{
    ConnectionSummary, CrossSessionPatternStore, MemoryStatistics, PersistentMemory, StoredSession,
};
use crate::layered::MemoryState;
use crate::scheduler::EventScheduler;
use crate::storage::StorageBackend;

/// Everything a caller gets back from processing one text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOutcome {
    pub events: Vec<MemoryEvent>,
    pub final_state: MemoryState,
    pub session_id: SessionId,
    /// Active connections after this session was committed.
    pub cross_story_connections: Vec<ConnectionSummary>,
}

/// Couples the event scheduler with an injected pattern store.
///
/// Passes run to completion one at a time; each one reads the store's
/// existing knowledge, then commits exactly one session.
pub struct MemoryEngine<S: StorageBackend, R: Rng = StdRng> {
    scheduler: EventScheduler,
    store: CrossSessionPatternStore<S>,
    rng: R,
}

impl<S: StorageBackend> MemoryEngine<S, StdRng> {
    /// Engine over `store` with an entropy-seeded random source.
    pub fn new(store: CrossSessionPatternStore<S>) -> Self {
        Self::with_rng(store, StdRng::from_entropy())
    }

    /// Open a store on `backend` and wrap it.
    pub fn open(backend: S, rules: RuleSet, config: EngineConfig) -> Self {
        Self::new(CrossSessionPatternStore::open(backend, rules, config))
    }
}

impl<S: StorageBackend, R: Rng> MemoryEngine<S, R> {
    /// Engine with an explicit random source for the association fallback.
    pub fn with_rng(store: CrossSessionPatternStore<S>, rng: R) -> Self {
        let scheduler = EventScheduler::new(store.rules().clone(), store.config().clone());
        Self {
            scheduler,
            store,
            rng,
        }
    }

    pub fn scheduler(&self) -> &EventScheduler {
        &self.scheduler
    }

    pub fn store(&self) -> &CrossSessionPatternStore<S> {
        &self.store
    }

    /// Process one text and commit it as a new session.
    pub fn process(&mut self, text: &str) -> ProcessOutcome {
        self.process_at(text, Utc::now())
    }

    pub fn process_at(&mut self, text: &str, now: DateTime<Utc>) -> ProcessOutcome {
        let (events, final_state) =
            self.scheduler
                .run_at(text, self.store.knowledge(), &mut self.rng, now);
        let session_id = self.store.add_session_at(text, &final_state, now);
        let cross_story_connections = self
            .store
            .cross_story_connections_at(Some(&session_id), now);

        ProcessOutcome {
            events,
            final_state,
            session_id,
            cross_story_connections,
        }
    }

    pub fn existing_knowledge(&self) -> PersistentMemory {
        self.store.existing_knowledge()
    }

    pub fn cross_story_connections(&self, session: Option<&SessionId>) -> Vec<ConnectionSummary> {
        self.store.cross_story_connections(session)
    }

    pub fn session_history(&self) -> Vec<StoredSession> {
        self.store.session_history()
    }

    pub fn statistics(&self) -> MemoryStatistics {
        self.store.statistics()
    }

    pub fn export_json(&self) -> Result<String> {
        self.store.export_json()
    }

    pub fn import_json(&mut self, json: &str) -> Result<()> {
        self.store.import_json(json)
    }

    pub fn clear_all_memory(&mut self) {
        self.store.clear_all_memory();
    }

    pub fn into_store(self) -> CrossSessionPatternStore<S> {
        self.store
    }

    /// Flush the store and hand back its backend.
    pub fn close(self) -> S {
        self.store.close()
    }
}
