//! Memory events - the virtual-time log of one processing pass.
//!
//! Events are produced sequentially and instantly; their timestamps are
//! replay labels for an external timeline, never wall-clock measurements.

use memory_rules::{EventAction, EventId, MemoryKind};
use serde::{Deserialize, Serialize};

/// Reference from an event to previously accumulated knowledge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossStoryConnection {
    pub pattern: String,
    pub previous_occurrences: usize,
    pub strength: f32,
}

/// One scheduled processing step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryEvent {
    pub id: EventId,
    /// Milliseconds from the start of the pass.
    pub timestamp: u64,
    pub memory_type: MemoryKind,
    pub action: EventAction,
    pub content: String,
    pub details: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cross_story_connection: Option<CrossStoryConnection>,
}

/// Append-only event list handing out monotonic IDs.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<MemoryEvent>,
    next_id: u32,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event and return its ID.
    pub fn emit(
        &mut self,
        timestamp: u64,
        memory_type: MemoryKind,
        action: EventAction,
        content: impl Into<String>,
        details: impl Into<String>,
        connection: Option<CrossStoryConnection>,
    ) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        self.events.push(MemoryEvent {
            id,
            timestamp,
            memory_type,
            action,
            content: content.into(),
            details: details.into(),
            cross_story_connection: connection,
        });
        id
    }

    pub fn events(&self) -> &[MemoryEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn into_events(self) -> Vec<MemoryEvent> {
        self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_monotonic() {
        let mut log = EventLog::new();
        let a = log.emit(100, MemoryKind::ShortTerm, EventAction::Store, "a", "", None);
        let b = log.emit(50, MemoryKind::Working, EventAction::Process, "b", "", None);

        assert_eq!(a, EventId(0));
        assert_eq!(b, EventId(1));
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_event_json_shape() {
        let mut log = EventLog::new();
        log.emit(
            800,
            MemoryKind::Working,
            EventAction::Process,
            "Processing entity: sarah",
            "Previously seen 2 times.",
            Some(CrossStoryConnection {
                pattern: "sarah".into(),
                previous_occurrences: 2,
                strength: 0.2,
            }),
        );
        log.emit(900, MemoryKind::Working, EventAction::Process, "x", "y", None);

        let json = serde_json::to_value(log.events()).unwrap();
        assert_eq!(json[0]["memoryType"], "Working Memory");
        assert_eq!(json[0]["action"], "process");
        assert_eq!(json[0]["crossStoryConnection"]["previousOccurrences"], 2);
        assert!(json[1].get("crossStoryConnection").is_none());
    }
}
