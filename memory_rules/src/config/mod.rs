//! Tunable parameters: thresholds, increments, capacities and the virtual
//! time windows of a processing pass.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{PatternType, RulesError};

/// A virtual-time window for one processing stage, in milliseconds.
///
/// The n-th event of a stage lands at `start + n * step`, clamped to `end`
/// so that consecutive stages never overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: u64,
    pub step: u64,
    pub end: u64,
}

impl Window {
    pub const fn new(start: u64, step: u64, end: u64) -> Self {
        Self { start, step, end }
    }

    /// A single instant.
    pub const fn at_instant(at: u64) -> Self {
        Self::new(at, 0, at)
    }

    /// Timestamp of the `index`-th event in this window.
    pub fn at(&self, index: usize) -> u64 {
        self.start
            .saturating_add(self.step.saturating_mul(index as u64))
            .min(self.end)
    }
}

/// Ordered windows for every stage of a pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub history: Window,
    pub perception: Window,
    pub working: Window,
    pub semantic: Window,
    pub episodic: Window,
    pub associative: Window,
    pub cross_association: Window,
    pub procedural: Window,
    pub consolidation: Window,
    pub cross_consolidation: Window,
    pub decay: Window,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            history: Window::at_instant(50),
            perception: Window::new(100, 150, 500),
            working: Window::new(800, 200, 1600),
            semantic: Window::new(2000, 300, 3500),
            episodic: Window::new(4000, 400, 5600),
            associative: Window::new(6000, 200, 7000),
            cross_association: Window::new(7200, 200, 7800),
            procedural: Window::new(8000, 300, 9000),
            consolidation: Window::new(10000, 200, 10800),
            cross_consolidation: Window::at_instant(11000),
            decay: Window::at_instant(11500),
        }
    }
}

impl ScheduleConfig {
    /// Windows in pass order.
    pub fn in_order(&self) -> [Window; 11] {
        [
            self.history,
            self.perception,
            self.working,
            self.semantic,
            self.episodic,
            self.associative,
            self.cross_association,
            self.procedural,
            self.consolidation,
            self.cross_consolidation,
            self.decay,
        ]
    }

    /// True if every window is well formed and starts after the previous one ends.
    pub fn is_ordered(&self) -> bool {
        let windows = self.in_order();
        windows.iter().all(|w| w.start <= w.end)
            && windows.windows(2).all(|pair| pair[0].end < pair[1].start)
    }
}

/// Association scoring policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssociationConfig {
    /// Score when the two concepts share a token.
    pub shared_token_score: f32,
    /// Score for a known relationship pair.
    pub relationship_score: f32,
    /// Exclusive upper bound of the random fallback.
    pub random_ceiling: f32,
    /// Only scores strictly above this are retained.
    pub retention_threshold: f32,
}

impl Default for AssociationConfig {
    fn default() -> Self {
        Self {
            shared_token_score: 0.8,
            relationship_score: 0.6,
            random_ceiling: 0.4,
            retention_threshold: 0.3,
        }
    }
}

/// Strength growth for patterns and consolidated knowledge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReinforcementConfig {
    pub increment: f32,
    pub cap: f32,
}

impl Default for ReinforcementConfig {
    fn default() -> Self {
        Self {
            increment: 0.1,
            cap: 1.0,
        }
    }
}

impl ReinforcementConfig {
    /// Grow `strength` by one increment, never past the cap and never down.
    pub fn reinforce(&self, strength: f32) -> f32 {
        (strength + self.increment).min(self.cap).max(strength.min(self.cap))
    }
}

/// Thresholds used when recalling persisted knowledge during a pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecallConfig {
    /// Minimum pattern strength for a perception "recognized pattern".
    pub perception_pattern_threshold: f32,
    /// Token-overlap ratio above which two episodes are similar.
    pub episode_similarity_threshold: f32,
    /// Cross-link strength per similar past episode.
    pub episode_link_step: f32,
    /// Strength reported on an episodic event annotation.
    pub episode_annotation_strength: f32,
}

impl Default for RecallConfig {
    fn default() -> Self {
        Self {
            perception_pattern_threshold: 0.4,
            episode_similarity_threshold: 0.6,
            episode_link_step: 0.2,
            episode_annotation_strength: 0.7,
        }
    }
}

/// Capacity limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapacityConfig {
    pub flash: usize,
    pub short_term_sentences: usize,
    pub max_sessions: usize,
    pub strongest_connections: usize,
}

impl Default for CapacityConfig {
    fn default() -> Self {
        Self {
            flash: 5,
            short_term_sentences: 3,
            max_sessions: 50,
            strongest_connections: 5,
        }
    }
}

/// Filtering of cross-story connection summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub min_strength: f32,
    pub recent_window_hours: i64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            min_strength: 0.3,
            recent_window_hours: 24,
        }
    }
}

/// Initial strength of a newly mined pattern, by pattern type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternSeedConfig {
    pub recurring_entity: f32,
    pub behavioral_sequence: f32,
    pub semantic_cluster: f32,
}

impl Default for PatternSeedConfig {
    fn default() -> Self {
        Self {
            recurring_entity: 0.8,
            behavioral_sequence: 0.7,
            semantic_cluster: 0.6,
        }
    }
}

impl PatternSeedConfig {
    /// Seed strength for a mined pattern type; `None` for types never mined.
    pub fn seed_for(&self, pattern_type: PatternType) -> Option<f32> {
        match pattern_type {
            PatternType::RecurringEntity => Some(self.recurring_entity),
            PatternType::BehavioralSequence => Some(self.behavioral_sequence),
            PatternType::SemanticCluster => Some(self.semantic_cluster),
            PatternType::TemporalPattern | PatternType::EmotionalTheme => None,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub association: AssociationConfig,
    pub reinforcement: ReinforcementConfig,
    pub recall: RecallConfig,
    pub capacity: CapacityConfig,
    pub connections: ConnectionConfig,
    pub pattern_seed: PatternSeedConfig,
    pub schedule: ScheduleConfig,
}

impl EngineConfig {
    /// Parse from TOML, filling missing sections with defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, RulesError> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RulesError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Load from a file, falling back to defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path.as_ref()) {
            Ok(config) => config,
            Err(e) => {
                tracing::info!(
                    "Engine config {} not loaded ({}), using defaults",
                    path.as_ref().display(),
                    e
                );
                Self::default()
            }
        }
    }

    fn validate(&self) -> Result<(), RulesError> {
        let unit = |name: &str, v: f32| {
            if (0.0..=1.0).contains(&v) {
                Ok(())
            } else {
                Err(RulesError::Invalid(format!("{} must be within [0, 1], got {}", name, v)))
            }
        };

        unit("association.shared_token_score", self.association.shared_token_score)?;
        unit("association.relationship_score", self.association.relationship_score)?;
        unit("association.random_ceiling", self.association.random_ceiling)?;
        unit("association.retention_threshold", self.association.retention_threshold)?;
        unit("reinforcement.increment", self.reinforcement.increment)?;
        unit("reinforcement.cap", self.reinforcement.cap)?;
        unit("pattern_seed.recurring_entity", self.pattern_seed.recurring_entity)?;
        unit("pattern_seed.behavioral_sequence", self.pattern_seed.behavioral_sequence)?;
        unit("pattern_seed.semantic_cluster", self.pattern_seed.semantic_cluster)?;

        if self.capacity.flash == 0 || self.capacity.max_sessions == 0 {
            return Err(RulesError::Invalid("capacities must be positive".into()));
        }
        if !self.schedule.is_ordered() {
            return Err(RulesError::Invalid("schedule windows overlap".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_clamps_to_end() {
        let w = Window::new(100, 150, 500);
        assert_eq!(w.at(0), 100);
        assert_eq!(w.at(2), 400);
        assert_eq!(w.at(3), 500);
        assert_eq!(w.at(usize::MAX), 500);
    }

    #[test]
    fn test_default_schedule_is_ordered() {
        assert!(ScheduleConfig::default().is_ordered());
    }

    #[test]
    fn test_reinforce_caps_and_never_decreases() {
        let r = ReinforcementConfig::default();
        assert!((r.reinforce(0.7) - 0.8).abs() < 1e-6);
        assert_eq!(r.reinforce(0.95), 1.0);
        assert_eq!(r.reinforce(1.0), 1.0);

        let zero = ReinforcementConfig {
            increment: 0.0,
            cap: 1.0,
        };
        assert_eq!(zero.reinforce(0.4), 0.4);
    }

    #[test]
    fn test_seed_strengths() {
        let seeds = PatternSeedConfig::default();
        assert_eq!(seeds.seed_for(PatternType::RecurringEntity), Some(0.8));
        assert_eq!(seeds.seed_for(PatternType::BehavioralSequence), Some(0.7));
        assert_eq!(seeds.seed_for(PatternType::SemanticCluster), Some(0.6));
        assert_eq!(seeds.seed_for(PatternType::EmotionalTheme), None);
    }

    #[test]
    fn test_partial_toml() {
        let config = EngineConfig::from_toml_str(
            r#"
            [reinforcement]
            increment = 0.25

            [capacity]
            flash = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.reinforcement.increment, 0.25);
        assert_eq!(config.reinforcement.cap, 1.0);
        assert_eq!(config.capacity.flash, 3);
        assert_eq!(config.capacity.max_sessions, 50);
        assert_eq!(config.recall, RecallConfig::default());
    }

    #[test]
    fn test_out_of_range_rejected() {
        let err = EngineConfig::from_toml_str("[association]\nrandom_ceiling = 1.5\n").unwrap_err();
        assert!(matches!(err, RulesError::Invalid(_)));
    }

    #[test]
    fn test_overlapping_windows_rejected() {
        let err = EngineConfig::from_toml_str(
            "[schedule.perception]\nstart = 100\nstep = 100\nend = 900\n",
        )
        .unwrap_err();
        assert!(matches!(err, RulesError::Invalid(_)));
    }
}
