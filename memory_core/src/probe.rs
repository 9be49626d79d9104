//! Memory probes - read-only questions asked of a finished memory state.

use serde::{Deserialize, Serialize};

use crate::layered::MemoryState;

/// Typical short-term span of 7±2 items.
const SHORT_TERM_SPAN: usize = 9;
const MIN_TERM_CHARS: usize = 3;

/// Which compartment a probe examines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProbeKind {
    ShortTerm,
    Working,
    Semantic,
    Episodic,
    Associative,
    Procedural,
    Flash,
    /// Overlap between compartments.
    Integration,
}

impl ProbeKind {
    pub const ALL: [ProbeKind; 8] = [
        ProbeKind::ShortTerm,
        ProbeKind::Working,
        ProbeKind::Semantic,
        ProbeKind::Episodic,
        ProbeKind::Associative,
        ProbeKind::Procedural,
        ProbeKind::Flash,
        ProbeKind::Integration,
    ];
}

/// Outcome of one probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeReport {
    pub probe: String,
    pub query: String,
    pub kind: ProbeKind,
    pub findings: Vec<String>,
    pub success: bool,
    pub explanation: String,
}

/// Lowercase whitespace tokens long enough to be meaningful.
pub fn query_terms(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .filter(|t| t.chars().count() >= MIN_TERM_CHARS)
        .map(str::to_string)
        .collect()
}

fn mentions(text: &str, terms: &[String]) -> bool {
    let lower = text.to_lowercase();
    terms.iter().any(|t| lower.contains(t.as_str()))
}

/// Run a probe against `state`.
pub fn run(state: &MemoryState, kind: ProbeKind, query: &str) -> ProbeReport {
    let terms = query_terms(query);
    let report =
        |probe: &str, findings: Vec<String>, success: bool, explanation: String| ProbeReport {
            probe: probe.to_string(),
            query: query.to_string(),
            kind,
            findings,
            success,
            explanation,
        };

    match kind {
        ProbeKind::ShortTerm => {
            let items = &state.short_term;
            let lower = query.to_lowercase();
            if lower.contains("capacity") || lower.contains("hold") {
                let within = items.len() <= SHORT_TERM_SPAN;
                report(
                    "Short-Term Capacity",
                    vec![format!("Current: {} items | Typical span: 7±2 items", items.len())],
                    within,
                    format!(
                        "Short-term memory holds {} items. {}",
                        items.len(),
                        if within {
                            "Within normal capacity."
                        } else {
                            "Over capacity; older items are displaced."
                        }
                    ),
                )
            } else {
                let findings = if items.is_empty() {
                    vec!["Buffer empty; short-term items decay at the end of a pass".to_string()]
                } else {
                    items.clone()
                };
                report(
                    "Short-Term Contents",
                    findings,
                    true,
                    format!("Short-term memory contains {} unprocessed perceptions.", items.len()),
                )
            }
        }
        ProbeKind::Working => report(
            "Working Memory Processing",
            state.working_memory.clone(),
            !state.working_memory.is_empty(),
            format!(
                "Working memory is processing {} items before consolidation.",
                state.working_memory.len()
            ),
        ),
        ProbeKind::Semantic => {
            let concepts: Vec<&String> = state.semantic_concepts().collect();
            let matching: Vec<String> = concepts
                .iter()
                .filter(|c| mentions(c, &terms))
                .map(|c| c.to_string())
                .collect();

            if matching.is_empty() {
                report(
                    "Semantic Memory",
                    vec![format!(
                        "{} concepts across {} categories",
                        concepts.len(),
                        state.semantic.len()
                    )],
                    true,
                    "Semantic memory files concepts by category.".to_string(),
                )
            } else {
                let count = matching.len();
                report(
                    "Semantic Knowledge",
                    matching,
                    true,
                    format!("Found {} concepts matching the query.", count),
                )
            }
        }
        ProbeKind::Episodic => {
            let episodes = &state.episodic;
            let matching: Vec<_> = episodes.iter().filter(|e| mentions(&e.event, &terms)).collect();
            let shown: Vec<_> = if matching.is_empty() {
                episodes.iter().skip(episodes.len().saturating_sub(2)).collect()
            } else {
                matching
            };
            report(
                "Episodic Reconstruction",
                shown
                    .iter()
                    .map(|e| format!("{} ({})", e.event, e.context))
                    .collect(),
                !episodes.is_empty(),
                format!("Episodic memory holds {} encoded episodes.", episodes.len()),
            )
        }
        ProbeKind::Associative => {
            let links = &state.associative;
            let matching: Vec<String> = links
                .iter()
                .filter(|a| mentions(&a.concept1, &terms) || mentions(&a.concept2, &terms))
                .map(|a| format!("{} ↔ {} ({:.2})", a.concept1, a.concept2, a.strength))
                .collect();

            if matching.is_empty() {
                report(
                    "Associative Memory",
                    vec![format!("{} concept associations formed", links.len())],
                    !links.is_empty(),
                    "Associative memory links working items to concepts.".to_string(),
                )
            } else {
                let count = matching.len();
                report(
                    "Associations",
                    matching,
                    true,
                    format!(
                        "Found {} associations matching the query; strength is recall likelihood.",
                        count
                    ),
                )
            }
        }
        ProbeKind::Procedural => {
            let procedures = &state.procedural;
            let matching: Vec<String> = procedures
                .iter()
                .filter(|p| mentions(p, &terms))
                .cloned()
                .collect();
            report(
                "Procedural Memory",
                if matching.is_empty() {
                    procedures.clone()
                } else {
                    matching
                },
                !procedures.is_empty(),
                "Procedural memory encodes behavioral sequences for automatic execution."
                    .to_string(),
            )
        }
        ProbeKind::Flash => report(
            "Flash Memory Cache",
            state.flash.clone(),
            !state.flash.is_empty(),
            format!("Flash memory caches the {} most recent items.", state.flash.len()),
        ),
        ProbeKind::Integration => {
            let mut findings = Vec::new();

            let shared = state
                .semantic_concepts()
                .filter(|concept| {
                    let concept = concept.to_lowercase();
                    state
                        .episodic
                        .iter()
                        .any(|e| e.event.to_lowercase().contains(&concept))
                })
                .count();
            if shared > 0 {
                findings.push(format!("Semantic-Episodic overlap: {} shared concepts", shared));
            }

            let both = state
                .working_memory
                .iter()
                .filter(|item| state.flash.contains(item))
                .count();
            if both > 0 {
                findings.push(format!("Working-Flash interaction: {} items in both systems", both));
            }

            let count = findings.len();
            report(
                "Memory System Integration",
                findings,
                count > 0,
                format!("Found {} interactions between memory systems.", count),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layered::{Association, EpisodicRecord};
    use chrono::Utc;

    fn sample_state() -> MemoryState {
        let mut state = MemoryState::new();
        state.working_memory = vec!["sarah".into(), "latte".into(), "walked".into()];
        state.flash = vec!["walked".into(), "latte".into()];
        state
            .semantic
            .insert("habits".into(), vec!["coffee culture".into(), "morning routine".into()]);
        state.episodic = vec![
            EpisodicRecord {
                event: "Academic study session".into(),
                context: "Library".into(),
                timestamp: Utc::now(),
            },
            EpisodicRecord {
                event: "Coffee shop experience".into(),
                context: "Routine".into(),
                timestamp: Utc::now(),
            },
        ];
        state.associative = vec![Association {
            concept1: "latte".into(),
            concept2: "coffee culture".into(),
            strength: 0.8,
        }];
        state.procedural = vec!["coffee shop routine".into(), "transit navigation".into()];
        state
    }

    #[test]
    fn test_query_terms() {
        assert_eq!(query_terms("What is IN my Coffee cup?"), vec!["what", "coffee", "cup?"]);
        assert!(query_terms("a to me").is_empty());
    }

    #[test]
    fn test_short_term_capacity() {
        let mut state = MemoryState::new();
        state.short_term = vec!["a".into(); 10];
        let report = run(&state, ProbeKind::ShortTerm, "How much can it HOLD?");
        assert_eq!(report.probe, "Short-Term Capacity");
        assert!(!report.success);

        let report = run(&MemoryState::new(), ProbeKind::ShortTerm, "contents");
        assert_eq!(report.probe, "Short-Term Contents");
        assert!(report.success);
        assert_eq!(report.findings.len(), 1);
    }

    #[test]
    fn test_semantic_matches_and_summary() {
        let state = sample_state();
        let report = run(&state, ProbeKind::Semantic, "coffee please");
        assert_eq!(report.findings, vec!["coffee culture"]);

        let report = run(&state, ProbeKind::Semantic, "zz");
        assert_eq!(report.findings, vec!["2 concepts across 1 categories"]);
    }

    #[test]
    fn test_episodic_falls_back_to_latest() {
        let state = sample_state();
        let report = run(&state, ProbeKind::Episodic, "coffee");
        assert_eq!(report.findings, vec!["Coffee shop experience (Routine)"]);

        let report = run(&state, ProbeKind::Episodic, "gym");
        assert_eq!(report.findings.len(), 2);
        assert!(report.success);
    }

    #[test]
    fn test_associative_formatting() {
        let state = sample_state();
        let report = run(&state, ProbeKind::Associative, "coffee");
        assert_eq!(report.findings, vec!["latte ↔ coffee culture (0.80)"]);
        assert!(report.success);

        let empty = run(&MemoryState::new(), ProbeKind::Associative, "coffee");
        assert!(!empty.success);
    }

    #[test]
    fn test_procedural_and_flash() {
        let state = sample_state();
        let report = run(&state, ProbeKind::Procedural, "transit");
        assert_eq!(report.findings, vec!["transit navigation"]);
        let report = run(&state, ProbeKind::Procedural, "");
        assert_eq!(report.findings.len(), 2);

        let report = run(&state, ProbeKind::Flash, "");
        assert_eq!(report.findings, vec!["walked", "latte"]);
        assert!(report.success);
    }

    #[test]
    fn test_integration_overlaps() {
        let state = sample_state();
        let report = run(&state, ProbeKind::Integration, "");
        assert_eq!(
            report.findings,
            vec!["Working-Flash interaction: 2 items in both systems"]
        );
        assert!(report.success);

        let mut state = sample_state();
        state.episodic[0].event = "A morning routine at home".into();
        let report = run(&state, ProbeKind::Integration, "");
        assert_eq!(report.findings[0], "Semantic-Episodic overlap: 1 shared concepts");
        assert!(!run(&MemoryState::new(), ProbeKind::Integration, "").success);
    }

    #[test]
    fn test_probes_are_read_only() {
        let state = sample_state();
        let before = state.clone();
        for kind in ProbeKind::ALL {
            let report = run(&state, kind, "coffee capacity");
            assert_eq!(report.kind, kind);
        }
        assert_eq!(state, before);
    }
}
