//! Association scoring between two extracted concepts.

use memory_rules::{AssociationConfig, EngineConfig, RelationshipPair, RuleSet};
use rand::Rng;

/// Scores how strongly two concepts are linked.
///
/// Policy, first match wins:
/// 1. the concepts share a whitespace token
/// 2. the pair matches a known relationship, in either order
/// 3. a weak random score in `[0, random_ceiling)`
#[derive(Debug, Clone)]
pub struct AssociationScorer {
    config: AssociationConfig,
    relationships: Vec<RelationshipPair>,
}

impl AssociationScorer {
    pub fn new(config: AssociationConfig, relationships: Vec<RelationshipPair>) -> Self {
        Self {
            config,
            relationships,
        }
    }

    /// Build a scorer from the relationship table and engine config.
    pub fn from_rules(rules: &RuleSet, config: &EngineConfig) -> Self {
        Self::new(config.association.clone(), rules.relationships.clone())
    }

    /// Score a pair, drawing the fallback from `rng`.
    pub fn score<R: Rng + ?Sized>(&self, a: &str, b: &str, rng: &mut R) -> f32 {
        if share_token(a, b) {
            return self.config.shared_token_score;
        }

        if self.relationships.iter().any(|pair| pair.matches(a, b)) {
            return self.config.relationship_score;
        }

        rng.gen::<f32>() * self.config.random_ceiling
    }

    /// Whether a score is strong enough to keep.
    pub fn retains(&self, strength: f32) -> bool {
        strength > self.config.retention_threshold
    }

    /// Score a pair and return it only if it would be retained.
    pub fn associate<R: Rng + ?Sized>(&self, a: &str, b: &str, rng: &mut R) -> Option<f32> {
        let strength = self.score(a, b, rng);
        self.retains(strength).then_some(strength)
    }
}

fn share_token(a: &str, b: &str) -> bool {
    a.split_whitespace()
        .any(|token| b.split_whitespace().any(|other| other == token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn scorer() -> AssociationScorer {
        AssociationScorer::from_rules(&RuleSet::default(), &EngineConfig::default())
    }

    /// Always draws zero.
    fn low() -> StepRng {
        StepRng::new(0, 0)
    }

    /// Always draws just under one.
    fn high() -> StepRng {
        StepRng::new(u64::MAX, 0)
    }

    #[test]
    fn test_shared_token_wins() {
        let s = scorer();
        assert_eq!(s.score("coffee shop", "coffee culture", &mut low()), 0.8);
    }

    #[test]
    fn test_relationship_either_order() {
        let s = scorer();
        assert_eq!(s.score("gym", "fitness routine", &mut low()), 0.6);
        assert_eq!(s.score("academic learning", "study", &mut low()), 0.6);
    }

    #[test]
    fn test_relationship_uses_containment() {
        let s = scorer();
        assert_eq!(s.score("work", "professional habits", &mut low()), 0.6);
    }

    #[test]
    fn test_fallback_is_bounded_and_injectable() {
        let s = scorer();
        assert_eq!(s.score("latte", "culinary skills", &mut low()), 0.0);

        let top = s.score("latte", "culinary skills", &mut high());
        assert!(top > 0.39 && top < 0.4);
    }

    #[test]
    fn test_fallback_range_with_seeded_rng() {
        let s = scorer();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..500 {
            let v = s.score("sarah", "culinary skills", &mut rng);
            assert!((0.0..0.4).contains(&v));
        }
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let s = scorer();
        let a = s.score("kim", "health", &mut StdRng::seed_from_u64(7));
        let b = s.score("kim", "health", &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn test_retention_threshold_is_strict() {
        let s = scorer();
        assert!(!s.retains(0.3));
        assert!(s.retains(0.31));
        assert_eq!(s.associate("latte", "culinary skills", &mut low()), None);
        assert!(s.associate("latte", "culinary skills", &mut high()).is_some());
    }
}
