use serde::{Deserialize, Serialize};

use crate::embedding::embedding_score;
use crate::matching::{fuzzy_match, matched_terms};
use crate::models::{MatchRecord, Profile};

/// Weights for the total compatibility score. The defaults sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityWeights {
    pub character: f64,
    pub desired: f64,
    pub my_perspective: f64,
    pub their_perspective: f64,
    pub embedding: f64,
}

impl Default for CompatibilityWeights {
    fn default() -> Self {
        Self {
            character: 0.25,
            desired: 0.15,
            my_perspective: 0.15,
            their_perspective: 0.15,
            embedding: 0.30,
        }
    }
}

/// Every score for an unordered pair, seen from the first profile (A).
#[derive(Debug, Clone, PartialEq)]
pub struct PairScore {
    /// A.self vs B.self
    pub character: u8,
    /// A.desired vs B.desired
    pub desired: u8,
    /// A.self vs B.desired: does A offer what B wants
    pub my_perspective: u8,
    /// B.self vs A.desired: does B offer what A wants
    pub their_perspective: u8,

    /// Self embedding vs self embedding
    pub embedding_character: u8,
    /// A's self embedding vs B's desired embedding
    pub embedding_desire: u8,
    /// Mean of the two embedding scores
    pub embedding: u8,

    pub total: u8,

    /// B.desired terms matched by some A.self term
    pub they_have_what_i_want: Vec<String>,
    /// A.desired terms matched by some B.self term
    pub i_have_what_they_want: Vec<String>,
    /// A.self terms matched by some B.self term
    pub common_traits: Vec<String>,
}

impl PairScore {
    /// The two directed rows for this pair: A's view of B, then B's view of A.
    /// Symmetric fields are shared; perspectives and exchange lists swap.
    pub fn directed_records(&self, a_id: i64, b_id: i64) -> (MatchRecord, MatchRecord) {
        let a_to_b = MatchRecord {
            user_id: a_id,
            matched_user_id: b_id,
            total_compatibility: self.total,
            character_compatibility: self.character,
            desired_compatibility: self.desired,
            embedding_compatibility: self.embedding,
            my_perspective: self.my_perspective,
            their_perspective: self.their_perspective,
            i_have_what_they_want: self.i_have_what_they_want.clone(),
            they_have_what_i_want: self.they_have_what_i_want.clone(),
            common_traits: self.common_traits.clone(),
        };

        let b_to_a = MatchRecord {
            user_id: b_id,
            matched_user_id: a_id,
            my_perspective: self.their_perspective,
            their_perspective: self.my_perspective,
            i_have_what_they_want: self.they_have_what_i_want.clone(),
            they_have_what_i_want: self.i_have_what_they_want.clone(),
            ..a_to_b.clone()
        };

        (a_to_b, b_to_a)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompatibilityScorer {
    weights: CompatibilityWeights,
}

impl CompatibilityScorer {
    pub fn new() -> Self {
        Self {
            weights: CompatibilityWeights::default(),
        }
    }

    pub fn with_weights(weights: CompatibilityWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &CompatibilityWeights {
        &self.weights
    }

    /// Score a pair from A's side. Attraction is not checked here.
    pub fn score(&self, a: &Profile, b: &Profile) -> PairScore {
        let character = fuzzy_match(&a.self_traits, &b.self_traits);
        let desired = fuzzy_match(&a.desired_traits, &b.desired_traits);
        let my_perspective = fuzzy_match(&a.self_traits, &b.desired_traits);
        let their_perspective = fuzzy_match(&b.self_traits, &a.desired_traits);

        let embedding_character = embedding_score(&a.self_embedding, &b.self_embedding);
        let embedding_desire = embedding_score(&a.self_embedding, &b.desired_embedding);
        let embedding =
            ((f64::from(embedding_character) + f64::from(embedding_desire)) / 2.0).round() as u8;

        let total = self.total(character, desired, my_perspective, their_perspective, embedding);

        PairScore {
            character,
            desired,
            my_perspective,
            their_perspective,
            embedding_character,
            embedding_desire,
            embedding,
            total,
            they_have_what_i_want: matched_terms(&b.desired_traits, &a.self_traits),
            i_have_what_they_want: matched_terms(&a.desired_traits, &b.self_traits),
            common_traits: matched_terms(&a.self_traits, &b.self_traits),
        }
    }

    /// Weighted sum of the component scores, rounded and kept in 0..=100.
    pub fn total(
        &self,
        character: u8,
        desired: u8,
        my_perspective: u8,
        their_perspective: u8,
        embedding: u8,
    ) -> u8 {
        let w = &self.weights;
        let sum = f64::from(character) * w.character
            + f64::from(desired) * w.desired
            + f64::from(my_perspective) * w.my_perspective
            + f64::from(their_perspective) * w.their_perspective
            + f64::from(embedding) * w.embedding;

        sum.round().clamp(0.0, 100.0) as u8
    }
}
