//! Compatibility engine for story-based dating profiles.
//!
//! Users are partitioned by city. For each city, every unordered pair of
//! users with mutual attraction is scored on lexical trait overlap and
//! embedding similarity, and written as two directed match rows.

pub mod attraction;
pub mod compatibility;
pub mod config;
pub mod embedding;
pub mod engine;
pub mod enrichment;
pub mod error;
pub mod matching;
pub mod models;
pub mod normalize;
pub mod store;

#[cfg(feature = "python")]
mod python;

pub use compatibility::{CompatibilityScorer, CompatibilityWeights, PairScore};
pub use config::EngineConfig;
pub use engine::{MatchEngine, Phase, RecomputeSummary};
pub use enrichment::{enrich_user, enrich_users, EnrichmentReport, TraitGenerator};
pub use error::{MatchError, MatchResult};
pub use models::{City, MatchRecord, MatchView, NewUser, Orientation, Profile, ProfileTraits};
pub use store::{MatchStore, MatchWriter, SqliteStore};
