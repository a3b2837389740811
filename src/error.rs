use std::path::PathBuf;

use thiserror::Error;

use crate::engine::Phase;

/// Errors surfaced by the matchmaking core.
///
/// Degenerate data (malformed stored JSON, empty trait lists, zero-norm
/// embeddings) never produces an error; it is scored as zero instead.
#[derive(Debug, Error)]
pub enum MatchError {
    /// Any failure reported by the SQLite layer.
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// A city recomputation failed; nothing it wrote was kept.
    #[error("Recomputation of city {city_id} failed while {phase}: {source}")]
    Recompute {
        city_id: i64,
        phase: Phase,
        #[source]
        source: Box<MatchError>,
    },

    #[error("User not found: {0}")]
    UserNotFound(i64),

    /// The trait generator returned an empty self or desired list.
    #[error("Empty traits generated for user {0}")]
    EmptyTraits(i64),

    /// The external trait/embedding service failed.
    #[error("Trait generation failed: {0}")]
    Generation(String),

    #[error("Invalid config {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type MatchResult<T> = Result<T, MatchError>;
