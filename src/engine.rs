//! City recomputation engine.
//!
//! A run moves through `Idle -> LoadingUsers -> Clearing -> Scoring ->
//! Committed`, or ends in `Failed` from any step. Clearing and scoring share
//! one store transaction, so readers see either the previous match table for
//! the city or the complete new one.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, info_span, trace};
use uuid::Uuid;

use crate::attraction::mutually_attracted;
use crate::compatibility::{CompatibilityScorer, CompatibilityWeights};
use crate::enrichment::{self, EnrichmentReport, TraitGenerator};
use crate::error::{MatchError, MatchResult};
use crate::models::{MatchView, Profile, ProfileTraits};
use crate::store::{MatchStore, MatchWriter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Idle,
    LoadingUsers,
    Clearing,
    Scoring,
    Committed,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Idle => "idle",
            Phase::LoadingUsers => "loading users",
            Phase::Clearing => "clearing matches",
            Phase::Scoring => "scoring pairs",
            Phase::Committed => "committed",
            Phase::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Outcome of one successful city recomputation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecomputeSummary {
    pub run_id: Uuid,
    pub city_id: i64,
    pub users_loaded: usize,
    /// Unordered pairs examined, i.e. n * (n - 1) / 2
    pub pairs_considered: usize,
    /// Pairs that passed the mutual attraction check
    pub pairs_matched: usize,
    pub rows_cleared: usize,
    pub rows_written: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RecomputeSummary {
    /// True when the city had no users and nothing was done.
    pub fn is_empty(&self) -> bool {
        self.users_loaded == 0
    }
}

#[derive(Debug, Default)]
struct PassCounts {
    pairs_considered: usize,
    pairs_matched: usize,
    rows_cleared: usize,
    rows_written: usize,
}

/// Rebuilds a city's match table from its users.
///
/// The engine owns its store handle; nothing is shared between engines, so
/// an engine per city can run independently.
pub struct MatchEngine<S: MatchStore> {
    store: S,
    scorer: CompatibilityScorer,
    phase: Phase,
}

impl<S: MatchStore> MatchEngine<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            scorer: CompatibilityScorer::new(),
            phase: Phase::Idle,
        }
    }

    pub fn with_weights(store: S, weights: CompatibilityWeights) -> Self {
        Self {
            store,
            scorer: CompatibilityScorer::with_weights(weights),
            phase: Phase::Idle,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Where the most recent run ended.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Replace every match row of `city_id` with a freshly computed set.
    ///
    /// A city without users is a successful no-op. Any storage failure
    /// rolls the whole run back and is returned as [`MatchError::Recompute`].
    pub fn recompute_city(&mut self, city_id: i64) -> MatchResult<RecomputeSummary> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let span = info_span!("recompute_city", %run_id, city_id);
        let _enter = span.enter();

        self.enter(Phase::LoadingUsers);
        let users = match self.store.fetch_users_by_city(city_id) {
            Ok(users) => users,
            Err(e) => return Err(self.fail(city_id, Phase::LoadingUsers, e)),
        };

        if users.is_empty() {
            info!("no users in city, nothing to recompute");
            self.enter(Phase::Idle);
            return Ok(RecomputeSummary {
                run_id,
                city_id,
                users_loaded: 0,
                pairs_considered: 0,
                pairs_matched: 0,
                rows_cleared: 0,
                rows_written: 0,
                started_at,
                finished_at: Utc::now(),
            });
        }

        let profiles: Vec<Profile> = users.iter().map(Profile::from_stored).collect();

        self.enter(Phase::Clearing);
        let scorer = &self.scorer;
        let mut phase = Phase::Clearing;
        let mut counts = PassCounts::default();

        let outcome = self.store.transaction(|writer| {
            counts.rows_cleared = writer.clear_matches_for_city(city_id)?;
            phase = Phase::Scoring;
            debug!(phase = %phase, rows_cleared = counts.rows_cleared, "cleared previous matches");
            score_city(scorer, &profiles, writer, &mut counts)
        });

        if let Err(e) = outcome {
            return Err(self.fail(city_id, phase, e));
        }

        self.enter(Phase::Committed);
        let summary = RecomputeSummary {
            run_id,
            city_id,
            users_loaded: profiles.len(),
            pairs_considered: counts.pairs_considered,
            pairs_matched: counts.pairs_matched,
            rows_cleared: counts.rows_cleared,
            rows_written: counts.rows_written,
            started_at,
            finished_at: Utc::now(),
        };
        info!(
            users = summary.users_loaded,
            pairs = summary.pairs_matched,
            rows = summary.rows_written,
            "city recomputation committed"
        );
        Ok(summary)
    }

    /// Stored matches of `user_id`, highest total first.
    pub fn matches_for_user(&self, user_id: i64) -> MatchResult<Vec<MatchView>> {
        self.store.fetch_matches_for_user(user_id)
    }

    /// Generate and store traits and embeddings for one user.
    pub fn enrich_user<G: TraitGenerator>(
        &self,
        generator: &G,
        user_id: i64,
    ) -> MatchResult<ProfileTraits> {
        enrichment::enrich_user(&self.store, generator, user_id)
    }

    /// Enrich every user with a story, skipping those left without traits.
    pub fn enrich_users<G: TraitGenerator>(
        &self,
        generator: &G,
    ) -> MatchResult<EnrichmentReport> {
        enrichment::enrich_users(&self.store, generator)
    }

    fn enter(&mut self, phase: Phase) {
        debug!(from = %self.phase, to = %phase, "phase transition");
        self.phase = phase;
    }

    fn fail(&mut self, city_id: i64, phase: Phase, source: MatchError) -> MatchError {
        error!(city_id, phase = %phase, error = %source, "city recomputation failed, rolled back");
        self.phase = Phase::Failed;
        MatchError::Recompute {
            city_id,
            phase,
            source: Box::new(source),
        }
    }
}

/// Score every unordered pair once, in load order, writing two rows per
/// mutually attracted pair.
fn score_city(
    scorer: &CompatibilityScorer,
    profiles: &[Profile],
    writer: &dyn MatchWriter,
    counts: &mut PassCounts,
) -> MatchResult<()> {
    for (i, a) in profiles.iter().enumerate() {
        for b in &profiles[i + 1..] {
            counts.pairs_considered += 1;
            if !mutually_attracted(a, b) {
                continue;
            }

            let score = scorer.score(a, b);
            trace!(a = a.id, b = b.id, total = score.total, "scored pair");

            let (a_to_b, b_to_a) = score.directed_records(a.id, b.id);
            writer.upsert_match(&a_to_b)?;
            writer.upsert_match(&b_to_a)?;

            counts.pairs_matched += 1;
            counts.rows_written += 2;
        }
    }
    Ok(())
}
