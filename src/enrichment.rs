//! Turning a user's free-text story into trait lists and embeddings.
//!
//! The generator itself (an LLM plus an embedding model) lives outside this
//! crate behind [`TraitGenerator`].

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{MatchError, MatchResult};
use crate::models::{ProfileTraits, StoredUser};
use crate::normalize::sanitize_traits;
use crate::store::MatchStore;

/// External source of traits and embeddings.
pub trait TraitGenerator {
    /// Extract `(self_traits, desired_traits)` from a story.
    fn generate_traits(&self, story: &str) -> MatchResult<(Vec<String>, Vec<String>)>;

    fn generate_embedding(&self, text: &str) -> MatchResult<Vec<f64>>;
}

/// Outcome of a batch enrichment pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnrichmentReport {
    /// Users whose traits and embeddings were written
    pub processed: usize,
    /// Users skipped because the generator gave no usable traits
    pub skipped: Vec<i64>,
}

/// Generate, sanitize and persist traits and embeddings for `user_id`.
///
/// Nothing is written unless both trait lists are non-empty after
/// sanitizing and both embeddings were produced.
pub fn enrich_user<S, G>(store: &S, generator: &G, user_id: i64) -> MatchResult<ProfileTraits>
where
    S: MatchStore + ?Sized,
    G: TraitGenerator + ?Sized,
{
    let user = store
        .fetch_user(user_id)?
        .ok_or(MatchError::UserNotFound(user_id))?;
    enrich_stored(store, generator, &user)
}

/// Enrich every user that has a story.
///
/// Users left with an empty trait list are logged and skipped. Any other
/// failure stops the pass; users already processed keep their new traits.
pub fn enrich_users<S, G>(store: &S, generator: &G) -> MatchResult<EnrichmentReport>
where
    S: MatchStore + ?Sized,
    G: TraitGenerator + ?Sized,
{
    let mut report = EnrichmentReport::default();

    for user in store.fetch_users_with_story()? {
        debug!(user_id = user.id, "generating traits");
        match enrich_stored(store, generator, &user) {
            Ok(_) => report.processed += 1,
            Err(MatchError::EmptyTraits(id)) => {
                warn!(user_id = id, "skipping user with empty traits");
                report.skipped.push(id);
            }
            Err(e) => return Err(e),
        }
    }

    info!(
        processed = report.processed,
        skipped = report.skipped.len(),
        "traits and embeddings generated"
    );
    Ok(report)
}

fn enrich_stored<S, G>(store: &S, generator: &G, user: &StoredUser) -> MatchResult<ProfileTraits>
where
    S: MatchStore + ?Sized,
    G: TraitGenerator + ?Sized,
{
    let user_id = user.id;
    let (raw_self, raw_desired) = generator.generate_traits(&user.story)?;
    let self_traits = sanitize_traits(raw_self);
    let desired_traits = sanitize_traits(raw_desired);

    if self_traits.is_empty() || desired_traits.is_empty() {
        warn!(
            user_id,
            self_count = self_traits.len(),
            desired_count = desired_traits.len(),
            "generator returned no usable traits"
        );
        return Err(MatchError::EmptyTraits(user_id));
    }

    let self_embedding = generator.generate_embedding(&self_traits.join(" "))?;
    let desired_embedding = generator.generate_embedding(&desired_traits.join(" "))?;

    let traits = ProfileTraits {
        self_traits,
        desired_traits,
        self_embedding,
        desired_embedding,
    };
    store.save_profile_traits(user_id, &traits)?;

    debug!(
        user_id,
        self_count = traits.self_traits.len(),
        desired_count = traits.desired_traits.len(),
        dims = traits.self_embedding.len(),
        "enriched user profile"
    );
    Ok(traits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewUser;
    use crate::store::SqliteStore;
    use std::cell::RefCell;

    /// Splits the story on "|" into self and desired halves, and embeds text
    /// as `[word count, char count]`. Records every embedded text.
    #[derive(Default)]
    struct StubGenerator {
        embedded: RefCell<Vec<String>>,
    }

    impl TraitGenerator for StubGenerator {
        fn generate_traits(&self, story: &str) -> MatchResult<(Vec<String>, Vec<String>)> {
            let (me, them) = story.split_once('|').unwrap_or((story, ""));
            let split = |s: &str| s.split(',').map(String::from).collect::<Vec<_>>();
            Ok((split(me), split(them)))
        }

        fn generate_embedding(&self, text: &str) -> MatchResult<Vec<f64>> {
            self.embedded.borrow_mut().push(text.to_string());
            Ok(vec![
                text.split_whitespace().count() as f64,
                text.len() as f64,
            ])
        }
    }

    struct FailingGenerator;

    impl TraitGenerator for FailingGenerator {
        fn generate_traits(&self, _story: &str) -> MatchResult<(Vec<String>, Vec<String>)> {
            Err(MatchError::Generation("service unavailable".to_string()))
        }

        fn generate_embedding(&self, _text: &str) -> MatchResult<Vec<f64>> {
            Err(MatchError::Generation("service unavailable".to_string()))
        }
    }

    fn store_with(story: &str) -> (SqliteStore, i64) {
        let store = SqliteStore::in_memory().unwrap();
        let id = store
            .insert_user(&NewUser::new("riya", 1).with_story(story))
            .unwrap();
        (store, id)
    }

    #[test]
    fn test_enrich_sanitizes_and_persists() {
        let (store, id) = store_with(" Kind , FUNNY,, |Tall, good cook ");
        let generator = StubGenerator::default();

        let traits = enrich_user(&store, &generator, id).unwrap();
        assert_eq!(traits.self_traits, vec!["kind", "funny"]);
        assert_eq!(traits.desired_traits, vec!["tall", "good cook"]);
        assert_eq!(
            *generator.embedded.borrow(),
            vec!["kind funny".to_string(), "tall good cook".to_string()]
        );
        assert_eq!(traits.self_embedding, vec![2.0, 10.0]);

        let user = store.fetch_user(id).unwrap().unwrap();
        assert_eq!(user.self_traits.as_deref(), Some(r#"["kind","funny"]"#));
        assert_eq!(user.desired_traits.as_deref(), Some(r#"["tall","good cook"]"#));
        assert_eq!(user.desired_embedding.as_deref(), Some("[3.0,14.0]"));
    }

    #[test]
    fn test_enrich_missing_user() {
        let store = SqliteStore::in_memory().unwrap();
        let err = enrich_user(&store, &StubGenerator::default(), 404).unwrap_err();
        assert!(matches!(err, MatchError::UserNotFound(404)));
    }

    #[test]
    fn test_enrich_rejects_empty_lists() {
        let (store, id) = store_with("kind, funny| ,  ");
        let generator = StubGenerator::default();

        let err = enrich_user(&store, &generator, id).unwrap_err();
        assert!(matches!(err, MatchError::EmptyTraits(x) if x == id));
        assert!(generator.embedded.borrow().is_empty());
        assert!(store.fetch_user(id).unwrap().unwrap().self_traits.is_none());
    }

    #[test]
    fn test_enrich_users_skips_empty_and_counts() {
        let store = SqliteStore::in_memory().unwrap();
        let a = store
            .insert_user(&NewUser::new("a", 1).with_story("kind,funny|tall"))
            .unwrap();
        let b = store
            .insert_user(&NewUser::new("b", 1).with_story("calm|  "))
            .unwrap();
        let silent = store.insert_user(&NewUser::new("silent", 2)).unwrap();
        let c = store
            .insert_user(&NewUser::new("c", 2).with_story("bold|reader"))
            .unwrap();

        let report = enrich_users(&store, &StubGenerator::default()).unwrap();
        assert_eq!(report.processed, 2);
        assert_eq!(report.skipped, vec![b]);

        for id in [a, c] {
            assert!(store.fetch_user(id).unwrap().unwrap().self_traits.is_some());
        }
        for id in [b, silent] {
            assert!(store.fetch_user(id).unwrap().unwrap().self_traits.is_none());
        }
    }

    #[test]
    fn test_enrich_users_with_no_stories() {
        let store = SqliteStore::in_memory().unwrap();
        store.insert_user(&NewUser::new("a", 1)).unwrap();
        let report = enrich_users(&store, &StubGenerator::default()).unwrap();
        assert_eq!(report, EnrichmentReport::default());
    }

    #[test]
    fn test_enrich_users_stops_on_storage_failure() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .insert_user(&NewUser::new("a", 1).with_story("kind|tall"))
            .unwrap();
        store
            .connection()
            .execute_batch(
                "CREATE TRIGGER fail_update BEFORE UPDATE ON users
                 BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
            )
            .unwrap();

        let err = enrich_users(&store, &StubGenerator::default()).unwrap_err();
        assert!(matches!(err, MatchError::Storage(_)));
    }

    #[test]
    fn test_enrich_users_stops_on_generator_failure() {
        let (store, _) = store_with("kind|tall");
        let err = enrich_users(&store, &FailingGenerator).unwrap_err();
        assert!(matches!(err, MatchError::Generation(_)));
    }

    #[test]
    fn test_enrich_propagates_generator_failure() {
        let (store, id) = store_with("kind|tall");
        let err = enrich_user(&store, &FailingGenerator, id).unwrap_err();
        assert!(matches!(err, MatchError::Generation(_)));
        assert!(store.fetch_user(id).unwrap().unwrap().self_traits.is_none());
    }
}
