//! Trait normalizer: turns raw stored user fields into a scoring-ready [`Profile`].
//!
//! Every function here is total. Missing or malformed data maps to an empty
//! list, an empty vector or `None`, so degenerate users still take part in
//! pairing and simply contribute zero for the missing component.

use serde_json::Value;
use tracing::warn;

use crate::models::{Orientation, Profile, StoredUser};

/// Build a [`Profile`] from a stored user row.
pub fn normalize_user(user: &StoredUser) -> Profile {
    Profile {
        id: user.id,
        gender: normalize_label(user.gender.as_deref()),
        orientation: normalize_label(user.sexual_orientation.as_deref())
            .map(|o| Orientation::parse(&o)),
        self_traits: parse_traits(user.id, "self_traits", user.self_traits.as_deref()),
        desired_traits: parse_traits(user.id, "desired_traits", user.desired_traits.as_deref()),
        self_embedding: parse_embedding(user.id, "self_embedding", user.self_embedding.as_deref()),
        desired_embedding: parse_embedding(
            user.id,
            "desired_embedding",
            user.desired_embedding.as_deref(),
        ),
    }
}

/// Trim and lowercase a categorical label. Blank labels count as absent.
pub fn normalize_label(raw: Option<&str>) -> Option<String> {
    raw.map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty())
}

/// Lowercase and trim each trait, dropping blanks. Order is preserved.
pub fn sanitize_traits<I, S>(traits: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    traits
        .into_iter()
        .map(|t| t.as_ref().trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Parse a JSON array of strings, lowercasing and trimming each entry.
/// Anything else yields an empty list.
///
/// Blank entries are kept. An empty term is contained in every other term,
/// so it scores as a containment match against anything.
pub fn parse_traits(user_id: i64, field: &str, raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
        return Vec::new();
    };

    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(traits) => traits.iter().map(|t| t.trim().to_lowercase()).collect(),
        Err(e) => {
            warn!(user_id, field, error = %e, "malformed stored trait list, using empty list");
            Vec::new()
        }
    }
}

/// Parse a JSON array of numbers. Numeric strings are accepted; any other
/// element, or any non-array payload, yields an empty vector.
pub fn parse_embedding(user_id: i64, field: &str, raw: Option<&str>) -> Vec<f64> {
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
        return Vec::new();
    };

    let parsed = serde_json::from_str::<Vec<Value>>(raw)
        .ok()
        .and_then(|values| values.iter().map(value_to_f64).collect::<Option<Vec<f64>>>());

    match parsed {
        Some(vector) => vector,
        None => {
            warn!(user_id, field, "malformed stored embedding, using empty vector");
            Vec::new()
        }
    }
}

fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}
