use serde::{Deserialize, Serialize};

use crate::normalize;

/// Stated sexual orientation of a user.
///
/// Anything outside the four known values parses to `Unrecognized`, which
/// is never attracted to anyone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Straight,
    Gay,
    Lesbian,
    Bisexual,
    Unrecognized,
}

impl Orientation {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "straight" => Orientation::Straight,
            "gay" => Orientation::Gay,
            "lesbian" => Orientation::Lesbian,
            "bisexual" => Orientation::Bisexual,
            _ => Orientation::Unrecognized,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Straight => "straight",
            Orientation::Gay => "gay",
            Orientation::Lesbian => "lesbian",
            Orientation::Bisexual => "bisexual",
            Orientation::Unrecognized => "unrecognized",
        }
    }
}

/// A user row exactly as persisted. Trait lists and embeddings are raw JSON
/// text and may be missing or malformed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredUser {
    pub id: i64,
    pub username: String,
    pub story: String,
    pub city_id: i64,
    pub gender: Option<String>,
    pub sexual_orientation: Option<String>,
    pub self_traits: Option<String>,
    pub desired_traits: Option<String>,
    pub self_embedding: Option<String>,
    pub desired_embedding: Option<String>,
}

/// A user after normalization: the only shape the scoring code sees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: i64,

    /// Lowercased gender, `None` when absent or blank
    pub gender: Option<String>,

    pub orientation: Option<Orientation>,

    /// What the user says they are
    pub self_traits: Vec<String>,

    /// What the user is looking for
    pub desired_traits: Vec<String>,

    pub self_embedding: Vec<f64>,
    pub desired_embedding: Vec<f64>,
}

impl Profile {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            gender: None,
            orientation: None,
            self_traits: Vec::new(),
            desired_traits: Vec::new(),
            self_embedding: Vec::new(),
            desired_embedding: Vec::new(),
        }
    }

    pub fn from_stored(user: &StoredUser) -> Self {
        normalize::normalize_user(user)
    }

    pub fn with_gender(mut self, gender: &str) -> Self {
        self.gender = normalize::normalize_label(Some(gender));
        self
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = Some(orientation);
        self
    }

    pub fn with_self_traits(mut self, traits: Vec<&str>) -> Self {
        self.self_traits = normalize::sanitize_traits(traits);
        self
    }

    pub fn with_desired_traits(mut self, traits: Vec<&str>) -> Self {
        self.desired_traits = normalize::sanitize_traits(traits);
        self
    }

    pub fn with_embeddings(mut self, self_embedding: Vec<f64>, desired_embedding: Vec<f64>) -> Self {
        self.self_embedding = self_embedding;
        self.desired_embedding = desired_embedding;
        self
    }
}

/// Generated trait lists and their embeddings for one user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileTraits {
    pub self_traits: Vec<String>,
    pub desired_traits: Vec<String>,
    pub self_embedding: Vec<f64>,
    pub desired_embedding: Vec<f64>,
}

/// A user to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub username: String,
    pub story: String,
    pub city_id: i64,
    pub gender: Option<String>,
    pub orientation: Orientation,
    pub traits: Option<ProfileTraits>,
}

impl NewUser {
    pub fn new(username: &str, city_id: i64) -> Self {
        Self {
            username: username.to_string(),
            story: String::new(),
            city_id,
            gender: None,
            orientation: Orientation::default(),
            traits: None,
        }
    }

    pub fn with_story(mut self, story: &str) -> Self {
        self.story = story.to_string();
        self
    }

    pub fn with_gender(mut self, gender: &str) -> Self {
        self.gender = Some(gender.to_string());
        self
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_traits(mut self, traits: ProfileTraits) -> Self {
        self.traits = Some(traits);
        self
    }
}

/// One directed match row: compatibility of `matched_user_id` as seen by
/// `user_id`. Every matched pair is stored as two of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub user_id: i64,
    pub matched_user_id: i64,

    /// Weighted total, the ranking key
    pub total_compatibility: u8,

    /// Self traits vs self traits (same on both rows)
    pub character_compatibility: u8,

    /// Desired traits vs desired traits (same on both rows)
    pub desired_compatibility: u8,

    pub embedding_compatibility: u8,

    /// How well my self traits cover what they want
    pub my_perspective: u8,

    /// How well their self traits cover what I want
    pub their_perspective: u8,

    pub i_have_what_they_want: Vec<String>,
    pub they_have_what_i_want: Vec<String>,
    pub common_traits: Vec<String>,
}

/// A match row as read back for presentation, with the other user's name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchView {
    pub username: String,
    #[serde(flatten)]
    pub record: MatchRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub id: i64,
    pub name: String,
}
