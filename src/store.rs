use std::path::Path;
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::MatchResult;
use crate::models::{City, MatchRecord, MatchView, NewUser, ProfileTraits, StoredUser};

/// Write primitives available inside a recomputation transaction.
pub trait MatchWriter {
    /// Delete every match row owned by a user of `city_id`. Returns rows removed.
    fn clear_matches_for_city(&self, city_id: i64) -> MatchResult<usize>;

    /// Insert a directed row, replacing any row with the same
    /// `(user_id, matched_user_id)`.
    fn upsert_match(&self, record: &MatchRecord) -> MatchResult<()>;
}

/// Persistence used by the engine. Implementations must make
/// [`transaction`](MatchStore::transaction) all-or-nothing.
pub trait MatchStore {
    fn fetch_users_by_city(&self, city_id: i64) -> MatchResult<Vec<StoredUser>>;

    fn fetch_user(&self, user_id: i64) -> MatchResult<Option<StoredUser>>;

    /// Users with a non-empty story, in id order.
    fn fetch_users_with_story(&self) -> MatchResult<Vec<StoredUser>>;

    fn save_profile_traits(&self, user_id: i64, traits: &ProfileTraits) -> MatchResult<()>;

    /// Match rows owned by `user_id`, best first.
    fn fetch_matches_for_user(&self, user_id: i64) -> MatchResult<Vec<MatchView>>;

    /// Run `work` against an exclusive write transaction. Commits if `work`
    /// returns `Ok`, otherwise rolls back every write it made.
    fn transaction<T, F>(&mut self, work: F) -> MatchResult<T>
    where
        F: FnOnce(&dyn MatchWriter) -> MatchResult<T>;
}

/// SQLite-backed store. Owns one connection; the engine that owns the store
/// is its only writer.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Create a store backed by an in-memory SQLite database.
    pub fn in_memory() -> MatchResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create a store backed by a file-based SQLite database.
    pub fn persistent(path: impl AsRef<Path>) -> MatchResult<Self> {
        Self::open(&EngineConfig::default().with_database_path(path.as_ref()))
    }

    /// Open the database named by `config`, applying its connection settings.
    pub fn open(config: &EngineConfig) -> MatchResult<Self> {
        let conn = Connection::open(&config.database_path)?;
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
        let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        let store = Self { conn };
        store.init_schema()?;
        debug!(path = %config.database_path.display(), "opened match store");
        Ok(store)
    }

    fn init_schema(&self) -> MatchResult<()> {
        self.conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS cities (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT UNIQUE NOT NULL,
                story TEXT NOT NULL DEFAULT '',
                city_id INTEGER NOT NULL,
                gender TEXT,
                sexual_orientation TEXT DEFAULT 'straight',
                self_traits TEXT,              -- JSON array of strings
                desired_traits TEXT,           -- JSON array of strings
                self_embedding TEXT,           -- JSON array of numbers
                desired_embedding TEXT         -- JSON array of numbers
            );

            CREATE INDEX IF NOT EXISTS idx_users_city ON users(city_id);

            -- Two rows per matched pair, one per perspective.
            CREATE TABLE IF NOT EXISTS matches (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                matched_user_id INTEGER NOT NULL,
                total_compatibility INTEGER NOT NULL DEFAULT 0,
                character_compatibility INTEGER NOT NULL DEFAULT 0,
                desired_compatibility INTEGER NOT NULL DEFAULT 0,
                embedding_compatibility INTEGER NOT NULL DEFAULT 0,
                my_perspective INTEGER NOT NULL DEFAULT 0,
                their_perspective INTEGER NOT NULL DEFAULT 0,
                i_have_what_they_want TEXT,    -- JSON array of strings
                they_have_what_i_want TEXT,    -- JSON array of strings
                common_traits TEXT,            -- JSON array of strings
                FOREIGN KEY (user_id) REFERENCES users(id),
                FOREIGN KEY (matched_user_id) REFERENCES users(id),
                UNIQUE (user_id, matched_user_id)
            );

            CREATE INDEX IF NOT EXISTS idx_matches_user_total
                ON matches(user_id, total_compatibility DESC);
            ",
        )?;
        Ok(())
    }

    /// Direct access to the connection, for callers that need raw SQL.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn insert_city(&self, name: &str) -> MatchResult<i64> {
        self.conn
            .execute("INSERT INTO cities (name) VALUES (?1)", params![name])?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_cities(&self) -> MatchResult<Vec<City>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM cities ORDER BY id ASC")?;
        let cities = stmt
            .query_map([], |row| {
                Ok(City {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(cities)
    }

    /// Insert a user and return its id.
    pub fn insert_user(&self, user: &NewUser) -> MatchResult<i64> {
        let traits = user.traits.as_ref();
        self.conn.execute(
            "INSERT INTO users (username, story, city_id, gender, sexual_orientation,
             self_traits, desired_traits, self_embedding, desired_embedding)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                user.username,
                user.story,
                user.city_id,
                user.gender,
                user.orientation.as_str(),
                traits.map(|t| to_json(&t.self_traits)),
                traits.map(|t| to_json(&t.desired_traits)),
                traits.map(|t| to_json(&t.self_embedding)),
                traits.map(|t| to_json(&t.desired_embedding)),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Number of match rows owned by users of `city_id`.
    pub fn count_matches_for_city(&self, city_id: i64) -> MatchResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM matches
             WHERE user_id IN (SELECT id FROM users WHERE city_id = ?1)",
            params![city_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Every match row in key order. Used to compare whole-table snapshots.
    pub fn all_matches(&self) -> MatchResult<Vec<MatchRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches m ORDER BY m.user_id, m.matched_user_id"
        ))?;
        let records = stmt
            .query_map([], row_to_match)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

impl MatchStore for SqliteStore {
    fn fetch_users_by_city(&self, city_id: i64) -> MatchResult<Vec<StoredUser>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE city_id = ?1 ORDER BY id ASC"
        ))?;
        let users = stmt
            .query_map(params![city_id], row_to_user)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    fn fetch_user(&self, user_id: i64) -> MatchResult<Option<StoredUser>> {
        let user = self
            .conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![user_id],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    fn fetch_users_with_story(&self) -> MatchResult<Vec<StoredUser>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE story IS NOT NULL AND story != '' ORDER BY id ASC"
        ))?;
        let users = stmt
            .query_map([], row_to_user)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    fn save_profile_traits(&self, user_id: i64, traits: &ProfileTraits) -> MatchResult<()> {
        self.conn.execute(
            "UPDATE users SET self_traits = ?1, desired_traits = ?2,
             self_embedding = ?3, desired_embedding = ?4 WHERE id = ?5",
            params![
                to_json(&traits.self_traits),
                to_json(&traits.desired_traits),
                to_json(&traits.self_embedding),
                to_json(&traits.desired_embedding),
                user_id,
            ],
        )?;
        Ok(())
    }

    fn fetch_matches_for_user(&self, user_id: i64) -> MatchResult<Vec<MatchView>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {MATCH_COLUMNS}, u.username
             FROM matches m
             JOIN users u ON u.id = m.matched_user_id
             WHERE m.user_id = ?1
             ORDER BY m.total_compatibility DESC, m.matched_user_id ASC"
        ))?;
        let views = stmt
            .query_map(params![user_id], |row| {
                Ok(MatchView {
                    record: row_to_match(row)?,
                    username: row.get(11)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(views)
    }

    fn transaction<T, F>(&mut self, work: F) -> MatchResult<T>
    where
        F: FnOnce(&dyn MatchWriter) -> MatchResult<T>,
    {
        // IMMEDIATE takes the write lock up front so two recomputations
        // against the same database serialize instead of interleaving.
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = work(&*tx)?;
        tx.commit()?;
        Ok(out)
    }
}

impl MatchWriter for Connection {
    fn clear_matches_for_city(&self, city_id: i64) -> MatchResult<usize> {
        let removed = self.execute(
            "DELETE FROM matches
             WHERE user_id IN (SELECT id FROM users WHERE city_id = ?1)",
            params![city_id],
        )?;
        Ok(removed)
    }

    fn upsert_match(&self, record: &MatchRecord) -> MatchResult<()> {
        let mut stmt = self.prepare_cached(
            "INSERT OR REPLACE INTO matches (user_id, matched_user_id, total_compatibility,
             character_compatibility, desired_compatibility, embedding_compatibility,
             my_perspective, their_perspective, i_have_what_they_want,
             they_have_what_i_want, common_traits)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )?;
        stmt.execute(params![
            record.user_id,
            record.matched_user_id,
            record.total_compatibility,
            record.character_compatibility,
            record.desired_compatibility,
            record.embedding_compatibility,
            record.my_perspective,
            record.their_perspective,
            to_json(&record.i_have_what_they_want),
            to_json(&record.they_have_what_i_want),
            to_json(&record.common_traits),
        ])?;
        Ok(())
    }
}

const USER_COLUMNS: &str = "id, username, story, city_id, gender, sexual_orientation,
    self_traits, desired_traits, self_embedding, desired_embedding";

const MATCH_COLUMNS: &str = "m.user_id, m.matched_user_id, m.total_compatibility,
    m.character_compatibility, m.desired_compatibility, m.embedding_compatibility,
    m.my_perspective, m.their_perspective, m.i_have_what_they_want,
    m.they_have_what_i_want, m.common_traits";

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

fn json_list(raw: Option<String>) -> Vec<String> {
    raw.and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<StoredUser> {
    Ok(StoredUser {
        id: row.get(0)?,
        username: row.get(1)?,
        story: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        city_id: row.get(3)?,
        gender: row.get(4)?,
        sexual_orientation: row.get(5)?,
        self_traits: row.get(6)?,
        desired_traits: row.get(7)?,
        self_embedding: row.get(8)?,
        desired_embedding: row.get(9)?,
    })
}

fn row_to_match(row: &rusqlite::Row) -> rusqlite::Result<MatchRecord> {
    Ok(MatchRecord {
        user_id: row.get(0)?,
        matched_user_id: row.get(1)?,
        total_compatibility: row.get(2)?,
        character_compatibility: row.get(3)?,
        desired_compatibility: row.get(4)?,
        embedding_compatibility: row.get(5)?,
        my_perspective: row.get(6)?,
        their_perspective: row.get(7)?,
        i_have_what_they_want: json_list(row.get(8)?),
        they_have_what_i_want: json_list(row.get(9)?),
        common_traits: json_list(row.get(10)?),
    })
}
