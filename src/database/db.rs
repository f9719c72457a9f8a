//! Database operations for the review item store
//!
//! Handles SQLite initialization, CRUD for review items, the due-item query,
//! the serialized review transition and the persisted study clock.

use crate::error::{SchedulerError, StoreError, StoreResult};
use crate::models::{Flashcard, ReviewItem, StatusSummary, owner_key, sm2};
use chrono::{DateTime, Duration, SubsecRound, Utc};
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS review_items (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner_id TEXT NOT NULL,
        front TEXT NOT NULL,
        back TEXT NOT NULL,
        kind TEXT NOT NULL DEFAULT 'basic',
        language TEXT NOT NULL DEFAULT 'javascript',
        tags TEXT NOT NULL DEFAULT '[]',
        source TEXT NOT NULL DEFAULT 'manual',
        interval_days INTEGER NOT NULL DEFAULT 0,
        repetitions INTEGER NOT NULL DEFAULT 0,
        ease_factor REAL NOT NULL DEFAULT 2.5,
        next_review_at INTEGER NOT NULL,
        last_reviewed_at INTEGER,
        created_at INTEGER NOT NULL,
        version INTEGER NOT NULL DEFAULT 0
    );

    CREATE INDEX IF NOT EXISTS idx_review_items_owner_due
        ON review_items (owner_id, next_review_at);

    CREATE TABLE IF NOT EXISTS app_state (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );
";

const ITEM_COLUMNS: &str = "id, owner_id, front, back, kind, language, tags, source, \
     interval_days, repetitions, ease_factor, next_review_at, last_reviewed_at, created_at, \
     version";

/// A stored value together with the row version it was read at.
#[derive(Clone, Debug, PartialEq)]
pub struct Versioned<T> {
    pub value: T,
    pub version: i64,
}

/// SQLite-backed collection of review items.
///
/// All access goes through one connection behind a mutex. Reviews run as
/// `BEGIN IMMEDIATE` read-modify-write transactions guarded by a row version,
/// so two reviews of the same item are always applied one after the other.
pub struct ItemStore {
    conn: Mutex<Connection>,
}

impl ItemStore {
    /// Opens (or creates) a database file and makes sure the schema exists.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(&path)?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;",
        )?;
        info!(path = %path.as_ref().display(), "opened review item store");
        Self::init(conn)
    }

    pub fn in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;

        // The study clock starts at the wall-clock time of the first open
        conn.execute(
            "INSERT OR IGNORE INTO app_state (key, value) VALUES ('current_date', ?1)",
            params![Utc::now().timestamp_millis().to_string()],
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::LockError(e.to_string()))
    }

    /// Retrieves the current study date.
    pub fn current_date(&self) -> StoreResult<DateTime<Utc>> {
        let conn = self.lock()?;
        get_current_date(&conn)
    }

    /// Moves the study date 24 hours forward and returns the new date.
    pub fn advance_day(&self) -> StoreResult<DateTime<Utc>> {
        let conn = self.lock()?;
        let next_day = get_current_date(&conn)? + Duration::days(1);

        conn.execute(
            "UPDATE app_state SET value = ?1 WHERE key = 'current_date'",
            params![next_day.timestamp_millis().to_string()],
        )?;

        info!(date = %next_day, "advanced study clock");
        Ok(next_day)
    }

    /// Marks `key` as done in the app state. Only the first call for a key
    /// returns true, also across processes sharing the file.
    pub fn claim_once(&self, key: &str) -> StoreResult<bool> {
        let conn = self.lock()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO app_state (key, value) VALUES (?1, ?2)",
            params![key, Utc::now().timestamp_millis().to_string()],
        )?;
        Ok(inserted == 1)
    }

    /// Number of stored rows for `owner_id`, readable or not.
    pub fn item_count(&self, owner_id: &str) -> StoreResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM review_items WHERE owner_id = ?1",
            params![owner_key(owner_id)],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Creates a new item in the default scheduling state, due at `now`.
    pub fn create_item(
        &self,
        owner_id: &str,
        content: Flashcard,
        now: DateTime<Utc>,
    ) -> StoreResult<ReviewItem> {
        let item = ReviewItem::new(0, owner_id, content, now);
        self.insert_item(owner_id, &item)
    }

    /// Inserts an item with its scheduling state under `owner_id`.
    ///
    /// The item gets a fresh id; the one on `item` is ignored. State that
    /// breaks a scheduling invariant is refused. Timestamps are kept to the
    /// millisecond, and the returned item is exactly what a later read gives.
    pub fn insert_item(&self, owner_id: &str, item: &ReviewItem) -> StoreResult<ReviewItem> {
        let owner_id = owner_key(owner_id);
        if owner_id.is_empty() {
            return Err(StoreError::Validation("owner id is required".to_string()));
        }
        let item = stored_precision(item);
        item.validate()?;
        let content = item.content.clone().normalized()?;

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO review_items (owner_id, front, back, kind, language, tags, source,
                 interval_days, repetitions, ease_factor, next_review_at, last_reviewed_at,
                 created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                owner_id,
                content.front,
                content.back,
                content.kind.as_str(),
                content.language,
                serde_json::to_string(&content.tags)?,
                content.source.as_str(),
                item.interval,
                item.repetitions,
                item.ease_factor,
                item.next_review_at.timestamp_millis(),
                item.last_reviewed_at.map(|t| t.timestamp_millis()),
                item.created_at.timestamp_millis(),
            ],
        )?;
        let id = conn.last_insert_rowid();
        debug!(item_id = id, owner_id, "created review item");

        Ok(ReviewItem {
            id,
            owner_id: owner_id.to_string(),
            content,
            ..item
        })
    }

    pub fn get_item(&self, id: i64) -> StoreResult<ReviewItem> {
        Ok(self.get_versioned(id)?.value)
    }

    /// Reads an item together with its row version, for callers that grade
    /// outside the store and write back with [`ItemStore::save_reviewed`].
    pub fn get_versioned(&self, id: i64) -> StoreResult<Versioned<ReviewItem>> {
        let conn = self.lock()?;
        load_item(&conn, id)
    }

    /// Lists an owner's items in creation order, optionally only those
    /// carrying `tag`. Rows that no longer load are logged and left out.
    pub fn list_items(&self, owner_id: &str, tag: Option<&str>) -> StoreResult<Vec<ReviewItem>> {
        let conn = self.lock()?;
        let items = query_items(
            &conn,
            &format!(
                "SELECT {ITEM_COLUMNS} FROM review_items WHERE owner_id = ?1 ORDER BY id ASC"
            ),
            params![owner_key(owner_id)],
        )?;

        Ok(match tag {
            Some(tag) => items.into_iter().filter(|i| i.content.has_tag(tag)).collect(),
            None => items,
        })
    }

    /// Retrieves the owner's items due at `now`
    ///
    /// Oldest `next_review_at` first; equal due times come back in creation
    /// (id) order, so repeated calls over unchanged data agree. Corrupted
    /// rows are skipped.
    pub fn due_items(&self, owner_id: &str, now: DateTime<Utc>) -> StoreResult<Vec<ReviewItem>> {
        let conn = self.lock()?;
        query_items(
            &conn,
            &format!(
                "SELECT {ITEM_COLUMNS} FROM review_items
                 WHERE owner_id = ?1 AND next_review_at <= ?2
                 ORDER BY next_review_at ASC, id ASC"
            ),
            params![owner_key(owner_id), now.timestamp_millis()],
        )
    }

    /// Applies one review to a stored item and persists the result.
    ///
    /// Read, transition and write happen inside one immediate transaction,
    /// so concurrent reviews of the same item never apply over the same
    /// prior state.
    pub fn review_item(
        &self,
        id: i64,
        quality: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<ReviewItem> {
        let now = now.trunc_subsecs(3);
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let prior = load_item(&tx, id)?;
        let updated = sm2::reviewed(&prior.value, quality, now).inspect_err(|e| {
            warn!(item_id = id, error = %e, "refusing to review corrupted item");
        })?;

        if !write_schedule(&tx, &updated, prior.version)? {
            return Err(StoreError::Conflict(id));
        }
        tx.commit()?;

        debug!(
            item_id = id,
            quality,
            interval = updated.interval,
            repetitions = updated.repetitions,
            ease_factor = updated.ease_factor,
            "review applied"
        );
        Ok(updated)
    }

    /// Writes a transition computed from `prior`, provided nobody else has
    /// reviewed the item since `prior` was read. Returns the item as stored.
    pub fn save_reviewed(
        &self,
        prior: &Versioned<ReviewItem>,
        updated: &ReviewItem,
    ) -> StoreResult<ReviewItem> {
        if updated.id != prior.value.id {
            return Err(StoreError::Validation(format!(
                "review result for item {} does not belong to item {}",
                updated.id, prior.value.id
            )));
        }
        let updated = &stored_precision(updated);
        updated.validate()?;

        let conn = self.lock()?;
        if write_schedule(&conn, updated, prior.version)? {
            return Ok(updated.clone());
        }

        let exists: Option<i64> = conn
            .query_row(
                "SELECT id FROM review_items WHERE id = ?1",
                params![updated.id],
                |row| row.get(0),
            )
            .optional()?;
        match exists {
            Some(_) => {
                warn!(item_id = updated.id, "stale review rejected");
                Err(StoreError::Conflict(updated.id))
            }
            None => Err(StoreError::NotFound(updated.id)),
        }
    }

    pub fn delete_item(&self, id: i64) -> StoreResult<()> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM review_items WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(StoreError::NotFound(id));
        }
        debug!(item_id = id, "deleted review item");
        Ok(())
    }

    /// Counts the owner's items per derived status, plus how many are due.
    pub fn status_summary(
        &self,
        owner_id: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<StatusSummary> {
        let mut summary = StatusSummary::default();
        for item in self.list_items(owner_id, None)? {
            summary.record(item.status(), item.is_due(now));
        }
        Ok(summary)
    }
}

fn get_current_date(conn: &Connection) -> StoreResult<DateTime<Utc>> {
    let value: String = conn.query_row(
        "SELECT value FROM app_state WHERE key = 'current_date'",
        [],
        |row| row.get(0),
    )?;

    value
        .parse::<i64>()
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .ok_or_else(|| {
            StoreError::Validation(format!("stored current date '{value}' is not a timestamp"))
        })
}

/// The item with its timestamps cut to the millisecond resolution of the
/// table.
fn stored_precision(item: &ReviewItem) -> ReviewItem {
    ReviewItem {
        next_review_at: item.next_review_at.trunc_subsecs(3),
        last_reviewed_at: item.last_reviewed_at.map(|t| t.trunc_subsecs(3)),
        created_at: item.created_at.trunc_subsecs(3),
        ..item.clone()
    }
}

fn load_item(conn: &Connection, id: i64) -> StoreResult<Versioned<ReviewItem>> {
    let raw = conn
        .query_row(
            &format!("SELECT {ITEM_COLUMNS} FROM review_items WHERE id = ?1"),
            params![id],
            RawItem::from_row,
        )
        .optional()?
        .ok_or(StoreError::NotFound(id))?;

    let version = raw.version;
    Ok(Versioned {
        value: raw.into_item()?,
        version,
    })
}

fn query_items(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> StoreResult<Vec<ReviewItem>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, RawItem::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let items = rows
        .into_iter()
        .filter_map(|raw| {
            let id = raw.id;
            raw.into_item()
                .inspect_err(|e| warn!(item_id = id, error = %e, "skipping unreadable item"))
                .ok()
        })
        .collect();
    Ok(items)
}

/// Writes the scheduling fields and bumps the version. Returns false when
/// the row is missing or its version moved on.
fn write_schedule(
    conn: &Connection,
    item: &ReviewItem,
    expected_version: i64,
) -> StoreResult<bool> {
    let updated = conn.execute(
        "UPDATE review_items
         SET interval_days = ?1, repetitions = ?2, ease_factor = ?3,
             next_review_at = ?4, last_reviewed_at = ?5, version = version + 1
         WHERE id = ?6 AND version = ?7",
        params![
            item.interval,
            item.repetitions,
            item.ease_factor,
            item.next_review_at.timestamp_millis(),
            item.last_reviewed_at.map(|t| t.timestamp_millis()),
            item.id,
            expected_version,
        ],
    )?;
    Ok(updated == 1)
}

/// Row as stored, before range checks.
struct RawItem {
    id: i64,
    owner_id: String,
    front: String,
    back: String,
    kind: String,
    language: String,
    tags: String,
    source: String,
    interval: i64,
    repetitions: i64,
    ease_factor: f64,
    next_review_at: i64,
    last_reviewed_at: Option<i64>,
    created_at: i64,
    version: i64,
}

impl RawItem {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            front: row.get(2)?,
            back: row.get(3)?,
            kind: row.get(4)?,
            language: row.get(5)?,
            tags: row.get(6)?,
            source: row.get(7)?,
            interval: row.get(8)?,
            repetitions: row.get(9)?,
            ease_factor: row.get(10)?,
            next_review_at: row.get(11)?,
            last_reviewed_at: row.get(12)?,
            created_at: row.get(13)?,
            version: row.get(14)?,
        })
    }

    fn into_item(self) -> StoreResult<ReviewItem> {
        let id = self.id;
        let invalid = |reason: String| {
            StoreError::Scheduler(SchedulerError::InvalidState { item_id: id, reason })
        };

        let interval = u32::try_from(self.interval)
            .map_err(|_| invalid(format!("interval {} is out of range", self.interval)))?;
        let repetitions = u32::try_from(self.repetitions)
            .map_err(|_| invalid(format!("repetitions {} is out of range", self.repetitions)))?;
        let timestamp = |millis: i64| {
            DateTime::from_timestamp_millis(millis)
                .ok_or_else(|| invalid(format!("timestamp {millis} is out of range")))
        };

        let content = Flashcard {
            front: self.front,
            back: self.back,
            kind: self
                .kind
                .parse()
                .map_err(|e| StoreError::Validation(format!("item {id}: {e}")))?,
            language: self.language,
            tags: serde_json::from_str(&self.tags)?,
            source: self
                .source
                .parse()
                .map_err(|e| StoreError::Validation(format!("item {id}: {e}")))?,
        };

        Ok(ReviewItem {
            id,
            owner_id: self.owner_id,
            content,
            interval,
            repetitions,
            ease_factor: self.ease_factor,
            next_review_at: timestamp(self.next_review_at)?,
            last_reviewed_at: self.last_reviewed_at.map(&timestamp).transpose()?,
            created_at: timestamp(self.created_at)?,
        })
    }
}
