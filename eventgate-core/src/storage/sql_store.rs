//! SQLite-backed store for users, events, participations and blocks

use super::errors::StoreResult;
use super::traits::{AdmitOutcome, BlockInsert, EventStore, ParticipationStore, RelationshipStore};
use crate::config::StoreConfig;
use crate::core_event::{
    BlockSummary, Event, EventAccess, EventId, NewEvent, NewUser, Participant, PrivacySettings,
    Timestamp, UserId,
};
use crate::metrics::{Timer, ADMIT_DURATION_MS};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{
    ffi, params, Connection, ErrorCode, OptionalExtension, Row, ToSql, TransactionBehavior,
};
use std::collections::HashSet;
use std::time::Duration;

const EVENT_COLUMNS: &str = "SELECT e.id, e.owner_id, e.slug, e.title, e.capacity,
        e.allow_unregistered_viewers, e.require_verified_to_view, e.require_verified_to_join,
        e.hide_organizer_until_joined, e.hide_participants_until_joined, e.created_at,
        u.name, u.email,
        EXISTS(SELECT 1 FROM event_participants p WHERE p.event_id = e.id AND p.user_id = ?2)
     FROM events e JOIN users u ON u.id = e.owner_id";

/// Which constraint a failed statement tripped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Violation {
    Unique,
    ForeignKey,
}

fn constraint_violation(err: &rusqlite::Error) -> Option<Violation> {
    match err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            match e.extended_code {
                ffi::SQLITE_CONSTRAINT_PRIMARYKEY | ffi::SQLITE_CONSTRAINT_UNIQUE => {
                    Some(Violation::Unique)
                }
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Some(Violation::ForeignKey),
                _ => None,
            }
        }
        _ => None,
    }
}

fn timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Timestamp> {
    let millis: i64 = row.get(idx)?;
    Ok(Timestamp::from_millis(millis.max(0) as u64))
}

fn capacity_from(raw: Option<i64>) -> Option<u32> {
    raw.map(|c| c.clamp(0, u32::MAX as i64) as u32)
}

fn privacy_at(row: &Row<'_>, first: usize) -> rusqlite::Result<PrivacySettings> {
    Ok(PrivacySettings {
        allow_unregistered_viewers: row.get(first)?,
        require_verified_to_view: row.get(first + 1)?,
        require_verified_to_join: row.get(first + 2)?,
        hide_organizer_until_joined: row.get(first + 3)?,
        hide_participants_until_joined: row.get(first + 4)?,
    })
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<Event> {
    Ok(Event {
        id: EventId(row.get(0)?),
        owner_id: UserId(row.get(1)?),
        slug: row.get(2)?,
        title: row.get(3)?,
        capacity: capacity_from(row.get(4)?),
        privacy: privacy_at(row, 5)?,
        created_at: timestamp_at(row, 10)?,
        organizer_name: row.get(11)?,
        organizer_email: row.get(12)?,
        viewer_is_participant: Some(row.get(13)?),
        participants: Vec::new(),
        participant_count: 0,
    })
}

fn participant_from_row(row: &Row<'_>) -> rusqlite::Result<Participant> {
    Ok(Participant {
        user_id: UserId(row.get(0)?),
        name: row.get(1)?,
        email: row.get(2)?,
        bio: row.get(3)?,
        languages: row.get(4)?,
        joined_at: timestamp_at(row, 5)?,
    })
}

fn query_participants(conn: &Connection, event_id: EventId) -> StoreResult<Vec<Participant>> {
    let mut stmt = conn.prepare_cached(
        "SELECT u.id, u.name, u.email, u.bio, u.languages, p.joined_at
         FROM event_participants p JOIN users u ON u.id = p.user_id
         WHERE p.event_id = ?1
         ORDER BY p.joined_at ASC, p.rowid ASC",
    )?;
    let participants = stmt
        .query_map(params![event_id.0], participant_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(participants)
}

/// SQLite store implementing every store trait
pub struct SqlStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqlStore {
    /// Wrap an existing pool and bring its schema up to date
    pub fn new(pool: Pool<SqliteConnectionManager>) -> StoreResult<Self> {
        super::migrations::migrate(&pool)?;
        Ok(Self { pool })
    }

    /// Open the database described by `config`
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        if config.is_in_memory() {
            return Self::in_memory_with_timeout(config.busy_timeout);
        }

        let busy_timeout = config.busy_timeout;
        let enable_wal = config.enable_wal;
        let manager = SqliteConnectionManager::file(&config.database_path).with_init(
            move |conn: &mut Connection| {
                conn.pragma_update(None, "foreign_keys", true)?;
                conn.busy_timeout(busy_timeout)?;
                if enable_wal {
                    let _mode: String = conn.pragma_update_and_check(
                        None,
                        "journal_mode",
                        "WAL",
                        |row| row.get(0),
                    )?;
                }
                Ok(())
            },
        );

        let pool = Pool::builder().max_size(config.pool_size).build(manager)?;
        tracing::info!(
            path = %config.database_path.display(),
            pool_size = config.pool_size,
            wal = enable_wal,
            "Opened event database"
        );
        Self::new(pool)
    }

    /// Private in-memory database (each `:memory:` connection is its own
    /// database, so the pool holds exactly one)
    pub fn in_memory() -> StoreResult<Self> {
        Self::in_memory_with_timeout(Duration::from_secs(5))
    }

    fn in_memory_with_timeout(busy_timeout: Duration) -> StoreResult<Self> {
        let manager = SqliteConnectionManager::memory().with_init(move |conn: &mut Connection| {
            conn.pragma_update(None, "foreign_keys", true)?;
            conn.busy_timeout(busy_timeout)
        });
        let pool = Pool::builder().max_size(1).build(manager)?;
        Self::new(pool)
    }

    // ===== Seeding =====

    /// Insert a user row
    pub fn insert_user(&self, user: &NewUser) -> StoreResult<UserId> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO users (name, email, bio, languages, email_verified, is_admin, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                user.name,
                user.email,
                user.bio,
                user.languages,
                user.email_verified,
                user.is_admin,
                Timestamp::now().as_millis() as i64,
            ],
        )?;
        Ok(UserId(conn.last_insert_rowid()))
    }

    /// Insert an event row
    pub fn insert_event(&self, event: &NewEvent) -> StoreResult<EventId> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO events (owner_id, slug, title, capacity,
                allow_unregistered_viewers, require_verified_to_view, require_verified_to_join,
                hide_organizer_until_joined, hide_participants_until_joined, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                event.owner_id.0,
                event.slug,
                event.title,
                event.capacity.map(i64::from),
                event.privacy.allow_unregistered_viewers,
                event.privacy.require_verified_to_view,
                event.privacy.require_verified_to_join,
                event.privacy.hide_organizer_until_joined,
                event.privacy.hide_participants_until_joined,
                Timestamp::now().as_millis() as i64,
            ],
        )?;
        Ok(EventId(conn.last_insert_rowid()))
    }

    // ===== Event loading =====

    fn load_event(
        &self,
        filter: &str,
        key: &dyn ToSql,
        viewer: Option<UserId>,
    ) -> StoreResult<Option<Event>> {
        let mut conn = self.pool.get()?;
        // Row and roster come from one snapshot so the count matches the list
        let tx = conn.transaction()?;

        let sql = format!("{} WHERE {}", EVENT_COLUMNS, filter);
        let event = tx
            .query_row(&sql, params![key, viewer.map(|v| v.0)], event_from_row)
            .optional()?;

        let Some(mut event) = event else {
            return Ok(None);
        };
        if viewer.is_none() {
            event.viewer_is_participant = None;
        }

        event.participants = query_participants(&tx, event.id)?;
        event.participant_count = event.participants.len() as u32;
        tx.commit()?;

        Ok(Some(event))
    }

    fn admit_locked(
        &self,
        event_id: EventId,
        user_id: UserId,
        joined_at: Timestamp,
    ) -> StoreResult<AdmitOutcome> {
        let mut conn = self.pool.get()?;

        // IMMEDIATE takes the write lock before the count is read, so a
        // concurrent joiner waits (busy_timeout) instead of reading the same count.
        // Every early return drops `tx`, which rolls back.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let seats: Option<(Option<i64>, i64)> = tx
            .query_row(
                "SELECT e.capacity,
                        (SELECT COUNT(*) FROM event_participants p WHERE p.event_id = e.id)
                 FROM events e WHERE e.id = ?1",
                params![event_id.0],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((capacity, count)) = seats else {
            return Ok(AdmitOutcome::EventNotFound);
        };

        let count = count.max(0) as u32;
        if let Some(capacity) = capacity_from(capacity) {
            if count >= capacity {
                return Ok(AdmitOutcome::Full { capacity, count });
            }
        }

        let inserted = tx.execute(
            "INSERT INTO event_participants (event_id, user_id, joined_at) VALUES (?1, ?2, ?3)",
            params![event_id.0, user_id.0, joined_at.as_millis() as i64],
        );

        if let Err(err) = inserted {
            return match constraint_violation(&err) {
                Some(Violation::Unique) => Ok(AdmitOutcome::AlreadyJoined),
                Some(Violation::ForeignKey) => Ok(AdmitOutcome::UnknownUser),
                None => Err(err.into()),
            };
        }

        tx.commit()?;
        Ok(AdmitOutcome::Admitted)
    }
}

impl EventStore for SqlStore {
    fn event_access(&self, event_id: EventId) -> StoreResult<Option<EventAccess>> {
        let conn = self.pool.get()?;
        let access = conn
            .query_row(
                "SELECT id, owner_id, capacity,
                        allow_unregistered_viewers, require_verified_to_view, require_verified_to_join,
                        hide_organizer_until_joined, hide_participants_until_joined
                 FROM events WHERE id = ?1",
                params![event_id.0],
                |row| {
                    Ok(EventAccess {
                        id: EventId(row.get(0)?),
                        owner_id: UserId(row.get(1)?),
                        capacity: capacity_from(row.get(2)?),
                        privacy: privacy_at(row, 3)?,
                    })
                },
            )
            .optional()?;
        Ok(access)
    }

    fn event_by_id(&self, event_id: EventId, viewer: Option<UserId>) -> StoreResult<Option<Event>> {
        self.load_event("e.id = ?1", &event_id.0, viewer)
    }

    fn event_by_slug(&self, slug: &str, viewer: Option<UserId>) -> StoreResult<Option<Event>> {
        self.load_event("e.slug = ?1", &slug, viewer)
    }
}

impl ParticipationStore for SqlStore {
    fn is_participant(&self, event_id: EventId, user_id: UserId) -> StoreResult<bool> {
        let conn = self.pool.get()?;
        let exists = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM event_participants WHERE event_id = ?1 AND user_id = ?2)",
            params![event_id.0, user_id.0],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn participants(&self, event_id: EventId) -> StoreResult<Vec<Participant>> {
        let conn = self.pool.get()?;
        query_participants(&conn, event_id)
    }

    fn participant_count(&self, event_id: EventId) -> StoreResult<u32> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM event_participants WHERE event_id = ?1",
            params![event_id.0],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u32)
    }

    fn admit(
        &self,
        event_id: EventId,
        user_id: UserId,
        joined_at: Timestamp,
    ) -> StoreResult<AdmitOutcome> {
        let timer = Timer::new(ADMIT_DURATION_MS);
        let outcome = self.admit_locked(event_id, user_id, joined_at);
        timer.stop();
        outcome
    }

    fn remove_participant(&self, event_id: EventId, user_id: UserId) -> StoreResult<bool> {
        let conn = self.pool.get()?;
        let removed = conn.execute(
            "DELETE FROM event_participants WHERE event_id = ?1 AND user_id = ?2",
            params![event_id.0, user_id.0],
        )?;
        Ok(removed > 0)
    }
}

impl RelationshipStore for SqlStore {
    fn insert_block(
        &self,
        blocker: UserId,
        blocked: UserId,
        reason: Option<&str>,
        created_at: Timestamp,
    ) -> StoreResult<BlockInsert> {
        let conn = self.pool.get()?;
        let inserted = conn.execute(
            "INSERT INTO user_blocks (blocker_id, blocked_id, reason, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![blocker.0, blocked.0, reason, created_at.as_millis() as i64],
        );

        match inserted {
            Ok(_) => Ok(BlockInsert::Inserted),
            Err(err) => match constraint_violation(&err) {
                Some(Violation::Unique) => Ok(BlockInsert::Duplicate),
                Some(Violation::ForeignKey) => Ok(BlockInsert::UnknownUser),
                None => Err(err.into()),
            },
        }
    }

    fn delete_block(&self, blocker: UserId, blocked: UserId) -> StoreResult<bool> {
        let conn = self.pool.get()?;
        let removed = conn.execute(
            "DELETE FROM user_blocks WHERE blocker_id = ?1 AND blocked_id = ?2",
            params![blocker.0, blocked.0],
        )?;
        Ok(removed > 0)
    }

    fn is_blocked_either_way(&self, a: UserId, b: UserId) -> StoreResult<bool> {
        let conn = self.pool.get()?;
        let blocked = conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM user_blocks
                WHERE (blocker_id = ?1 AND blocked_id = ?2)
                   OR (blocker_id = ?2 AND blocked_id = ?1)
             )",
            params![a.0, b.0],
            |row| row.get(0),
        )?;
        Ok(blocked)
    }

    fn block_counterparts(&self, user: UserId) -> StoreResult<HashSet<UserId>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare_cached(
            "SELECT blocked_id FROM user_blocks WHERE blocker_id = ?1
             UNION
             SELECT blocker_id FROM user_blocks WHERE blocked_id = ?1",
        )?;
        let ids = stmt
            .query_map(params![user.0], |row| Ok(UserId(row.get(0)?)))?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(ids)
    }

    fn blocks_by(&self, blocker: UserId) -> StoreResult<Vec<BlockSummary>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare_cached(
            "SELECT b.id, b.blocked_id, u.name, u.email, b.reason, b.created_at
             FROM user_blocks b JOIN users u ON u.id = b.blocked_id
             WHERE b.blocker_id = ?1
             ORDER BY b.created_at DESC, b.id DESC",
        )?;
        let blocks = stmt
            .query_map(params![blocker.0], |row| {
                Ok(BlockSummary {
                    id: row.get(0)?,
                    blocked_id: UserId(row.get(1)?),
                    name: row.get(2)?,
                    email: row.get(3)?,
                    reason: row.get(4)?,
                    created_at: timestamp_at(row, 5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(blocks)
    }
}
