//! Database migrations for events, participations and blocks
//!
//! Each migration is applied atomically and tracked in the schema_version table.

use super::errors::{StoreError, StoreResult};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};

use crate::core_event::Timestamp;

/// Current schema version
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Migration descriptor
pub struct Migration {
    pub version: i32,
    pub description: &'static str,
    pub up_sql: &'static str,
    pub down_sql: Option<&'static str>,
}

/// All available migrations in order
pub fn get_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "Users, events and participations",
            up_sql: r#"
                CREATE TABLE IF NOT EXISTS users (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    email TEXT NOT NULL UNIQUE,
                    bio TEXT,
                    languages TEXT,                         -- comma-separated codes
                    email_verified BOOLEAN NOT NULL DEFAULT 0,
                    is_admin BOOLEAN NOT NULL DEFAULT 0,
                    created_at INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS events (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    owner_id INTEGER NOT NULL,
                    slug TEXT NOT NULL UNIQUE,
                    title TEXT NOT NULL,
                    capacity INTEGER CHECK(capacity IS NULL OR capacity >= 0),
                    allow_unregistered_viewers BOOLEAN NOT NULL DEFAULT 0,
                    require_verified_to_view BOOLEAN NOT NULL DEFAULT 0,
                    require_verified_to_join BOOLEAN NOT NULL DEFAULT 0,
                    hide_organizer_until_joined BOOLEAN NOT NULL DEFAULT 0,
                    hide_participants_until_joined BOOLEAN NOT NULL DEFAULT 0,
                    created_at INTEGER NOT NULL,
                    FOREIGN KEY (owner_id) REFERENCES users(id) ON DELETE CASCADE
                );

                CREATE INDEX IF NOT EXISTS idx_events_owner ON events(owner_id);

                -- One row per (event, user); the participant count is derived from it
                CREATE TABLE IF NOT EXISTS event_participants (
                    event_id INTEGER NOT NULL,
                    user_id INTEGER NOT NULL,
                    joined_at INTEGER NOT NULL,
                    PRIMARY KEY (event_id, user_id),
                    FOREIGN KEY (event_id) REFERENCES events(id) ON DELETE CASCADE,
                    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
                );

                CREATE INDEX IF NOT EXISTS idx_participants_user ON event_participants(user_id);
            "#,
            down_sql: Some(
                r#"
                DROP INDEX IF EXISTS idx_participants_user;
                DROP TABLE IF EXISTS event_participants;
                DROP INDEX IF EXISTS idx_events_owner;
                DROP TABLE IF EXISTS events;
                DROP TABLE IF EXISTS users;
            "#,
            ),
        },
        Migration {
            version: 2,
            description: "Directional user blocks",
            up_sql: r#"
                CREATE TABLE IF NOT EXISTS user_blocks (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    blocker_id INTEGER NOT NULL,
                    blocked_id INTEGER NOT NULL,
                    reason TEXT,
                    created_at INTEGER NOT NULL,
                    UNIQUE (blocker_id, blocked_id),
                    CHECK (blocker_id <> blocked_id),
                    FOREIGN KEY (blocker_id) REFERENCES users(id) ON DELETE CASCADE,
                    FOREIGN KEY (blocked_id) REFERENCES users(id) ON DELETE CASCADE
                );

                CREATE INDEX IF NOT EXISTS idx_blocks_blocker ON user_blocks(blocker_id);
                CREATE INDEX IF NOT EXISTS idx_blocks_blocked ON user_blocks(blocked_id);
            "#,
            down_sql: Some(
                r#"
                DROP INDEX IF EXISTS idx_blocks_blocked;
                DROP INDEX IF EXISTS idx_blocks_blocker;
                DROP TABLE IF EXISTS user_blocks;
            "#,
            ),
        },
    ]
}

/// Get current schema version from database
pub fn get_current_version(pool: &Pool<SqliteConnectionManager>) -> StoreResult<i32> {
    let conn = pool.get()?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let version: Option<i32> = conn
        .query_row(
            "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()?;

    Ok(version.unwrap_or(0))
}

/// Run all pending migrations
pub fn migrate(pool: &Pool<SqliteConnectionManager>) -> StoreResult<()> {
    let current_version = get_current_version(pool)?;
    let latest = get_latest_version();
    if current_version > latest {
        return Err(StoreError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current_version, latest
        )));
    }

    let pending: Vec<_> = get_migrations()
        .into_iter()
        .filter(|m| m.version > current_version)
        .collect();

    if pending.is_empty() {
        return Ok(());
    }

    let mut conn = pool.get()?;

    for migration in pending {
        let tx = conn.transaction()?;

        tx.execute_batch(migration.up_sql)?;
        tx.execute(
            "INSERT INTO schema_version (version, applied_at) VALUES (?1, ?2)",
            params![migration.version, Timestamp::now().as_millis() as i64],
        )?;

        tx.commit()?;

        tracing::info!(
            version = migration.version,
            description = migration.description,
            "Applied migration"
        );
    }

    Ok(())
}

/// Undo applied migrations down to `target` (exclusive), newest first
pub fn rollback_to(pool: &Pool<SqliteConnectionManager>, target: i32) -> StoreResult<()> {
    let current_version = get_current_version(pool)?;
    let mut applied: Vec<_> = get_migrations()
        .into_iter()
        .filter(|m| m.version > target && m.version <= current_version)
        .collect();
    applied.sort_by(|a, b| b.version.cmp(&a.version));

    let mut conn = pool.get()?;
    for migration in applied {
        let down_sql = migration.down_sql.ok_or_else(|| {
            StoreError::Migration(format!("migration {} cannot be undone", migration.version))
        })?;

        let tx = conn.transaction()?;
        tx.execute_batch(down_sql)?;
        tx.execute(
            "DELETE FROM schema_version WHERE version = ?1",
            params![migration.version],
        )?;
        tx.commit()?;
        tracing::info!(version = migration.version, "Rolled back migration");
    }

    Ok(())
}

/// Get the latest migration version available
pub fn get_latest_version() -> i32 {
    get_migrations().iter().map(|m| m.version).max().unwrap_or(0)
}
