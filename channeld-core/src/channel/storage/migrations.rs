//! Versioned schema migrations for the channel store

use crate::channel::errors::ChannelResult;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

pub const CURRENT_CHANNEL_SCHEMA_VERSION: i32 = 1;

pub struct Migration {
    pub version: i32,
    pub description: &'static str,
    pub up_sql: &'static str,
}

/// All migrations in order
pub fn get_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial channel schema",
        up_sql: r#"
            CREATE TABLE IF NOT EXISTS channels (
                id TEXT PRIMARY KEY,                    -- ObjectId, 24 hex chars
                document TEXT NOT NULL,                 -- JSON object of attributes
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_channels_created ON channels(created_at);

            CREATE TABLE IF NOT EXISTS channel_identities (
                channel_id TEXT NOT NULL,
                identity_id TEXT NOT NULL,
                added_at INTEGER NOT NULL,
                PRIMARY KEY (channel_id, identity_id),
                FOREIGN KEY (channel_id) REFERENCES channels(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_channel_identities_identity
                ON channel_identities(identity_id);
        "#,
    }]
}

fn ensure_version_table(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS channel_schema_version (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;
    Ok(())
}

/// Highest applied migration, 0 for a fresh database
pub fn current_version(conn: &Connection) -> rusqlite::Result<i32> {
    ensure_version_table(conn)?;

    let version: Option<i32> = conn.query_row(
        "SELECT MAX(version) FROM channel_schema_version",
        [],
        |row| row.get(0),
    )?;

    Ok(version.unwrap_or(0))
}

/// Run all pending migrations
pub fn migrate(pool: &Pool<SqliteConnectionManager>) -> ChannelResult<()> {
    let conn = pool.get()?;
    let current = current_version(&conn)?;

    for migration in get_migrations().into_iter().filter(|m| m.version > current) {
        let tx = conn.unchecked_transaction()?;

        tx.execute_batch(migration.up_sql)?;

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        tx.execute(
            "INSERT INTO channel_schema_version (version, applied_at) VALUES (?, ?)",
            params![migration.version, now],
        )?;

        tx.commit()?;

        info!(
            version = migration.version,
            "Applied migration: {}", migration.description
        );
    }

    Ok(())
}
