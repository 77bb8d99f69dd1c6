//! SQL-backed `ChannelService`

use crate::channel::errors::{ChannelError, ChannelResult};
use crate::channel::model::{Channel, ChannelDocument, IdentityId};
use crate::channel::object_id::ObjectId;
use crate::channel::service::ChannelService;
use crate::metrics::record_store_op;
use async_trait::async_trait;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Channel store persisted in SQLite
///
/// Each operation runs on the blocking pool with its own pooled connection.
#[derive(Clone)]
pub struct SqliteChannelStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteChannelStore {
    /// Wrap an existing pool, applying pending migrations
    pub fn new(pool: Pool<SqliteConnectionManager>) -> ChannelResult<Self> {
        super::migrations::migrate(&pool)?;
        Ok(Self { pool })
    }

    /// Open (or create) a database file
    pub fn open(
        path: impl AsRef<Path>,
        pool_size: u32,
        connection_timeout: Duration,
    ) -> ChannelResult<Self> {
        let manager = SqliteConnectionManager::file(path.as_ref())
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = Pool::builder()
            .max_size(pool_size)
            .connection_timeout(connection_timeout)
            .build(manager)?;

        Self::new(pool)
    }

    /// In-memory database; a single connection that is never recycled, so every
    /// caller sees the same data for the life of the pool
    pub fn memory() -> ChannelResult<Self> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = Pool::builder()
            .max_size(1)
            .max_lifetime(None)
            .idle_timeout(None)
            .build(manager)?;

        Self::new(pool)
    }

    async fn run<T, F>(&self, op: &'static str, f: F) -> ChannelResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> ChannelResult<T> + Send + 'static,
    {
        record_store_op(op);
        let pool = self.pool.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            f(&mut *conn)
        })
        .await
        .map_err(|e| ChannelError::Storage(format!("{} task failed: {}", op, e)))?
    }
}

fn load_identities(conn: &Connection, channel_id: &ObjectId) -> ChannelResult<Vec<IdentityId>> {
    let mut stmt = conn.prepare(
        "SELECT identity_id FROM channel_identities WHERE channel_id = ? ORDER BY rowid",
    )?;

    let identities = stmt
        .query_map(params![channel_id.to_hex()], |row| {
            Ok(IdentityId(row.get::<_, String>(0)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(identities)
}

fn decode_document(raw: &str) -> ChannelResult<Map<String, Value>> {
    match serde_json::from_str(raw)? {
        Value::Object(map) => Ok(map),
        _ => Err(ChannelError::Serialization(
            "stored document is not an object".to_string(),
        )),
    }
}

fn load_channel(conn: &Connection, channel_id: &ObjectId) -> ChannelResult<Option<Channel>> {
    let row = conn
        .query_row(
            "SELECT document, created_at, updated_at FROM channels WHERE id = ?",
            params![channel_id.to_hex()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            },
        )
        .optional()?;

    let Some((document, created_at, updated_at)) = row else {
        return Ok(None);
    };

    Ok(Some(Channel {
        id: *channel_id,
        identities: load_identities(conn, channel_id)?,
        created_at: created_at.max(0) as u64,
        updated_at: updated_at.max(0) as u64,
        attributes: decode_document(&document)?,
    }))
}

fn replace_identities(conn: &Connection, channel: &Channel) -> ChannelResult<()> {
    let id = channel.id.to_hex();
    conn.execute("DELETE FROM channel_identities WHERE channel_id = ?", params![id])?;

    let mut stmt = conn.prepare(
        "INSERT INTO channel_identities (channel_id, identity_id, added_at) VALUES (?, ?, ?)",
    )?;
    for identity in &channel.identities {
        stmt.execute(params![id, identity.as_str(), channel.updated_at as i64])?;
    }

    Ok(())
}

fn channel_exists(conn: &Connection, channel_id: &ObjectId) -> ChannelResult<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM channels WHERE id = ?",
            params![channel_id.to_hex()],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

fn touch(conn: &Connection, channel_id: &ObjectId) -> ChannelResult<()> {
    conn.execute(
        "UPDATE channels SET updated_at = MAX(updated_at, ?) WHERE id = ?",
        params![crate::channel::model::now_millis() as i64, channel_id.to_hex()],
    )?;
    Ok(())
}

#[async_trait]
impl ChannelService for SqliteChannelStore {
    async fn channels_for_identity(&self, identity: &IdentityId) -> ChannelResult<Vec<Channel>> {
        let identity = identity.clone();
        self.run("channels_for_identity", move |conn| {
            let ids: Vec<String> = {
                let mut stmt = conn.prepare(
                    "SELECT c.id FROM channels c
                     JOIN channel_identities ci ON ci.channel_id = c.id
                     WHERE ci.identity_id = ?
                     ORDER BY c.created_at, c.id",
                )?;
                let rows = stmt.query_map(params![identity.as_str()], |row| row.get(0))?;
                rows.collect::<Result<_, _>>()?
            };

            let mut channels = Vec::with_capacity(ids.len());
            for raw in ids {
                let id = ObjectId::parse(&raw)
                    .map_err(|e| ChannelError::Serialization(format!("bad stored id {}: {}", raw, e)))?;
                if let Some(channel) = load_channel(conn, &id)? {
                    channels.push(channel);
                }
            }
            Ok(channels)
        })
        .await
    }

    async fn create_channel(&self, document: ChannelDocument) -> ChannelResult<Channel> {
        let channel = Channel::new(document)?;
        self.run("create_channel", move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO channels (id, document, created_at, updated_at) VALUES (?, ?, ?, ?)",
                params![
                    channel.id.to_hex(),
                    serde_json::to_string(&channel.attributes)?,
                    channel.created_at as i64,
                    channel.updated_at as i64,
                ],
            )?;
            replace_identities(&tx, &channel)?;
            tx.commit()?;

            debug!(channel_id = %channel.id, "Created channel");
            Ok(channel)
        })
        .await
    }

    async fn delete_channel(&self, channel_id: &ObjectId) -> ChannelResult<()> {
        let channel_id = *channel_id;
        self.run("delete_channel", move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM channel_identities WHERE channel_id = ?",
                params![channel_id.to_hex()],
            )?;
            let removed = tx.execute("DELETE FROM channels WHERE id = ?", params![channel_id.to_hex()])?;
            if removed == 0 {
                return Err(ChannelError::NotFound(channel_id));
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn update_channel(
        &self,
        channel_id: &ObjectId,
        document: ChannelDocument,
    ) -> ChannelResult<()> {
        let channel_id = *channel_id;
        self.run("update_channel", move |conn| {
            let tx = conn.transaction()?;
            let mut channel =
                load_channel(&tx, &channel_id)?.ok_or(ChannelError::NotFound(channel_id))?;
            let membership_before = channel.identities.clone();

            channel.apply_update(document)?;

            tx.execute(
                "UPDATE channels SET document = ?, updated_at = ? WHERE id = ?",
                params![
                    serde_json::to_string(&channel.attributes)?,
                    channel.updated_at as i64,
                    channel_id.to_hex(),
                ],
            )?;
            if channel.identities != membership_before {
                replace_identities(&tx, &channel)?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn list_identities(&self, channel_id: &ObjectId) -> ChannelResult<Vec<IdentityId>> {
        let channel_id = *channel_id;
        self.run("list_identities", move |conn| {
            if !channel_exists(conn, &channel_id)? {
                return Err(ChannelError::NotFound(channel_id));
            }
            load_identities(conn, &channel_id)
        })
        .await
    }

    async fn add_identity(
        &self,
        channel_id: &ObjectId,
        identity: IdentityId,
    ) -> ChannelResult<()> {
        let channel_id = *channel_id;
        self.run("add_identity", move |conn| {
            let tx = conn.transaction()?;
            if !channel_exists(&tx, &channel_id)? {
                return Err(ChannelError::NotFound(channel_id));
            }

            let inserted = tx.execute(
                "INSERT OR IGNORE INTO channel_identities (channel_id, identity_id, added_at)
                 VALUES (?, ?, ?)",
                params![
                    channel_id.to_hex(),
                    identity.as_str(),
                    crate::channel::model::now_millis() as i64,
                ],
            )?;
            if inserted == 0 {
                return Err(ChannelError::IdentityExists {
                    channel: channel_id,
                    identity,
                });
            }

            touch(&tx, &channel_id)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn remove_identity(
        &self,
        channel_id: &ObjectId,
        identity: &IdentityId,
    ) -> ChannelResult<()> {
        let channel_id = *channel_id;
        let identity = identity.clone();
        self.run("remove_identity", move |conn| {
            let tx = conn.transaction()?;
            if !channel_exists(&tx, &channel_id)? {
                return Err(ChannelError::NotFound(channel_id));
            }

            let removed = tx.execute(
                "DELETE FROM channel_identities WHERE channel_id = ? AND identity_id = ?",
                params![channel_id.to_hex(), identity.as_str()],
            )?;
            if removed == 0 {
                return Err(ChannelError::IdentityNotFound {
                    channel: channel_id,
                    identity,
                });
            }

            touch(&tx, &channel_id)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> ChannelDocument {
        ChannelDocument::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_create_and_reload() {
        let store = SqliteChannelStore::memory().unwrap();
        let created = store
            .create_channel(doc(json!({ "name": "general", "identities": ["alice", "bob"] })))
            .await
            .unwrap();

        let channels = store
            .channels_for_identity(&IdentityId::from("bob"))
            .await
            .unwrap();
        assert_eq!(channels, vec![created]);
    }

    #[test]
    fn test_memory_pool_never_recycles_its_connection() {
        let store = SqliteChannelStore::memory().unwrap();
        assert_eq!(store.pool.max_size(), 1);
        assert_eq!(store.pool.max_lifetime(), None);
        assert_eq!(store.pool.idle_timeout(), None);
    }

    #[tokio::test]
    async fn test_update_merges_document() {
        let store = SqliteChannelStore::memory().unwrap();
        let created = store
            .create_channel(doc(json!({ "name": "general", "topic": "hi", "identities": ["a"] })))
            .await
            .unwrap();

        store
            .update_channel(&created.id, doc(json!({ "topic": null, "name": "renamed" })))
            .await
            .unwrap();

        let channel = store
            .channels_for_identity(&IdentityId::from("a"))
            .await
            .unwrap()
            .pop()
            .unwrap();
        assert_eq!(channel.attributes["name"], json!("renamed"));
        assert!(!channel.attributes.contains_key("topic"));
        assert_eq!(channel.identities, vec![IdentityId::from("a")]);
    }

    #[tokio::test]
    async fn test_delete_removes_memberships() {
        let store = SqliteChannelStore::memory().unwrap();
        let created = store
            .create_channel(doc(json!({ "identities": ["a"] })))
            .await
            .unwrap();

        store.delete_channel(&created.id).await.unwrap();

        assert!(store
            .channels_for_identity(&IdentityId::from("a"))
            .await
            .unwrap()
            .is_empty());
        assert!(matches!(
            store.list_identities(&created.id).await,
            Err(ChannelError::NotFound(_))
        ));
        assert!(matches!(
            store.delete_channel(&created.id).await,
            Err(ChannelError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_membership_operations() {
        let store = SqliteChannelStore::memory().unwrap();
        let created = store.create_channel(ChannelDocument::default()).await.unwrap();

        store.add_identity(&created.id, IdentityId::from("x")).await.unwrap();
        store.add_identity(&created.id, IdentityId::from("y")).await.unwrap();
        assert!(matches!(
            store.add_identity(&created.id, IdentityId::from("x")).await,
            Err(ChannelError::IdentityExists { .. })
        ));
        assert_eq!(
            store.list_identities(&created.id).await.unwrap(),
            vec![IdentityId::from("x"), IdentityId::from("y")]
        );

        store
            .remove_identity(&created.id, &IdentityId::from("x"))
            .await
            .unwrap();
        assert!(matches!(
            store.remove_identity(&created.id, &IdentityId::from("x")).await,
            Err(ChannelError::IdentityNotFound { .. })
        ));
        assert!(matches!(
            store
                .remove_identity(&ObjectId::generate(), &IdentityId::from("y"))
                .await,
            Err(ChannelError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("channels.db");

        let created = {
            let store = SqliteChannelStore::open(&path, 2, Duration::from_secs(5)).unwrap();
            store
                .create_channel(doc(json!({ "name": "kept", "identities": ["z"] })))
                .await
                .unwrap()
        };

        let store = SqliteChannelStore::open(&path, 2, Duration::from_secs(5)).unwrap();
        assert_eq!(
            store.list_identities(&created.id).await.unwrap(),
            vec![IdentityId::from("z")]
        );
    }
}
