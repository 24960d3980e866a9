//! SQLite-backed implementation of the shared state store.
//!
//! Writes are serialized by a writer lock and committed in a transaction
//! together with the revision bump, then fanned out to subscribers.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tokio::sync::{broadcast, Mutex};

use crate::errors::AppError;
use crate::store::{tree, Change, SharedStore, StorePath, Subscription};

/// Shared state store persisted in SQLite.
pub struct SqliteStore {
    pool: SqlitePool,
    changes: broadcast::Sender<Change>,
    writer: Mutex<PushClock>,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool, event_buffer: usize) -> Self {
        let (changes, _) = broadcast::channel(event_buffer);
        Self {
            pool,
            changes,
            writer: Mutex::new(PushClock::default()),
        }
    }

    /// Write under an already held writer lock.
    async fn write_locked(&self, path: &StorePath, value: Value) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let current = load_document(&mut tx, path.root()).await?;
        let updated = tree::set_in(current, path.rest(), value);
        save_document(&mut tx, path.root(), updated.as_ref()).await?;
        let revision = bump_revision(&mut tx).await?;

        tx.commit().await?;

        tracing::debug!(path = %path, revision, "Store write committed");

        // No receivers is fine
        let _ = self.changes.send(Change {
            root: path.root().to_string(),
            document: updated.map(Arc::new),
            revision,
        });
        Ok(())
    }
}

#[async_trait]
impl SharedStore for SqliteStore {
    async fn read(&self, path: &StorePath) -> Result<Option<Value>, AppError> {
        let mut conn = self.pool.acquire().await?;
        let document = load_document(&mut conn, path.root()).await?;
        Ok(document.and_then(|doc| tree::get_in(&doc, path.rest()).cloned()))
    }

    async fn subscribe(&self, path: &StorePath) -> Result<Subscription, AppError> {
        let changes = self.changes.subscribe();
        let initial = self.read(path).await?;
        Ok(Subscription::new(path.clone(), changes, initial))
    }

    async fn write(&self, path: &StorePath, value: Value) -> Result<(), AppError> {
        let _guard = self.writer.lock().await;
        self.write_locked(path, value).await
    }

    async fn append(&self, path: &StorePath, value: Value) -> Result<String, AppError> {
        let mut clock = self.writer.lock().await;
        let id = clock.next_id();
        self.write_locked(&path.child(&id)?, value).await?;
        Ok(id)
    }

    async fn revision(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT revision_id FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("revision_id"))
    }
}

/// Generates unique child keys that sort in creation order.
#[derive(Debug, Default)]
struct PushClock {
    last_millis: i64,
}

impl PushClock {
    fn next_id(&mut self) -> String {
        let millis = Utc::now().timestamp_millis().max(self.last_millis + 1);
        self.last_millis = millis;
        let entropy = uuid::Uuid::new_v4().simple().to_string();
        format!("{:012x}{}", millis, &entropy[..8])
    }
}

async fn load_document(conn: &mut SqliteConnection, key: &str) -> Result<Option<Value>, AppError> {
    let row = sqlx::query("SELECT value FROM nodes WHERE key = ?")
        .bind(key)
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(row) => {
            let raw: String = row.get("value");
            serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| AppError::Database(format!("Corrupt document at {}: {}", key, e)))
        }
        None => Ok(None),
    }
}

async fn save_document(
    conn: &mut SqliteConnection,
    key: &str,
    document: Option<&Value>,
) -> Result<(), AppError> {
    match document {
        Some(document) => {
            let now = Utc::now().to_rfc3339();
            sqlx::query(
                "INSERT INTO nodes (key, value, updated_at) VALUES (?, ?, ?) \
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            )
            .bind(key)
            .bind(serde_json::to_string(document)?)
            .bind(&now)
            .execute(&mut *conn)
            .await?;
        }
        None => {
            sqlx::query("DELETE FROM nodes WHERE key = ?")
                .bind(key)
                .execute(&mut *conn)
                .await?;
        }
    }
    Ok(())
}

async fn bump_revision(conn: &mut SqliteConnection) -> Result<i64, AppError> {
    let now = Utc::now().to_rfc3339();
    let row = sqlx::query(
        "UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1 RETURNING revision_id",
    )
    .bind(&now)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row.get("revision_id"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use serde_json::json;
    use tempfile::TempDir;

    async fn open_store() -> (SqliteStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database(&temp_dir.path().join("store.sqlite"))
            .await
            .unwrap();
        (SqliteStore::new(pool, 16), temp_dir)
    }

    fn path(raw: &str) -> StorePath {
        StorePath::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn test_write_and_read_nested() {
        let (store, _dir) = open_store().await;

        assert_eq!(store.read(&path("votes")).await.unwrap(), None);

        store
            .write(&path("votes/amy"), json!({ "category": "poop" }))
            .await
            .unwrap();
        store
            .write(&path("votes/bob"), json!({ "category": "cloud" }))
            .await
            .unwrap();

        assert_eq!(
            store.read(&path("votes")).await.unwrap(),
            Some(json!({ "amy": { "category": "poop" }, "bob": { "category": "cloud" } }))
        );
        assert_eq!(
            store.read(&path("votes/bob/category")).await.unwrap(),
            Some(json!("cloud"))
        );

        store.write(&path("votes"), Value::Null).await.unwrap();
        assert_eq!(store.read(&path("votes")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_revision_increments_per_write() {
        let (store, _dir) = open_store().await;
        let start = store.revision().await.unwrap();

        store.write(&path("gameState"), json!("lobby")).await.unwrap();
        store.append(&path("gallery"), json!({ "title": "T" })).await.unwrap();

        assert_eq!(store.revision().await.unwrap(), start + 2);
    }

    #[tokio::test]
    async fn test_append_ids_are_unique_and_ordered() {
        let (store, _dir) = open_store().await;

        let mut ids = Vec::new();
        for n in 0..5 {
            ids.push(store.append(&path("gallery"), json!({ "n": n })).await.unwrap());
        }

        let mut sorted = ids.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted, ids);

        let gallery = store.read(&path("gallery")).await.unwrap().unwrap();
        assert_eq!(gallery.as_object().unwrap().len(), 5);
        assert_eq!(gallery[&ids[3]], json!({ "n": 3 }));
    }

    #[tokio::test]
    async fn test_subscribe_sees_current_then_changes() {
        let (store, _dir) = open_store().await;
        store.write(&path("gameState"), json!("lobby")).await.unwrap();

        let mut sub = store.subscribe(&path("gameState")).await.unwrap();
        assert_eq!(sub.next().await, Some(Some(json!("lobby"))));

        store.write(&path("players"), json!(["amy"])).await.unwrap();
        store.write(&path("gameState"), json!("drawing")).await.unwrap();

        assert_eq!(sub.next().await, Some(Some(json!("drawing"))));
    }

    #[tokio::test]
    async fn test_documents_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("store.sqlite");

        {
            let store = SqliteStore::new(init_database(&db_path).await.unwrap(), 16);
            store.write(&path("scores/amy"), json!(3)).await.unwrap();
        }

        let store = SqliteStore::new(init_database(&db_path).await.unwrap(), 16);
        assert_eq!(store.read(&path("scores")).await.unwrap(), Some(json!({ "amy": 3 })));
    }
}
