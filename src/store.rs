use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::db;
use crate::error::StoreError;
use crate::models::action::{Action, QUEUE_VERSION, QueueEnvelope};

/// Generic persistent string storage, a single logical namespace.
/// The queue lives under one well-known key.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Durable key-value storage backed by an embedded sqlite database.
pub struct SqliteKv {
    pool: SqlitePool,
}

impl SqliteKv {
    /// Open (creating if missing) the database at `url`, e.g.
    /// `sqlite://outboxer.db` or `sqlite::memory:`.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        db::kv::init(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl KeyValueStore for SqliteKv {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(db::kv::get(&self.pool, key).await?)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        Ok(db::kv::set(&self.pool, key, value).await?)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        Ok(db::kv::delete(&self.pool, key).await?)
    }
}

/// In-memory key-value storage for tests and ephemeral deployments.
#[derive(Default)]
pub struct MemoryKv {
    entries: DashMap<String, String>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// The durable, ordered list of pending actions.
///
/// Owns the persisted queue exclusively: an in-memory mirror is loaded
/// lazily from the backend and every mutation writes the full list back.
/// Readers get snapshots; the processor commits its pass result through
/// [`ActionStore::commit_pass`] so actions enqueued mid-pass survive the
/// write-back.
pub struct ActionStore {
    kv: Arc<dyn KeyValueStore>,
    key: String,
    mirror: Mutex<Option<Vec<Action>>>,
}

impl ActionStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            kv,
            key: key.into(),
            mirror: Mutex::new(None),
        }
    }

    /// Append one action and persist the full list. On a backend write
    /// failure the append is rolled back and the error propagates, so a
    /// failed enqueue is observably not queued.
    pub async fn append(&self, action: Action) -> Result<(), StoreError> {
        let mut slot = self.mirror.lock().await;
        let actions = self.load_into(&mut slot).await?;
        actions.push(action);
        if let Err(e) = self.persist(actions).await {
            actions.pop();
            return Err(e);
        }
        Ok(())
    }

    /// Ordered snapshot of all pending actions. Absent or unreadable data
    /// reads as an empty queue; backend read errors are logged and also
    /// read as empty without poisoning the mirror.
    pub async fn read_all(&self) -> Vec<Action> {
        let mut slot = self.mirror.lock().await;
        match self.load_into(&mut slot).await {
            Ok(actions) => actions.clone(),
            Err(e) => {
                tracing::warn!("Failed to read action queue: {e}");
                Vec::new()
            }
        }
    }

    pub async fn count(&self) -> usize {
        self.read_all().await.len()
    }

    /// Replace the whole queue and persist it. The in-memory replacement
    /// stands even when the backend write fails; the error propagates for
    /// the caller to log.
    pub async fn write_all(&self, actions: Vec<Action>) -> Result<(), StoreError> {
        let mut slot = self.mirror.lock().await;
        let result = self.persist(&actions).await;
        *slot = Some(actions);
        result
    }

    /// Discard every pending action.
    pub async fn clear(&self) -> Result<(), StoreError> {
        self.write_all(Vec::new()).await
    }

    /// Commit the result of a processing pass: the actions that were in
    /// the pass snapshot are replaced by `survivors` (original relative
    /// order preserved), while anything appended during the pass is kept
    /// after them. Persists once; a backend write failure is logged and
    /// the in-memory outcome stands until the next successful read.
    ///
    /// Returns the new pending count.
    pub async fn commit_pass(&self, snapshot_ids: &HashSet<Uuid>, survivors: Vec<Action>) -> usize {
        let mut slot = self.mirror.lock().await;
        let mut next = survivors;
        {
            let current = slot.get_or_insert_with(Vec::new);
            next.extend(current.drain(..).filter(|a| !snapshot_ids.contains(&a.id)));
        }
        let count = next.len();
        if let Err(e) = self.persist(&next).await {
            tracing::error!("Failed to persist action queue after pass: {e}");
        }
        *slot = Some(next);
        count
    }

    async fn load_into<'a>(
        &self,
        slot: &'a mut Option<Vec<Action>>,
    ) -> Result<&'a mut Vec<Action>, StoreError> {
        if slot.is_none() {
            let actions = match self.kv.get(&self.key).await? {
                Some(raw) => decode(&raw),
                None => Vec::new(),
            };
            *slot = Some(actions);
        }
        Ok(slot.get_or_insert_with(Vec::new))
    }

    async fn persist(&self, actions: &[Action]) -> Result<(), StoreError> {
        let envelope = QueueEnvelope {
            version: QUEUE_VERSION,
            actions: actions.to_vec(),
        };
        let raw = serde_json::to_string(&envelope)?;
        self.kv.set(&self.key, &raw).await
    }
}

/// Decode the persisted queue. Accepts the versioned envelope and, for
/// migration, the version-0 layout (a bare array). Corrupt data reads as
/// an empty queue.
fn decode(raw: &str) -> Vec<Action> {
    if let Ok(envelope) = serde_json::from_str::<QueueEnvelope>(raw) {
        if envelope.version > QUEUE_VERSION {
            tracing::warn!(
                "Action queue was written by a newer layout (version {}), reading anyway",
                envelope.version
            );
        }
        return envelope.actions;
    }
    if let Ok(actions) = serde_json::from_str::<Vec<Action>>(raw) {
        return actions;
    }
    tracing::warn!("Corrupt action queue data, starting with an empty queue");
    Vec::new()
}
