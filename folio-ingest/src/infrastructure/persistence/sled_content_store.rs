//! Sled-based persistent content store implementation.

use crate::domain::record::{ContentRecord, RecordKind, StoredRecord};
use crate::port::content_store::{ContentStore, RecordSnapshot, StoreError, UpsertOutcome};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sled::Db;
use std::path::Path;
use tokio::sync::RwLock;

const POST_TREE_NAME: &str = "posts";
const PROJECT_TREE_NAME: &str = "projects";

/// Sled-based implementation of ContentStore.
///
/// One tree per record kind, keyed by slug or name, values are JSON-encoded
/// [`StoredRecord`]s. `write_gate` serializes writers against each other and
/// against `list`, which keeps the ownership check atomic with the insert and
/// makes listings point-in-time.
pub struct SledContentStore {
    db: Db,
    write_gate: RwLock<()>,
}

impl SledContentStore {
    /// Open or create a sled database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path.as_ref()).context("Failed to open sled database")?;
        Ok(Self::with_db(db))
    }

    /// Open with an existing sled database instance.
    pub fn with_db(db: Db) -> Self {
        Self {
            db,
            write_gate: RwLock::new(()),
        }
    }

    fn tree(&self, kind: RecordKind) -> Result<sled::Tree> {
        let name = match kind {
            RecordKind::Post => POST_TREE_NAME,
            RecordKind::Project => PROJECT_TREE_NAME,
        };
        self.db
            .open_tree(name)
            .with_context(|| format!("Failed to open {name} tree"))
    }

    fn load(&self, kind: RecordKind, key: &str) -> Result<Option<StoredRecord>> {
        let tree = self.tree(kind)?;
        match tree.get(key.as_bytes()).context("Failed to read record")? {
            Some(bytes) => {
                let stored: StoredRecord =
                    serde_json::from_slice(&bytes).context("Failed to deserialize record")?;
                Ok(Some(stored))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ContentStore for SledContentStore {
    async fn upsert(
        &self,
        source_path: &str,
        record: ContentRecord,
    ) -> Result<UpsertOutcome, StoreError> {
        let kind = record.kind();
        let key = record.key().to_string();

        let _gate = self.write_gate.write().await;

        if let Some(existing) = self.load(kind, &key)? {
            if existing.source_path != source_path {
                return Err(StoreError::SlugConflict {
                    kind,
                    key,
                    owner: existing.source_path,
                });
            }
        }

        let stored = StoredRecord {
            record,
            source_path: source_path.to_string(),
        };
        let value = serde_json::to_vec(&stored).context("Failed to serialize record")?;
        let previous = self
            .tree(kind)?
            .insert(key.as_bytes(), value)
            .context("Failed to insert record")?;

        Ok(match previous {
            Some(_) => UpsertOutcome::Replaced,
            None => UpsertOutcome::Inserted,
        })
    }

    async fn get(&self, kind: RecordKind, key: &str) -> Result<Option<ContentRecord>, StoreError> {
        Ok(self.load(kind, key)?.map(|stored| stored.record))
    }

    async fn list(&self, kind: RecordKind) -> Result<RecordSnapshot, StoreError> {
        let _gate = self.write_gate.read().await;
        let tree = self.tree(kind)?;
        let mut records = Vec::new();
        for result in tree.iter() {
            let (_, bytes) = result.context("Failed to iterate records")?;
            let stored: StoredRecord =
                serde_json::from_slice(&bytes).context("Failed to deserialize record")?;
            records.push(stored.record);
        }
        Ok(RecordSnapshot::new(records))
    }

    async fn owner_of(&self, kind: RecordKind, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.load(kind, key)?.map(|stored| stored.source_path))
    }

    async fn flush(&self) -> Result<(), StoreError> {
        self.db
            .flush_async()
            .await
            .context("Failed to flush database")?;
        Ok(())
    }
}
