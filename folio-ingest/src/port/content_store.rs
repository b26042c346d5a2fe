//! Content store trait - the single owner of published records.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::record::{ContentRecord, RecordKind};

#[derive(Debug, Error)]
pub enum StoreError {
    /// The key is owned by a different source file. Nothing was written.
    #[error("{kind} `{key}` is already owned by {owner}")]
    SlugConflict {
        kind: RecordKind,
        key: String,
        owner: String,
    },

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Replaced,
}

/// Point-in-time copy of every record of one kind, ordered by key.
///
/// Taken under the store's read lock, so it never reflects upserts that
/// start after `list` returns. Iterate it as many times as needed.
#[derive(Debug, Clone, Default)]
pub struct RecordSnapshot {
    records: Arc<[ContentRecord]>,
}

impl RecordSnapshot {
    pub fn new(records: Vec<ContentRecord>) -> Self {
        Self {
            records: records.into(),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ContentRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn to_vec(&self) -> Vec<ContentRecord> {
        self.records.to_vec()
    }
}

impl<'a> IntoIterator for &'a RecordSnapshot {
    type Item = &'a ContentRecord;
    type IntoIter = std::slice::Iter<'a, ContentRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Abstract interface for the content store.
///
/// Writes are linearized inside the implementation: the ownership check and
/// the write of an `upsert` happen in one critical section. Readers see
/// either the old or the new record for a key, never a partial one.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Insert or replace `record` under its key, owned by `source_path`.
    ///
    /// Fails with [`StoreError::SlugConflict`] when another source path
    /// already owns the key.
    async fn upsert(
        &self,
        source_path: &str,
        record: ContentRecord,
    ) -> Result<UpsertOutcome, StoreError>;

    /// Get a copy of the current record for `key`.
    async fn get(&self, kind: RecordKind, key: &str) -> Result<Option<ContentRecord>, StoreError>;

    /// Snapshot every record of `kind`.
    async fn list(&self, kind: RecordKind) -> Result<RecordSnapshot, StoreError>;

    /// Source path currently owning `key`.
    async fn owner_of(&self, kind: RecordKind, key: &str) -> Result<Option<String>, StoreError>;

    /// Flush pending writes to disk.
    async fn flush(&self) -> Result<(), StoreError>;
}
