use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::record::{ContentRecord, RecordKind, StoredRecord};
use crate::port::content_store::{ContentStore, RecordSnapshot, StoreError, UpsertOutcome};

#[derive(Debug, Default)]
struct Tables {
    posts: BTreeMap<String, StoredRecord>,
    projects: BTreeMap<String, StoredRecord>,
}

impl Tables {
    fn table(&self, kind: RecordKind) -> &BTreeMap<String, StoredRecord> {
        match kind {
            RecordKind::Post => &self.posts,
            RecordKind::Project => &self.projects,
        }
    }

    fn table_mut(&mut self, kind: RecordKind) -> &mut BTreeMap<String, StoredRecord> {
        match kind {
            RecordKind::Post => &mut self.posts,
            RecordKind::Project => &mut self.projects,
        }
    }
}

/// In-process content store. Nothing survives a restart.
#[derive(Clone, Default)]
pub struct InMemoryContentStore {
    inner: Arc<RwLock<Tables>>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn upsert(
        &self,
        source_path: &str,
        record: ContentRecord,
    ) -> Result<UpsertOutcome, StoreError> {
        let kind = record.kind();
        let key = record.key().to_string();

        let mut guard = self.inner.write().await;
        let table = guard.table_mut(kind);

        if let Some(existing) = table.get(&key) {
            if existing.source_path != source_path {
                return Err(StoreError::SlugConflict {
                    kind,
                    key,
                    owner: existing.source_path.clone(),
                });
            }
        }

        let previous = table.insert(
            key,
            StoredRecord {
                record,
                source_path: source_path.to_string(),
            },
        );
        Ok(match previous {
            Some(_) => UpsertOutcome::Replaced,
            None => UpsertOutcome::Inserted,
        })
    }

    async fn get(&self, kind: RecordKind, key: &str) -> Result<Option<ContentRecord>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard.table(kind).get(key).map(|stored| stored.record.clone()))
    }

    async fn list(&self, kind: RecordKind) -> Result<RecordSnapshot, StoreError> {
        let guard = self.inner.read().await;
        let records = guard
            .table(kind)
            .values()
            .map(|stored| stored.record.clone())
            .collect();
        Ok(RecordSnapshot::new(records))
    }

    async fn owner_of(&self, kind: RecordKind, key: &str) -> Result<Option<String>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard
            .table(kind)
            .get(key)
            .map(|stored| stored.source_path.clone()))
    }

    async fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::{Post, Project};
    use chrono::NaiveDate;

    fn post(slug: &str, title: &str) -> ContentRecord {
        ContentRecord::Post(Post {
            title: title.to_string(),
            slug: slug.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            tags: vec![],
            body: String::new(),
        })
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let store = InMemoryContentStore::new();

        let outcome = store.upsert("Posts/a.md", post("a", "First")).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::Inserted);

        let outcome = store.upsert("Posts/a.md", post("a", "Second")).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::Replaced);

        let current = store.get(RecordKind::Post, "a").await.unwrap();
        assert_eq!(current, Some(post("a", "Second")));
        assert_eq!(
            store.owner_of(RecordKind::Post, "a").await.unwrap(),
            Some("Posts/a.md".to_string())
        );
        assert!(store.get(RecordKind::Project, "a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_conflicting_owner_is_rejected() {
        let store = InMemoryContentStore::new();
        store.upsert("Posts/a.md", post("same", "A")).await.unwrap();

        let err = store.upsert("Posts/b.md", post("same", "B")).await.unwrap_err();
        match err {
            StoreError::SlugConflict { key, owner, .. } => {
                assert_eq!(key, "same");
                assert_eq!(owner, "Posts/a.md");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // The original record is untouched.
        assert_eq!(
            store.get(RecordKind::Post, "same").await.unwrap(),
            Some(post("same", "A"))
        );
    }

    #[tokio::test]
    async fn test_list_is_a_snapshot() {
        let store = InMemoryContentStore::new();
        store.upsert("Posts/b.md", post("b", "B")).await.unwrap();
        store.upsert("Posts/a.md", post("a", "A")).await.unwrap();
        store
            .upsert(
                "projects/p.json",
                ContentRecord::Project(Project {
                    name: "p".to_string(),
                    description: String::new(),
                    url: "https://example.com".to_string(),
                    image: String::new(),
                }),
            )
            .await
            .unwrap();

        let snapshot = store.list(RecordKind::Post).await.unwrap();
        store.upsert("Posts/c.md", post("c", "C")).await.unwrap();

        let keys: Vec<&str> = snapshot.iter().map(|r| r.key()).collect();
        assert_eq!(keys, vec!["a", "b"]);
        // Restartable.
        assert_eq!(snapshot.iter().count(), 2);
        assert_eq!(store.list(RecordKind::Post).await.unwrap().len(), 3);
        assert_eq!(store.list(RecordKind::Project).await.unwrap().len(), 1);
    }
}
