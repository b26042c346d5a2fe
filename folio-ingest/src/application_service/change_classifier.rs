//! Change Classifier - routes each changed file to its parser and stores the
//! validated record.

use std::sync::Arc;

use crate::domain::change_set::{ChangeType, FileChange};
use crate::domain::outcome::{IngestionOutcome, OutcomeKind, RejectReason};
use crate::domain::record::RecordKind;
use crate::domain::validation::{self, ParsedRecord};
use crate::domain::{frontmatter, project_record};
use crate::port::content_store::{ContentStore, StoreError, UpsertOutcome};
use crate::port::repository_fetcher::FetchError;

/// Where posts and projects live in the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentLayout {
    pub posts_dir: String,
    pub projects_dir: String,
}

impl Default for ContentLayout {
    fn default() -> Self {
        Self::new("Posts", "projects")
    }
}

impl ContentLayout {
    pub fn new(posts_dir: impl Into<String>, projects_dir: impl Into<String>) -> Self {
        Self {
            posts_dir: posts_dir.into().trim_matches('/').to_string(),
            projects_dir: projects_dir.into().trim_matches('/').to_string(),
        }
    }

    /// Record kind for a repository path, by area prefix and extension.
    pub fn kind_of(&self, path: &str) -> Option<RecordKind> {
        if is_under(path, &self.posts_dir) && path.ends_with(".md") {
            Some(RecordKind::Post)
        } else if is_under(path, &self.projects_dir) && path.ends_with(".json") {
            Some(RecordKind::Project)
        } else {
            None
        }
    }
}

fn is_under(path: &str, dir: &str) -> bool {
    path.strip_prefix(dir)
        .and_then(|rest| rest.strip_prefix('/'))
        .is_some_and(|name| !name.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Ingest(RecordKind),
    Deletion,
    Unrecognized,
}

/// A changed path together with its fetched content. Content is only
/// present for paths routed to [`Route::Ingest`]; an `Err` is a fetch
/// problem confined to this one file, such as content that is not UTF-8.
#[derive(Debug, Clone)]
pub struct FetchedChange {
    pub change: FileChange,
    pub content: Option<Result<String, FetchError>>,
}

pub struct ChangeClassifier {
    store: Arc<dyn ContentStore>,
    layout: ContentLayout,
}

impl ChangeClassifier {
    pub fn new(store: Arc<dyn ContentStore>, layout: ContentLayout) -> Self {
        Self { store, layout }
    }

    pub fn layout(&self) -> &ContentLayout {
        &self.layout
    }

    pub fn route(&self, change: &FileChange) -> Route {
        if change.change == ChangeType::Deleted {
            return Route::Deletion;
        }
        match self.layout.kind_of(&change.path) {
            Some(kind) => Route::Ingest(kind),
            None => Route::Unrecognized,
        }
    }

    /// One outcome per input file, in input order. Files are independent:
    /// a rejection never affects the others.
    pub async fn process(&self, files: Vec<FetchedChange>) -> Vec<IngestionOutcome> {
        let mut outcomes = Vec::with_capacity(files.len());
        for file in files {
            let path = file.change.path.clone();
            let outcome = match (self.route(&file.change), file.content) {
                (Route::Deletion, _) => IngestionOutcome::rejected(
                    path,
                    OutcomeKind::Unrecognized,
                    None,
                    RejectReason::DeletionsNotSupported,
                ),
                (Route::Unrecognized, _) => IngestionOutcome::rejected(
                    path,
                    OutcomeKind::Unrecognized,
                    None,
                    RejectReason::UnrecognizedPath,
                ),
                (Route::Ingest(kind), Some(Ok(content))) => {
                    self.ingest(kind, &path, &content).await
                }
                (Route::Ingest(kind), Some(Err(e))) => IngestionOutcome::rejected(
                    path,
                    kind.into(),
                    None,
                    RejectReason::MalformedStructure {
                        detail: e.to_string(),
                    },
                ),
                (Route::Ingest(kind), None) => IngestionOutcome::rejected(
                    path,
                    kind.into(),
                    None,
                    RejectReason::MalformedStructure {
                        detail: "file content was not fetched".to_string(),
                    },
                ),
            };
            if let Some(reason) = &outcome.reason {
                tracing::warn!("Rejected {}: {}", outcome.path, reason);
            }
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Parse, validate and upsert one file.
    pub async fn ingest(&self, kind: RecordKind, path: &str, content: &str) -> IngestionOutcome {
        let parsed = match kind {
            RecordKind::Post => frontmatter::parse(content).map(ParsedRecord::Post),
            RecordKind::Project => project_record::parse(content).map(ParsedRecord::Project),
        };
        let parsed = match parsed {
            Ok(parsed) => parsed,
            Err(e) => return IngestionOutcome::rejected(path, kind.into(), None, e.into()),
        };

        let key = parsed.key().map(str::to_string);
        let owner = match &key {
            Some(key) => match self.store.owner_of(kind, key).await {
                Ok(owner) => owner,
                Err(e) => return store_failure(path, kind, Some(key.clone()), e),
            },
            None => None,
        };

        let record = match validation::validate(parsed, path, owner.as_deref()) {
            Ok(record) => record,
            Err(violations) => {
                return IngestionOutcome::rejected(
                    path,
                    kind.into(),
                    key,
                    RejectReason::from_violations(violations),
                )
            }
        };

        let record_key = record.key().to_string();
        match self.store.upsert(path, record).await {
            Ok(upserted) => {
                tracing::debug!(
                    "{} {} `{}` from {}",
                    match upserted {
                        UpsertOutcome::Inserted => "Inserted",
                        UpsertOutcome::Replaced => "Replaced",
                    },
                    kind,
                    record_key,
                    path
                );
                IngestionOutcome::accepted(path, kind, record_key)
            }
            // Another file claimed the key between validation and upsert.
            Err(StoreError::SlugConflict { key, owner, .. }) => IngestionOutcome::rejected(
                path,
                kind.into(),
                Some(key.clone()),
                RejectReason::SlugConflict { key, owner },
            ),
            Err(e) => store_failure(path, kind, Some(record_key), e),
        }
    }
}

fn store_failure(
    path: &str,
    kind: RecordKind,
    key: Option<String>,
    error: StoreError,
) -> IngestionOutcome {
    tracing::error!("Content store failed while ingesting {}: {}", path, error);
    IngestionOutcome::rejected(
        path,
        kind.into(),
        key,
        RejectReason::StoreFailure {
            detail: error.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::outcome::OutcomeStatus;
    use crate::infrastructure::memory_store::InMemoryContentStore;
    use crate::test_utils::{post_file, project_file};

    fn classifier() -> (ChangeClassifier, Arc<InMemoryContentStore>) {
        let store = Arc::new(InMemoryContentStore::new());
        (
            ChangeClassifier::new(store.clone(), ContentLayout::default()),
            store,
        )
    }

    fn change(path: &str, change: ChangeType) -> FileChange {
        FileChange {
            path: path.to_string(),
            change,
        }
    }

    #[test]
    fn test_layout_routing() {
        let layout = ContentLayout::default();
        assert_eq!(layout.kind_of("Posts/hello.md"), Some(RecordKind::Post));
        assert_eq!(layout.kind_of("Posts/2024/hello.md"), Some(RecordKind::Post));
        assert_eq!(layout.kind_of("projects/site.json"), Some(RecordKind::Project));
        assert_eq!(layout.kind_of("Posts/hello.json"), None);
        assert_eq!(layout.kind_of("projects/site.md"), None);
        assert_eq!(layout.kind_of("PostsExtra/hello.md"), None);
        assert_eq!(layout.kind_of("posts/hello.md"), None);
        assert_eq!(layout.kind_of("README.md"), None);

        let custom = ContentLayout::new("content/posts/", "/content/projects");
        assert_eq!(custom.kind_of("content/posts/a.md"), Some(RecordKind::Post));
        assert_eq!(custom.kind_of("content/projects/a.json"), Some(RecordKind::Project));
    }

    #[test]
    fn test_route_deletions_first() {
        let (classifier, _) = classifier();
        assert_eq!(
            classifier.route(&change("Posts/a.md", ChangeType::Deleted)),
            Route::Deletion
        );
        assert_eq!(
            classifier.route(&change("Posts/a.md", ChangeType::Modified)),
            Route::Ingest(RecordKind::Post)
        );
        assert_eq!(
            classifier.route(&change("docs/a.txt", ChangeType::Added)),
            Route::Unrecognized
        );
    }

    #[tokio::test]
    async fn test_process_keeps_input_order_and_isolates_failures() {
        let (classifier, store) = classifier();

        let files = vec![
            FetchedChange {
                change: change("Posts/good.md", ChangeType::Added),
                content: Some(Ok(post_file("Good", "good", "2024-01-01", &["rust"], "Body"))),
            },
            FetchedChange {
                change: change("Posts/bad.md", ChangeType::Added),
                content: Some(Ok("---\ntitle: \"A\"\n".to_string())),
            },
            FetchedChange {
                change: change("README.md", ChangeType::Modified),
                content: None,
            },
            FetchedChange {
                change: change("Posts/old.md", ChangeType::Deleted),
                content: None,
            },
            FetchedChange {
                change: change("projects/site.json", ChangeType::Added),
                content: Some(Ok(project_file(
                    "Site",
                    "",
                    "https://example.com",
                    "img/site.png",
                ))),
            },
        ];

        let outcomes = classifier.process(files).await;
        let paths: Vec<&str> = outcomes.iter().map(|o| o.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "Posts/good.md",
                "Posts/bad.md",
                "README.md",
                "Posts/old.md",
                "projects/site.json"
            ]
        );

        assert_eq!(outcomes[0].status, OutcomeStatus::Accepted);
        assert_eq!(outcomes[0].key.as_deref(), Some("good"));
        assert!(matches!(
            outcomes[1].reason,
            Some(RejectReason::MalformedStructure { .. })
        ));
        assert_eq!(outcomes[2].record_kind, OutcomeKind::Unrecognized);
        assert_eq!(outcomes[2].reason, Some(RejectReason::UnrecognizedPath));
        assert_eq!(outcomes[3].record_kind, OutcomeKind::Unrecognized);
        assert_eq!(outcomes[3].reason, Some(RejectReason::DeletionsNotSupported));
        assert_eq!(outcomes[4].status, OutcomeStatus::Accepted);

        assert!(store.get(RecordKind::Post, "good").await.unwrap().is_some());
        assert!(store.get(RecordKind::Project, "Site").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_slug_conflict_between_files() {
        let (classifier, store) = classifier();
        let content = post_file("Same", "same", "2024-01-01", &[], "");

        let first = classifier.ingest(RecordKind::Post, "Posts/a.md", &content).await;
        assert!(first.is_accepted());

        let second = classifier.ingest(RecordKind::Post, "Posts/b.md", &content).await;
        assert_eq!(
            second.reason,
            Some(RejectReason::SlugConflict {
                key: "same".to_string(),
                owner: "Posts/a.md".to_string()
            })
        );
        assert_eq!(
            store.owner_of(RecordKind::Post, "same").await.unwrap(),
            Some("Posts/a.md".to_string())
        );
    }

    #[tokio::test]
    async fn test_reingestion_is_idempotent() {
        let (classifier, store) = classifier();
        let content = post_file("Hello", "hello", "2024-02-02", &["a", "b"], "Body\n");

        let first = classifier.ingest(RecordKind::Post, "Posts/hello.md", &content).await;
        let second = classifier.ingest(RecordKind::Post, "Posts/hello.md", &content).await;

        assert!(first.is_accepted());
        assert_eq!(first, second);
        assert_eq!(store.list(RecordKind::Post).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unexpected_project_field() {
        let (classifier, _) = classifier();
        let outcome = classifier
            .ingest(
                RecordKind::Project,
                "projects/x.json",
                r#"{"Name":"X","Url":"not a url","Description":"","Image":"","Extra":1}"#,
            )
            .await;

        assert_eq!(outcome.record_kind, OutcomeKind::Project);
        assert_eq!(
            outcome.reason,
            Some(RejectReason::UnexpectedField {
                fields: vec!["Extra".to_string()]
            })
        );
    }

    #[tokio::test]
    async fn test_validation_violations_are_reported_together() {
        let (classifier, _) = classifier();
        let outcome = classifier
            .ingest(
                RecordKind::Post,
                "Posts/x.md",
                "---\ntitle: \"\"\nslug: \"Bad Slug\"\n---\n",
            )
            .await;

        match outcome.reason {
            Some(RejectReason::InvalidFields { violations }) => assert_eq!(violations.len(), 3),
            other => panic!("unexpected reason: {other:?}"),
        }
        assert_eq!(outcome.key.as_deref(), Some("Bad Slug"));
    }
}
