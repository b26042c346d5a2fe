use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use thiserror::Error;

use super::change_classifier::{ChangeClassifier, FetchedChange, Route};
use crate::domain::change_set::ChangeSet;
use crate::domain::outcome::ReceiveSummary;
use crate::port::notification_verifier::NotificationVerifier;
use crate::port::repository_fetcher::{FetchError, RepositoryFetcher};

/// Upper bound on file fetches in flight for one notification.
const MAX_CONCURRENT_FETCHES: usize = 8;

/// An incoming repository notification as read off the wire.
#[derive(Debug, Clone, Default)]
pub struct Notification {
    pub payload: Vec<u8>,
    /// Value of the verifier's token header.
    pub token: Option<String>,
    /// Value of the event-type header, if the sender provides one.
    pub event: Option<String>,
}

#[derive(Debug, Error)]
pub enum ReceiveError {
    #[error("notification could not be authenticated")]
    Unauthenticated,

    #[error("{0}")]
    InvalidPayload(String),

    /// Nothing was applied. Redelivery helps only when the fetch error is
    /// itself retryable.
    #[error("failed to fetch changed files: {0}")]
    FetchFailure(#[source] FetchError),
}

impl ReceiveError {
    pub fn is_retryable(&self) -> bool {
        match self {
            ReceiveError::FetchFailure(e) => e.is_retryable(),
            ReceiveError::Unauthenticated | ReceiveError::InvalidPayload(_) => false,
        }
    }
}

/// Entry point for repository notifications: authenticate, decode, fetch
/// every changed file, then hand the batch to the classifier.
pub struct WebhookReceiver {
    verifier: Arc<dyn NotificationVerifier>,
    fetcher: Arc<dyn RepositoryFetcher>,
    classifier: ChangeClassifier,
}

impl WebhookReceiver {
    pub fn new(
        verifier: Arc<dyn NotificationVerifier>,
        fetcher: Arc<dyn RepositoryFetcher>,
        classifier: ChangeClassifier,
    ) -> Self {
        Self {
            verifier,
            fetcher,
            classifier,
        }
    }

    /// Header the verifier reads its token from.
    pub fn token_header(&self) -> &'static str {
        self.verifier.token_header()
    }

    pub async fn receive(&self, notification: Notification) -> Result<ReceiveSummary, ReceiveError> {
        let token = notification.token.as_deref().unwrap_or_default();
        if token.is_empty() || !self.verifier.verify(&notification.payload, token) {
            tracing::warn!(
                "Rejected notification: missing or invalid {}",
                self.verifier.token_header()
            );
            return Err(ReceiveError::Unauthenticated);
        }

        let event = notification.event.as_deref();
        if event == Some("ping") {
            tracing::info!("Received ping notification");
            return Ok(ReceiveSummary::new("", "", Vec::new()));
        }

        let change_set = ChangeSet::decode(&notification.payload, event).map_err(|e| {
            tracing::warn!("Rejected notification: {}", e);
            ReceiveError::InvalidPayload(e.to_string())
        })?;

        let contents = self.fetch_all(&change_set).await.map_err(|e| {
            tracing::warn!(
                "Aborted notification for {}@{}: {}",
                change_set.repository,
                change_set.commit,
                e
            );
            ReceiveError::FetchFailure(e)
        })?;

        let files = change_set
            .changes
            .into_iter()
            .zip(contents)
            .map(|(change, content)| FetchedChange { change, content })
            .collect();
        let outcomes = self.classifier.process(files).await;

        let summary = ReceiveSummary::new(change_set.repository, change_set.commit, outcomes);
        tracing::info!(
            "Processed {}@{}: {} files, {} accepted, {} rejected ({} unrecognized)",
            summary.repository,
            summary.commit,
            summary.total,
            summary.accepted,
            summary.rejected,
            summary.unrecognized
        );
        Ok(summary)
    }

    /// Fetch the content of every file the classifier will ingest, in
    /// change-set order. Errors confined to one file's content are kept with
    /// that file; any other fetch error fails the whole batch.
    async fn fetch_all(
        &self,
        change_set: &ChangeSet,
    ) -> Result<Vec<Option<Result<String, FetchError>>>, FetchError> {
        let fetches: Vec<_> = change_set
            .changes
            .iter()
            .map(|change| {
                let wanted = matches!(self.classifier.route(change), Route::Ingest(_));
                let fetcher = Arc::clone(&self.fetcher);
                let repository = change_set.repository.clone();
                let commit = change_set.commit.clone();
                let path = change.path.clone();
                async move {
                    if !wanted {
                        return Ok(None);
                    }
                    match fetcher.fetch(&repository, &commit, &path).await {
                        Ok(content) => Ok(Some(Ok(content))),
                        Err(e) if e.is_file_level() => Ok(Some(Err(e))),
                        Err(e) => Err(e),
                    }
                }
            })
            .collect();

        stream::iter(fetches)
            .buffered(MAX_CONCURRENT_FETCHES)
            .try_collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_service::change_classifier::ContentLayout;
    use crate::domain::change_set::ChangeType;
    use crate::domain::outcome::RejectReason;
    use crate::domain::record::RecordKind;
    use crate::infrastructure::memory_store::InMemoryContentStore;
    use crate::infrastructure::signature::HmacSha256Verifier;
    use crate::port::content_store::ContentStore;
    use crate::test_utils::{change_set_payload, post_file, sign, StaticFetcher};

    const SECRET: &str = "test-secret";

    fn receiver(fetcher: Arc<StaticFetcher>) -> (WebhookReceiver, Arc<InMemoryContentStore>) {
        let store = Arc::new(InMemoryContentStore::new());
        let receiver = WebhookReceiver::new(
            Arc::new(HmacSha256Verifier::new(SECRET)),
            fetcher,
            ChangeClassifier::new(store.clone(), ContentLayout::default()),
        );
        (receiver, store)
    }

    fn signed(payload: Vec<u8>) -> Notification {
        Notification {
            token: Some(sign(SECRET, &payload)),
            payload,
            event: None,
        }
    }

    #[tokio::test]
    async fn test_unauthenticated_notification_touches_nothing() {
        let fetcher = Arc::new(
            StaticFetcher::new().with_file(
                "Posts/a.md",
                post_file("A", "a", "2024-01-01", &[], ""),
            ),
        );
        let (receiver, store) = receiver(fetcher.clone());
        let payload = change_set_payload("me/site", "c1", &[("Posts/a.md", ChangeType::Added)]);

        for token in [None, Some(String::new()), Some(sign("wrong", &payload))] {
            let err = receiver
                .receive(Notification {
                    payload: payload.clone(),
                    token,
                    event: None,
                })
                .await
                .unwrap_err();
            assert!(matches!(err, ReceiveError::Unauthenticated));
        }

        assert_eq!(fetcher.calls(), 0);
        assert!(store.list(RecordKind::Post).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_payload() {
        let (receiver, _) = receiver(Arc::new(StaticFetcher::new()));
        let err = receiver
            .receive(signed(b"{not json".to_vec()))
            .await
            .unwrap_err();
        assert!(matches!(err, ReceiveError::InvalidPayload(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_ping_is_acknowledged() {
        let (receiver, _) = receiver(Arc::new(StaticFetcher::new()));
        let payload = br#"{"zen":"Keep it logically awesome."}"#.to_vec();
        let summary = receiver
            .receive(Notification {
                event: Some("ping".to_string()),
                ..signed(payload)
            })
            .await
            .unwrap();
        assert_eq!(summary.total, 0);
    }

    #[tokio::test]
    async fn test_only_routed_files_are_fetched() {
        let fetcher = Arc::new(
            StaticFetcher::new().with_file(
                "Posts/a.md",
                post_file("A", "a", "2024-01-01", &["x"], "Body"),
            ),
        );
        let (receiver, store) = receiver(fetcher.clone());
        let payload = change_set_payload(
            "me/site",
            "c1",
            &[
                ("Posts/a.md", ChangeType::Added),
                ("README.md", ChangeType::Modified),
                ("Posts/gone.md", ChangeType::Deleted),
            ],
        );

        let summary = receiver.receive(signed(payload)).await.unwrap();
        assert_eq!(summary.repository, "me/site");
        assert_eq!(summary.commit, "c1");
        assert_eq!(summary.total, 3);
        assert_eq!(summary.accepted, 1);
        assert_eq!(summary.rejected, 2);
        assert_eq!(summary.unrecognized, 2);
        assert_eq!(
            summary.outcomes[2].reason,
            Some(RejectReason::DeletionsNotSupported)
        );
        assert_eq!(fetcher.calls(), 1);
        assert!(store.get(RecordKind::Post, "a").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_fetch_failure_applies_nothing() {
        let fetcher = Arc::new(
            StaticFetcher::new()
                .with_file("Posts/a.md", post_file("A", "a", "2024-01-01", &[], ""))
                .with_failure("Posts/b.md"),
        );
        let (receiver, store) = receiver(fetcher);
        let payload = change_set_payload(
            "me/site",
            "c1",
            &[
                ("Posts/a.md", ChangeType::Added),
                ("Posts/b.md", ChangeType::Added),
            ],
        );

        let err = receiver.receive(signed(payload)).await.unwrap_err();
        match &err {
            ReceiveError::FetchFailure(source) => assert_eq!(source.path(), "Posts/b.md"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.is_retryable());
        assert!(store.list(RecordKind::Post).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_is_not_retryable() {
        let fetcher = Arc::new(
            StaticFetcher::new().with_file("Posts/a.md", post_file("A", "a", "2024-01-01", &[], "")),
        );
        let (receiver, store) = receiver(fetcher);
        let payload = change_set_payload(
            "me/site",
            "c1",
            &[
                ("Posts/a.md", ChangeType::Added),
                ("Posts/gone.md", ChangeType::Added),
            ],
        );

        let err = receiver.receive(signed(payload)).await.unwrap_err();
        assert!(matches!(
            err,
            ReceiveError::FetchFailure(FetchError::NotFound { .. })
        ));
        assert!(!err.is_retryable());
        assert!(store.list(RecordKind::Post).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_file_is_rejected_alone() {
        let fetcher = Arc::new(
            StaticFetcher::new()
                .with_file("Posts/good.md", post_file("Good", "good", "2024-01-01", &[], ""))
                .with_error(
                    "Posts/latin1.md",
                    FetchError::Encoding {
                        path: "Posts/latin1.md".to_string(),
                    },
                ),
        );
        let (receiver, store) = receiver(fetcher);
        let payload = change_set_payload(
            "me/site",
            "c1",
            &[
                ("Posts/latin1.md", ChangeType::Added),
                ("Posts/good.md", ChangeType::Added),
            ],
        );

        let summary = receiver.receive(signed(payload)).await.unwrap();
        assert_eq!(summary.accepted, 1);
        assert_eq!(summary.rejected, 1);
        assert!(matches!(
            summary.outcomes[0].reason,
            Some(RejectReason::MalformedStructure { .. })
        ));
        assert!(summary.outcomes[1].is_accepted());
        assert!(store.get(RecordKind::Post, "good").await.unwrap().is_some());
    }

    #[test]
    fn test_retryable_follows_fetch_error() {
        let timeout = ReceiveError::FetchFailure(FetchError::Timeout {
            path: "Posts/a.md".to_string(),
        });
        let invalid = ReceiveError::FetchFailure(FetchError::InvalidPath {
            path: "../a.md".to_string(),
        });
        assert!(timeout.is_retryable());
        assert!(!invalid.is_retryable());
        assert!(!ReceiveError::Unauthenticated.is_retryable());
    }
}
