//! Port layer - Abstract interfaces for infrastructure dependencies
//!
//! This module defines traits that abstract away infrastructure concerns,
//! allowing the application layer to remain independent of specific implementations.

pub mod content_store;
pub mod notification_verifier;
pub mod repository_fetcher;

pub use content_store::{ContentStore, RecordSnapshot, StoreError, UpsertOutcome};
pub use notification_verifier::NotificationVerifier;
pub use repository_fetcher::{FetchError, RepositoryFetcher};
