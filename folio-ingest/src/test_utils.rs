//! Test utilities: an in-memory repository fetcher and builders for
//! content files and notification payloads.

use crate::domain::change_set::{ChangeSet, ChangeType, FileChange};
use crate::infrastructure::signature::HmacSha256;
use crate::port::repository_fetcher::{FetchError, RepositoryFetcher};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ============================================================================
// StaticFetcher
// ============================================================================

/// Serves file contents from a map, regardless of repository or commit.
#[derive(Default)]
pub struct StaticFetcher {
    files: HashMap<String, String>,
    failing: HashSet<String>,
    errors: HashMap<String, FetchError>,
    calls: Arc<AtomicUsize>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }

    /// Make every fetch of `path` fail with a transport error.
    pub fn with_failure(mut self, path: impl Into<String>) -> Self {
        self.failing.insert(path.into());
        self
    }

    /// Make every fetch of `path` fail with `error`.
    pub fn with_error(mut self, path: impl Into<String>, error: FetchError) -> Self {
        self.errors.insert(path.into(), error);
        self
    }

    /// Number of fetches served so far, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RepositoryFetcher for StaticFetcher {
    async fn fetch(&self, _repository: &str, commit: &str, path: &str) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.errors.get(path) {
            return Err(error.clone());
        }
        if self.failing.contains(path) {
            return Err(FetchError::Transport {
                path: path.to_string(),
                message: "connection refused".to_string(),
            });
        }
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| FetchError::NotFound {
                path: path.to_string(),
                commit: commit.to_string(),
            })
    }
}

// ============================================================================
// Builders
// ============================================================================

/// A post file with a complete metadata block.
pub fn post_file(title: &str, slug: &str, date: &str, tags: &[&str], body: &str) -> String {
    format!(
        "---\ntitle: \"{}\"\nslug: \"{}\"\ndate: {}\ntags: [{}]\n---\n{}",
        title,
        slug,
        date,
        tags.join(", "),
        body
    )
}

/// A project file with all four fields.
pub fn project_file(name: &str, description: &str, url: &str, image: &str) -> String {
    serde_json::json!({
        "Name": name,
        "Description": description,
        "Url": url,
        "Image": image,
    })
    .to_string()
}

/// A native change-set payload.
pub fn change_set_payload(repository: &str, commit: &str, changes: &[(&str, ChangeType)]) -> Vec<u8> {
    let change_set = ChangeSet {
        repository: repository.to_string(),
        commit: commit.to_string(),
        changes: changes
            .iter()
            .map(|(path, change)| FileChange {
                path: path.to_string(),
                change: *change,
            })
            .collect(),
    };
    serde_json::to_vec(&change_set).unwrap_or_default()
}

/// `sha256=<hex>` signature of `payload` under `secret`.
pub fn sign(secret: &str, payload: &[u8]) -> String {
    HmacSha256::sign_header(secret.as_bytes(), payload)
}
