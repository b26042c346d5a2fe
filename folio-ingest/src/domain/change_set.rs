//! Change-set carried by a repository notification.
//!
//! Two payload shapes are understood:
//! - the native shape, `{"repository", "commit", "changes": [{"path", "change"}]}`
//! - a GitHub `push` event, whose per-commit `added`/`modified`/`removed`
//!   lists are folded into one entry per path.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Added,
    Modified,
    #[serde(alias = "removed")]
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    pub change: ChangeType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub repository: String,
    pub commit: String,
    #[serde(default)]
    pub changes: Vec<FileChange>,
}

#[derive(Debug, Error)]
pub enum ChangeSetError {
    #[error("invalid notification payload: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Deserialize)]
struct GithubPush {
    after: String,
    repository: GithubRepository,
    #[serde(default)]
    commits: Vec<GithubCommit>,
}

#[derive(Deserialize)]
struct GithubRepository {
    full_name: String,
}

#[derive(Deserialize)]
struct GithubCommit {
    #[serde(default)]
    added: Vec<String>,
    #[serde(default)]
    modified: Vec<String>,
    #[serde(default)]
    removed: Vec<String>,
}

impl ChangeSet {
    /// Decode a payload. `event` is the value of the delivery's event header,
    /// when the transport provides one.
    pub fn decode(payload: &[u8], event: Option<&str>) -> Result<Self, ChangeSetError> {
        match event {
            Some("push") => Self::from_github_push(payload),
            Some(_) | None => {
                let value: serde_json::Value = serde_json::from_slice(payload)?;
                if value.get("commits").is_some() && value.get("after").is_some() {
                    Ok(Self::from_github_value(value)?)
                } else {
                    Ok(serde_json::from_value(value)?)
                }
            }
        }
    }

    pub fn from_github_push(payload: &[u8]) -> Result<Self, ChangeSetError> {
        let value: serde_json::Value = serde_json::from_slice(payload)?;
        Ok(Self::from_github_value(value)?)
    }

    fn from_github_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        let push: GithubPush = serde_json::from_value(value)?;

        // Commits arrive oldest first; the last change to a path wins.
        let mut changes: Vec<FileChange> = Vec::new();
        for commit in push.commits {
            let entries = commit
                .added
                .into_iter()
                .map(|p| (p, ChangeType::Added))
                .chain(commit.modified.into_iter().map(|p| (p, ChangeType::Modified)))
                .chain(commit.removed.into_iter().map(|p| (p, ChangeType::Deleted)));
            for (path, change) in entries {
                match changes.iter_mut().find(|c| c.path == path) {
                    Some(existing) => existing.change = change,
                    None => changes.push(FileChange { path, change }),
                }
            }
        }

        Ok(ChangeSet {
            repository: push.repository.full_name,
            commit: push.after,
            changes,
        })
    }
}
