use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use crate::port::repository_fetcher::{FetchError, RepositoryFetcher};

/// Reads files from a local checkout of the repository.
///
/// The checkout is expected to be kept at the notified commit by whoever
/// deploys it (a post-receive hook, a `git pull` before delivery, ...); the
/// `commit` argument is only used in error messages.
pub struct LocalRepositoryFetcher {
    root: PathBuf,
}

impl LocalRepositoryFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, FetchError> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if path.is_empty() || escapes {
            return Err(FetchError::InvalidPath {
                path: path.to_string(),
            });
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl RepositoryFetcher for LocalRepositoryFetcher {
    async fn fetch(&self, _repository: &str, commit: &str, path: &str) -> Result<String, FetchError> {
        let full_path = self.resolve(path)?;
        match tokio::fs::read(&full_path).await {
            Ok(bytes) => String::from_utf8(bytes).map_err(|_| FetchError::Encoding {
                path: path.to_string(),
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(FetchError::NotFound {
                path: path.to_string(),
                commit: commit.to_string(),
            }),
            Err(e) => Err(FetchError::Transport {
                path: path.to_string(),
                message: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_reads_files_under_root() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir_all(temp_dir.path().join("Posts")).unwrap();
        std::fs::write(temp_dir.path().join("Posts/a.md"), "---\n---\nhi").unwrap();

        let fetcher = LocalRepositoryFetcher::new(temp_dir.path());
        let content = fetcher.fetch("me/site", "abc", "Posts/a.md").await.unwrap();
        assert_eq!(content, "---\n---\nhi");
    }

    #[tokio::test]
    async fn test_missing_file_and_escapes() {
        let temp_dir = TempDir::new().unwrap();
        let fetcher = LocalRepositoryFetcher::new(temp_dir.path());

        let err = fetcher.fetch("me/site", "abc", "Posts/none.md").await.unwrap_err();
        assert_eq!(
            err,
            FetchError::NotFound {
                path: "Posts/none.md".to_string(),
                commit: "abc".to_string()
            }
        );

        for path in ["../secret", "/etc/passwd", ""] {
            let err = fetcher.fetch("me/site", "abc", path).await.unwrap_err();
            assert!(matches!(err, FetchError::InvalidPath { .. }), "{path}");
        }
    }
}
