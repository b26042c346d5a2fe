//! Raw-content HTTP fetcher.
//!
//! Builds the file URL from a template such as
//! `https://raw.githubusercontent.com/{repository}/{commit}/{path}`.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

use crate::port::repository_fetcher::{FetchError, RepositoryFetcher};

pub const DEFAULT_RAW_URL_TEMPLATE: &str =
    "https://raw.githubusercontent.com/{repository}/{commit}/{path}";

pub struct HttpRepositoryFetcher {
    url_template: String,
    auth_token: Option<String>,
    http_client: Client,
}

impl HttpRepositoryFetcher {
    pub fn new(
        url_template: impl Into<String>,
        auth_token: Option<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("folio-ingest/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            url_template: url_template.into(),
            auth_token,
            http_client,
        })
    }

    /// Expand the template. Each segment of the repository, commit and path
    /// is percent-encoded on its own so `#`, `?` and `%` stay in the path;
    /// `..` segments are refused.
    pub fn file_url(&self, repository: &str, commit: &str, path: &str) -> Result<url::Url, FetchError> {
        let path = path.trim_start_matches('/');
        if path.split('/').any(|segment| segment == "..") {
            return Err(FetchError::InvalidPath {
                path: path.to_string(),
            });
        }
        let expanded = self
            .url_template
            .replace("{repository}", &encode_segments(repository))
            .replace("{commit}", &encode_segments(commit))
            .replace("{path}", &encode_segments(path));
        url::Url::parse(&expanded).map_err(|_| FetchError::InvalidPath {
            path: path.to_string(),
        })
    }
}

fn encode_segments(value: &str) -> String {
    value
        .split('/')
        .map(urlencoding::encode)
        .collect::<Vec<_>>()
        .join("/")
}

#[async_trait]
impl RepositoryFetcher for HttpRepositoryFetcher {
    async fn fetch(&self, repository: &str, commit: &str, path: &str) -> Result<String, FetchError> {
        let url = self.file_url(repository, commit, path)?;
        tracing::debug!("Fetching {}", url);

        let mut request = self.http_client.get(url);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| transport_error(path, e))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => {
                return Err(FetchError::NotFound {
                    path: path.to_string(),
                    commit: commit.to_string(),
                })
            }
            status => {
                return Err(FetchError::Status {
                    path: path.to_string(),
                    status: status.as_u16(),
                })
            }
        }

        let bytes = response.bytes().await.map_err(|e| transport_error(path, e))?;
        String::from_utf8(bytes.to_vec()).map_err(|_| FetchError::Encoding {
            path: path.to_string(),
        })
    }
}

fn transport_error(path: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            path: path.to_string(),
        }
    } else {
        FetchError::Transport {
            path: path.to_string(),
            message: error.to_string(),
        }
    }
}
