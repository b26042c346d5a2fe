//! Ingest Node - wires the store, fetcher and verifier chosen by the
//! configuration into a running HTTP server.

use anyhow::{Context, Result};
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use super::change_classifier::{ChangeClassifier, ContentLayout};
use super::webhook_receiver::WebhookReceiver;
use crate::infrastructure::config::{FolioConfig, SignatureScheme, StoreBackend};
use crate::infrastructure::http_fetcher::HttpRepositoryFetcher;
use crate::infrastructure::local_fetcher::LocalRepositoryFetcher;
use crate::infrastructure::memory_store::InMemoryContentStore;
use crate::infrastructure::persistence::SledContentStore;
use crate::infrastructure::retry::RetryingFetcher;
use crate::infrastructure::signature::{HmacSha256Verifier, SharedTokenVerifier};
use crate::port::content_store::ContentStore;
use crate::port::notification_verifier::NotificationVerifier;
use crate::port::repository_fetcher::RepositoryFetcher;
use crate::presentation::http_api::{create_router, ApiState, AppState};

/// Ingest node instance.
pub struct IngestNode {
    config: FolioConfig,
    state: AppState,
}

impl IngestNode {
    /// Create a new IngestNode with the given configuration.
    pub async fn new(config: FolioConfig) -> Result<Self> {
        config.validate().context("Invalid configuration")?;

        let store = open_store(&config)?;
        let fetcher = build_fetcher(&config)?;
        let verifier = build_verifier(&config);

        let classifier = ChangeClassifier::new(
            store.clone(),
            ContentLayout::new(
                config.repository.posts_dir.as_str(),
                config.repository.projects_dir.as_str(),
            ),
        );
        let receiver = Arc::new(WebhookReceiver::new(verifier, fetcher, classifier));

        Ok(Self {
            config,
            state: Arc::new(ApiState { receiver, store }),
        })
    }

    pub fn config(&self) -> &FolioConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.state.store
    }

    pub fn receiver(&self) -> &Arc<WebhookReceiver> {
        &self.state.receiver
    }

    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    /// Run the node until Ctrl-C.
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(&self.config.server.listen)
            .await
            .context("Failed to bind HTTP listener")?;

        self.serve(listener, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await
    }

    /// Serve on an already bound listener until `shutdown` resolves, then
    /// flush the store.
    pub async fn serve<S>(&self, listener: TcpListener, shutdown: S) -> Result<()>
    where
        S: Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = listener
            .local_addr()
            .context("Failed to read listener address")?;
        tracing::info!("Starting ingest node on {}", addr);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .context("HTTP server error")?;

        tracing::info!("Shutting down, flushing content store");
        self.state
            .store
            .flush()
            .await
            .context("Failed to flush content store")?;

        Ok(())
    }
}

fn open_store(config: &FolioConfig) -> Result<Arc<dyn ContentStore>> {
    match config.server.store {
        StoreBackend::Sled => {
            std::fs::create_dir_all(&config.server.data_dir)
                .context("Failed to create data directory")?;
            let store = SledContentStore::open(config.server.data_dir.join("content"))
                .context("Failed to open content store")?;
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => Ok(Arc::new(InMemoryContentStore::new())),
    }
}

fn build_fetcher(config: &FolioConfig) -> Result<Arc<dyn RepositoryFetcher>> {
    let policy = config.fetch.retry_policy();
    match &config.repository.local_root {
        Some(root) => {
            tracing::info!("Reading repository files from {:?}", root);
            Ok(Arc::new(RetryingFetcher::new(
                LocalRepositoryFetcher::new(root.clone()),
                policy,
            )))
        }
        None => {
            let fetcher = HttpRepositoryFetcher::new(
                config.repository.raw_url_template.clone(),
                config.repository.auth_token.clone(),
                config.fetch.timeout(),
            )
            .context("Failed to create HTTP fetcher")?;
            Ok(Arc::new(RetryingFetcher::new(fetcher, policy)))
        }
    }
}

fn build_verifier(config: &FolioConfig) -> Arc<dyn NotificationVerifier> {
    let secret = config.webhook.secret.as_bytes();
    match config.webhook.scheme {
        SignatureScheme::HmacSha256 => Arc::new(HmacSha256Verifier::new(secret)),
        SignatureScheme::Token => Arc::new(SharedTokenVerifier::new(secret)),
    }
}
