pub mod config;
pub mod http_fetcher;
pub mod local_fetcher;
pub mod memory_store;
pub mod persistence;
pub mod retry;
pub mod signature;

pub use http_fetcher::HttpRepositoryFetcher;
pub use local_fetcher::LocalRepositoryFetcher;
pub use memory_store::InMemoryContentStore;
pub use persistence::SledContentStore;
pub use retry::{RetryPolicy, RetryingFetcher};
pub use signature::{HmacSha256Verifier, SharedTokenVerifier};
