//! Persistence implementations for data storage.
//!
//! This module provides the durable content store using sled.

pub mod sled_content_store;

pub use sled_content_store::SledContentStore;
