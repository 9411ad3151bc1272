//! Remote diagram cache clients.
//!
//! The engine needs exactly two operations from the remote object
//! store: an existence check and a write. Both are treated as opaque
//! and retried zero times; an `exists` failure is a cache miss, a
//! `put` failure is logged and swallowed. A benign race where two
//! processes both build and both upload the same key is acceptable —
//! the overwrite is idempotent.

mod http;
mod memory;

use std::future::Future;

use thiserror::Error;

pub use http::HttpObjectStore;
pub use memory::{MemoryObjectStore, StoredObject};

/// Errors from the remote object store. Never fatal for a request.
#[derive(Debug, Error)]
pub enum RemoteCacheError {
    /// Transport-level failure (connection, timeout, simulated outage).
    #[error("transport error for {key}: {message}")]
    Transport { key: String, message: String },

    /// The store answered with an unexpected status.
    #[error("unexpected status {status} for {key}")]
    Status { key: String, status: u16 },
}

/// Minimal remote object store surface.
pub trait RemoteCache: Send + Sync + 'static {
    /// Whether an object exists at `key`.
    fn exists(&self, key: &str) -> impl Future<Output = Result<bool, RemoteCacheError>> + Send;

    /// Writes `bytes` at `key`. Overwrites are idempotent.
    fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> impl Future<Output = Result<(), RemoteCacheError>> + Send;

    /// Public URL of the object at `key`, for redirect responses.
    fn object_url(&self, key: &str) -> String;
}
