//! HTTP-backed object store client.
//!
//! Works against any S3-style static object host: `HEAD` for the
//! existence check, `PUT` for the upload, and plain URL concatenation
//! for redirects.

use reqwest::{header, StatusCode};
use tracing::{debug, trace};

use super::{RemoteCache, RemoteCacheError};

/// Remote cache over plain HTTP.
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpObjectStore {
    /// Creates a client for the store rooted at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }
}

impl RemoteCache for HttpObjectStore {
    async fn exists(&self, key: &str) -> Result<bool, RemoteCacheError> {
        let url = self.url(key);
        trace!(url = %url, "HEAD existence check");

        let response =
            self.client
                .head(&url)
                .send()
                .await
                .map_err(|err| RemoteCacheError::Transport {
                    key: key.to_string(),
                    message: err.to_string(),
                })?;

        let status = response.status();
        if status.is_success() {
            debug!(key, "remote object present");
            Ok(true)
        } else if status == StatusCode::NOT_FOUND || status == StatusCode::FORBIDDEN {
            // S3-style hosts answer 403 for missing keys without list
            // permission; both count as a miss.
            Ok(false)
        } else {
            Err(RemoteCacheError::Status {
                key: key.to_string(),
                status: status.as_u16(),
            })
        }
    }

    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), RemoteCacheError> {
        let url = self.url(key);
        trace!(url = %url, size = bytes.len(), "PUT object");

        let response = self
            .client
            .put(&url)
            .header(header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|err| RemoteCacheError::Transport {
                key: key.to_string(),
                message: err.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            debug!(key, "object uploaded");
            Ok(())
        } else {
            Err(RemoteCacheError::Status {
                key: key.to_string(),
                status: status.as_u16(),
            })
        }
    }

    fn object_url(&self, key: &str) -> String {
        self.url(key)
    }
}
