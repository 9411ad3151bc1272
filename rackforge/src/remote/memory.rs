//! In-memory object store.
//!
//! Backs offline rendering in the CLI and deterministic race tests:
//! the existence check can be slowed down or made to fail on demand.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::{RemoteCache, RemoteCacheError};

/// One stored object.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Map-backed remote cache.
#[derive(Debug)]
pub struct MemoryObjectStore {
    base_url: String,
    objects: Mutex<HashMap<String, StoredObject>>,
    exists_delay: Mutex<Duration>,
    fail_exists: AtomicBool,
}

impl MemoryObjectStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            objects: Mutex::new(HashMap::new()),
            exists_delay: Mutex::new(Duration::ZERO),
            fail_exists: AtomicBool::new(false),
        }
    }

    /// Adds artificial latency to every existence check.
    pub fn with_exists_delay(self, delay: Duration) -> Self {
        self.set_exists_delay(delay);
        self
    }

    /// Changes the existence-check latency.
    pub fn set_exists_delay(&self, delay: Duration) {
        *self.exists_delay.lock().unwrap() = delay;
    }

    /// Makes subsequent existence checks fail with a transport error.
    pub fn set_fail_exists(&self, fail: bool) {
        self.fail_exists.store(fail, Ordering::SeqCst);
    }

    /// Pre-populates an object.
    pub fn insert(&self, key: impl Into<String>, bytes: Vec<u8>, content_type: impl Into<String>) {
        self.objects.lock().unwrap().insert(
            key.into(),
            StoredObject {
                bytes,
                content_type: content_type.into(),
            },
        );
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RemoteCache for MemoryObjectStore {
    async fn exists(&self, key: &str) -> Result<bool, RemoteCacheError> {
        let delay = *self.exists_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_exists.load(Ordering::SeqCst) {
            return Err(RemoteCacheError::Transport {
                key: key.to_string(),
                message: "simulated outage".to_string(),
            });
        }
        Ok(self.contains(key))
    }

    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), RemoteCacheError> {
        self.insert(key, bytes, content_type);
        Ok(())
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_exists() {
        let store = MemoryObjectStore::new("memory://test");
        assert!(!store.exists("cache/k.png").await.unwrap());

        store
            .put("cache/k.png", vec![1, 2, 3], "image/png")
            .await
            .unwrap();
        assert!(store.exists("cache/k.png").await.unwrap());

        let object = store.get("cache/k.png").unwrap();
        assert_eq!(object.bytes, vec![1, 2, 3]);
        assert_eq!(object.content_type, "image/png");
        assert_eq!(store.object_url("cache/k.png"), "memory://test/cache/k.png");
    }

    #[tokio::test]
    async fn simulated_outage_fails_exists() {
        let store = MemoryObjectStore::new("memory://test");
        store.set_fail_exists(true);
        assert!(store.exists("any").await.is_err());
    }
}
