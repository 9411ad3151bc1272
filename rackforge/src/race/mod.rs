//! Build-vs-cache-lookup race.
//!
//! For one diagram request, two strategies run at once: ask the remote
//! cache whether the object already exists, and build the diagram
//! locally. Whichever reaches a terminal outcome first wins and the
//! loser is cancelled.
//!
//! # State machine
//!
//! ```text
//! Started ──► { RemotePending, LocalPending } ──► Decided ──► Finalizing ──► Done
//!                                                  │
//!                              CacheHit: cancel the build
//!                              Built:    drop the remote check,
//!                                        fire-and-forget upload
//! ```
//!
//! Cancellation is cooperative: a cancelled build abandons its private
//! pixel copies, while in-flight asset decodes complete on detached
//! tasks so unrelated requests sharing the registry are never starved.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::compose::ComposeError;
use crate::remote::RemoteCache;

/// Terminal result of one race. Produced exactly once per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RaceOutcome {
    /// The remote cache already holds the object; redirect there.
    CacheHit { location: String },
    /// Built locally; the encoded image is returned inline.
    Built { png: Vec<u8> },
}

/// Races a remote existence check against a local build.
pub struct RaceCoordinator<C: RemoteCache> {
    cache: Arc<C>,
}

impl<C: RemoteCache> Clone for RaceCoordinator<C> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<C: RemoteCache> RaceCoordinator<C> {
    pub fn new(cache: Arc<C>) -> Self {
        Self { cache }
    }

    /// Runs the race for one derived object key.
    ///
    /// `build` produces the encoded image. Outcome policy:
    /// - remote hit first: the build is cancelled, `CacheHit`
    /// - build first: the remote check is dropped, `Built`, and the
    ///   image is uploaded off the critical path
    /// - remote miss or check failure: keep waiting on the build
    /// - build failure while the check is still out: a late hit still
    ///   wins; if both fail, the build error surfaces
    pub async fn run<F>(
        &self,
        object_key: &str,
        content_type: &str,
        build: F,
    ) -> Result<RaceOutcome, ComposeError>
    where
        F: std::future::Future<Output = Result<Vec<u8>, ComposeError>> + Send + 'static,
    {
        let cancel = CancellationToken::new();

        let build_token = cancel.clone();
        let mut build_task = tokio::spawn(async move {
            tokio::select! {
                _ = build_token.cancelled() => None,
                result = build => Some(result),
            }
        });

        let cache = Arc::clone(&self.cache);
        let remote_key = object_key.to_string();
        let mut remote_task = tokio::spawn(async move {
            match cache.exists(&remote_key).await {
                Ok(found) => found,
                Err(err) => {
                    // Zero retries: an unreachable cache is a miss.
                    warn!(key = %remote_key, error = %err, "existence check failed, treating as miss");
                    false
                }
            }
        });

        let mut remote_pending = true;
        let mut build_pending = true;
        let mut build_error: Option<ComposeError> = None;

        loop {
            tokio::select! {
                remote = &mut remote_task, if remote_pending => {
                    remote_pending = false;
                    let hit = remote.unwrap_or_else(|err| {
                        warn!(error = %err, "remote check task failed, treating as miss");
                        false
                    });
                    if hit {
                        info!(key = object_key, "remote cache hit, cancelling local build");
                        cancel.cancel();
                        return Ok(RaceOutcome::CacheHit {
                            location: self.cache.object_url(object_key),
                        });
                    }
                    debug!(key = object_key, "remote cache miss");
                    if let Some(err) = build_error.take() {
                        return Err(err);
                    }
                }
                built = &mut build_task, if build_pending => {
                    build_pending = false;
                    match flatten(built) {
                        Ok(png) => {
                            remote_task.abort();
                            info!(key = object_key, size = png.len(), "local build won the race");
                            self.spawn_upload(object_key.to_string(), content_type.to_string(), png.clone());
                            return Ok(RaceOutcome::Built { png });
                        }
                        Err(err) => {
                            if remote_pending {
                                debug!(key = object_key, error = %err, "local build failed, remote check still out");
                                build_error = Some(err);
                            } else {
                                return Err(err);
                            }
                        }
                    }
                }
            }
        }
    }

    /// Uploads a built image off the critical path. Failures are
    /// logged, never surfaced.
    fn spawn_upload(&self, key: String, content_type: String, png: Vec<u8>) -> JoinHandle<()> {
        let cache = Arc::clone(&self.cache);
        tokio::spawn(async move {
            match cache.put(&key, png, &content_type).await {
                Ok(()) => debug!(key = %key, "built diagram uploaded to remote cache"),
                Err(err) => warn!(key = %key, error = %err, "cache upload failed"),
            }
        })
    }
}

fn flatten(
    joined: Result<Option<Result<Vec<u8>, ComposeError>>, tokio::task::JoinError>,
) -> Result<Vec<u8>, ComposeError> {
    match joined {
        Ok(Some(result)) => result,
        Ok(None) => Err(ComposeError::Task(
            "build cancelled before completion".to_string(),
        )),
        Err(err) => Err(ComposeError::Task(err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryObjectStore;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tokio::time::sleep;

    const KEY: &str = "cache/deadbeef.png";
    const PNG: &[u8] = &[0x89, b'P', b'N', b'G'];

    fn store() -> Arc<MemoryObjectStore> {
        Arc::new(MemoryObjectStore::new("memory://race"))
    }

    #[tokio::test]
    async fn prepopulated_store_always_hits() {
        let store = store();
        store.insert(KEY, PNG.to_vec(), "image/png");
        let coordinator = RaceCoordinator::new(Arc::clone(&store));

        let built = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&built);
        let outcome = coordinator
            .run(KEY, "image/png", async move {
                sleep(Duration::from_millis(30)).await;
                flag.store(true, Ordering::SeqCst);
                Ok(PNG.to_vec())
            })
            .await
            .unwrap();

        assert_eq!(
            outcome,
            RaceOutcome::CacheHit {
                location: store.object_url(KEY)
            }
        );
        // The losing build never finalizes: nothing was re-uploaded and
        // the store still holds exactly the seeded object.
        sleep(Duration::from_millis(50)).await;
        assert_eq!(store.len(), 1);
        assert!(!built.load(Ordering::SeqCst), "cancelled build ran to completion");
    }

    #[tokio::test]
    async fn build_wins_on_slow_remote_and_uploads() {
        let store = Arc::new(
            MemoryObjectStore::new("memory://race").with_exists_delay(Duration::from_millis(100)),
        );
        let coordinator = RaceCoordinator::new(Arc::clone(&store));

        let outcome = coordinator
            .run(KEY, "image/png", async { Ok(PNG.to_vec()) })
            .await
            .unwrap();
        assert_eq!(outcome, RaceOutcome::Built { png: PNG.to_vec() });

        // Upload is fire-and-forget; poll until it lands.
        for _ in 0..50 {
            if store.contains(KEY) {
                break;
            }
            sleep(Duration::from_millis(10)).await;
        }
        let object = store.get(KEY).expect("upload never landed");
        assert_eq!(object.bytes, PNG);
        assert_eq!(object.content_type, "image/png");
    }

    #[tokio::test]
    async fn exists_failure_falls_through_to_build() {
        let store = store();
        store.set_fail_exists(true);
        let coordinator = RaceCoordinator::new(Arc::clone(&store));

        let outcome = coordinator
            .run(KEY, "image/png", async { Ok(PNG.to_vec()) })
            .await
            .unwrap();
        assert_eq!(outcome, RaceOutcome::Built { png: PNG.to_vec() });
    }

    #[tokio::test]
    async fn late_hit_rescues_a_failed_build() {
        let store = Arc::new(
            MemoryObjectStore::new("memory://race").with_exists_delay(Duration::from_millis(50)),
        );
        store.insert(KEY, PNG.to_vec(), "image/png");
        let coordinator = RaceCoordinator::new(Arc::clone(&store));

        let outcome = coordinator
            .run(KEY, "image/png", async {
                Err(ComposeError::Task("boom".to_string()))
            })
            .await
            .unwrap();
        assert!(matches!(outcome, RaceOutcome::CacheHit { .. }));
    }

    #[tokio::test]
    async fn both_paths_failing_surfaces_the_build_error() {
        let store = store();
        store.set_fail_exists(true);
        let coordinator = RaceCoordinator::new(store);

        let err = coordinator
            .run(KEY, "image/png", async {
                Err(ComposeError::Task("boom".to_string()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ComposeError::Task(message) if message == "boom"));
    }

    #[tokio::test]
    async fn miss_then_build_error_surfaces_the_build_error() {
        let store = store();
        let coordinator = RaceCoordinator::new(store);

        let err = coordinator
            .run(KEY, "image/png", async {
                sleep(Duration::from_millis(20)).await;
                Err(ComposeError::Task("boom".to_string()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ComposeError::Task(message) if message == "boom"));
    }
}
