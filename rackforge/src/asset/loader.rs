//! Single-flight asset registry.
//!
//! The first request for a key registers it and kicks off the decode;
//! every request that arrives while the decode is in flight subscribes
//! to the same result. Decoded images are kept for the process lifetime
//! (the catalog is small and bounded) and callers always receive their
//! own pixel copy, so in-place edits never touch the shared original.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use image::RgbaImage;
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

use super::source::{AssetError, AssetSource};

type LoadResult = Result<Arc<RgbaImage>, AssetError>;

/// Registry slot for one asset key.
enum Entry {
    /// Decode in flight; subscribe for the result.
    Loading(broadcast::Sender<LoadResult>),
    /// Decode finished (failures are cached too, no retry).
    Done(LoadResult),
}

struct Registry<S> {
    source: Arc<S>,
    entries: Mutex<HashMap<String, Entry>>,
}

/// Deduplicating, lazily-loading image registry.
///
/// Cheap to clone; clones share the same registry.
///
/// # Example
///
/// ```ignore
/// use rackforge::asset::{AssetLoader, FsAssetSource};
///
/// let loader = AssetLoader::new(FsAssetSource::new("assets"));
/// let face = loader.acquire("png/chassis_front.png").await?;
/// ```
pub struct AssetLoader<S: AssetSource> {
    registry: Arc<Registry<S>>,
}

impl<S: AssetSource> Clone for AssetLoader<S> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<S: AssetSource> AssetLoader<S> {
    /// Creates a loader over the given source.
    pub fn new(source: S) -> Self {
        Self {
            registry: Arc::new(Registry {
                source: Arc::new(source),
                entries: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Returns an independent decoded copy of the asset for `key`.
    ///
    /// The first caller for a key triggers the decode; concurrent
    /// callers suspend until it completes. The check-or-register step
    /// is atomic under the registry lock, so two callers can never both
    /// believe they are first.
    ///
    /// # Errors
    ///
    /// [`AssetError`] naming the key if the source has no such asset or
    /// the bytes do not decode. The same error is delivered to every
    /// waiter and to all future callers of the key.
    pub async fn acquire(&self, key: &str) -> Result<RgbaImage, AssetError> {
        let mut rx = {
            let mut entries = self.registry.entries.lock().unwrap();
            match entries.get(key) {
                Some(Entry::Done(result)) => {
                    trace!(key, "asset already resolved");
                    return copy_out(result.clone());
                }
                Some(Entry::Loading(tx)) => {
                    trace!(key, "asset decode in flight, subscribing");
                    tx.subscribe()
                }
                None => {
                    let (tx, rx) = broadcast::channel(1);
                    entries.insert(key.to_string(), Entry::Loading(tx.clone()));
                    self.spawn_decode(key.to_string(), tx);
                    rx
                }
            }
        };

        match rx.recv().await {
            Ok(result) => copy_out(result),
            Err(_) => Err(AssetError::Internal {
                key: key.to_string(),
                message: "decode task dropped its channel".to_string(),
            }),
        }
    }

    /// True if the key has a registry entry (loading or done).
    pub fn is_registered(&self, key: &str) -> bool {
        self.registry.entries.lock().unwrap().contains_key(key)
    }

    /// Number of keys that have finished loading (success or failure).
    pub fn resolved_count(&self) -> usize {
        self.registry
            .entries
            .lock()
            .unwrap()
            .values()
            .filter(|entry| matches!(entry, Entry::Done(_)))
            .count()
    }

    /// Runs the decode on a detached task so that a cancelled caller
    /// never strands the other waiters: the registry entry, once
    /// started, always completes.
    fn spawn_decode(&self, key: String, tx: broadcast::Sender<LoadResult>) {
        let registry = Arc::clone(&self.registry);
        tokio::spawn(async move {
            let source = Arc::clone(&registry.source);
            let blocking_key = key.clone();
            let result: LoadResult =
                match tokio::task::spawn_blocking(move || decode(source.as_ref(), &blocking_key))
                    .await
                {
                    Ok(decoded) => decoded.map(Arc::new),
                    Err(err) => Err(AssetError::Internal {
                        key: key.clone(),
                        message: err.to_string(),
                    }),
                };

            match &result {
                Ok(image) => debug!(
                    key = %key,
                    width = image.width(),
                    height = image.height(),
                    "asset loaded"
                ),
                Err(err) => warn!(key = %key, error = %err, "asset load failed"),
            }

            registry
                .entries
                .lock()
                .unwrap()
                .insert(key, Entry::Done(result.clone()));
            let _ = tx.send(result);
        });
    }
}

fn decode<S: AssetSource>(source: &S, key: &str) -> Result<RgbaImage, AssetError> {
    let bytes = source.load(key)?;
    let image = image::load_from_memory(&bytes).map_err(|err| AssetError::Decode {
        key: key.to_string(),
        message: err.to_string(),
    })?;
    Ok(image.to_rgba8())
}

fn copy_out(result: LoadResult) -> Result<RgbaImage, AssetError> {
    result.map(|shared| (*shared).clone())
}
