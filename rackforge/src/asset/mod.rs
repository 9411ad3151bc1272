//! Deduplicated, lazily-loaded image assets.
//!
//! Diagram sections reference the same small catalog of face plates and
//! module icons over and over. This module makes sure each distinct asset
//! key is read and decoded at most once per process, no matter how many
//! sections request it concurrently.
//!
//! # Architecture
//!
//! ```text
//! Section task A ─┐
//!                 │                        ┌─────────────┐
//! Section task B ─┼──► AssetLoader ──────► │ AssetSource │
//!                 │    (registry)          └─────────────┘
//! Section task C ─┘        │
//!                          ▼
//!                    one decode per key,
//!                    every caller gets a
//!                    private pixel copy
//! ```
//!
//! # Key Components
//!
//! - [`AssetSource`] - key-addressable read-only source of raw image bytes
//! - [`FsAssetSource`] - filesystem-backed source
//! - [`AssetLoader`] - the single-flight registry handing out decoded copies
//! - [`AssetError`] - load/decode failures, broadcast to every waiter

mod loader;
mod source;

pub use loader::AssetLoader;
pub use source::{AssetError, AssetSource, FsAssetSource};
