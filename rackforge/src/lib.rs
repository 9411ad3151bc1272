//! Rackforge - concurrent rack-diagram composition engine.
//!
//! Renders a composite diagram image from many small image assets,
//! positioned and layered per a hardware configuration, and avoids
//! redundant work two ways: deduplicated lazily-loaded shared assets,
//! and a race between "find it already built in the remote cache" and
//! "build it locally", with the loser cancelled.
//!
//! # High-Level API
//!
//! The [`service`] module provides the facade most callers want:
//!
//! ```ignore
//! use std::sync::Arc;
//! use rackforge::asset::{AssetLoader, FsAssetSource};
//! use rackforge::config::ServiceConfig;
//! use rackforge::label::NoLabelRenderer;
//! use rackforge::remote::HttpObjectStore;
//! use rackforge::service::{DiagramService, RenderResponse};
//!
//! let service = DiagramService::new(
//!     AssetLoader::new(FsAssetSource::new("assets")),
//!     Arc::new(NoLabelRenderer),
//!     Arc::new(HttpObjectStore::new("https://images.example.com")),
//!     ServiceConfig::default(),
//! );
//!
//! match service.render(request).await? {
//!     RenderResponse::Redirect { location } => redirect(location),
//!     RenderResponse::Image { bytes, content_type } => respond(bytes, content_type),
//! }
//! ```

pub mod asset;
pub mod compose;
pub mod config;
pub mod key;
pub mod label;
pub mod logging;
pub mod race;
pub mod remote;
pub mod service;

/// Version of the rackforge library and CLI.
///
/// Synchronized across the workspace; injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
