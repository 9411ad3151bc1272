//! High-level facade tying the engine together.
//!
//! One call drives the whole chain: derive the cache key, race the
//! remote existence check against a local build (assembler →
//! compositor → asset loader), and map the outcome to the response
//! shape the request boundary needs.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::asset::{AssetLoader, AssetSource};
use crate::compose::{
    encode_png, ComposeError, DiagramAssembler, DiagramRequest, SectionComposer,
};
use crate::config::ServiceConfig;
use crate::key::object_key;
use crate::label::LabelRenderer;
use crate::race::{RaceCoordinator, RaceOutcome};
use crate::remote::RemoteCache;

/// Request-level failure. Maps to a generic failure response at the
/// boundary; a malformed or partial image is never returned.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error("failed to normalize request for keying: {0}")]
    Key(#[from] serde_json::Error),
}

/// What the request boundary sends back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderResponse {
    /// The diagram already exists remotely; redirect the client there.
    Redirect { location: String },
    /// Freshly built; return the encoded image inline.
    Image {
        bytes: Vec<u8>,
        content_type: String,
    },
}

/// The composition engine behind one asset catalog and one remote
/// cache. Concurrent renders share the asset registry; everything else
/// is per-request.
pub struct DiagramService<S, C, L>
where
    S: AssetSource,
    C: RemoteCache,
    L: LabelRenderer + 'static,
{
    assembler: DiagramAssembler<S, L>,
    race: RaceCoordinator<C>,
    config: ServiceConfig,
}

impl<S, C, L> DiagramService<S, C, L>
where
    S: AssetSource,
    C: RemoteCache,
    L: LabelRenderer + 'static,
{
    pub fn new(
        loader: AssetLoader<S>,
        labels: Arc<L>,
        cache: Arc<C>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            assembler: DiagramAssembler::new(SectionComposer::new(loader, labels)),
            race: RaceCoordinator::new(cache),
            config,
        }
    }

    /// The remote object key this request resolves to.
    pub fn object_key(&self, request: &DiagramRequest) -> Result<String, RenderError> {
        Ok(object_key(
            &self.config.cache_prefix,
            self.config.schema_version,
            request,
        )?)
    }

    /// Renders one diagram request to completion.
    pub async fn render(&self, request: DiagramRequest) -> Result<RenderResponse, RenderError> {
        let key = self.object_key(&request)?;
        info!(key = %key, sections = request.sections.len(), "rendering diagram request");

        let assembler = self.assembler.clone();
        let build = async move {
            let canvas = assembler.assemble(&request).await?;
            encode_png(&canvas)
        };

        let outcome = self
            .race
            .run(&key, &self.config.content_type, build)
            .await?;

        Ok(match outcome {
            RaceOutcome::CacheHit { location } => RenderResponse::Redirect { location },
            RaceOutcome::Built { png } => RenderResponse::Image {
                bytes: png,
                content_type: self.config.content_type.clone(),
            },
        })
    }
}
