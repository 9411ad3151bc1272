//! Rackforge CLI - renders a rack diagram from a JSON request file.
//!
//! ```text
//! rackforge --request diagram.json --assets ./assets --output out.png
//! ```
//!
//! With `--cache-url` the render races the remote cache the same way
//! the service boundary does; a cache hit prints the object URL
//! instead of writing a file.

mod error;

use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use rackforge::asset::{AssetLoader, FsAssetSource};
use rackforge::compose::DiagramRequest;
use rackforge::config::ServiceConfig;
use rackforge::label::{GlyphLabelRenderer, LabelRenderer, NoLabelRenderer};
use rackforge::remote::{
    HttpObjectStore, MemoryObjectStore, RemoteCache, RemoteCacheError,
};
use rackforge::service::{DiagramService, RenderResponse};

use error::CliError;

#[derive(Parser)]
#[command(name = "rackforge")]
#[command(version = rackforge::VERSION)]
#[command(about = "Render a rack diagram from a JSON request", long_about = None)]
struct Args {
    /// Diagram request JSON file
    #[arg(long)]
    request: PathBuf,

    /// Directory containing the image assets the request references
    #[arg(long)]
    assets: PathBuf,

    /// TrueType font for module and banner labels
    #[arg(long)]
    font: Option<PathBuf>,

    /// Base URL of the remote diagram cache (omit to render offline)
    #[arg(long)]
    cache_url: Option<String>,

    /// Output PNG path
    #[arg(long)]
    output: PathBuf,

    /// Schema version mixed into cache keys
    #[arg(long, default_value = "1")]
    schema_version: u32,
}

/// Store picked at runtime: remote HTTP cache or offline stand-in.
enum ObjectStore {
    Http(HttpObjectStore),
    Memory(MemoryObjectStore),
}

impl RemoteCache for ObjectStore {
    async fn exists(&self, key: &str) -> Result<bool, RemoteCacheError> {
        match self {
            ObjectStore::Http(store) => store.exists(key).await,
            ObjectStore::Memory(store) => store.exists(key).await,
        }
    }

    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), RemoteCacheError> {
        match self {
            ObjectStore::Http(store) => store.put(key, bytes, content_type).await,
            ObjectStore::Memory(store) => store.put(key, bytes, content_type).await,
        }
    }

    fn object_url(&self, key: &str) -> String {
        match self {
            ObjectStore::Http(store) => store.object_url(key),
            ObjectStore::Memory(store) => store.object_url(key),
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    if let Err(err) = run(args).await {
        eprintln!("error: {err}");
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), CliError> {
    let _guard = rackforge::logging::init_logging("logs", "rackforge.log")?;

    let request: DiagramRequest = serde_json::from_str(&fs::read_to_string(&args.request)?)?;
    info!(
        sections = request.sections.len(),
        assets = %args.assets.display(),
        "loaded diagram request"
    );

    let loader = AssetLoader::new(FsAssetSource::new(&args.assets));

    let labels: Box<dyn LabelRenderer> = match &args.font {
        Some(path) => Box::new(GlyphLabelRenderer::from_bytes(fs::read(path)?)?),
        None => Box::new(NoLabelRenderer),
    };

    let store = match args.cache_url {
        Some(url) => ObjectStore::Http(HttpObjectStore::new(url)),
        None => ObjectStore::Memory(MemoryObjectStore::new("memory://rackforge")),
    };

    let config = ServiceConfig {
        schema_version: args.schema_version,
        ..ServiceConfig::default()
    };
    let service = DiagramService::new(loader, Arc::new(labels), Arc::new(store), config);

    match service.render(request).await? {
        RenderResponse::Redirect { location } => {
            println!("already cached: {location}");
        }
        RenderResponse::Image { bytes, .. } => {
            fs::write(&args.output, bytes)?;
            println!("wrote {}", args.output.display());
        }
    }
    Ok(())
}
