//! CLI error type.

use rackforge::label::LabelError;
use rackforge::service::RenderError;
use thiserror::Error;

/// Anything that can stop the CLI, with a printable description.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid request file: {0}")]
    Request(#[from] serde_json::Error),

    #[error(transparent)]
    Label(#[from] LabelError),

    #[error(transparent)]
    Render(#[from] RenderError),
}
