//! Error types for section composition and diagram assembly.

use thiserror::Error;

use crate::asset::AssetError;
use crate::label::LabelError;

/// Errors that fail a section, and with it the whole diagram build.
#[derive(Debug, Error)]
pub enum ComposeError {
    /// An asset load or decode failed.
    #[error(transparent)]
    Asset(#[from] AssetError),

    /// An overlay or banner does not fit inside its base canvas.
    #[error(
        "{element} at ({x}, {y}) size {width}x{height} exceeds {base_width}x{base_height} base"
    )]
    OutOfBounds {
        element: String,
        x: i64,
        y: i64,
        width: u32,
        height: u32,
        base_width: u32,
        base_height: u32,
    },

    /// Label rasterization failed.
    #[error(transparent)]
    Label(#[from] LabelError),

    /// The base image never landed on the canvas.
    #[error("section base {base} was never produced")]
    MissingBase { base: String },

    /// Encoding the finished canvas failed.
    #[error("failed to encode canvas: {0}")]
    Encode(String),

    /// A composition task ended abnormally.
    #[error("composition task failed: {0}")]
    Task(String),
}
