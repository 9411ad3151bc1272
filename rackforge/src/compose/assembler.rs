//! Diagram assembly: fan out sections, stack the results.

use std::io::Cursor;

use futures::future::try_join_all;
use image::{imageops, ImageFormat, Rgba, RgbaImage};
use tracing::debug;

use crate::asset::AssetSource;
use crate::label::LabelRenderer;

use super::error::ComposeError;
use super::section::SectionComposer;
use super::spec::{DiagramRequest, StackDirection};

/// Runs one [`SectionComposer`] task per section and stacks the results.
pub struct DiagramAssembler<S: AssetSource, L: LabelRenderer> {
    composer: SectionComposer<S, L>,
}

impl<S: AssetSource, L: LabelRenderer> Clone for DiagramAssembler<S, L> {
    fn clone(&self) -> Self {
        Self {
            composer: self.composer.clone(),
        }
    }
}

impl<S: AssetSource, L: LabelRenderer + 'static> DiagramAssembler<S, L> {
    pub fn new(composer: SectionComposer<S, L>) -> Self {
        Self { composer }
    }

    pub fn composer(&self) -> &SectionComposer<S, L> {
        &self.composer
    }

    /// Builds the full diagram canvas.
    ///
    /// Sections compose fully concurrently; there is no ordering
    /// dependency between them. The first failure cancels the rest and
    /// propagates. Stacking afterwards is a pure reduction.
    pub async fn assemble(&self, request: &DiagramRequest) -> Result<RgbaImage, ComposeError> {
        debug!(
            sections = request.sections.len(),
            direction = ?request.direction,
            "assembling diagram"
        );
        let mut images = try_join_all(
            request
                .sections
                .iter()
                .map(|spec| self.composer.compose(spec)),
        )
        .await?;

        if request.direction == StackDirection::Up {
            images.reverse();
        }
        Ok(stack_vertically(&images))
    }
}

/// Stacks section images top to bottom on an opaque canvas.
///
/// Canvas width is the widest section, height the sum of heights; each
/// section is horizontally centered.
pub fn stack_vertically(images: &[RgbaImage]) -> RgbaImage {
    let width = images.iter().map(|image| image.width()).max().unwrap_or(0);
    let height = images.iter().map(|image| image.height()).sum();

    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255]));
    let mut y = 0i64;
    for image in images {
        let x = i64::from((width - image.width()) / 2);
        imageops::overlay(&mut canvas, image, x, y);
        y += i64::from(image.height());
    }
    canvas
}

/// Encodes a canvas as PNG bytes.
pub fn encode_png(canvas: &RgbaImage) -> Result<Vec<u8>, ComposeError> {
    let mut bytes = Vec::new();
    canvas
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|err| ComposeError::Encode(err.to_string()))?;
    Ok(bytes)
}
