//! Text rendering onto pixel buffers.
//!
//! Labels are always drawn on a task's private copy of an overlay or
//! onto the finished section canvas, never on a shared asset. The
//! [`LabelRenderer`] trait keeps font handling swappable: the CLI uses
//! [`GlyphLabelRenderer`] with a TrueType font, deployments without a
//! font fall back to [`NoLabelRenderer`], and tests stamp sentinel
//! pixels through their own implementations.

use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};
use thiserror::Error;

/// Errors from font loading or glyph rasterization.
#[derive(Debug, Error)]
pub enum LabelError {
    /// The provided bytes are not a parseable font.
    #[error("invalid font data: {0}")]
    InvalidFont(String),

    /// Rasterizing the text failed.
    #[error("label rendering failed: {0}")]
    Render(String),
}

/// Appearance of one label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelStyle {
    /// Pixel scale of the text.
    pub scale: f32,
    /// RGBA text color.
    pub color: [u8; 4],
    /// Top edge of the text, in pixels from the canvas top.
    pub y: i64,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            scale: 15.0,
            color: [199, 89, 40, 255],
            y: 18,
        }
    }
}

/// Renders text horizontally centered onto a canvas.
pub trait LabelRenderer: Send + Sync {
    /// Pixel size `(width, height)` the text will occupy at this style.
    fn measure(&self, text: &str, style: &LabelStyle) -> (u32, u32);

    /// Draws `text` centered across the canvas width, top edge at
    /// `style.y`.
    fn draw_label(
        &self,
        canvas: &mut RgbaImage,
        text: &str,
        style: &LabelStyle,
    ) -> Result<(), LabelError>;
}

/// Renderer that draws nothing.
///
/// Used when no font is configured; composition still succeeds, the
/// diagram just carries no text.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLabelRenderer;

impl LabelRenderer for NoLabelRenderer {
    fn measure(&self, _text: &str, _style: &LabelStyle) -> (u32, u32) {
        (0, 0)
    }

    fn draw_label(
        &self,
        _canvas: &mut RgbaImage,
        _text: &str,
        _style: &LabelStyle,
    ) -> Result<(), LabelError> {
        Ok(())
    }
}

/// TrueType-backed renderer.
#[derive(Debug)]
pub struct GlyphLabelRenderer {
    font: FontVec,
}

impl GlyphLabelRenderer {
    /// Parses a TrueType/OpenType font from raw bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, LabelError> {
        let font = FontVec::try_from_vec(bytes).map_err(|err| {
            LabelError::InvalidFont(err.to_string())
        })?;
        Ok(Self { font })
    }
}

impl LabelRenderer for GlyphLabelRenderer {
    fn measure(&self, text: &str, style: &LabelStyle) -> (u32, u32) {
        let scale = PxScale::from(style.scale);
        let (width, _) = text_size(scale, &self.font, text);
        // text_size reports glyph extents; line height reads better for
        // vertical centering.
        let height = self.font.as_scaled(scale).height().ceil() as u32;
        (width, height)
    }

    fn draw_label(
        &self,
        canvas: &mut RgbaImage,
        text: &str,
        style: &LabelStyle,
    ) -> Result<(), LabelError> {
        let scale = PxScale::from(style.scale);
        let (width, _) = text_size(scale, &self.font, text);
        let x = (i64::from(canvas.width()) - i64::from(width)) / 2;
        draw_text_mut(
            canvas,
            Rgba(style.color),
            x as i32,
            style.y as i32,
            scale,
            &self.font,
            text,
        );
        Ok(())
    }
}

impl LabelRenderer for Box<dyn LabelRenderer> {
    fn measure(&self, text: &str, style: &LabelStyle) -> (u32, u32) {
        (**self).measure(text, style)
    }

    fn draw_label(
        &self,
        canvas: &mut RgbaImage,
        text: &str,
        style: &LabelStyle,
    ) -> Result<(), LabelError> {
        (**self).draw_label(canvas, text, style)
    }
}
