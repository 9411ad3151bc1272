//! Geometric description of one diagram request.
//!
//! These are plain configuration values handed over by the layout
//! collaborator. The engine executes them as given; it does not know or
//! validate which hardware family the pixels belong to.

use serde::{Deserialize, Serialize};

/// Pixel position on a section canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned pixel rectangle on a section canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

/// Quarter-turn applied to an overlay before pasting.
///
/// Vertical module slots take the same icon as horizontal ones, turned
/// on its side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rotation {
    #[default]
    None,
    /// 90 degrees clockwise.
    Quarter,
    /// 270 degrees clockwise.
    ThreeQuarter,
}

/// One overlay asset pasted at one or more positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlaySpec {
    /// Asset key of the overlay image.
    pub asset: String,
    /// Optional label drawn on the overlay's private copy before pasting.
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub rotation: Rotation,
    /// Every position this overlay is pasted at.
    pub positions: Vec<Point>,
}

/// Translucent labelled box composited over the finished section.
///
/// Banners apply strictly after every overlay paste, in listed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BannerSpec {
    pub text: String,
    pub region: Region,
    /// RGBA fill of the box; the alpha channel makes it translucent.
    #[serde(default = "default_banner_fill")]
    pub fill: [u8; 4],
    #[serde(default = "default_banner_text_color")]
    pub text_color: [u8; 4],
    #[serde(default = "default_banner_text_scale")]
    pub text_scale: f32,
}

fn default_banner_fill() -> [u8; 4] {
    [199, 89, 40, 127]
}

fn default_banner_text_color() -> [u8; 4] {
    [255, 255, 255, 220]
}

fn default_banner_text_scale() -> f32 {
    85.0
}

/// One logical layer of the diagram: a base image plus its overlays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionSpec {
    /// Asset key of the base image the section is built on.
    pub base: String,
    #[serde(default)]
    pub overlays: Vec<OverlaySpec>,
    #[serde(default)]
    pub banners: Vec<BannerSpec>,
}

impl SectionSpec {
    /// A section consisting of just its base image.
    pub fn bare(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            overlays: Vec::new(),
            banners: Vec::new(),
        }
    }
}

/// Order sections are stacked into the final canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackDirection {
    /// First section at the top of the canvas.
    Down,
    /// First section at the bottom (rack-style, the default).
    #[default]
    Up,
}

/// The top-level request: ordered sections plus stacking direction.
///
/// Immutable once constructed; also the input to cache-key derivation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramRequest {
    pub sections: Vec<SectionSpec>,
    #[serde(default)]
    pub direction: StackDirection,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_json_round_trip() {
        let request = DiagramRequest {
            sections: vec![SectionSpec {
                base: "png/shelf_front.png".to_string(),
                overlays: vec![OverlaySpec {
                    asset: "png/module.png".to_string(),
                    label: Some("1.9TB".to_string()),
                    rotation: Rotation::Quarter,
                    positions: vec![Point::new(10, 20), Point::new(115, 20)],
                }],
                banners: vec![BannerSpec {
                    text: "45TB".to_string(),
                    region: Region {
                        x: 0,
                        y: 0,
                        width: 100,
                        height: 50,
                    },
                    fill: default_banner_fill(),
                    text_color: default_banner_text_color(),
                    text_scale: 85.0,
                }],
            }],
            direction: StackDirection::Down,
        };

        let json = serde_json::to_string(&request).unwrap();
        let parsed: DiagramRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, request);
    }

    #[test]
    fn sparse_json_fills_defaults() {
        let json = r#"{"sections": [{"base": "png/face.png"}]}"#;
        let request: DiagramRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.direction, StackDirection::Up);
        assert!(request.sections[0].overlays.is_empty());
        assert!(request.sections[0].banners.is_empty());
    }
}
