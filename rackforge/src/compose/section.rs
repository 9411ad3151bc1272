//! Section composition.
//!
//! One section is a base image plus overlays. The base load and every
//! overlay preparation run concurrently; pasting mutates the base
//! canvas in place, so each paste waits on the section's base-ready
//! gate. Overlays paste in whatever order their own loads finish.
//! Banner passes run strictly after all overlay pastes.

use std::sync::Arc;

use futures::future::{try_join_all, BoxFuture};
use image::{imageops, Rgba, RgbaImage};
use tokio::sync::Mutex;
use tracing::{debug, trace};

use crate::asset::{AssetLoader, AssetSource};
use crate::label::{LabelRenderer, LabelStyle};

use super::error::ComposeError;
use super::gate::Gate;
use super::spec::{BannerSpec, Point, Rotation, SectionSpec};

/// Composes one section spec into a finished image.
///
/// Cheap to clone; clones share the loader registry and renderer.
pub struct SectionComposer<S: AssetSource, L: LabelRenderer> {
    loader: AssetLoader<S>,
    labels: Arc<L>,
}

impl<S: AssetSource, L: LabelRenderer> Clone for SectionComposer<S, L> {
    fn clone(&self) -> Self {
        Self {
            loader: self.loader.clone(),
            labels: Arc::clone(&self.labels),
        }
    }
}

impl<S: AssetSource, L: LabelRenderer + 'static> SectionComposer<S, L> {
    pub fn new(loader: AssetLoader<S>, labels: Arc<L>) -> Self {
        Self { loader, labels }
    }

    /// Handle to the shared asset loader.
    pub fn loader(&self) -> &AssetLoader<S> {
        &self.loader
    }

    /// Builds the section image.
    ///
    /// Any overlay or base failure fails the whole section; no partial
    /// section is ever emitted.
    pub async fn compose(&self, spec: &SectionSpec) -> Result<RgbaImage, ComposeError> {
        let canvas: Arc<Mutex<Option<RgbaImage>>> = Arc::new(Mutex::new(None));
        let gate = Arc::new(Gate::new());

        let mut stages: Vec<BoxFuture<'static, Result<(), ComposeError>>> =
            Vec::with_capacity(spec.overlays.len() + 1);

        {
            let loader = self.loader.clone();
            let canvas = Arc::clone(&canvas);
            let gate = Arc::clone(&gate);
            let base_key = spec.base.clone();
            stages.push(Box::pin(async move {
                let base = loader.acquire(&base_key).await?;
                trace!(base = %base_key, "section base landed");
                *canvas.lock().await = Some(base);
                gate.open();
                Ok(())
            }));
        }

        for overlay in &spec.overlays {
            let loader = self.loader.clone();
            let labels = Arc::clone(&self.labels);
            let canvas = Arc::clone(&canvas);
            let waiter = gate.waiter();
            let overlay = overlay.clone();
            let base_key = spec.base.clone();
            stages.push(Box::pin(async move {
                let mut image = loader.acquire(&overlay.asset).await?;
                image = match overlay.rotation {
                    Rotation::None => image,
                    Rotation::Quarter => imageops::rotate90(&image),
                    Rotation::ThreeQuarter => imageops::rotate270(&image),
                };
                if let Some(text) = &overlay.label {
                    // Drawn on this task's private copy; the shared
                    // original and the base stay untouched.
                    labels.draw_label(&mut image, text, &LabelStyle::default())?;
                }

                if !waiter.wait().await {
                    return Err(ComposeError::MissingBase { base: base_key });
                }
                let mut slot = canvas.lock().await;
                let base = slot.as_mut().ok_or_else(|| ComposeError::MissingBase {
                    base: base_key.clone(),
                })?;
                for position in &overlay.positions {
                    paste(base, &image, &overlay.asset, *position)?;
                }
                trace!(
                    asset = %overlay.asset,
                    positions = overlay.positions.len(),
                    "overlay pasted"
                );
                Ok(())
            }));
        }

        try_join_all(stages).await?;

        let mut canvas = match Arc::try_unwrap(canvas) {
            Ok(slot) => slot
                .into_inner()
                .ok_or_else(|| ComposeError::MissingBase {
                    base: spec.base.clone(),
                })?,
            Err(_) => {
                return Err(ComposeError::Task(
                    "canvas still shared after all stages joined".to_string(),
                ))
            }
        };

        for banner in &spec.banners {
            apply_banner(&mut canvas, banner, self.labels.as_ref())?;
        }

        debug!(
            base = %spec.base,
            overlays = spec.overlays.len(),
            banners = spec.banners.len(),
            width = canvas.width(),
            height = canvas.height(),
            "section composed"
        );
        Ok(canvas)
    }
}

/// Pastes `overlay` onto `base` at `at`, alpha-blending.
fn paste(
    base: &mut RgbaImage,
    overlay: &RgbaImage,
    asset: &str,
    at: Point,
) -> Result<(), ComposeError> {
    let fits = at.x >= 0
        && at.y >= 0
        && at.x + i64::from(overlay.width()) <= i64::from(base.width())
        && at.y + i64::from(overlay.height()) <= i64::from(base.height());
    if !fits {
        return Err(ComposeError::OutOfBounds {
            element: asset.to_string(),
            x: at.x,
            y: at.y,
            width: overlay.width(),
            height: overlay.height(),
            base_width: base.width(),
            base_height: base.height(),
        });
    }
    imageops::overlay(base, overlay, at.x, at.y);
    Ok(())
}

/// Composites a translucent labelled panel over the canvas.
fn apply_banner<L: LabelRenderer + ?Sized>(
    canvas: &mut RgbaImage,
    banner: &BannerSpec,
    labels: &L,
) -> Result<(), ComposeError> {
    let region = banner.region;
    let fits = region.x >= 0
        && region.y >= 0
        && region.x + i64::from(region.width) <= i64::from(canvas.width())
        && region.y + i64::from(region.height) <= i64::from(canvas.height());
    if !fits {
        return Err(ComposeError::OutOfBounds {
            element: format!("banner {:?}", banner.text),
            x: region.x,
            y: region.y,
            width: region.width,
            height: region.height,
            base_width: canvas.width(),
            base_height: canvas.height(),
        });
    }

    let probe = LabelStyle {
        scale: banner.text_scale,
        color: banner.text_color,
        y: 0,
    };
    let (_, text_height) = labels.measure(&banner.text, &probe);
    let style = LabelStyle {
        y: i64::from(region.height.saturating_sub(text_height)) / 2,
        ..probe
    };

    let mut panel = RgbaImage::from_pixel(region.width, region.height, Rgba(banner.fill));
    labels.draw_label(&mut panel, &banner.text, &style)?;
    imageops::overlay(canvas, &panel, region.x, region.y);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetError;
    use crate::compose::spec::{OverlaySpec, Region};
    use crate::label::LabelError;
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::time::Duration;

    const SENTINEL: Rgba<u8> = Rgba([1, 2, 3, 255]);

    /// Source with per-key artificial latency.
    struct SlowSource {
        assets: HashMap<String, Vec<u8>>,
        delays: HashMap<String, Duration>,
    }

    impl AssetSource for SlowSource {
        fn load(&self, key: &str) -> Result<Vec<u8>, AssetError> {
            if let Some(delay) = self.delays.get(key) {
                std::thread::sleep(*delay);
            }
            self.assets
                .get(key)
                .cloned()
                .ok_or_else(|| AssetError::NotFound {
                    key: key.to_string(),
                })
        }
    }

    /// Renderer that stamps a sentinel pixel at (0, style.y).
    struct MarkerRenderer;

    impl LabelRenderer for MarkerRenderer {
        fn measure(&self, _text: &str, _style: &LabelStyle) -> (u32, u32) {
            (1, 1)
        }

        fn draw_label(
            &self,
            canvas: &mut RgbaImage,
            _text: &str,
            style: &LabelStyle,
        ) -> Result<(), LabelError> {
            let y = (style.y.max(0) as u32).min(canvas.height() - 1);
            canvas.put_pixel(0, y, SENTINEL);
            Ok(())
        }
    }

    fn png_bytes(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
        let image = RgbaImage::from_pixel(width, height, Rgba(rgba));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn composer(
        assets: Vec<(&str, Vec<u8>)>,
        delays: Vec<(&str, Duration)>,
    ) -> SectionComposer<SlowSource, MarkerRenderer> {
        let source = SlowSource {
            assets: assets
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            delays: delays
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        };
        SectionComposer::new(AssetLoader::new(source), Arc::new(MarkerRenderer))
    }

    fn overlay_at(asset: &str, positions: Vec<Point>) -> OverlaySpec {
        OverlaySpec {
            asset: asset.to_string(),
            label: None,
            rotation: Rotation::None,
            positions,
        }
    }

    #[tokio::test]
    async fn overlays_land_on_the_base() {
        let composer = composer(
            vec![
                ("base", png_bytes(10, 10, [0, 0, 255, 255])),
                ("module", png_bytes(2, 2, [255, 0, 0, 255])),
            ],
            vec![],
        );
        let spec = SectionSpec {
            base: "base".to_string(),
            overlays: vec![overlay_at("module", vec![Point::new(3, 3), Point::new(7, 7)])],
            banners: vec![],
        };

        let image = composer.compose(&spec).await.unwrap();
        assert_eq!(image.get_pixel(0, 0), &Rgba([0, 0, 255, 255]));
        assert_eq!(image.get_pixel(3, 3), &Rgba([255, 0, 0, 255]));
        assert_eq!(image.get_pixel(8, 8), &Rgba([255, 0, 0, 255]));
    }

    #[tokio::test]
    async fn slow_base_still_lands_before_pastes() {
        // Overlay loads finish long before the base; the gate must hold
        // the pastes back until the base is on the canvas.
        let composer = composer(
            vec![
                ("base", png_bytes(10, 10, [0, 0, 255, 255])),
                ("module", png_bytes(2, 2, [255, 0, 0, 255])),
            ],
            vec![("base", Duration::from_millis(40))],
        );
        let spec = SectionSpec {
            base: "base".to_string(),
            overlays: vec![overlay_at("module", vec![Point::new(0, 0)])],
            banners: vec![],
        };

        let image = composer.compose(&spec).await.unwrap();
        assert_eq!(image.get_pixel(0, 0), &Rgba([255, 0, 0, 255]));
        assert_eq!(image.get_pixel(5, 5), &Rgba([0, 0, 255, 255]));
    }

    #[tokio::test]
    async fn label_is_drawn_on_the_private_copy_only() {
        let composer = composer(
            vec![
                ("base", png_bytes(10, 10, [0, 0, 255, 255])),
                ("module", png_bytes(4, 4, [255, 0, 0, 255])),
            ],
            vec![],
        );
        let spec = SectionSpec {
            base: "base".to_string(),
            overlays: vec![OverlaySpec {
                asset: "module".to_string(),
                label: Some("1.9TB".to_string()),
                rotation: Rotation::None,
                positions: vec![Point::new(2, 2)],
            }],
            banners: vec![],
        };

        let image = composer.compose(&spec).await.unwrap();
        // Marker lands at overlay-local (0, 3) (clamped), pasted at (2, 2).
        assert_eq!(image.get_pixel(2, 5), &SENTINEL);

        // The shared original must be clean: acquire it again and check.
        let module = composer.loader().acquire("module").await.unwrap();
        for pixel in module.pixels() {
            assert_ne!(pixel, &SENTINEL);
        }
    }

    #[tokio::test]
    async fn missing_overlay_fails_the_section() {
        let composer = composer(vec![("base", png_bytes(10, 10, [0, 0, 255, 255]))], vec![]);
        let spec = SectionSpec {
            base: "base".to_string(),
            overlays: vec![overlay_at("ghost", vec![Point::new(0, 0)])],
            banners: vec![],
        };

        let err = composer.compose(&spec).await.unwrap_err();
        match err {
            ComposeError::Asset(asset) => assert_eq!(asset.key(), "ghost"),
            other => panic!("expected asset error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn out_of_bounds_paste_is_rejected() {
        let composer = composer(
            vec![
                ("base", png_bytes(4, 4, [0, 0, 255, 255])),
                ("module", png_bytes(2, 2, [255, 0, 0, 255])),
            ],
            vec![],
        );
        let spec = SectionSpec {
            base: "base".to_string(),
            overlays: vec![overlay_at("module", vec![Point::new(3, 3)])],
            banners: vec![],
        };

        let err = composer.compose(&spec).await.unwrap_err();
        assert!(matches!(err, ComposeError::OutOfBounds { .. }));
    }

    #[tokio::test]
    async fn rotation_swaps_dimensions() {
        let composer = composer(
            vec![
                ("base", png_bytes(10, 10, [0, 0, 255, 255])),
                ("tall", {
                    // 1x3 overlay with a distinct top pixel.
                    let mut img = RgbaImage::from_pixel(1, 3, Rgba([255, 0, 0, 255]));
                    img.put_pixel(0, 0, Rgba([0, 255, 0, 255]));
                    let mut bytes = Vec::new();
                    img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
                        .unwrap();
                    bytes
                }),
            ],
            vec![],
        );
        let spec = SectionSpec {
            base: "base".to_string(),
            overlays: vec![OverlaySpec {
                asset: "tall".to_string(),
                label: None,
                rotation: Rotation::Quarter,
                positions: vec![Point::new(0, 0)],
            }],
            banners: vec![],
        };

        let image = composer.compose(&spec).await.unwrap();
        // rotate90 turns 1x3 into 3x1; the former top pixel ends up at
        // the right edge of the pasted strip.
        assert_eq!(image.get_pixel(2, 0), &Rgba([0, 255, 0, 255]));
        assert_eq!(image.get_pixel(0, 0), &Rgba([255, 0, 0, 255]));
    }

    #[tokio::test]
    async fn banners_apply_after_overlays() {
        let composer = composer(
            vec![
                ("base", png_bytes(20, 20, [0, 0, 255, 255])),
                ("module", png_bytes(2, 2, [255, 0, 0, 255])),
            ],
            vec![],
        );
        let spec = SectionSpec {
            base: "base".to_string(),
            overlays: vec![overlay_at("module", vec![Point::new(0, 0)])],
            banners: vec![BannerSpec {
                text: "45TB".to_string(),
                region: Region {
                    x: 0,
                    y: 0,
                    width: 10,
                    height: 10,
                },
                fill: [10, 20, 30, 255],
                text_color: [255, 255, 255, 255],
                text_scale: 8.0,
            }],
        };

        let image = composer.compose(&spec).await.unwrap();
        // Opaque banner fill covers the pasted overlay inside its region.
        assert_eq!(image.get_pixel(1, 1), &Rgba([10, 20, 30, 255]));
        // Marker from the banner label sits inside the region.
        assert_eq!(image.get_pixel(0, 4), &SENTINEL);
        // Outside the region the base is untouched.
        assert_eq!(image.get_pixel(15, 15), &Rgba([0, 0, 255, 255]));
    }

    #[tokio::test]
    async fn oversized_banner_is_rejected() {
        let composer = composer(vec![("base", png_bytes(8, 8, [0, 0, 255, 255]))], vec![]);
        let spec = SectionSpec {
            base: "base".to_string(),
            overlays: vec![],
            banners: vec![BannerSpec {
                text: "big".to_string(),
                region: Region {
                    x: 4,
                    y: 4,
                    width: 8,
                    height: 8,
                },
                fill: [0, 0, 0, 127],
                text_color: [255, 255, 255, 255],
                text_scale: 8.0,
            }],
        };

        let err = composer.compose(&spec).await.unwrap_err();
        assert!(matches!(err, ComposeError::OutOfBounds { .. }));
    }
}
