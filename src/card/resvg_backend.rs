//! Pure Rust face rasterizer built on `resvg`.
//!
//! ## Crate mapping
//!
//! | Step | Crate / function |
//! |---|---|
//! | Parse staged SVG | `usvg::Tree::from_str` (fonts from `fontdb`, loaded once) |
//! | Opaque canvas | `tiny_skia::Pixmap::fill` with the configured background |
//! | Draw | `resvg::render`, scaled from logical units to pixels |
//! | Hand-off | premultiplied RGBA → `image::RgbImage` |
//!
//! Text that names a font missing on the host falls back to whatever
//! `fontdb` resolves; on a host with no fonts at all text is skipped but the
//! rest of the face still renders.

use super::face::{CardCanvas, FaceMarkup, RenderedFace};
use super::renderer::{FaceRenderer, RenderError};
use image::RgbImage;
use resvg::{tiny_skia, usvg};

/// `resvg` backend. Holds the parsed font database so every face reuses it.
pub struct ResvgRenderer {
    canvas: CardCanvas,
    options: usvg::Options<'static>,
}

impl ResvgRenderer {
    /// Build a renderer for `canvas`, loading system fonts once.
    pub fn new(canvas: CardCanvas) -> Self {
        let mut options = usvg::Options::default();
        options.fontdb_mut().load_system_fonts();
        tracing::debug!(
            faces = options.fontdb.len(),
            "loaded system fonts for card rendering"
        );
        Self { canvas, options }
    }

    pub fn canvas(&self) -> CardCanvas {
        self.canvas
    }
}

impl FaceRenderer for ResvgRenderer {
    fn rasterize(&self, face: &FaceMarkup) -> Result<RenderedFace, RenderError> {
        let tree = usvg::Tree::from_str(&face.svg, &self.options)
            .map_err(|e| RenderError::Svg(e.to_string()))?;

        let (width, height) = self.canvas.pixel_size();
        let mut pixmap = tiny_skia::Pixmap::new(width, height).ok_or_else(|| {
            RenderError::Raster(format!("cannot allocate {width}x{height} canvas"))
        })?;
        let [r, g, b] = self.canvas.background;
        pixmap.fill(tiny_skia::Color::from_rgba8(r, g, b, 255));

        // Map the face's own coordinate space onto the pixel grid, so a
        // template authored at any size still fills the canvas exactly.
        let size = tree.size();
        let transform = tiny_skia::Transform::from_scale(
            width as f32 / size.width(),
            height as f32 / size.height(),
        );
        resvg::render(&tree, transform, &mut pixmap.as_mut());

        // The background is opaque, so premultiplied RGBA equals straight RGB.
        let rgb: Vec<u8> = pixmap
            .data()
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect();
        let image = RgbImage::from_raw(width, height, rgb).ok_or_else(|| {
            RenderError::Raster("pixel buffer does not match canvas size".to_string())
        })?;

        Ok(RenderedFace {
            record_id: face.record_id.clone(),
            side: face.side,
            image,
        })
    }
}
