//! Face types shared by staging, rendering, and composition.

use image::{ImageFormat, RgbImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;

use super::renderer::RenderError;

/// One visual side of an ID card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Front,
    Back,
}

impl Side {
    /// Both sides in export order.
    pub const BOTH: [Side; 2] = [Side::Front, Side::Back];

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Front => "front",
            Side::Back => "back",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Drawing surface every face is rendered onto.
///
/// Faces are authored in logical units (`width` x `height`) and rasterized at
/// `scale` pixels per unit onto an opaque `background`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardCanvas {
    pub width: u32,
    pub height: u32,
    pub scale: u32,
    pub background: [u8; 3],
}

impl CardCanvas {
    /// Physical raster size: `(width * scale, height * scale)`.
    ///
    /// Saturates instead of overflowing; config validation keeps real
    /// canvases far below that.
    pub fn pixel_size(&self) -> (u32, u32) {
        (
            self.width.saturating_mul(self.scale),
            self.height.saturating_mul(self.scale),
        )
    }
}

impl Default for CardCanvas {
    fn default() -> Self {
        Self {
            width: 320,
            height: 200,
            scale: 3,
            background: [255, 255, 255],
        }
    }
}

/// A staged, detached description of one face.
///
/// Self-contained SVG: photos and codes are embedded by value, so the
/// rasterizer never reaches out to the filesystem or network.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceMarkup {
    pub record_id: String,
    pub side: Side,
    pub svg: String,
}

/// An opaque raster of one face.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedFace {
    pub record_id: String,
    pub side: Side,
    pub image: RgbImage,
}

impl RenderedFace {
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Encode as PNG. Output is byte-stable for identical pixels.
    pub fn to_png(&self) -> Result<Vec<u8>, RenderError> {
        let mut buf = Vec::new();
        self.image
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .map_err(|e| RenderError::Encode(e.to_string()))?;
        Ok(buf)
    }
}

/// Parse a `#rrggbb` color.
pub fn parse_hex_color(value: &str) -> Option<[u8; 3]> {
    let hex = value.strip_prefix('#')?;
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}
