//! Face rasterization trait and shared error type.
//!
//! The [`FaceRenderer`] trait turns a staged [`FaceMarkup`] into an opaque
//! [`RenderedFace`] of the canvas' pixel size. The production implementation
//! is [`ResvgRenderer`](super::resvg_backend::ResvgRenderer); tests swap in
//! the recording mock from this module.

use super::face::{FaceMarkup, RenderedFace, Side};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Template error: {0}")]
    Template(String),
    #[error("Photo {path}: {reason}")]
    Photo { path: String, reason: String },
    #[error("QR encoding failed: {0}")]
    Qr(String),
    #[error("SVG parse failed: {0}")]
    Svg(String),
    #[error("Rasterization failed: {0}")]
    Raster(String),
    #[error("PNG encode failed: {0}")]
    Encode(String),
    #[error("{side} face render exceeded {limit:?}")]
    Timeout { side: Side, limit: Duration },
}

/// Trait for face rasterization backends.
///
/// Implementations must be shareable across threads: the pipeline runs each
/// call on a helper thread so it can bound it with a timeout.
pub trait FaceRenderer: Send + Sync {
    /// Rasterize one staged face onto an opaque canvas.
    fn rasterize(&self, face: &FaceMarkup) -> Result<RenderedFace, RenderError>;
}
