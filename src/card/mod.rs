//! Card face staging and rasterization.
//!
//! Turns one side of a roster record into a fixed-size opaque raster. Faces
//! are staged as self-contained SVG (built-in design or user template) and
//! rasterized by a [`FaceRenderer`] backend.
//!
//! ## Architecture
//!
//! - **`face`**: shared types: [`Side`], [`CardCanvas`], [`FaceMarkup`], [`RenderedFace`]
//! - **`geometry`**: pure page/canvas math (fill scaling, aspect checks)
//! - **`stage`**: [`FaceLocator`] trait and the production [`Staging`] locator
//! - **`design`**: built-in front/back designs, written with Maud
//! - **`template`**: `{placeholder}` filling for user SVG templates
//! - **`qr`**: profile QR code as SVG path data
//! - **`renderer`**: [`FaceRenderer`] trait and [`RenderError`]
//! - **`resvg_backend`**: production rasterizer using `resvg`
//!
//! The locator and renderer are separate seams so tests can stage real
//! markup and skip rasterization, or drive the pipeline with mock faces.

mod design;
mod face;
pub mod geometry;
mod qr;
mod renderer;
mod resvg_backend;
mod stage;
mod template;

pub use design::CardFields;
pub use face::{CardCanvas, FaceMarkup, RenderedFace, Side, parse_hex_color};
pub use qr::QrModules;
pub use renderer::{FaceRenderer, RenderError};
pub use resvg_backend::ResvgRenderer;
pub use stage::{FaceLocator, Staging};

#[cfg(test)]
pub(crate) use renderer::tests::MockRenderer;
