//! Pure geometry for card faces and printed pages.
//!
//! All functions here are pure and testable without any I/O or images.

/// Millimeters per inch.
const MM_PER_INCH: f32 = 25.4;

/// ISO/IEC 7810 ID-1 card width in millimeters.
pub const ID1_WIDTH_MM: f32 = 85.6;

/// ISO/IEC 7810 ID-1 card height in millimeters.
pub const ID1_HEIGHT_MM: f32 = 53.98;

/// Natural printed length of `px` pixels at `dpi`.
pub fn natural_length_mm(px: u32, dpi: f32) -> f32 {
    px as f32 / dpi * MM_PER_INCH
}

/// Scale factor that stretches `px` pixels at `dpi` to exactly `target_mm`.
///
/// Applied independently per axis, so an image always fills its page with no
/// margin and no cropping.
///
/// # Examples
/// ```
/// # use idcard_export::card::geometry::fill_scale;
/// // 300 px at 300 dpi is one inch; stretching to two inches doubles it.
/// assert!((fill_scale(300, 300.0, 50.8) - 2.0).abs() < 1e-5);
/// ```
pub fn fill_scale(px: u32, dpi: f32, target_mm: f32) -> f32 {
    target_mm / natural_length_mm(px, dpi)
}

/// Relative difference between two aspect ratios (`w / h`).
///
/// Used to check that the card canvas matches the printed page closely
/// enough that filling the page does not visibly distort the face.
pub fn aspect_mismatch(canvas: (f32, f32), page: (f32, f32)) -> f32 {
    let canvas_ratio = canvas.0 / canvas.1;
    let page_ratio = page.0 / page.1;
    ((canvas_ratio - page_ratio) / page_ratio).abs()
}

/// Whether a `width x height` page is landscape (strictly wider than tall).
pub fn is_landscape(width: f32, height: f32) -> bool {
    width > height
}
