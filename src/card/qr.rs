//! Profile QR codes as SVG path data.
//!
//! The code is emitted as one `<path>` in module units (one unit per module,
//! no quiet zone), so faces can place and scale it with a single transform
//! and it stays crisp at any raster scale.

use super::renderer::RenderError;
use qrcode::{Color, QrCode};
use std::fmt::Write;

/// Dark modules of a QR code, ready to drop into an SVG `d` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrModules {
    /// Modules per side.
    pub size: usize,
    /// Path data: one `M x y h1 v1 h-1 z` square per dark module.
    pub path: String,
}

/// Encode `data` into QR modules.
pub fn encode(data: &str) -> Result<QrModules, RenderError> {
    let code = QrCode::new(data.as_bytes()).map_err(|e| RenderError::Qr(e.to_string()))?;
    let size = code.width();
    let mut path = String::new();
    for (i, color) in code.to_colors().iter().enumerate() {
        if *color == Color::Dark {
            let (x, y) = (i % size, i / size);
            // Writing into a String cannot fail.
            let _ = write!(path, "M{x} {y}h1v1h-1z");
        }
    }
    Ok(QrModules { size, path })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_url_fits_small_version() {
        let qr = encode("https://tomoacademy.site/employee/emp-001").unwrap();
        // Version 3 (29 modules) holds this URL at the default EC level.
        assert!(qr.size >= 21 && qr.size <= 33, "size {}", qr.size);
        assert!(qr.path.starts_with("M0 0h1v1h-1z"), "finder pattern corner");
    }

    #[test]
    fn encoding_is_deterministic() {
        assert_eq!(encode("abc").unwrap(), encode("abc").unwrap());
    }

    #[test]
    fn oversized_payload_is_an_error() {
        let data = "x".repeat(5000);
        assert!(matches!(encode(&data), Err(RenderError::Qr(_))));
    }
}
