//! Printable card documents.
//!
//! A card document is a PDF with exactly two landscape pages of the physical
//! card size, front first. Each raster is placed at the page origin and
//! stretched independently per axis so it fills the page with no margin:
//!
//! ```text
//! 960 x 600 px  @ 300 dpi  →  81.28 x 50.80 mm natural
//!               scale_x = 85.6  / 81.28 ≈ 1.053
//!               scale_y = 53.98 / 50.80 ≈ 1.063
//! ```
//!
//! The same page builder ([`PdfBook`]) also assembles the combined sheet of
//! every card, one front/back page pair per record.

use crate::card::geometry;
use crate::card::{RenderedFace, Side};
use crate::config::DocumentConfig;
use printpdf::{
    ColorBits, ColorSpace, Image, ImageTransform, ImageXObject, Mm, PdfDocument,
    PdfDocumentReference, Px,
};
use thiserror::Error;

/// Raster density the page scale is computed against.
pub const DEFAULT_DPI: f32 = 300.0;

#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("PDF error: {0}")]
    Pdf(String),
    #[error("expected {expected} face, got {found}")]
    PageOrder { expected: Side, found: Side },
    #[error("document has no pages")]
    Empty,
}

/// Physical page size in millimeters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width_mm: f32,
    pub height_mm: f32,
}

impl Default for PageSize {
    fn default() -> Self {
        Self {
            width_mm: geometry::ID1_WIDTH_MM,
            height_mm: geometry::ID1_HEIGHT_MM,
        }
    }
}

impl From<&DocumentConfig> for PageSize {
    fn from(config: &DocumentConfig) -> Self {
        Self {
            width_mm: config.width_mm,
            height_mm: config.height_mm,
        }
    }
}

/// How one face was placed on its page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PagePlacement {
    pub side: Side,
    pub width_mm: f32,
    pub height_mm: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub dpi: f32,
}

impl PagePlacement {
    fn fill(side: Side, (px_w, px_h): (u32, u32), page: PageSize, dpi: f32) -> Self {
        Self {
            side,
            width_mm: page.width_mm,
            height_mm: page.height_mm,
            scale_x: geometry::fill_scale(px_w, dpi, page.width_mm),
            scale_y: geometry::fill_scale(px_h, dpi, page.height_mm),
            dpi,
        }
    }

    /// Printed size of the placed image; equals the page size.
    pub fn placed_size_mm(&self, (px_w, px_h): (u32, u32)) -> (f32, f32) {
        (
            geometry::natural_length_mm(px_w, self.dpi) * self.scale_x,
            geometry::natural_length_mm(px_h, self.dpi) * self.scale_y,
        )
    }
}

/// Encoded PDF plus the placements it was built from.
#[derive(Debug, Clone)]
pub struct ExportDocument {
    pub bytes: Vec<u8>,
    pub pages: Vec<PagePlacement>,
}

/// Composes two rendered faces into one printable document.
pub trait DocumentComposer {
    fn compose(
        &self,
        front: &RenderedFace,
        back: &RenderedFace,
    ) -> Result<ExportDocument, ComposeError>;
}

/// Incremental PDF builder: one full-bleed page per added face.
pub struct PdfBook {
    doc: PdfDocumentReference,
    page: PageSize,
    dpi: f32,
    pages: Vec<PagePlacement>,
}

impl PdfBook {
    pub fn new(title: &str, page: PageSize, dpi: f32) -> Self {
        Self {
            doc: PdfDocument::empty(title),
            page,
            dpi,
            pages: Vec::new(),
        }
    }

    /// Append a page showing `face`, stretched to fill it.
    pub fn add_face(&mut self, face: &RenderedFace) -> PagePlacement {
        let (width, height) = face.dimensions();
        let placement = PagePlacement::fill(face.side, (width, height), self.page, self.dpi);

        let (page_index, layer_index) = self.doc.add_page(
            Mm(self.page.width_mm),
            Mm(self.page.height_mm),
            format!("{} {}", face.record_id, face.side),
        );
        let layer = self.doc.get_page(page_index).get_layer(layer_index);

        let image = Image::from(ImageXObject {
            width: Px(width as usize),
            height: Px(height as usize),
            color_space: ColorSpace::Rgb,
            bits_per_component: ColorBits::Bit8,
            interpolate: true,
            image_data: face.image.as_raw().clone(),
            image_filter: None,
            clipping_bbox: None,
            smask: None,
        });
        image.add_to_layer(
            layer,
            ImageTransform {
                translate_x: Some(Mm(0.0)),
                translate_y: Some(Mm(0.0)),
                scale_x: Some(placement.scale_x),
                scale_y: Some(placement.scale_y),
                dpi: Some(placement.dpi),
                ..Default::default()
            },
        );

        self.pages.push(placement);
        placement
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn finish(self) -> Result<ExportDocument, ComposeError> {
        if self.pages.is_empty() {
            return Err(ComposeError::Empty);
        }
        let bytes = self
            .doc
            .save_to_bytes()
            .map_err(|e| ComposeError::Pdf(e.to_string()))?;
        Ok(ExportDocument {
            bytes,
            pages: self.pages,
        })
    }
}

/// Production composer using `printpdf`.
#[derive(Debug, Clone, Copy)]
pub struct PdfComposer {
    page: PageSize,
    dpi: f32,
}

impl PdfComposer {
    pub fn new(page: PageSize) -> Self {
        Self {
            page,
            dpi: DEFAULT_DPI,
        }
    }

    /// Empty builder with this composer's page size, for multi-card sheets.
    pub fn book(&self, title: &str) -> PdfBook {
        PdfBook::new(title, self.page, self.dpi)
    }
}

impl Default for PdfComposer {
    fn default() -> Self {
        Self::new(PageSize::default())
    }
}

impl DocumentComposer for PdfComposer {
    fn compose(
        &self,
        front: &RenderedFace,
        back: &RenderedFace,
    ) -> Result<ExportDocument, ComposeError> {
        for (face, expected) in [(front, Side::Front), (back, Side::Back)] {
            if face.side != expected {
                return Err(ComposeError::PageOrder {
                    expected,
                    found: face.side,
                });
            }
        }

        let mut book = self.book(&format!("{} ID Card", front.record_id));
        book.add_face(front);
        book.add_face(back);
        book.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::face;
    use printpdf::lopdf;

    /// ID-1 in PDF points.
    const ID1_PT: (f32, f32) = (242.6457, 153.0142);

    /// Read the written PDF back: per page, in page order, the MediaBox
    /// size in points and the pixel width of the image placed on it.
    fn written_pages(bytes: &[u8]) -> Vec<((f32, f32), i64)> {
        let pdf = lopdf::Document::load_mem(bytes).unwrap();
        pdf.get_pages()
            .values()
            .map(|&page_id| {
                let page = pdf.get_dictionary(page_id).unwrap();
                let media: Vec<f32> = page
                    .get(b"MediaBox")
                    .and_then(lopdf::Object::as_array)
                    .unwrap()
                    .iter()
                    .map(|v| v.as_float().unwrap())
                    .collect();
                let resources = page
                    .get(b"Resources")
                    .and_then(lopdf::Object::as_reference)
                    .and_then(|id| pdf.get_dictionary(id))
                    .unwrap();
                let xobjects = resources
                    .get(b"XObject")
                    .and_then(lopdf::Object::as_dict)
                    .unwrap();
                let (_, image) = xobjects.iter().next().unwrap();
                let (_, image) = pdf.dereference(image).unwrap();
                let width = image
                    .as_stream()
                    .unwrap()
                    .dict
                    .get(b"Width")
                    .and_then(lopdf::Object::as_i64)
                    .unwrap();
                ((media[2] - media[0], media[3] - media[1]), width)
            })
            .collect()
    }

    fn assert_id1((w, h): (f32, f32)) {
        assert!((w - ID1_PT.0).abs() < 0.01, "page width {w}pt");
        assert!((h - ID1_PT.1).abs() < 0.01, "page height {h}pt");
    }

    #[test]
    fn compose_produces_two_full_bleed_pages_front_first() {
        let doc = PdfComposer::default()
            .compose(&face("a", Side::Front, 960, 600), &face("a", Side::Back, 960, 600))
            .unwrap();

        assert!(doc.bytes.starts_with(b"%PDF"));
        assert_eq!(doc.pages.len(), 2);
        assert_eq!(doc.pages[0].side, Side::Front);
        assert_eq!(doc.pages[1].side, Side::Back);
        for page in &doc.pages {
            assert_eq!((page.width_mm, page.height_mm), (85.6, 53.98));
            let (w, h) = page.placed_size_mm((960, 600));
            assert!((w - 85.6).abs() < 1e-3, "width {w}");
            assert!((h - 53.98).abs() < 1e-3, "height {h}");
        }
    }

    #[test]
    fn written_pdf_has_two_id1_pages_front_first() {
        // Different raster widths tell the two pages apart in the file.
        let doc = PdfComposer::default()
            .compose(&face("a", Side::Front, 16, 10), &face("a", Side::Back, 8, 5))
            .unwrap();

        let pages = written_pages(&doc.bytes);
        assert_eq!(pages.len(), 2);
        assert_id1(pages[0].0);
        assert_id1(pages[1].0);
        assert_eq!(pages[0].1, 16, "front must be page 1");
        assert_eq!(pages[1].1, 8, "back must be page 2");
    }

    #[test]
    fn written_sheet_keeps_roster_order() {
        let mut book = PdfComposer::default().book("sheet");
        for (width, id) in [(8, "a"), (16, "b")] {
            book.add_face(&face(id, Side::Front, width, width * 5 / 8));
            book.add_face(&face(id, Side::Back, width, width * 5 / 8));
        }
        let doc = book.finish().unwrap();

        let widths: Vec<i64> = written_pages(&doc.bytes).iter().map(|p| p.1).collect();
        assert_eq!(widths, vec![8, 8, 16, 16]);
    }

    #[test]
    fn scale_is_computed_per_axis() {
        let doc = PdfComposer::default()
            .compose(&face("a", Side::Front, 960, 600), &face("a", Side::Back, 960, 600))
            .unwrap();
        let page = doc.pages[0];
        // 8:5 raster on a slightly taller page: y stretches a bit more than x.
        assert!(page.scale_y > page.scale_x);
    }

    #[test]
    fn compose_rejects_swapped_faces() {
        let err = PdfComposer::default()
            .compose(&face("a", Side::Back, 8, 5), &face("a", Side::Front, 8, 5))
            .unwrap_err();
        assert!(matches!(
            err,
            ComposeError::PageOrder {
                expected: Side::Front,
                found: Side::Back
            }
        ));
    }

    #[test]
    fn custom_page_size_is_used() {
        let composer = PdfComposer::new(PageSize {
            width_mm: 100.0,
            height_mm: 62.5,
        });
        let doc = composer
            .compose(&face("a", Side::Front, 8, 5), &face("a", Side::Back, 8, 5))
            .unwrap();
        let (w, h) = doc.pages[1].placed_size_mm((8, 5));
        assert!((w - 100.0).abs() < 1e-3);
        assert!((h - 62.5).abs() < 1e-3);
    }

    #[test]
    fn book_collects_many_pages() {
        let composer = PdfComposer::default();
        let mut book = composer.book("sheet");
        for id in ["a", "b", "c"] {
            book.add_face(&face(id, Side::Front, 8, 5));
            book.add_face(&face(id, Side::Back, 8, 5));
        }
        assert_eq!(book.page_count(), 6);
        let doc = book.finish().unwrap();
        assert_eq!(doc.pages.len(), 6);
    }

    #[test]
    fn empty_book_is_an_error() {
        let book = PdfComposer::default().book("nothing");
        assert!(matches!(book.finish(), Err(ComposeError::Empty)));
    }
}
