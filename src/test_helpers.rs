//! Shared test utilities for the exporter's unit tests.
//!
//! Provides record/face fixtures and recording mocks for the two seams the
//! pipeline is generic over (face lookup and document composition). Mocks
//! share a [`CallLog`] so a test can assert the exact interleaving of
//! render and compose calls across records.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let log = CallLog::default();
//! let pipeline = Pipeline::new(
//!     MockLocator::default(),
//!     MockRenderer::new(log.clone()),
//!     MockComposer::new(log.clone()),
//! );
//! pipeline.export_one(&record("a", "Ann Lee", "E1"));
//! assert_eq!(log.entries(), ["a.front", "a.back", "a.compose"]);
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::card::{FaceLocator, FaceMarkup, RenderError, RenderedFace, Side};
use crate::document::{ComposeError, DocumentComposer, ExportDocument, PageSize, PagePlacement};
use crate::roster::CardRecord;
use image::{Rgb, RgbImage};

// =========================================================================
// Fixtures
// =========================================================================

/// A minimal roster record.
pub fn record(id: &str, name: &str, employee_id: &str) -> CardRecord {
    CardRecord {
        id: id.to_string(),
        display_name: name.to_string(),
        employee_id: employee_id.to_string(),
        role: String::new(),
        location: None,
        photo: None,
    }
}

/// A solid white rendered face.
pub fn face(id: &str, side: Side, width: u32, height: u32) -> RenderedFace {
    RenderedFace {
        record_id: id.to_string(),
        side,
        image: RgbImage::from_pixel(width, height, Rgb([255, 255, 255])),
    }
}

/// Write a small gradient PNG to `path`.
pub fn write_png(path: &Path, width: u32, height: u32) {
    RgbImage::from_fn(width, height, |x, y| Rgb([(x * 40) as u8, (y * 40) as u8, 128]))
        .save(path)
        .unwrap();
}

// =========================================================================
// Recording mocks
// =========================================================================

/// Ordered, thread-safe record of mock calls.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Locator that stages empty markup, with selected faces missing or failing.
#[derive(Debug, Default)]
pub struct MockLocator {
    pub missing: HashSet<(String, Side)>,
    pub failing: HashSet<(String, Side)>,
}

impl MockLocator {
    pub fn missing(mut self, id: &str, side: Side) -> Self {
        self.missing.insert((id.to_string(), side));
        self
    }

    pub fn failing(mut self, id: &str, side: Side) -> Self {
        self.failing.insert((id.to_string(), side));
        self
    }
}

impl FaceLocator for MockLocator {
    fn locate(&self, record: &CardRecord, side: Side) -> Result<Option<FaceMarkup>, RenderError> {
        let key = (record.id.clone(), side);
        if self.missing.contains(&key) {
            return Ok(None);
        }
        if self.failing.contains(&key) {
            return Err(RenderError::Template("mock staging failure".to_string()));
        }
        Ok(Some(FaceMarkup {
            record_id: record.id.clone(),
            side,
            svg: String::new(),
        }))
    }
}

/// Composer that logs `"<id>.compose"` and returns a placeholder document.
#[derive(Debug)]
pub struct MockComposer {
    pub log: CallLog,
    pub failing: HashSet<String>,
}

impl MockComposer {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            failing: HashSet::new(),
        }
    }

    pub fn failing_on(mut self, id: &str) -> Self {
        self.failing.insert(id.to_string());
        self
    }
}

impl DocumentComposer for MockComposer {
    fn compose(
        &self,
        front: &RenderedFace,
        back: &RenderedFace,
    ) -> Result<ExportDocument, ComposeError> {
        self.log.push(format!("{}.compose", front.record_id));
        if self.failing.contains(&front.record_id) {
            return Err(ComposeError::Pdf("mock failure".to_string()));
        }
        let page = PageSize::default();
        let placement = |side| PagePlacement {
            side,
            width_mm: page.width_mm,
            height_mm: page.height_mm,
            scale_x: 1.0,
            scale_y: 1.0,
            dpi: 300.0,
        };
        Ok(ExportDocument {
            bytes: format!("%PDF {} {}", front.record_id, back.record_id).into_bytes(),
            pages: vec![placement(Side::Front), placement(Side::Back)],
        })
    }
}
