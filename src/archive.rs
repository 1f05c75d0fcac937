//! Archive assembly and delivery.
//!
//! All artifacts of a batch are collected in memory and written out in one
//! step at the end, so a failed batch never leaves a half-written archive:
//!
//! ```text
//! TOMO_Academy_ID_Cards.zip
//! ├── images/
//! │   ├── Jane_Doe_E001_front.png
//! │   └── Jane_Doe_E001_back.png
//! └── documents/
//!     └── Jane_Doe_E001.pdf
//! ```
//!
//! The folder names come from `[archive]` config and are part of the output
//! contract. Entry timestamps are left at the ZIP epoch so identical input
//! produces an identical archive.
//!
//! [`save_as`] writes to a temporary file next to the target and renames it
//! into place, so the final name only ever refers to a complete archive.

use crate::card::Side;
use crate::config::ArchiveConfig;
use crate::naming;
use crate::pipeline::RecordOutcome;
use crate::summary::EntrySummary;
use std::collections::HashSet;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use zip::{CompressionMethod, ZipWriter, write::FileOptions};

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Duplicate archive entry: {0}")]
    DuplicateEntry(String),
}

/// Folder layout inside the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveLayout {
    pub images_dir: String,
    pub documents_dir: String,
}

impl ArchiveLayout {
    pub fn image_path(&self, stem: &str, side: Side) -> String {
        format!("{}/{}", self.images_dir, naming::image_file_name(stem, side))
    }

    pub fn document_path(&self, stem: &str) -> String {
        format!("{}/{}", self.documents_dir, naming::document_file_name(stem))
    }
}

impl Default for ArchiveLayout {
    fn default() -> Self {
        Self::from(&ArchiveConfig::default())
    }
}

impl From<&ArchiveConfig> for ArchiveLayout {
    fn from(config: &ArchiveConfig) -> Self {
        Self {
            images_dir: config.images_dir.clone(),
            documents_dir: config.documents_dir.clone(),
        }
    }
}

/// In-memory manifest of relative path → payload, in insertion order.
#[derive(Debug, Default)]
pub struct ArchiveBuilder {
    layout: ArchiveLayout,
    entries: Vec<(String, Vec<u8>)>,
    paths: HashSet<String>,
}

impl ArchiveBuilder {
    pub fn new(layout: ArchiveLayout) -> Self {
        Self {
            layout,
            entries: Vec::new(),
            paths: HashSet::new(),
        }
    }

    pub fn layout(&self) -> &ArchiveLayout {
        &self.layout
    }

    /// Add one entry. Paths must be unique within the archive.
    pub fn add(&mut self, path: String, bytes: Vec<u8>) -> Result<(), ArchiveError> {
        if !self.paths.insert(path.clone()) {
            return Err(ArchiveError::DuplicateEntry(path));
        }
        self.entries.push((path, bytes));
        Ok(())
    }

    /// Move a record's artifacts into the archive. Returns how many entries
    /// were added (0-3).
    pub fn add_record(&mut self, outcome: RecordOutcome) -> Result<usize, ArchiveError> {
        let RecordOutcome {
            stem,
            front,
            back,
            document,
            ..
        } = outcome;
        let mut added = 0;
        for (side, png) in [(Side::Front, front), (Side::Back, back)] {
            if let Some(png) = png {
                self.add(self.layout.image_path(&stem, side), png)?;
                added += 1;
            }
        }
        if let Some(document) = document {
            self.add(self.layout.document_path(&stem), document.bytes)?;
            added += 1;
        }
        Ok(added)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Path, size, and hash of every entry, in archive order.
    pub fn summaries(&self) -> Vec<EntrySummary> {
        self.entries
            .iter()
            .map(|(path, bytes)| EntrySummary::of(path, bytes))
            .collect()
    }

    /// Folders that hold at least one entry, in first-use order.
    fn folders(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for (path, _) in &self.entries {
            if let Some((folder, _)) = path.split_once('/') {
                if !seen.iter().any(|f: &String| f == folder) {
                    seen.push(folder.to_string());
                }
            }
        }
        seen
    }

    /// Encode everything as a Deflate-compressed ZIP.
    pub fn finish(self) -> Result<Vec<u8>, ArchiveError> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options: FileOptions<'_, ()> =
            FileOptions::default().compression_method(CompressionMethod::Deflated);

        for folder in self.folders() {
            zip.add_directory(format!("{folder}/"), options)?;
        }
        for (path, bytes) in &self.entries {
            zip.start_file(path.as_str(), options)?;
            zip.write_all(bytes)?;
        }
        let cursor = zip.finish()?;
        Ok(cursor.into_inner())
    }

    /// Write every entry as a plain file under `dir` instead of zipping.
    pub fn write_unpacked(self, dir: &Path) -> Result<Vec<PathBuf>, ArchiveError> {
        let mut written = Vec::with_capacity(self.entries.len());
        for (path, bytes) in self.entries {
            let target = dir.join(&path);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&target, bytes)?;
            written.push(target);
        }
        Ok(written)
    }
}

/// Atomically deliver `bytes` as `dir/file_name`.
///
/// Either the complete file appears under its final name or nothing does.
pub fn save_as(bytes: &[u8], dir: &Path, file_name: &str) -> Result<PathBuf, ArchiveError> {
    fs::create_dir_all(dir)?;
    let target = dir.join(file_name);
    let partial = dir.join(format!(".{}.{}.partial", file_name, std::process::id()));

    let written = fs::File::create(&partial).and_then(|mut file| {
        file.write_all(bytes)?;
        file.sync_all()
    });
    if let Err(e) = written.and_then(|()| fs::rename(&partial, &target)) {
        let _ = fs::remove_file(&partial);
        return Err(e.into());
    }
    Ok(target)
}
