//! Batch driver: runs the pipeline over a whole roster and delivers the result.
//!
//! ```text
//! Started{total}
//! ├── RecordStarted{1, total, name} → export_one → RecordFinished{1, ...}
//! │   [pace]
//! ├── RecordStarted{2, total, name} → export_one → RecordFinished{2, ...}
//! │   ...
//! Archiving{entries} → ZIP in memory → save_as (atomic)
//! Finished{exported, total}
//! ```
//!
//! Per-record problems never stop the batch; they are collected into
//! [`BatchReport::failures`]. Only three things make a batch fail: every
//! record came back empty, the archive could not be built or saved, or the
//! run was cancelled. In all three cases nothing is delivered.
//!
//! Progress is reported through an optional `mpsc` sender so the CLI can
//! print from its own thread while the batch runs.

use crate::archive::{self, ArchiveBuilder, ArchiveError, ArchiveLayout};
use crate::card::{FaceLocator, FaceRenderer, Side};
use crate::document::{ComposeError, DocumentComposer, PdfComposer};
use crate::pipeline::{CancelToken, Pacer, Pipeline, RecordOutcome, RecordStatus};
use crate::roster::CardRecord;
use crate::summary::{self, EntrySummary, FailureSummary};
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Archive failed: {0}")]
    Archive(#[from] ArchiveError),
    #[error("Document failed: {0}")]
    Compose(#[from] ComposeError),
    #[error("No cards were exported ({total} records attempted)")]
    NothingExported { total: usize },
    #[error("Export cancelled after {completed} of {total} records")]
    Cancelled { completed: usize, total: usize },
}

/// Progress events, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportEvent {
    Started {
        total: usize,
    },
    RecordStarted {
        index: usize,
        total: usize,
        name: String,
    },
    RecordFinished {
        index: usize,
        total: usize,
        name: String,
        status: RecordStatus,
        entries: usize,
        failures: Vec<String>,
    },
    Archiving {
        entries: usize,
    },
    Cancelled {
        completed: usize,
        total: usize,
    },
    Finished {
        exported: usize,
        total: usize,
    },
}

/// Where the batch output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// One ZIP archive, saved atomically as `dir/file_name`.
    Zip { dir: PathBuf, file_name: String },
    /// The archive layout written as plain folders under `dir`.
    Unpacked { dir: PathBuf },
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub layout: ArchiveLayout,
    pub delivery: Delivery,
    /// Delay between records.
    pub pace: Duration,
    pub cancel: CancelToken,
}

/// Terminal success of a batch.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub total: usize,
    /// Records that contributed at least one entry.
    pub exported: usize,
    pub entries: Vec<EntrySummary>,
    pub failures: Vec<FailureSummary>,
    /// Archive file, or the output directory when unpacked.
    pub delivered: PathBuf,
    pub archive_sha256: Option<String>,
}

/// Terminal success of a combined-sheet run.
#[derive(Debug, Clone)]
pub struct SheetReport {
    pub total: usize,
    pub exported: usize,
    pub pages: usize,
    pub failures: Vec<FailureSummary>,
    pub delivered: PathBuf,
}

fn emit(events: &Option<Sender<ExportEvent>>, event: ExportEvent) {
    if let Some(tx) = events {
        // A dropped receiver only means nobody is watching.
        let _ = tx.send(event);
    }
}

fn failure_summaries(outcome: &RecordOutcome) -> Vec<FailureSummary> {
    outcome
        .failures
        .iter()
        .map(|f| FailureSummary {
            record_id: outcome.record_id.clone(),
            name: outcome.display_name.clone(),
            stage: f.stage().to_string(),
            reason: f.to_string(),
        })
        .collect()
}

/// Export every record and deliver one archive.
pub fn run<L, R, C>(
    pipeline: &Pipeline<L, R, C>,
    records: &[CardRecord],
    options: &BatchOptions,
    events: Option<Sender<ExportEvent>>,
) -> Result<BatchReport, BatchError>
where
    L: FaceLocator,
    R: FaceRenderer + 'static,
    C: DocumentComposer,
{
    let total = records.len();
    tracing::info!(total, "export started");
    emit(&events, ExportEvent::Started { total });

    let mut pacer = Pacer::new(options.pace);
    let mut archive = ArchiveBuilder::new(options.layout.clone());
    let mut exported = 0;
    let mut failures = Vec::new();

    for (i, record) in records.iter().enumerate() {
        if options.cancel.is_cancelled() {
            tracing::info!(completed = i, total, "export cancelled");
            emit(&events, ExportEvent::Cancelled { completed: i, total });
            return Err(BatchError::Cancelled { completed: i, total });
        }

        pacer.acquire();
        emit(
            &events,
            ExportEvent::RecordStarted {
                index: i + 1,
                total,
                name: record.display_name.clone(),
            },
        );
        let outcome = pipeline.export_one(record);
        pacer.release();

        let status = outcome.status();
        let record_failures = failure_summaries(&outcome);
        let reasons: Vec<String> = record_failures.iter().map(|f| f.reason.clone()).collect();
        failures.extend(record_failures);
        if status != RecordStatus::Failed {
            exported += 1;
        }
        let entries = archive.add_record(outcome)?;

        emit(
            &events,
            ExportEvent::RecordFinished {
                index: i + 1,
                total,
                name: record.display_name.clone(),
                status,
                entries,
                failures: reasons,
            },
        );
    }

    if exported == 0 {
        tracing::warn!(total, "no record produced any artifact");
        return Err(BatchError::NothingExported { total });
    }

    emit(
        &events,
        ExportEvent::Archiving {
            entries: archive.len(),
        },
    );
    let entries = archive.summaries();
    let (delivered, archive_sha256) = match &options.delivery {
        Delivery::Zip { dir, file_name } => {
            let bytes = archive.finish()?;
            let sha = summary::sha256_hex(&bytes);
            let path = archive::save_as(&bytes, dir, file_name)?;
            (path, Some(sha))
        }
        Delivery::Unpacked { dir } => {
            archive.write_unpacked(dir)?;
            (dir.clone(), None)
        }
    };

    tracing::info!(
        exported,
        total,
        path = %delivered.display(),
        "export finished"
    );
    emit(&events, ExportEvent::Finished { exported, total });

    Ok(BatchReport {
        total,
        exported,
        entries,
        failures,
        delivered,
        archive_sha256,
    })
}

/// Render every record into one combined PDF, front then back per record.
///
/// A record with a missing face contributes the face it has; a record that
/// fails to render is skipped. The sheet is saved atomically as
/// `dir/file_name`.
pub fn run_sheet<L, R>(
    pipeline: &Pipeline<L, R, PdfComposer>,
    records: &[CardRecord],
    options: &BatchOptions,
    file_name: &str,
    events: Option<Sender<ExportEvent>>,
) -> Result<SheetReport, BatchError>
where
    L: FaceLocator,
    R: FaceRenderer + 'static,
{
    let total = records.len();
    emit(&events, ExportEvent::Started { total });

    let mut pacer = Pacer::new(options.pace);
    let mut book = pipeline.composer().book("ID Cards");
    let mut exported = 0;
    let mut failures = Vec::new();

    for (i, record) in records.iter().enumerate() {
        if options.cancel.is_cancelled() {
            emit(&events, ExportEvent::Cancelled { completed: i, total });
            return Err(BatchError::Cancelled { completed: i, total });
        }

        pacer.acquire();
        emit(
            &events,
            ExportEvent::RecordStarted {
                index: i + 1,
                total,
                name: record.display_name.clone(),
            },
        );

        let mut faces = Vec::with_capacity(2);
        let mut reasons = Vec::new();
        for side in Side::BOTH {
            match pipeline.capture(record, side) {
                Ok(Some(face)) => faces.push(face),
                Ok(None) => reasons.push(("missing_face", format!("{side} face missing"))),
                Err(e) => {
                    faces.clear();
                    reasons.push(("render", format!("{side} face failed: {e}")));
                    break;
                }
            }
        }
        for face in &faces {
            book.add_face(face);
        }
        pacer.release();

        let status = match (faces.len(), reasons.is_empty()) {
            (0, _) => RecordStatus::Failed,
            (_, true) => RecordStatus::Complete,
            (_, false) => RecordStatus::Partial,
        };
        if status != RecordStatus::Failed {
            exported += 1;
        }
        for (stage, reason) in &reasons {
            tracing::warn!(record = %record.id, stage, "{reason}");
            failures.push(FailureSummary {
                record_id: record.id.clone(),
                name: record.display_name.clone(),
                stage: stage.to_string(),
                reason: reason.clone(),
            });
        }

        emit(
            &events,
            ExportEvent::RecordFinished {
                index: i + 1,
                total,
                name: record.display_name.clone(),
                status,
                entries: faces.len(),
                failures: reasons.into_iter().map(|(_, r)| r).collect(),
            },
        );
    }

    if exported == 0 {
        return Err(BatchError::NothingExported { total });
    }

    let pages = book.page_count();
    let document = book.finish()?;
    let dir = match &options.delivery {
        Delivery::Zip { dir, .. } | Delivery::Unpacked { dir } => dir,
    };
    let delivered = archive::save_as(&document.bytes, dir, file_name)?;
    emit(&events, ExportEvent::Finished { exported, total });

    Ok(SheetReport {
        total,
        exported,
        pages,
        failures,
        delivered,
    })
}

/// Staging status of one face, without rasterizing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaceCheck {
    Ready,
    Missing,
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordCheck {
    pub record_id: String,
    pub name: String,
    pub stem: String,
    pub front: FaceCheck,
    pub back: FaceCheck,
}

impl RecordCheck {
    pub fn is_ready(&self) -> bool {
        self.front == FaceCheck::Ready && self.back == FaceCheck::Ready
    }
}

/// Stage every face of every record and report what would be exported.
pub fn check(locator: &impl FaceLocator, records: &[CardRecord]) -> Vec<RecordCheck> {
    let face = |record: &CardRecord, side| match locator.locate(record, side) {
        Ok(Some(_)) => FaceCheck::Ready,
        Ok(None) => FaceCheck::Missing,
        Err(e) => FaceCheck::Error(e.to_string()),
    };
    records
        .iter()
        .map(|record| RecordCheck {
            record_id: record.id.clone(),
            name: record.display_name.clone(),
            stem: record.stem(),
            front: face(record, Side::Front),
            back: face(record, Side::Back),
        })
        .collect()
}
