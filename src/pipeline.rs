//! Per-record export: render front, render back, compose, hand back artifacts.
//!
//! [`Pipeline::export_one`] never fails as a whole. Everything that can go
//! wrong for one record is caught here and returned as part of its
//! [`RecordOutcome`], so a bad photo or a stuck render costs that record and
//! nothing else.
//!
//! ## Failure Policy
//!
//! | What happened | Images kept | Document |
//! |---|---|---|
//! | Both faces rendered, compose ok | front + back | yes |
//! | One face missing | the other one | skipped |
//! | Any face fails to stage or render (incl. timeout) | none | skipped |
//! | Compose fails | front + back | none |
//!
//! ## Scheduling
//!
//! Records go through one at a time. A [`Pacer`] spaces consecutive records
//! by a fixed delay, and a [`CancelToken`] is checked between records by the
//! batch driver. Each rasterization runs on a helper thread so it can be
//! bounded by a timeout; a face that overruns is reported as a render failure.
//!
//! An overrunning render thread cannot be killed, so the pipeline keeps its
//! handle and the next face waits for it (up to one more timeout period)
//! before starting. At most one rasterization ever runs at a time; if the
//! old one is still stuck, the next face fails with a timeout too instead of
//! running alongside it.

use crate::card::{FaceLocator, FaceMarkup, FaceRenderer, RenderError, RenderedFace, Side};
use crate::document::{ComposeError, DocumentComposer, ExportDocument};
use crate::roster::CardRecord;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Default upper bound on rendering one face.
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(10);

/// How often an abandoned render is checked for completion.
const OVERRUN_POLL: Duration = Duration::from_millis(5);

/// Why a record did not export completely.
#[derive(Error, Debug)]
pub enum RecordFailure {
    #[error("{0} face missing")]
    MissingFace(Side),
    #[error("{side} face failed: {source}")]
    Render { side: Side, source: RenderError },
    #[error("document failed: {0}")]
    Compose(#[from] ComposeError),
}

impl RecordFailure {
    /// Short machine-readable stage name, used in summaries.
    pub fn stage(&self) -> &'static str {
        match self {
            RecordFailure::MissingFace(_) => "missing_face",
            RecordFailure::Render { .. } => "render",
            RecordFailure::Compose(_) => "compose",
        }
    }
}

/// Overall result for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    /// Both images and the document.
    Complete,
    /// Some artifacts, with at least one skip or failure.
    Partial,
    /// Nothing to archive.
    Failed,
}

/// Artifacts and failures for one record.
#[derive(Debug)]
pub struct RecordOutcome {
    pub record_id: String,
    pub display_name: String,
    /// Shared file stem, e.g. `Jane_Doe_E001`.
    pub stem: String,
    /// PNG-encoded front face.
    pub front: Option<Vec<u8>>,
    /// PNG-encoded back face.
    pub back: Option<Vec<u8>>,
    pub document: Option<ExportDocument>,
    pub failures: Vec<RecordFailure>,
}

impl RecordOutcome {
    fn empty(record: &CardRecord) -> Self {
        Self {
            record_id: record.id.clone(),
            display_name: record.display_name.clone(),
            stem: record.stem(),
            front: None,
            back: None,
            document: None,
            failures: Vec::new(),
        }
    }

    pub fn image(&self, side: Side) -> Option<&[u8]> {
        match side {
            Side::Front => self.front.as_deref(),
            Side::Back => self.back.as_deref(),
        }
    }

    fn set_image(&mut self, side: Side, png: Vec<u8>) {
        match side {
            Side::Front => self.front = Some(png),
            Side::Back => self.back = Some(png),
        }
    }

    /// Number of archive entries this record contributes (0-3).
    pub fn entry_count(&self) -> usize {
        usize::from(self.front.is_some())
            + usize::from(self.back.is_some())
            + usize::from(self.document.is_some())
    }

    pub fn status(&self) -> RecordStatus {
        match (self.entry_count(), self.failures.is_empty()) {
            (0, _) => RecordStatus::Failed,
            (_, true) => RecordStatus::Complete,
            (_, false) => RecordStatus::Partial,
        }
    }

    fn fail(&mut self, failure: RecordFailure) {
        tracing::warn!(
            record = %self.record_id,
            name = %self.display_name,
            stage = failure.stage(),
            "{failure}"
        );
        self.failures.push(failure);
    }
}

/// Renders and composes one record at a time.
///
/// Generic over its three seams so tests can substitute recording mocks.
pub struct Pipeline<L, R, C> {
    locator: L,
    renderer: Arc<R>,
    composer: C,
    render_timeout: Duration,
    /// Render thread abandoned by the last timeout, if it may still be running.
    overrun: Mutex<Option<JoinHandle<()>>>,
}

impl<L, R, C> Pipeline<L, R, C>
where
    L: FaceLocator,
    R: FaceRenderer + 'static,
    C: DocumentComposer,
{
    pub fn new(locator: L, renderer: R, composer: C) -> Self {
        Self {
            locator,
            renderer: Arc::new(renderer),
            composer,
            render_timeout: DEFAULT_RENDER_TIMEOUT,
            overrun: Mutex::new(None),
        }
    }

    pub fn with_render_timeout(mut self, timeout: Duration) -> Self {
        self.render_timeout = timeout;
        self
    }

    pub fn composer(&self) -> &C {
        &self.composer
    }

    /// Export one record: front, back, then the two-page document.
    pub fn export_one(&self, record: &CardRecord) -> RecordOutcome {
        let mut outcome = RecordOutcome::empty(record);
        let mut faces: Vec<RenderedFace> = Vec::with_capacity(2);

        for side in Side::BOTH {
            match self.capture(record, side) {
                Ok(Some(face)) => faces.push(face),
                Ok(None) => outcome.fail(RecordFailure::MissingFace(side)),
                Err(source) => {
                    outcome.fail(RecordFailure::Render { side, source });
                    return outcome;
                }
            }
        }

        for face in &faces {
            match face.to_png() {
                Ok(png) => outcome.set_image(face.side, png),
                Err(source) => {
                    outcome.front = None;
                    outcome.back = None;
                    outcome.fail(RecordFailure::Render {
                        side: face.side,
                        source,
                    });
                    return outcome;
                }
            }
        }

        if let [front, back] = faces.as_slice() {
            match self.composer.compose(front, back) {
                Ok(document) => outcome.document = Some(document),
                Err(err) => outcome.fail(err.into()),
            }
        }

        tracing::debug!(
            record = %outcome.record_id,
            entries = outcome.entry_count(),
            "record exported"
        );
        outcome
    }

    /// Stage and rasterize one face. `Ok(None)` when the face does not exist.
    pub fn capture(
        &self,
        record: &CardRecord,
        side: Side,
    ) -> Result<Option<RenderedFace>, RenderError> {
        match self.locator.locate(record, side)? {
            Some(markup) => self.rasterize_bounded(markup).map(Some),
            None => Ok(None),
        }
    }

    fn rasterize_bounded(&self, markup: FaceMarkup) -> Result<RenderedFace, RenderError> {
        let side = markup.side;
        let mut overrun = self.overrun.lock().unwrap_or_else(PoisonError::into_inner);
        self.settle_overrun(&mut overrun, side)?;

        let renderer = Arc::clone(&self.renderer);
        let (tx, rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name(format!("render-{side}"))
            .spawn(move || {
                // The receiver is gone if we already timed out.
                let _ = tx.send(renderer.rasterize(&markup));
            })?;

        match rx.recv_timeout(self.render_timeout) {
            Ok(result) => {
                join_render(handle);
                result
            }
            Err(RecvTimeoutError::Timeout) => {
                *overrun = Some(handle);
                Err(RenderError::Timeout {
                    side,
                    limit: self.render_timeout,
                })
            }
            Err(RecvTimeoutError::Disconnected) => {
                join_render(handle);
                Err(RenderError::Raster(format!(
                    "{side} render thread exited without a result"
                )))
            }
        }
    }

    /// Wait for a render abandoned by an earlier timeout to finish.
    ///
    /// Gives up after one timeout period, leaving the handle in place, and
    /// fails `side` without starting a second render.
    fn settle_overrun(
        &self,
        overrun: &mut Option<JoinHandle<()>>,
        side: Side,
    ) -> Result<(), RenderError> {
        let Some(handle) = overrun.take() else {
            return Ok(());
        };
        let deadline = Instant::now() + self.render_timeout;
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                tracing::warn!(%side, "previous render still running, not starting another");
                *overrun = Some(handle);
                return Err(RenderError::Timeout {
                    side,
                    limit: self.render_timeout,
                });
            }
            thread::sleep(OVERRUN_POLL);
        }
        join_render(handle);
        Ok(())
    }
}

fn join_render(handle: JoinHandle<()>) {
    if handle.join().is_err() {
        tracing::warn!("render thread panicked");
    }
}

/// Spaces consecutive records by a fixed delay.
///
/// Holding the pacer mutably is the single slot: only one record is ever in
/// flight. The first acquire never waits.
#[derive(Debug)]
pub struct Pacer {
    delay: Duration,
    last_release: Option<Instant>,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_release: None,
        }
    }

    /// Block until at least `delay` has passed since the previous release.
    pub fn acquire(&mut self) {
        if let Some(released) = self.last_release {
            let elapsed = released.elapsed();
            if elapsed < self.delay {
                thread::sleep(self.delay - elapsed);
            }
        }
    }

    pub fn release(&mut self) {
        self.last_release = Some(Instant::now());
    }
}

/// Cooperative cancellation, checked between records.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
