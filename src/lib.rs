//! # idcard-export
//!
//! Batch exporter for employee ID cards. Given a roster of people, it renders
//! the front and back of every card to PNG, composes a two-page print-ready
//! PDF per card, and packages everything into one branded ZIP archive.
//!
//! # Architecture: One Record at a Time
//!
//! ```text
//! roster.json → Batch ─┬─ Pipeline(record 1): stage → rasterize front/back → compose PDF
//!                      ├─ [pace]
//!                      ├─ Pipeline(record 2): ...
//!                      └─ ArchiveBuilder (in memory) → save_as (atomic) → <Org>_ID_Cards.zip
//! ```
//!
//! - **Per-record containment**: a missing face or a broken photo costs that
//!   one record, and a render that overruns its timeout is cut off. The
//!   batch carries on and reports it.
//! - **Nothing half-written**: the archive is assembled in memory and renamed
//!   into place, so the output name only ever refers to a complete archive.
//! - **Testable seams**: the pipeline is generic over face lookup, rendering,
//!   and composition, so ordering and failure policy are tested with
//!   recording mocks and no pixels.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`card`] | Face staging (built-in design or SVG templates) and `resvg` rasterization |
//! | [`document`] | Two-page ID-1 PDFs with `printpdf`, plus the combined sheet builder |
//! | [`pipeline`] | Per-record export, failure policy, render timeouts, pacing, cancellation |
//! | [`archive`] | In-memory ZIP with `images/` and `documents/`, atomic save, unpacked mode |
//! | [`batch`] | Drives the pipeline over the roster, progress events, terminal outcome |
//! | [`roster`] | Roster JSON loading and validation |
//! | [`config`] | `export.toml` loading, merging over stock defaults, validation |
//! | [`naming`] | File stem and output names derived from display names and ids |
//! | [`summary`] | JSON export summary with per-entry SHA-256 |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## SVG Faces Instead of a Browser
//!
//! Faces are self-contained SVG documents, staged off-screen and rasterized
//! by `resvg`. No headless browser, no network: photos and QR codes are
//! embedded by value, so the same roster always produces the same pixels.
//!
//! ## Sequential on Purpose
//!
//! Records are exported strictly one after another with a small delay in
//! between. Rendering is not the bottleneck for an ID card batch, and a
//! strict order keeps progress output and failure reports easy to follow.

pub mod archive;
pub mod batch;
pub mod card;
pub mod config;
pub mod document;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod roster;
pub mod summary;

#[cfg(test)]
pub(crate) mod test_helpers;
