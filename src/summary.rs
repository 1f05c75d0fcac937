//! Machine-readable export summary (`--summary <path>`).
//!
//! ```json
//! {
//!   "organization": "TOMO Academy",
//!   "archive": "TOMO_Academy_ID_Cards.zip",
//!   "archive_sha256": "9f2c...",
//!   "total": 3,
//!   "exported": 2,
//!   "entries": [
//!     { "path": "images/Jane_Doe_E001_front.png", "size": 48211, "sha256": "..." }
//!   ],
//!   "failures": [
//!     { "record_id": "emp-3", "name": "Sam Poe", "stage": "render",
//!       "reason": "front face failed: Photo photos/sam.jpg: No such file" }
//!   ]
//! }
//! ```

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

/// SHA-256 of `bytes` as lowercase hex.
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// One file in the delivered archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntrySummary {
    pub path: String,
    pub size: u64,
    pub sha256: String,
}

impl EntrySummary {
    pub fn of(path: &str, bytes: &[u8]) -> Self {
        Self {
            path: path.to_string(),
            size: bytes.len() as u64,
            sha256: sha256_hex(bytes),
        }
    }
}

/// One per-record skip or failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureSummary {
    pub record_id: String,
    pub name: String,
    pub stage: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    pub organization: String,
    /// Archive file name, or the output directory in unpacked mode.
    pub archive: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive_sha256: Option<String>,
    pub total: usize,
    pub exported: usize,
    pub entries: Vec<EntrySummary>,
    pub failures: Vec<FailureSummary>,
}

/// Write `summary` as pretty JSON.
pub fn write_summary(path: &Path, summary: &ExportSummary) -> Result<(), std::io::Error> {
    let json = serde_json::to_string_pretty(summary)?;
    fs::write(path, json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn sha256_known_value() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn entry_summary_records_size_and_hash() {
        let entry = EntrySummary::of("images/a_front.png", b"abc");
        assert_eq!(entry.size, 3);
        assert_eq!(entry.sha256.len(), 64);
    }

    #[test]
    fn summary_serializes_failures() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("summary.json");
        let summary = ExportSummary {
            organization: "TOMO Academy".to_string(),
            archive: "TOMO_Academy_ID_Cards.zip".to_string(),
            archive_sha256: None,
            total: 2,
            exported: 1,
            entries: vec![EntrySummary::of("documents/a.pdf", b"%PDF")],
            failures: vec![FailureSummary {
                record_id: "b".to_string(),
                name: "Bo".to_string(),
                stage: "render".to_string(),
                reason: "front face failed".to_string(),
            }],
        };

        write_summary(&path, &summary).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();

        assert_eq!(value["exported"], 1);
        assert_eq!(value["entries"][0]["path"], "documents/a.pdf");
        assert_eq!(value["failures"][0]["stage"], "render");
        assert!(value.get("archive_sha256").is_none());
    }
}
