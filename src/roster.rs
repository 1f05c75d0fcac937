//! Roster loading: the list of people to export cards for.
//!
//! The roster is a JSON array of employee records, loaded fully before any
//! rendering starts:
//!
//! ```json
//! [
//!   { "id": "emp-001", "name": "Jane Doe", "employeeId": "E001",
//!     "role": "Designer", "location": "Tokyo", "photo": "photos/jane.jpg" }
//! ]
//! ```
//!
//! Only `id`, `name`, and `employeeId` are required. Extra keys (skills,
//! social links, ...) are ignored so an existing employee export can be used
//! as-is. `photo` paths are relative to the roster file.
//!
//! Loading rejects rosters where two records share an `id` or would write to
//! the same file stem, since either would silently overwrite artifacts.

use crate::naming;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Location shown on a card when the record has none.
pub const DEFAULT_LOCATION: &str = "Remote";

#[derive(Error, Debug)]
pub enum RosterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Roster parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Roster validation error: {0}")]
    Validation(String),
}

/// One exportable card subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRecord {
    /// Stable record identity, used for template lookup and the profile URL.
    pub id: String,
    /// Display name; the file stem is derived from it.
    #[serde(rename = "name")]
    pub display_name: String,
    /// Employee id, appended to the file stem.
    pub employee_id: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub location: Option<String>,
    /// Photo path, relative to the roster file unless absolute.
    #[serde(default)]
    pub photo: Option<PathBuf>,
}

impl CardRecord {
    /// Shared file stem for this record's artifacts, e.g. `Jane_Doe_E001`.
    pub fn stem(&self) -> String {
        naming::file_stem(&self.display_name, &self.employee_id)
    }

    pub fn location_or_default(&self) -> &str {
        self.location
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(DEFAULT_LOCATION)
    }
}

/// A validated, fully loaded roster.
#[derive(Debug, Clone)]
pub struct Roster {
    pub records: Vec<CardRecord>,
    /// Directory photo paths are resolved against.
    pub base_dir: PathBuf,
}

impl Roster {
    /// Validate `records` and wrap them with the directory photos live under.
    pub fn new(records: Vec<CardRecord>, base_dir: impl Into<PathBuf>) -> Result<Self, RosterError> {
        validate(&records)?;
        Ok(Self {
            records,
            base_dir: base_dir.into(),
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn find(&self, id: &str) -> Option<&CardRecord> {
        self.records.iter().find(|r| r.id == id)
    }
}

/// Load and validate a roster file.
pub fn load_roster(path: &Path) -> Result<Roster, RosterError> {
    let content = fs::read_to_string(path)?;
    let records: Vec<CardRecord> = serde_json::from_str(&content)?;
    let base_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    tracing::debug!(path = %path.display(), records = records.len(), "loaded roster");
    Roster::new(records, base_dir)
}

fn validate(records: &[CardRecord]) -> Result<(), RosterError> {
    let mut ids: HashMap<&str, usize> = HashMap::new();
    let mut stems: HashMap<String, &str> = HashMap::new();

    for (index, record) in records.iter().enumerate() {
        if record.id.trim().is_empty() {
            return Err(RosterError::Validation(format!(
                "record #{} has an empty id",
                index + 1
            )));
        }
        if record.employee_id.trim().is_empty() {
            return Err(RosterError::Validation(format!(
                "record '{}' has an empty employeeId",
                record.id
            )));
        }
        if let Some(first) = ids.insert(&record.id, index) {
            return Err(RosterError::Validation(format!(
                "duplicate id '{}' (records #{} and #{})",
                record.id,
                first + 1,
                index + 1
            )));
        }
        if let Some(other) = stems.insert(record.stem(), &record.id) {
            return Err(RosterError::Validation(format!(
                "records '{}' and '{}' both export as '{}'",
                other,
                record.id,
                record.stem()
            )));
        }
    }
    Ok(())
}
