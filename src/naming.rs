//! Centralized file naming for everything the exporter writes.
//!
//! Every artifact of a record shares one *stem* built from the employee's
//! display name and employee id:
//!
//! ```text
//! "Jane Doe" + "E001"  →  Jane_Doe_E001
//!
//! images/Jane_Doe_E001_front.png
//! images/Jane_Doe_E001_back.png
//! documents/Jane_Doe_E001.pdf
//! ```
//!
//! ## Sanitizing Display Names
//!
//! - Unicode is transliterated to ASCII first (`José` → `Jose`).
//! - Runs of whitespace become a single `_`.
//! - Anything else outside `[A-Za-z0-9_]` is dropped (`O'Neil` → `ONeil`).
//!
//! The employee id is appended to the stem, so two people sharing a display
//! name never collide as long as their ids differ.
//!
//! ## Escaping Ids
//!
//! Ids are escaped, not cleaned: `[A-Za-z0-9-]` passes through and every
//! other byte becomes `_XX` (uppercase hex). Distinct ids always give
//! distinct path components:
//!
//! ```text
//! "E001"  →  E001
//! "E/1"   →  E_2F1
//! "E 1"   →  E_201
//! "E_1"   →  E_5F1
//! ```

use crate::card::Side;

/// Fallback used when a name sanitizes to nothing (e.g. only punctuation).
const EMPTY_NAME: &str = "card";

/// Sanitize a display name into a filename-safe component.
///
/// - `"Jane Doe"` → `"Jane_Doe"`
/// - `"  Ana   María  "` → `"Ana_Maria"`
/// - `"Mary-Jane O'Neil"` → `"MaryJane_ONeil"`
pub fn sanitize_name(name: &str) -> String {
    let ascii = deunicode::deunicode(name);
    let mut out = String::with_capacity(ascii.len());
    let mut pending_gap = false;

    for ch in ascii.chars() {
        if ch.is_whitespace() {
            pending_gap = true;
            continue;
        }
        if !(ch.is_ascii_alphanumeric() || ch == '_') {
            continue;
        }
        if pending_gap && !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
        pending_gap = false;
        if ch == '_' && out.ends_with('_') {
            continue;
        }
        out.push(ch);
    }

    while out.ends_with('_') {
        out.pop();
    }

    if out.is_empty() {
        EMPTY_NAME.to_string()
    } else {
        out
    }
}

/// Escape an identifier (record id or employee id) for use in paths.
///
/// Dashes are kept since ids like `TOMO-001` are common. Every other byte
/// outside `[A-Za-z0-9-]`, `_` included, becomes `_XX`, so the mapping is
/// reversible and two different ids never share a component.
pub fn sanitize_id(id: &str) -> String {
    if id.is_empty() {
        return "_".to_string();
    }
    let mut out = String::with_capacity(id.len());
    for byte in id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("_{byte:02X}"));
        }
    }
    out
}

/// Shared stem for all artifacts of one record: `<sanitized-name>_<employee-id>`.
pub fn file_stem(display_name: &str, employee_id: &str) -> String {
    format!("{}_{}", sanitize_name(display_name), sanitize_id(employee_id))
}

/// Raster file name for one face: `Jane_Doe_E001_front.png`.
pub fn image_file_name(stem: &str, side: Side) -> String {
    format!("{}_{}.png", stem, side.as_str())
}

/// Document file name for one record: `Jane_Doe_E001.pdf`.
pub fn document_file_name(stem: &str) -> String {
    format!("{}.pdf", stem)
}

/// Branded archive name for an export run: `TOMO_Academy_ID_Cards.zip`.
///
/// Derived from the organization only, never from the batch contents.
pub fn archive_file_name(organization: &str) -> String {
    format!("{}_ID_Cards.zip", sanitize_name(organization))
}

/// Branded name for the combined all-cards PDF: `TOMO_Academy_All_ID_Cards.pdf`.
pub fn sheet_file_name(organization: &str) -> String {
    format!("{}_All_ID_Cards.pdf", sanitize_name(organization))
}

/// Up to two uppercase initials for the avatar placeholder.
///
/// `"Jane Doe"` → `"JD"`, `"Cher"` → `"C"`, `"Ana Maria Lopez"` → `"AM"`.
pub fn initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .take(2)
        .collect()
}
