//! Export configuration module.
//!
//! Handles loading, validating, and merging `export.toml`. Stock defaults are
//! the base layer; a user file only needs the keys it wants to change.
//!
//! ## Config File Location
//!
//! `export.toml` in the working directory, or any path passed with
//! `--config`. A missing file means "stock defaults".
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [organization]
//! name = "TOMO Academy"
//! tagline = "EDUCATION ELEVATED"
//! profile_base_url = "https://tomoacademy.site/employee"
//! website = "tomoacademy.com"
//! email = "support@tomo"
//! member_year = 2025
//! # archive_name = "TOMO_Academy_ID_Cards.zip"
//!
//! [card]
//! width = 320               # logical units
//! height = 200
//! scale = 3                 # pixels per unit
//! background = "#ffffff"
//! # template_dir = "cards"
//!
//! [document]
//! width_mm = 85.6           # ISO/IEC 7810 ID-1
//! height_mm = 53.98
//!
//! [archive]
//! images_dir = "images"
//! documents_dir = "documents"
//!
//! [export]
//! pace_ms = 100             # delay between records
//! render_timeout_secs = 10  # per face
//! ```
//!
//! ## Partial Configuration
//!
//! ```toml
//! # Only rebrand
//! [organization]
//! name = "Acme Corp"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::card::geometry;
use crate::card::{CardCanvas, parse_hex_color};
use crate::naming;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "export.toml";

/// Largest allowed relative difference between card and page aspect ratios.
const MAX_ASPECT_MISMATCH: f32 = 0.01;

/// Largest rendered face side in pixels (`width * scale`, `height * scale`).
pub const MAX_CANVAS_SIDE_PX: u32 = 16_384;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Export configuration loaded from `export.toml`.
///
/// All fields have sensible defaults. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    /// Branding shown on cards and used for output names.
    pub organization: OrganizationConfig,
    /// Face canvas and templates.
    pub card: CardConfig,
    /// Printed page size.
    pub document: DocumentConfig,
    /// Folder layout inside the archive.
    pub archive: ArchiveConfig,
    /// Pacing and timeouts.
    pub export: PacingConfig,
}

impl ExportConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.organization.validate()?;

        let card = &self.card;
        if card.width == 0 || card.height == 0 || card.scale == 0 {
            return Err(ConfigError::Validation(
                "card.width, card.height and card.scale must be non-zero".into(),
            ));
        }
        for (name, units) in [("width", card.width), ("height", card.height)] {
            let too_big = units
                .checked_mul(card.scale)
                .is_none_or(|px| px > MAX_CANVAS_SIDE_PX);
            if too_big {
                return Err(ConfigError::Validation(format!(
                    "card.{name} x card.scale must be at most {MAX_CANVAS_SIDE_PX} pixels"
                )));
            }
        }
        if parse_hex_color(&card.background).is_none() {
            return Err(ConfigError::Validation(format!(
                "card.background must be #rrggbb, got '{}'",
                card.background
            )));
        }

        let doc = &self.document;
        if !(doc.width_mm > 0.0 && doc.height_mm > 0.0) {
            return Err(ConfigError::Validation(
                "document.width_mm and document.height_mm must be positive".into(),
            ));
        }
        let mismatch = geometry::aspect_mismatch(
            (card.width as f32, card.height as f32),
            (doc.width_mm, doc.height_mm),
        );
        if mismatch > MAX_ASPECT_MISMATCH {
            return Err(ConfigError::Validation(format!(
                "card {}x{} does not match page {}x{}mm aspect ratio ({:.1}% off)",
                card.width,
                card.height,
                doc.width_mm,
                doc.height_mm,
                mismatch * 100.0
            )));
        }

        let archive = &self.archive;
        for (key, dir) in [
            ("archive.images_dir", &archive.images_dir),
            ("archive.documents_dir", &archive.documents_dir),
        ] {
            if dir.is_empty() || dir.contains(['/', '\\']) || dir == "." || dir == ".." {
                return Err(ConfigError::Validation(format!(
                    "{key} must be a single folder name, got '{dir}'"
                )));
            }
        }
        if archive.images_dir == archive.documents_dir {
            return Err(ConfigError::Validation(
                "archive.images_dir and archive.documents_dir must differ".into(),
            ));
        }

        if self.organization.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "organization.name must not be empty".into(),
            ));
        }
        if let Some(name) = &self.organization.archive_name {
            if name.is_empty() || name.contains(['/', '\\']) {
                return Err(ConfigError::Validation(format!(
                    "organization.archive_name must be a plain file name, got '{name}'"
                )));
            }
        }

        if self.export.render_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "export.render_timeout_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// The canvas every face is rendered onto.
    pub fn canvas(&self) -> CardCanvas {
        CardCanvas {
            width: self.card.width,
            height: self.card.height,
            scale: self.card.scale,
            // `validate` rejects malformed colors.
            background: parse_hex_color(&self.card.background).unwrap_or([255, 255, 255]),
        }
    }

    /// Final archive file name: explicit override, else derived from the
    /// organization name.
    pub fn archive_name(&self) -> String {
        self.organization
            .archive_name
            .clone()
            .unwrap_or_else(|| naming::archive_file_name(&self.organization.name))
    }

    pub fn sheet_name(&self) -> String {
        naming::sheet_file_name(&self.organization.name)
    }
}

/// Organization branding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrganizationConfig {
    pub name: String,
    /// Line under the organization name on the front header.
    pub tagline: String,
    /// Profile URLs are `<profile_base_url>/<record id>`, id percent-encoded.
    pub profile_base_url: String,
    pub website: String,
    pub email: String,
    pub member_year: u16,
    /// Override for the archive file name.
    pub archive_name: Option<String>,
}

impl OrganizationConfig {
    /// Profile page for one record. The id is appended as a single
    /// percent-encoded path segment.
    pub fn profile_url(&self, record_id: &str) -> Result<String, url::ParseError> {
        let mut url = Url::parse(&self.profile_base_url)?;
        match url.path_segments_mut() {
            Ok(mut segments) => {
                segments.pop_if_empty().push(record_id);
            }
            Err(()) => return Err(url::ParseError::RelativeUrlWithCannotBeABaseBase),
        }
        Ok(url.to_string())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let valid = Url::parse(&self.profile_base_url)
            .map(|url| matches!(url.scheme(), "http" | "https") && url.host().is_some())
            .unwrap_or(false);
        if !valid {
            return Err(ConfigError::Validation(format!(
                "organization.profile_base_url must be an http(s) URL, got '{}'",
                self.profile_base_url
            )));
        }
        Ok(())
    }
}


impl Default for OrganizationConfig {
    fn default() -> Self {
        Self {
            name: "TOMO Academy".to_string(),
            tagline: "EDUCATION ELEVATED".to_string(),
            profile_base_url: "https://tomoacademy.site/employee".to_string(),
            website: "tomoacademy.com".to_string(),
            email: "support@tomo".to_string(),
            member_year: 2025,
            archive_name: None,
        }
    }
}

/// Face canvas settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CardConfig {
    /// Face width in logical units.
    pub width: u32,
    /// Face height in logical units.
    pub height: u32,
    /// Pixels per logical unit.
    pub scale: u32,
    /// Opaque background as `#rrggbb`.
    pub background: String,
    /// Directory of SVG face templates. When unset the built-in design is used.
    pub template_dir: Option<PathBuf>,
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 200,
            scale: 3,
            background: "#ffffff".to_string(),
            template_dir: None,
        }
    }
}

/// Printed page size, landscape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DocumentConfig {
    pub width_mm: f32,
    pub height_mm: f32,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            width_mm: geometry::ID1_WIDTH_MM,
            height_mm: geometry::ID1_HEIGHT_MM,
        }
    }
}

/// Folder names inside the archive. Consumers depend on these.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArchiveConfig {
    pub images_dir: String,
    pub documents_dir: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            images_dir: "images".to_string(),
            documents_dir: "documents".to_string(),
        }
    }
}

/// Sequential pacing and per-face timeouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PacingConfig {
    /// Delay between records in milliseconds. `0` disables pacing.
    pub pace_ms: u64,
    /// Upper bound on rendering one face.
    pub render_timeout_secs: u64,
}

impl PacingConfig {
    pub fn pace(&self) -> Duration {
        Duration::from_millis(self.pace_ms)
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            pace_ms: 100,
            render_timeout_secs: 10,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    // `archive_name` and `template_dir` are `None` by default and TOML has no
    // null, so they are simply absent from the table.
    toml::Value::try_from(ExportConfig::default())
        .unwrap_or_else(|_| toml::Value::Table(toml::map::Map::new()))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ExportConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ExportConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result. A relative `card.template_dir` is resolved
/// against the config file's directory.
pub fn load_config(path: &Path) -> Result<ExportConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(path)?;
    let mut config = resolve_config(base, overlay)?;
    if let (Some(dir), Some(parent)) = (&config.card.template_dir, path.parent()) {
        if dir.is_relative() {
            config.card.template_dir = Some(parent.join(dir));
        }
    }
    Ok(config)
}

/// Returns a fully-commented stock `export.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# ID Card Export Configuration
# ============================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Organization branding
# ---------------------------------------------------------------------------
[organization]
name = "TOMO Academy"
tagline = "EDUCATION ELEVATED"

# Each card's QR code links to <profile_base_url>/<record id>.
profile_base_url = "https://tomoacademy.site/employee"

website = "tomoacademy.com"
email = "support@tomo"
member_year = 2025

# Archive file name. Defaults to "<Organization_Name>_ID_Cards.zip".
# archive_name = "TOMO_Academy_ID_Cards.zip"

# ---------------------------------------------------------------------------
# Card faces
# ---------------------------------------------------------------------------
[card]
# Face size in logical units. Must match the page aspect ratio within 1%.
width = 320
height = 200

# Pixels per logical unit. 320x200 at scale 3 gives 960x600 PNGs.
scale = 3

# Opaque background behind every face.
background = "#ffffff"

# Directory of SVG face templates, relative to this file.
# Lookup order per record: <dir>/<id>/front.svg, then <dir>/front.svg
# (and the same for back.svg). A record with neither is exported without
# that face. Leave unset to use the built-in design.
# template_dir = "cards"

# ---------------------------------------------------------------------------
# Printed documents
# ---------------------------------------------------------------------------
[document]
# Landscape page size in millimeters (ISO/IEC 7810 ID-1).
width_mm = 85.6
height_mm = 53.98

# ---------------------------------------------------------------------------
# Archive layout
# ---------------------------------------------------------------------------
[archive]
images_dir = "images"
documents_dir = "documents"

# ---------------------------------------------------------------------------
# Export pacing
# ---------------------------------------------------------------------------
[export]
# Delay between records in milliseconds. 0 disables pacing.
pace_ms = 100

# Upper bound on rendering one face, in seconds.
render_timeout_secs = 10
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_matches_id1_card() {
        let config = ExportConfig::default();
        assert_eq!(config.canvas().pixel_size(), (960, 600));
        assert_eq!(config.document.width_mm, 85.6);
        assert_eq!(config.document.height_mm, 53.98);
        assert_eq!(config.export.pace(), Duration::from_millis(100));
        assert_eq!(config.export.render_timeout(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn default_archive_name_is_branded() {
        let config = ExportConfig::default();
        assert_eq!(config.archive_name(), "TOMO_Academy_ID_Cards.zip");
        assert_eq!(config.sheet_name(), "TOMO_Academy_All_ID_Cards.pdf");
    }

    #[test]
    fn archive_name_override_wins() {
        let mut config = ExportConfig::default();
        config.organization.archive_name = Some("cards.zip".to_string());
        assert_eq!(config.archive_name(), "cards.zip");
    }

    #[test]
    fn profile_url_joins_base_and_id() {
        let mut org = OrganizationConfig::default();
        assert_eq!(
            org.profile_url("emp-1").unwrap(),
            "https://tomoacademy.site/employee/emp-1"
        );
        org.profile_base_url = "https://x.test/people/".to_string();
        assert_eq!(org.profile_url("a").unwrap(), "https://x.test/people/a");
    }

    #[test]
    fn profile_url_encodes_id_as_one_segment() {
        let org = OrganizationConfig::default();
        assert_eq!(
            org.profile_url("emp 1?x#y/z").unwrap(),
            "https://tomoacademy.site/employee/emp%201%3Fx%23y%2Fz"
        );
    }

    #[test]
    fn profile_url_rejects_unusable_base() {
        let mut org = OrganizationConfig::default();
        org.profile_base_url = "employee".to_string();
        assert!(org.profile_url("a").is_err());
        org.profile_base_url = "mailto:hr@tomo".to_string();
        assert!(org.profile_url("a").is_err());
    }

    #[test]
    fn validate_rejects_non_http_profile_base() {
        let mut config = ExportConfig::default();
        config.organization.profile_base_url = "employee".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("profile_base_url"));

        config.organization.profile_base_url = "mailto:hr@tomo".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_oversized_canvas() {
        let mut config = ExportConfig::default();
        config.card.width = u32::MAX;
        config.card.height = u32::MAX / 2;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("card.width x card.scale"));

        let mut config = ExportConfig::default();
        config.card.scale = MAX_CANVAS_SIDE_PX;
        assert!(config.validate().is_err());
    }

    #[test]
    fn parse_partial_config() {
        let toml = r##"
[organization]
name = "Acme Corp"
"##;
        let config: ExportConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.organization.name, "Acme Corp");
        // Defaults preserved
        assert_eq!(config.organization.tagline, "EDUCATION ELEVATED");
        assert_eq!(config.card.scale, 3);
        assert_eq!(config.archive_name(), "Acme_Corp_ID_Cards.zip");
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(config.organization.name, "TOMO Academy");
        assert_eq!(config.archive.images_dir, "images");
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);
        fs::write(
            &path,
            r##"
[card]
background = "#fafafa"

[export]
pace_ms = 0
"##,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.canvas().background, [0xfa, 0xfa, 0xfa]);
        assert_eq!(config.export.pace_ms, 0);
        // Unspecified values should be defaults
        assert_eq!(config.export.render_timeout_secs, 10);
    }

    #[test]
    fn load_config_resolves_template_dir_next_to_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[card]\ntemplate_dir = \"cards\"\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.card.template_dir, Some(tmp.path().join("cards")));
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "this is not valid toml [[[").unwrap();

        assert!(matches!(load_config(&path), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_rejects_unknown_keys() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[card]\nwidht = 400\n").unwrap();

        assert!(matches!(load_config(&path), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[card]\nscale = 0\n").unwrap();

        assert!(matches!(
            load_config(&path),
            Err(ConfigError::Validation(_))
        ));
    }

    // =========================================================================
    // validate tests
    // =========================================================================

    #[test]
    fn validate_rejects_aspect_mismatch() {
        let mut config = ExportConfig::default();
        config.card.width = 200;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("aspect ratio"));
    }

    #[test]
    fn validate_accepts_scaled_canvas() {
        let mut config = ExportConfig::default();
        config.card.width = 640;
        config.card.height = 400;
        config.card.scale = 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_background() {
        let mut config = ExportConfig::default();
        config.card.background = "white".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_same_folders() {
        let mut config = ExportConfig::default();
        config.archive.documents_dir = "images".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_nested_folder() {
        let mut config = ExportConfig::default();
        config.archive.images_dir = "out/images".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_timeout_but_allows_zero_pace() {
        let mut config = ExportConfig::default();
        config.export.pace_ms = 0;
        assert!(config.validate().is_ok());
        config.export.render_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_non_positive_page() {
        let mut config = ExportConfig::default();
        config.document.height_mm = 0.0;
        assert!(config.validate().is_err());
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_overlays_nested_keys() {
        let base: toml::Value = toml::from_str("[a]\nx = 1\ny = 2\n").unwrap();
        let overlay: toml::Value = toml::from_str("[a]\ny = 3\n").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["a"]["x"].as_integer(), Some(1));
        assert_eq!(merged["a"]["y"].as_integer(), Some(3));
    }

    #[test]
    fn stock_config_toml_parses_to_defaults() {
        let config: ExportConfig = toml::from_str(stock_config_toml()).unwrap();
        let defaults = ExportConfig::default();
        assert_eq!(config.organization.name, defaults.organization.name);
        assert_eq!(config.card.width, defaults.card.width);
        assert_eq!(config.document.height_mm, defaults.document.height_mm);
        assert_eq!(config.export.pace_ms, defaults.export.pace_ms);
        assert!(config.validate().is_ok());
    }
}
