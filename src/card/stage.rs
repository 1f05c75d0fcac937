//! Off-screen staging of card faces.
//!
//! A [`FaceLocator`] turns a roster record into a detached [`FaceMarkup`]
//! for one side. Staging resolves everything the face shows up front (the
//! photo is read and embedded, the QR code is encoded) so the markup is
//! self-contained and rendering it never touches shared state.
//!
//! ## Face Resolution
//!
//! With a template directory configured, [`Staging`] looks for, in order:
//!
//! ```text
//! <template_dir>/<id>/front.svg     # per-record override
//! <template_dir>/front.svg          # shared template
//! ```
//!
//! `<id>` is the record id escaped with [`naming::sanitize_id`], so plain
//! ids like `emp-001` are used as-is and `emp_001` becomes `emp_5F001`.
//!
//! If neither exists the face is missing (`Ok(None)`), and the record is
//! exported without it. Without a template directory every record uses the
//! built-in design, so no face is ever missing.

use super::design::{self, CardFields};
use super::face::{FaceMarkup, Side};
use super::qr;
use super::renderer::RenderError;
use super::template;
use crate::config::{ExportConfig, OrganizationConfig};
use crate::naming;
use crate::roster::CardRecord;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::ImageFormat;
use std::fs;
use std::path::{Path, PathBuf};

/// Resolves the markup for one face of a record.
pub trait FaceLocator {
    /// Stage `side` of `record`.
    ///
    /// `Ok(None)` means the face does not exist for this record.
    fn locate(&self, record: &CardRecord, side: Side) -> Result<Option<FaceMarkup>, RenderError>;
}

/// Production locator: templates or the built-in design, plus photos on disk.
#[derive(Debug, Clone)]
pub struct Staging {
    organization: OrganizationConfig,
    template_dir: Option<PathBuf>,
    photo_root: PathBuf,
}

impl Staging {
    pub fn new(
        organization: OrganizationConfig,
        template_dir: Option<PathBuf>,
        photo_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            organization,
            template_dir,
            photo_root: photo_root.into(),
        }
    }

    /// Staging for `config`, resolving relative photo paths against `photo_root`.
    pub fn from_config(config: &ExportConfig, photo_root: &Path) -> Self {
        Self::new(
            config.organization.clone(),
            config.card.template_dir.clone(),
            photo_root,
        )
    }

    /// Resolve every value a face can show.
    pub fn fields(&self, record: &CardRecord) -> Result<CardFields, RenderError> {
        let profile_url = self
            .organization
            .profile_url(&record.id)
            .map_err(|e| RenderError::Qr(format!("invalid profile URL: {e}")))?;
        let qr = qr::encode(&profile_url)?;
        let photo = match &record.photo {
            Some(path) => Some(self.photo_data_uri(path)?),
            None => None,
        };
        Ok(CardFields {
            name: record.display_name.clone(),
            role: record.role.clone(),
            employee_id: record.employee_id.clone(),
            location: record.location_or_default().to_string(),
            initials: naming::initials(&record.display_name),
            profile_url,
            organization: self.organization.name.clone(),
            tagline: self.organization.tagline.clone(),
            website: self.organization.website.clone(),
            email: self.organization.email.clone(),
            member_year: self.organization.member_year,
            photo,
            qr,
        })
    }

    /// First existing template for this face, if a template directory is set.
    fn template_path(&self, dir: &Path, record: &CardRecord, side: Side) -> Option<PathBuf> {
        let file = format!("{side}.svg");
        [
            dir.join(naming::sanitize_id(&record.id)).join(&file),
            dir.join(&file),
        ]
        .into_iter()
        .find(|p| p.is_file())
    }

    fn photo_data_uri(&self, path: &Path) -> Result<String, RenderError> {
        let full = self.photo_root.join(path);
        let photo_err = |reason: String| RenderError::Photo {
            path: full.display().to_string(),
            reason,
        };

        let bytes = fs::read(&full).map_err(|e| photo_err(e.to_string()))?;
        let mime = match image::guess_format(&bytes) {
            Ok(ImageFormat::Png) => "image/png",
            Ok(ImageFormat::Jpeg) => "image/jpeg",
            Ok(ImageFormat::Gif) => "image/gif",
            Ok(ImageFormat::WebP) => "image/webp",
            Ok(other) => return Err(photo_err(format!("unsupported format {other:?}"))),
            Err(e) => return Err(photo_err(e.to_string())),
        };
        Ok(format!("data:{mime};base64,{}", STANDARD.encode(&bytes)))
    }
}

impl FaceLocator for Staging {
    fn locate(&self, record: &CardRecord, side: Side) -> Result<Option<FaceMarkup>, RenderError> {
        let svg = match &self.template_dir {
            Some(dir) => {
                let Some(path) = self.template_path(dir, record, side) else {
                    tracing::debug!(record = %record.id, %side, "no template for face");
                    return Ok(None);
                };
                tracing::debug!(record = %record.id, %side, template = %path.display(), "staging from template");
                let source = fs::read_to_string(&path)?;
                template::fill(&source, &self.fields(record)?)?
            }
            None => design::render(side, &self.fields(record)?),
        };
        Ok(Some(FaceMarkup {
            record_id: record.id.clone(),
            side,
            svg,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{record, write_png};
    use tempfile::TempDir;

    fn staging(template_dir: Option<PathBuf>, photo_root: &Path) -> Staging {
        Staging::new(OrganizationConfig::default(), template_dir, photo_root)
    }

    #[test]
    fn builtin_design_always_has_both_faces() {
        let tmp = TempDir::new().unwrap();
        let staging = staging(None, tmp.path());
        let rec = record("emp-1", "Jane Doe", "E001");

        for side in Side::BOTH {
            let face = staging.locate(&rec, side).unwrap().unwrap();
            assert_eq!(face.record_id, "emp-1");
            assert_eq!(face.side, side);
            assert!(face.svg.starts_with("<svg"));
        }
    }

    #[test]
    fn fields_resolve_defaults() {
        let tmp = TempDir::new().unwrap();
        let fields = staging(None, tmp.path())
            .fields(&record("emp-1", "Jane Doe", "E001"))
            .unwrap();

        assert_eq!(fields.initials, "JD");
        assert_eq!(fields.location, "Remote");
        assert_eq!(fields.profile_url, "https://tomoacademy.site/employee/emp-1");
        assert_eq!(fields.organization, "TOMO Academy");
        assert!(fields.photo.is_none());
    }

    #[test]
    fn profile_url_escapes_record_id() {
        let tmp = TempDir::new().unwrap();
        let fields = staging(None, tmp.path())
            .fields(&record("team a/7?", "Jane Doe", "E001"))
            .unwrap();
        assert_eq!(
            fields.profile_url,
            "https://tomoacademy.site/employee/team%20a%2F7%3F"
        );
    }

    #[test]
    fn unusable_profile_base_is_render_error() {
        let tmp = TempDir::new().unwrap();
        let mut org = OrganizationConfig::default();
        org.profile_base_url = "not a url".to_string();
        let staging = Staging::new(org, None, tmp.path());

        let result = staging.locate(&record("emp-1", "Jane Doe", "E001"), Side::Front);
        assert!(matches!(result, Err(RenderError::Qr(_))));
    }

    #[test]
    fn photo_is_embedded_as_data_uri() {
        let tmp = TempDir::new().unwrap();
        write_png(&tmp.path().join("jane.png"), 4, 4);
        let mut rec = record("emp-1", "Jane Doe", "E001");
        rec.photo = Some(PathBuf::from("jane.png"));

        let fields = staging(None, tmp.path()).fields(&rec).unwrap();
        assert!(fields.photo.unwrap().starts_with("data:image/png;base64,"));
    }

    #[test]
    fn missing_photo_is_render_error() {
        let tmp = TempDir::new().unwrap();
        let mut rec = record("emp-1", "Jane Doe", "E001");
        rec.photo = Some(PathBuf::from("gone.jpg"));

        let result = staging(None, tmp.path()).locate(&rec, Side::Front);
        assert!(matches!(result, Err(RenderError::Photo { .. })));
    }

    #[test]
    fn non_image_photo_is_render_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("notes.txt"), "hello").unwrap();
        let mut rec = record("emp-1", "Jane Doe", "E001");
        rec.photo = Some(PathBuf::from("notes.txt"));

        let result = staging(None, tmp.path()).fields(&rec);
        assert!(matches!(result, Err(RenderError::Photo { .. })));
    }

    #[test]
    fn shared_template_is_filled() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("front.svg"), "<svg>{name} {employee_id}</svg>").unwrap();
        let staging = staging(Some(tmp.path().to_path_buf()), tmp.path());

        let face = staging
            .locate(&record("emp-1", "Jane Doe", "E001"), Side::Front)
            .unwrap()
            .unwrap();
        assert_eq!(face.svg, "<svg>Jane Doe E001</svg>");
    }

    #[test]
    fn per_record_template_overrides_shared() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("back.svg"), "<svg>shared</svg>").unwrap();
        fs::create_dir(tmp.path().join("emp-2")).unwrap();
        fs::write(tmp.path().join("emp-2/back.svg"), "<svg>special {name}</svg>").unwrap();
        let staging = staging(Some(tmp.path().to_path_buf()), tmp.path());

        let one = staging
            .locate(&record("emp-1", "A", "1"), Side::Back)
            .unwrap()
            .unwrap();
        let two = staging
            .locate(&record("emp-2", "B", "2"), Side::Back)
            .unwrap()
            .unwrap();
        assert_eq!(one.svg, "<svg>shared</svg>");
        assert_eq!(two.svg, "<svg>special B</svg>");
    }

    #[test]
    fn absent_template_is_missing_face() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("front.svg"), "<svg/>").unwrap();
        let staging = staging(Some(tmp.path().to_path_buf()), tmp.path());

        let rec = record("emp-1", "Jane Doe", "E001");
        assert!(staging.locate(&rec, Side::Front).unwrap().is_some());
        assert!(staging.locate(&rec, Side::Back).unwrap().is_none());
    }

    #[test]
    fn template_typo_is_render_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("front.svg"), "<svg>{nmae}</svg>").unwrap();
        let staging = staging(Some(tmp.path().to_path_buf()), tmp.path());

        let result = staging.locate(&record("emp-1", "Jane", "E1"), Side::Front);
        assert!(matches!(result, Err(RenderError::Template(_))));
    }
}
