//! Upload validation: decide whether an object-finalized event is a masterlist.
//!
//! Buckets are shared with other uploads (quiz photos, avatars), so most
//! rejections are routine and must not be treated as failures.

use std::fmt;

use masterlist_shared::UploadEvent;
use masterlist_shared::paths::MASTERLIST_PREFIX;

/// Content type every masterlist upload must carry.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Minimum path shape: `masterlists/{professorId}/{classId}/{fileName}`.
const MIN_PATH_SEGMENTS: usize = 4;

/// Where a validated masterlist came from and which class it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterlistTarget {
    pub bucket: String,
    pub object_path: String,
    pub professor_id: String,
    pub class_id: String,
    pub file_name: String,
}

/// Why an event was ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The event carried no object path.
    MissingPath,
    /// The object is outside `masterlists/`.
    NotMasterlist { path: String },
    /// The object is not a PDF.
    NotPdf {
        path: String,
        content_type: Option<String>,
    },
    /// The path is under `masterlists/` but lacks professor/class segments.
    MalformedPath { path: String },
}

impl Rejection {
    /// Malformed masterlist paths indicate an uploader bug; everything else
    /// is an unrelated object sharing the bucket.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::MalformedPath { .. })
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingPath => write!(f, "event has no object path"),
            Self::NotMasterlist { path } => write!(f, "{path} is not under {MASTERLIST_PREFIX}"),
            Self::NotPdf { path, content_type } => write!(
                f,
                "{path} has content type {}, expected {PDF_CONTENT_TYPE}",
                content_type.as_deref().unwrap_or("<none>")
            ),
            Self::MalformedPath { path } => write!(
                f,
                "invalid file path structure: {path} (expected {MASTERLIST_PREFIX}{{professorId}}/{{classId}}/{{fileName}})"
            ),
        }
    }
}

/// Validate an event and extract the owning professor and class.
pub fn validate_upload(event: &UploadEvent) -> Result<MasterlistTarget, Rejection> {
    let Some(path) = event.name.as_deref().filter(|p| !p.is_empty()) else {
        return Err(Rejection::MissingPath);
    };

    if !path.starts_with(MASTERLIST_PREFIX) {
        return Err(Rejection::NotMasterlist { path: path.into() });
    }

    let is_pdf = event
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.starts_with(PDF_CONTENT_TYPE));
    if !is_pdf {
        return Err(Rejection::NotPdf {
            path: path.into(),
            content_type: event.content_type.clone(),
        });
    }

    let segments: Vec<&str> = path.split('/').collect();
    if segments.len() < MIN_PATH_SEGMENTS {
        return Err(Rejection::MalformedPath { path: path.into() });
    }

    Ok(MasterlistTarget {
        bucket: event.bucket.clone(),
        object_path: path.to_string(),
        professor_id: segments[1].to_string(),
        class_id: segments[2].to_string(),
        file_name: segments[segments.len() - 1].to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(name: Option<&str>, content_type: Option<&str>) -> UploadEvent {
        UploadEvent {
            bucket: "uploads".into(),
            name: name.map(String::from),
            content_type: content_type.map(String::from),
        }
    }

    #[test]
    fn accepts_masterlist_pdf() {
        let target = validate_upload(&event(
            Some("masterlists/prof-1/class-9/roster.pdf"),
            Some("application/pdf"),
        ))
        .unwrap();
        assert_eq!(target.professor_id, "prof-1");
        assert_eq!(target.class_id, "class-9");
        assert_eq!(target.file_name, "roster.pdf");
        assert_eq!(target.bucket, "uploads");
        assert_eq!(target.object_path, "masterlists/prof-1/class-9/roster.pdf");
    }

    #[test]
    fn accepts_content_type_with_parameters() {
        let target = validate_upload(&event(
            Some("masterlists/p/c/roster.pdf"),
            Some("application/pdf; charset=binary"),
        ));
        assert!(target.is_ok());
    }

    #[test]
    fn extra_segments_use_first_two_ids() {
        let target = validate_upload(&event(
            Some("masterlists/p1/c1/2024/sem-1/roster.pdf"),
            Some("application/pdf"),
        ))
        .unwrap();
        assert_eq!(target.professor_id, "p1");
        assert_eq!(target.class_id, "c1");
        assert_eq!(target.file_name, "roster.pdf");
    }

    #[test]
    fn rejects_missing_path() {
        assert_eq!(
            validate_upload(&event(None, Some("application/pdf"))),
            Err(Rejection::MissingPath)
        );
        assert_eq!(
            validate_upload(&event(Some(""), Some("application/pdf"))),
            Err(Rejection::MissingPath)
        );
    }

    #[test]
    fn rejects_other_prefixes() {
        let err = validate_upload(&event(
            Some("answers/p1/c1/photo.pdf"),
            Some("application/pdf"),
        ))
        .unwrap_err();
        assert!(matches!(err, Rejection::NotMasterlist { .. }));
        assert!(!err.is_error());
    }

    #[test]
    fn rejects_non_pdf_content() {
        let err = validate_upload(&event(
            Some("masterlists/p1/c1/roster.png"),
            Some("image/png"),
        ))
        .unwrap_err();
        assert!(matches!(err, Rejection::NotPdf { .. }));
        assert!(err.to_string().contains("image/png"));

        let err = validate_upload(&event(Some("masterlists/p1/c1/roster.pdf"), None)).unwrap_err();
        assert!(err.to_string().contains("<none>"));
    }

    #[test]
    fn rejects_short_paths_as_error() {
        let err = validate_upload(&event(Some("masterlists/p1/roster.pdf"), Some("application/pdf")))
            .unwrap_err();
        assert_eq!(
            err,
            Rejection::MalformedPath {
                path: "masterlists/p1/roster.pdf".into()
            }
        );
        assert!(err.is_error());
    }

    #[test]
    fn prefix_and_type_checked_before_shape() {
        // A short path with the wrong type is reported as a type problem.
        let err = validate_upload(&event(Some("masterlists/p1"), Some("text/plain"))).unwrap_err();
        assert!(matches!(err, Rejection::NotPdf { .. }));
    }
}
