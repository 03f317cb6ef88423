//! Core domain types for masterlist ingestion.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MasterlistError, Result};

// ---------------------------------------------------------------------------
// UploadEvent
// ---------------------------------------------------------------------------

/// A storage object-finalized notification.
///
/// Field names follow the platform payload (`bucket`, `name`, `contentType`),
/// so an event captured from the storage trigger deserializes as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadEvent {
    /// Bucket that received the object.
    pub bucket: String,
    /// Full object path within the bucket.
    #[serde(default)]
    pub name: Option<String>,
    /// MIME type reported by the uploader.
    #[serde(default)]
    pub content_type: Option<String>,
}

impl UploadEvent {
    /// Build an event for an object that was just written.
    pub fn finalized(
        bucket: impl Into<String>,
        name: impl Into<String>,
        content_type: Option<&str>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            name: Some(name.into()),
            content_type: content_type.map(String::from),
        }
    }

    /// Decode a captured platform payload.
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| MasterlistError::parse(format!("invalid upload event: {e}")))
    }
}

// ---------------------------------------------------------------------------
// StudentRecord
// ---------------------------------------------------------------------------

/// One student parsed from a masterlist, stored under
/// `professors/{professorId}/classes/{classId}/students/{studentId}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    /// Student number in `TUPM-NN-NNNN` shape, as captured from the document.
    pub student_id: String,
    /// Cleaned display name.
    pub name: String,
    /// When this record was last ingested.
    pub added_at: DateTime<Utc>,
}

/// Parsed students keyed by `student_id`. Inserting an existing key replaces it.
pub type StudentMap = BTreeMap<String, StudentRecord>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_event_from_platform_payload() {
        let json = r#"{
            "bucket": "classroom-app.appspot.com",
            "name": "masterlists/prof-1/class-9/roster.pdf",
            "contentType": "application/pdf",
            "size": "20481"
        }"#;
        let event: UploadEvent = serde_json::from_str(json).expect("deserialize event");
        assert_eq!(event.bucket, "classroom-app.appspot.com");
        assert_eq!(
            event.name.as_deref(),
            Some("masterlists/prof-1/class-9/roster.pdf")
        );
        assert_eq!(event.content_type.as_deref(), Some("application/pdf"));
    }

    #[test]
    fn upload_event_bad_payload_is_parse_error() {
        let err = UploadEvent::from_json(r#"{"name": "masterlists/p/c/r.pdf"}"#).unwrap_err();
        assert!(matches!(err, MasterlistError::Parse { .. }));
        assert!(err.to_string().contains("bucket"));

        assert!(matches!(
            UploadEvent::from_json("not json"),
            Err(MasterlistError::Parse { .. })
        ));
        assert_eq!(
            UploadEvent::from_json(r#"{"bucket": "b", "name": "x"}"#).unwrap(),
            UploadEvent::finalized("b", "x", None)
        );
    }

    #[test]
    fn upload_event_missing_optional_fields() {
        let event: UploadEvent =
            serde_json::from_str(r#"{"bucket": "b"}"#).expect("deserialize event");
        assert!(event.name.is_none());
        assert!(event.content_type.is_none());
    }

    #[test]
    fn student_record_uses_camel_case() {
        let record = StudentRecord {
            student_id: "TUPM-22-1234".into(),
            name: "Dela Cruz, Juan".into(),
            added_at: Utc::now(),
        };
        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(json["studentId"], "TUPM-22-1234");
        assert_eq!(json["name"], "Dela Cruz, Juan");
        assert!(json["addedAt"].is_string());

        let parsed: StudentRecord = serde_json::from_value(json).expect("deserialize");
        assert_eq!(parsed, record);
    }
}
