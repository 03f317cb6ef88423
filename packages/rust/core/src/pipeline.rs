//! End-to-end ingestion: upload event → validate → download → extract → parse → merge.
//!
//! The pipeline has no response channel. Callers learn the result by reading
//! the class's student collection; [`IngestOutcome`] exists for logging and
//! the CLI summary only.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use masterlist_extract::TextExtractor;
use masterlist_roster::RosterParser;
use masterlist_shared::{Result, UploadEvent, paths};
use masterlist_storage::{DocumentSource, Storage};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::validator::{MasterlistTarget, Rejection, validate_upload};

/// How many extracted lines to include in the debug sample.
const SAMPLE_LINES: usize = 20;

/// What one invocation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The event was not a masterlist upload; nothing was read or written.
    Rejected(Rejection),
    /// The document parsed to zero students; nothing was written.
    Empty,
    /// `count` student records were merged into the class collection.
    Written { count: usize },
    /// Download, extraction, or the write failed; nothing was written.
    Failed { message: String },
}

/// Masterlist ingestion handler.
///
/// Holds only injected clients. Each [`handle`](Self::handle) call is an
/// independent invocation, so one pipeline may serve concurrent events.
pub struct MasterlistPipeline {
    source: Arc<dyn DocumentSource>,
    extractor: Arc<dyn TextExtractor>,
    storage: Arc<Storage>,
    parser: RosterParser,
}

impl MasterlistPipeline {
    pub fn new(
        source: Arc<dyn DocumentSource>,
        extractor: Arc<dyn TextExtractor>,
        storage: Arc<Storage>,
        parser: RosterParser,
    ) -> Self {
        Self {
            source,
            extractor,
            storage,
            parser,
        }
    }

    /// Handle one object-finalized event.
    ///
    /// Never returns an error: rejections and failures are logged here, with
    /// the object path, and reported through the outcome.
    #[instrument(
        skip_all,
        fields(
            invocation = %Uuid::now_v7(),
            bucket = %event.bucket,
            object_path = event.name.as_deref().unwrap_or(""),
        )
    )]
    pub async fn handle(&self, event: &UploadEvent) -> IngestOutcome {
        let target = match validate_upload(event) {
            Ok(target) => target,
            Err(rejection) => {
                if rejection.is_error() {
                    error!(%rejection, "rejected masterlist upload");
                } else {
                    info!(%rejection, "file is not a masterlist PDF");
                }
                return IngestOutcome::Rejected(rejection);
            }
        };

        match self.ingest(&target).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(
                    object_path = %target.object_path,
                    professor_id = %target.professor_id,
                    class_id = %target.class_id,
                    error = %e,
                    "error processing masterlist"
                );
                IngestOutcome::Failed {
                    message: e.to_string(),
                }
            }
        }
    }

    /// Run the download → extract → parse → merge steps for a validated target.
    pub async fn ingest(&self, target: &MasterlistTarget) -> Result<IngestOutcome> {
        let start = Instant::now();

        let data = self
            .source
            .download(&target.bucket, &target.object_path)
            .await?;
        let size = data.len();

        let text = self.extractor.extract_text(data).await?;
        debug!(
            sample = ?text.split('\n').take(SAMPLE_LINES).collect::<Vec<_>>(),
            "PDF text lines sample"
        );

        let roster = self.parser.parse(&text, Utc::now());
        let stats = roster.stats;
        info!(
            student_count = roster.yield_count(),
            lines = stats.lines,
            id_lines = stats.id_lines,
            dropped = stats.dropped,
            duplicates = stats.duplicates,
            size,
            "parsed students from PDF"
        );

        if roster.students.is_empty() {
            warn!(object_path = %target.object_path, "no students found in PDF");
            return Ok(IngestOutcome::Empty);
        }

        let count = self
            .storage
            .merge_students(&target.professor_id, &target.class_id, &roster.students)
            .await?;

        info!(
            count,
            class_id = %target.class_id,
            path = %paths::students(&target.professor_id, &target.class_id),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "students added to class"
        );

        Ok(IngestOutcome::Written { count })
    }
}
