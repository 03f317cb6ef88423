//! Masterlist ingestion: upload event → validated target → PDF text →
//! parsed roster → merged student collection.
//!
//! [`pipeline::MasterlistPipeline`] is the one-way handler for storage
//! upload events; [`validator`] decides which events it acts on.

pub mod pipeline;
pub mod validator;

pub use pipeline::{IngestOutcome, MasterlistPipeline};
pub use validator::{MasterlistTarget, Rejection, validate_upload};
