//! Ingestion coordinator: dispatches uploaded artifacts to format adapters by
//! declared type and collects per-artifact failures without aborting a batch.

pub mod format;
pub mod importer;

pub use format::*;
pub use importer::*;

use thiserror::Error;

use crate::pipeline::extraction::FormatError;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Unsupported declared type: {0}")]
    UnsupportedType(String),

    #[error("Artifact too large: {size_mb:.1}MB exceeds {max_mb}MB limit")]
    TooLarge { size_mb: f64, max_mb: u64 },

    #[error(transparent)]
    Format(#[from] FormatError),
}
