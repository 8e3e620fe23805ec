//! Format adapters: one per input modality, each turning an artifact's bytes
//! into raw field maps for the normalizer.

pub mod document;
pub mod keyvalue;
pub mod object;
pub mod pdf;
pub mod sanitize;
pub mod tabular;
pub mod types;

pub use document::*;
pub use keyvalue::*;
pub use object::*;
pub use pdf::*;
pub use sanitize::*;
pub use tabular::*;
pub use types::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("Could not parse {artifact}: {cause}")]
    Parse { artifact: String, cause: String },

    #[error("{artifact} is not valid UTF-8 text: {cause}")]
    Encoding { artifact: String, cause: String },

    #[error("No text could be extracted from {artifact}")]
    Extraction { artifact: String },

    #[error("{artifact} contains no usable patient records")]
    NoRecords { artifact: String },

    #[error("PDF text extraction failed for {artifact}: {cause}")]
    Pdf { artifact: String, cause: String },
}

impl FormatError {
    /// Name of the artifact the error belongs to.
    pub fn artifact(&self) -> &str {
        match self {
            Self::Parse { artifact, .. }
            | Self::Encoding { artifact, .. }
            | Self::Extraction { artifact }
            | Self::NoRecords { artifact }
            | Self::Pdf { artifact, .. } => artifact,
        }
    }

    pub(crate) fn parse(artifact: &str, cause: impl std::fmt::Display) -> Self {
        Self::Parse {
            artifact: artifact.to_string(),
            cause: cause.to_string(),
        }
    }
}
