//! Diagnostic analysis: prompt building over a record batch, the reasoning
//! model call, and repair/filtering of what comes back.

pub mod engine;
pub mod filter;
pub mod ollama;
pub mod parser;
pub mod prompt;
pub mod repair;
pub mod sanitize;
pub mod specialty;
pub mod summary;
pub mod types;

pub use engine::*;
pub use filter::*;
pub use ollama::*;
pub use parser::*;
pub use prompt::*;
pub use repair::*;
pub use sanitize::*;
pub use specialty::*;
pub use summary::*;
pub use types::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Reasoning model unreachable: {0}")]
    Transport(String),

    #[error("Reasoning model returned error (status {status}): {body}")]
    ModelStatus { status: u16, body: String },

    #[error("Reasoning model returned an empty response")]
    EmptyResponse,

    #[error("No patient data to analyze")]
    NoPatientData,

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

impl EngineError {
    /// Transport-class failures worth another attempt: connection problems,
    /// timeouts, server errors and rate limiting.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::ModelStatus { status, .. } => *status == 429 || *status >= 500,
            Self::EmptyResponse | Self::NoPatientData | Self::HttpClient(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(EngineError::Transport("refused".into()).is_retryable());
        assert!(EngineError::ModelStatus { status: 503, body: String::new() }.is_retryable());
        assert!(EngineError::ModelStatus { status: 429, body: String::new() }.is_retryable());
        assert!(!EngineError::ModelStatus { status: 404, body: "model not found".into() }.is_retryable());
        assert!(!EngineError::EmptyResponse.is_retryable());
        assert!(!EngineError::HttpClient("bad body".into()).is_retryable());
    }
}
