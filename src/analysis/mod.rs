pub mod kinds;
pub mod llm;
pub mod prompt;
pub mod extract;
pub mod sanitize;
pub mod truncation;
pub mod validate;
pub mod repair;
pub mod fallback;
pub mod pipeline;

pub use kinds::*;
pub use llm::*;
pub use prompt::*;
pub use extract::*;
pub use sanitize::*;
pub use truncation::*;
pub use validate::*;
pub use repair::*;
pub use fallback::*;
pub use pipeline::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Completion API is not reachable at {0}")]
    Connection(String),

    #[error("Completion API returned error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Completion request timed out after {0}s")]
    Timeout(u64),

    #[error("Failed to decode completion API response: {0}")]
    ResponseDecoding(String),

    #[error("Model returned an empty completion")]
    EmptyCompletion,

    #[error("Analysis failed after {attempts} attempts: {last_error}")]
    AnalysisFailed { attempts: usize, last_error: String },
}

impl AnalysisError {
    /// Transient transport failures worth retrying at the call level.
    pub fn is_retryable(&self) -> bool {
        match self {
            AnalysisError::Connection(_) | AnalysisError::Timeout(_) => true,
            AnalysisError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
