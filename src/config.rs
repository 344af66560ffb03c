use std::path::PathBuf;

use crate::analysis::kinds::ResponseKind;
use crate::analysis::llm::CompletionOptions;

/// Application-level constants
pub const APP_NAME: &str = "NeuroReport";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Timeout for the comprehensive report, which synthesizes the most content.
const COMPREHENSIVE_TIMEOUT_SECS: u64 = 120;

/// Timeout for the single-signal analyses.
const DEFAULT_TIMEOUT_SECS: u64 = 90;

/// Get the application data directory
/// ~/NeuroReport/ on all platforms (user-visible, per design requirement)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("NeuroReport")
}

/// Get the report archive directory
pub fn reports_dir() -> PathBuf {
    app_data_dir().join("reports")
}

/// Everything the analysis runner needs to talk to the completion API and
/// bound its retry behavior.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    /// Total LLM call attempts per analysis, first try included.
    pub max_attempts: usize,
    /// Linear backoff step between transient-failure retries.
    pub retry_backoff_ms: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            api_key: None,
            model: "gemma2:9b".to_string(),
            temperature: 0.3,
            max_output_tokens: 4096,
            max_attempts: 3,
            retry_backoff_ms: 1_000,
        }
    }
}

impl AnalysisConfig {
    /// Per-kind completion timeout: the comprehensive report gets longer.
    pub fn timeout_secs(&self, kind: ResponseKind) -> u64 {
        match kind {
            ResponseKind::Comprehensive => COMPREHENSIVE_TIMEOUT_SECS,
            _ => DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Resolve the call parameters for one analysis kind.
    pub fn completion_options(&self, kind: ResponseKind) -> CompletionOptions {
        CompletionOptions {
            model: self.model.clone(),
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
            timeout_secs: self.timeout_secs(kind),
        }
    }
}
