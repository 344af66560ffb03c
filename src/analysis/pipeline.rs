//! Resilience pipeline over raw model completions, and the retry-driving
//! runner that feeds it.
//!
//! Extraction tries every candidate pattern, sanitizes each candidate, and
//! parses the first that survives. Validation decides whether structural
//! repair is needed; when nothing parses at all, a fallback response is
//! synthesized from the raw text. The runner wraps this in a bounded attempt
//! loop that retries transient transport failures and re-prompts the model
//! after parse failures.

use serde_json::Value;
use tracing::{info, info_span, warn};

use crate::config::AnalysisConfig;

use super::extract::candidates;
use super::fallback::salvage_fields;
use super::kinds::ResponseKind;
use super::llm::{CompletionClient, HttpCompletionClient};
use super::prompt::{
    build_analysis_prompt, build_retry_prompt, FailureSummary, ANALYSIS_SYSTEM_PROMPT,
};
use super::repair::repair;
use super::sanitize::sanitize;
use super::validate::{validate, ValidationResult};
use super::AnalysisError;

/// How one extraction's result came to be. All flags are observable so the
/// UI can badge provisional reports; recovery itself is silent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionOutcome {
    /// 1-based extraction pattern that produced the winning candidate.
    /// `None` when the result came from the fallback synthesizer.
    pub pattern: Option<usize>,
    /// The winning candidate needed textual fixes before it parsed.
    pub sanitized: bool,
    /// Structural repair filled in missing or malformed required fields.
    pub repaired: bool,
    /// No candidate parsed; the result was synthesized from raw text.
    pub fallback: bool,
}

/// A structurally complete response plus how it was obtained.
///
/// `validation` describes the value as parsed (or, on the fallback path, as
/// salvaged), before any repair, so the completeness score reflects what the
/// model actually produced.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub result: Value,
    pub validation: ValidationResult,
    pub outcome: ExtractionOutcome,
}

/// Run the full extract-sanitize-validate-repair ladder over one completion.
///
/// Total: every non-empty input produces a structurally complete response.
/// The only error is an empty completion, which has nothing to recover from.
pub fn run_resilient_extraction(
    raw: &str,
    kind: ResponseKind,
) -> Result<Extraction, AnalysisError> {
    if raw.trim().is_empty() {
        return Err(AnalysisError::EmptyCompletion);
    }

    match try_parse_candidates(raw) {
        Ok((value, pattern, sanitized)) => {
            let validation = validate(&value, kind);
            let needs_repair = validation.critical_count() > 0;
            let result = if needs_repair {
                repair(&value, kind)
            } else {
                value
            };
            Ok(Extraction {
                result,
                validation,
                outcome: ExtractionOutcome {
                    pattern: Some(pattern),
                    sanitized,
                    repaired: needs_repair,
                    fallback: false,
                },
            })
        }
        Err(_) => fallback_extraction(raw, kind),
    }
}

/// Synthesize an extraction from raw text via field salvage. Validation runs
/// on the salvaged fields alone, so the completeness score reflects how much
/// of the response was recovered rather than defaulted.
fn fallback_extraction(raw: &str, kind: ResponseKind) -> Result<Extraction, AnalysisError> {
    if raw.trim().is_empty() {
        return Err(AnalysisError::EmptyCompletion);
    }

    let partial = Value::Object(salvage_fields(raw));
    let validation = validate(&partial, kind);
    let result = repair(&partial, kind);
    Ok(Extraction {
        result,
        validation,
        outcome: ExtractionOutcome {
            pattern: None,
            sanitized: false,
            repaired: false,
            fallback: true,
        },
    })
}

/// Try every extraction candidate in confidence order; return the first that
/// sanitizes into parseable JSON, with its pattern and whether fixes were
/// needed. The error carries the first candidate's parse diagnostics, the
/// most specific description of what went wrong.
fn try_parse_candidates(raw: &str) -> Result<(Value, usize, bool), String> {
    let mut first_error: Option<String> = None;

    for candidate in candidates(raw) {
        let sanitized = sanitize(&candidate.text);
        if sanitized.success {
            match serde_json::from_str::<Value>(&sanitized.sanitized_text) {
                Ok(value) => {
                    return Ok((value, candidate.pattern, !sanitized.applied_fixes.is_empty()))
                }
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e.to_string());
                    }
                }
            }
        } else if first_error.is_none() {
            first_error = sanitized.errors.first().cloned();
        }
    }

    Err(first_error.unwrap_or_else(|| "no extraction candidates found".to_string()))
}

/// One completed analysis: the structured response plus run metadata.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub kind: ResponseKind,
    pub extraction: Extraction,
    /// LLM call attempts consumed, first try included.
    pub attempts: usize,
}

/// EEG and PPG analyses produced from the same session's metrics.
#[derive(Debug)]
pub struct CompositeAnalysis {
    pub eeg: AnalysisReport,
    pub ppg: AnalysisReport,
}

/// Drives the completion client and the extraction pipeline with a bounded
/// retry budget. Transient transport failures back off and retry; parse
/// failures re-prompt the model with a summary of what was wrong; once the
/// budget is spent, the last non-empty completion feeds the fallback
/// synthesizer so a report is produced whenever the model said anything at
/// all.
pub struct AnalysisRunner {
    client: Box<dyn CompletionClient>,
    config: AnalysisConfig,
}

impl AnalysisRunner {
    pub fn new(client: Box<dyn CompletionClient>, config: AnalysisConfig) -> Self {
        Self { client, config }
    }

    /// Build a runner talking to the configured completion endpoint.
    pub fn from_config(config: AnalysisConfig) -> Self {
        let client = HttpCompletionClient::new(&config.base_url, config.api_key.clone());
        Self::new(Box::new(client), config)
    }

    pub fn run(
        &self,
        kind: ResponseKind,
        metrics_block: &str,
    ) -> Result<AnalysisReport, AnalysisError> {
        let span = info_span!("analysis", kind = kind.as_str());
        let _guard = span.enter();

        let options = self.config.completion_options(kind);
        let mut prompt = build_analysis_prompt(kind, metrics_block);
        let mut last_error = String::new();
        // Kept across attempts so a trailing transport failure can still
        // salvage a report from an earlier unparseable completion.
        let mut last_raw: Option<String> = None;

        for attempt in 1..=self.config.max_attempts {
            let raw = match self.client.complete(&prompt, ANALYSIS_SYSTEM_PROMPT, &options) {
                Ok(raw) => raw,
                Err(e) if e.is_retryable() => {
                    warn!(attempt, error = %e, "transient completion failure");
                    last_error = e.to_string();
                    if attempt < self.config.max_attempts {
                        self.backoff(attempt);
                    }
                    continue;
                }
                Err(e) => return Err(e),
            };

            match try_parse_candidates(&raw) {
                Ok((value, pattern, sanitized)) => {
                    let validation = validate(&value, kind);
                    let needs_repair = validation.critical_count() > 0;
                    let result = if needs_repair {
                        repair(&value, kind)
                    } else {
                        value
                    };
                    info!(
                        attempt,
                        pattern,
                        sanitized,
                        repaired = needs_repair,
                        completeness = validation.score,
                        "analysis complete"
                    );
                    return Ok(AnalysisReport {
                        kind,
                        extraction: Extraction {
                            result,
                            validation,
                            outcome: ExtractionOutcome {
                                pattern: Some(pattern),
                                sanitized,
                                repaired: needs_repair,
                                fallback: false,
                            },
                        },
                        attempts: attempt,
                    });
                }
                Err(parse_error) => {
                    warn!(attempt, error = %parse_error, "no candidate parsed");
                    last_error = parse_error.clone();
                    if attempt < self.config.max_attempts {
                        let failure = FailureSummary::new(attempt, &parse_error, &raw);
                        prompt = build_retry_prompt(kind, metrics_block, &failure);
                    }
                    if !raw.trim().is_empty() {
                        last_raw = Some(raw);
                    }
                }
            }
        }

        // Out of attempts. If any attempt produced text, salvage a report
        // from the most recent completion instead of failing.
        if let Some(raw) = last_raw {
            info!("analysis completed via fallback synthesis after exhausting attempts");
            let extraction = fallback_extraction(&raw, kind)?;
            return Ok(AnalysisReport {
                kind,
                extraction,
                attempts: self.config.max_attempts,
            });
        }

        Err(AnalysisError::AnalysisFailed {
            attempts: self.config.max_attempts,
            last_error,
        })
    }

    /// Run the EEG and PPG analyses concurrently for one session.
    pub fn run_composite(
        &self,
        eeg_metrics: &str,
        ppg_metrics: &str,
    ) -> Result<CompositeAnalysis, AnalysisError> {
        std::thread::scope(|scope| {
            let eeg = scope.spawn(|| self.run(ResponseKind::Eeg, eeg_metrics));
            let ppg = scope.spawn(|| self.run(ResponseKind::Ppg, ppg_metrics));
            let eeg = eeg.join().expect("EEG analysis thread panicked")?;
            let ppg = ppg.join().expect("PPG analysis thread panicked")?;
            Ok(CompositeAnalysis { eeg, ppg })
        })
    }

    /// Linear backoff between transient-failure retries.
    fn backoff(&self, attempt: usize) {
        let ms = self.config.retry_backoff_ms * attempt as u64;
        if ms > 0 {
            std::thread::sleep(std::time::Duration::from_millis(ms));
        }
    }
}
