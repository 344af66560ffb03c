use super::kinds::ResponseKind;

pub const ANALYSIS_SYSTEM_PROMPT: &str = r#"
You are a biosignal health-report assistant. Your ONLY role is to turn
pre-computed EEG/PPG metrics into a structured health assessment.

RULES — ABSOLUTE, NO EXCEPTIONS:
1. Base every statement on the metrics provided; never invent measurements.
2. NEVER give a medical diagnosis or treatment instruction.
3. Output MUST be a single JSON object wrapped in ```json``` fences.
4. Every required field of the requested schema MUST be present.
5. score is an integer from 0 to 100. status is a short word, not a sentence.
6. Do not output anything before or after the JSON block.
"#;

/// Typed summary of a failed attempt, rendered into the retry prompt by this
/// module only — call sites never concatenate error strings themselves.
#[derive(Debug, Clone)]
pub struct FailureSummary {
    pub attempt: usize,
    pub parse_error: String,
    pub response_excerpt: String,
}

impl FailureSummary {
    pub fn new(attempt: usize, parse_error: &str, raw_response: &str) -> Self {
        Self {
            attempt,
            parse_error: parse_error.to_string(),
            response_excerpt: excerpt(raw_response, 160),
        }
    }
}

fn excerpt(text: &str, max: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max {
        trimmed.to_string()
    } else {
        let head: String = trimmed.chars().take(max).collect();
        format!("{head}…")
    }
}

/// Build the first-attempt prompt for one analysis kind.
pub fn build_analysis_prompt(kind: ResponseKind, metrics_block: &str) -> String {
    format!(
        r#"<metrics>
{metrics_block}
</metrics>

Produce the {label} assessment for the metrics above.
Respond with exactly this JSON structure, wrapped in ```json``` fences:

```json
{schema}
```
"#,
        label = kind_label(kind),
        schema = schema_block(kind),
    )
}

/// Build a retry prompt carrying the previous failure, so the model can
/// correct its formatting instead of repeating the same defect.
pub fn build_retry_prompt(
    kind: ResponseKind,
    metrics_block: &str,
    failure: &FailureSummary,
) -> String {
    format!(
        r#"Your previous answer (attempt {attempt}) was not valid JSON.
Parser error: {error}
Your answer began with: {excerpt}

Respond again. Output ONLY the JSON object, with every required field.

{base}"#,
        attempt = failure.attempt,
        error = failure.parse_error,
        excerpt = failure.response_excerpt,
        base = build_analysis_prompt(kind, metrics_block),
    )
}

fn kind_label(kind: ResponseKind) -> &'static str {
    match kind {
        ResponseKind::Eeg => "EEG brainwave",
        ResponseKind::Ppg => "PPG cardiovascular",
        ResponseKind::Comprehensive => "comprehensive health",
        ResponseKind::MentalHealthRisk => "mental-health risk",
    }
}

fn schema_block(kind: ResponseKind) -> &'static str {
    match kind {
        ResponseKind::Eeg | ResponseKind::Ppg => {
            r#"{
  "score": 0,
  "status": "excellent | good | normal | caution | warning",
  "analysis": "2-4 sentence narrative grounded in the metrics",
  "recommendations": ["actionable lifestyle suggestion"],
  "concerns": ["metric-backed point of attention"]
}"#
        }
        ResponseKind::Comprehensive => {
            r#"{
  "score": 0,
  "status": "excellent | good | normal | caution | warning",
  "analysis": "overall narrative combining EEG and PPG findings",
  "recommendations": ["actionable lifestyle suggestion"],
  "concerns": ["metric-backed point of attention"],
  "sections": {"brain": "EEG summary", "heart": "PPG summary"}
}"#
        }
        ResponseKind::MentalHealthRisk => {
            r#"{
  "score": 0,
  "status": "low | moderate | elevated | high",
  "analysis": "risk narrative grounded in the metrics",
  "recommendations": ["actionable lifestyle suggestion"],
  "concerns": ["metric-backed point of attention"],
  "riskFactors": ["named contributing factor"]
}"#
        }
    }
}
