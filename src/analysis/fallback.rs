//! Last-resort synthesis of a minimally-shaped report from raw completion
//! text, used when no candidate produced parseable JSON. Field values are
//! salvaged by regex heuristics; whatever cannot be salvaged gets the same
//! documented defaults structural repair uses.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use super::kinds::ResponseKind;
use super::repair::repair;
use super::AnalysisError;

static SCORE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)"?score"?\s*[:=]\s*"?(\d{1,3})"#).unwrap());

static STATUS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)"?status"?\s*[:=]\s*"?([A-Za-z가-힣][A-Za-z가-힣 ]{0,23})"#).unwrap()
});

/// A quoted sentence long enough to plausibly be narrative analysis rather
/// than a field name or status tag.
static QUOTED_SENTENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"\n]{20,300})""#).unwrap());

/// Status words the models use, checked when no explicit status field shows
/// up in the text.
const STATUS_KEYWORDS: &[&str] = &[
    "excellent", "good", "normal", "caution", "warning", "danger", "양호", "보통", "주의", "위험",
];

/// Field values recoverable from the raw text, without shape completion.
/// The map carries only what the heuristics actually found, so callers can
/// score how much of the response was salvaged versus defaulted.
pub fn salvage_fields(raw: &str) -> Map<String, Value> {
    let mut map = Map::new();

    if let Some(score) = extract_score(raw) {
        map.insert("score".to_string(), Value::from(score));
    }
    if let Some(status) = extract_status(raw) {
        map.insert("status".to_string(), Value::from(status));
    }
    if let Some(analysis) = extract_analysis(raw) {
        map.insert("analysis".to_string(), Value::from(analysis));
    }

    map
}

/// Build a synthetic, always-valid response directly from the raw completion.
///
/// The only failure is an empty completion, which is a caller contract
/// violation: a successful model call never returns nothing to recover from.
pub fn build_fallback(raw: &str, kind: ResponseKind) -> Result<Value, AnalysisError> {
    if raw.trim().is_empty() {
        return Err(AnalysisError::EmptyCompletion);
    }

    // Repair guarantees the minimal shape regardless of what was salvaged.
    Ok(repair(&Value::Object(salvage_fields(raw)), kind))
}

fn extract_score(raw: &str) -> Option<i64> {
    let caps = SCORE_PATTERN.captures(raw)?;
    let n: i64 = caps[1].parse().ok()?;
    Some(n.clamp(0, 100))
}

fn extract_status(raw: &str) -> Option<String> {
    if let Some(caps) = STATUS_PATTERN.captures(raw) {
        return Some(caps[1].trim().to_string());
    }
    let lower = raw.to_lowercase();
    STATUS_KEYWORDS
        .iter()
        .find(|k| lower.contains(*k))
        .map(|k| k.to_string())
}

fn extract_analysis(raw: &str) -> Option<String> {
    if let Some(caps) = QUOTED_SENTENCE.captures(raw) {
        return Some(caps[1].trim().to_string());
    }
    // No usable quote: take the first substantial prose line.
    raw.lines()
        .map(str::trim)
        .find(|line| line.len() >= 20 && !line.starts_with('{') && !line.starts_with('`'))
        .map(|line| truncate_chars(line, 240))
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::validate::validate;

    #[test]
    fn salvages_score_and_status_from_prose() {
        let raw = "The brainwave score: 72 overall. Status: good. Keep sleeping well.";
        let value = build_fallback(raw, ResponseKind::Eeg).unwrap();
        assert_eq!(value["score"], 72);
        assert_eq!(value["status"], "good");
        assert!(validate(&value, ResponseKind::Eeg).is_valid);
    }

    #[test]
    fn salvages_from_broken_json_fragments() {
        let raw = "\"score\": 55, \"status\": \"caution\" and then the model rambled off";
        let value = build_fallback(raw, ResponseKind::Ppg).unwrap();
        assert_eq!(value["score"], 55);
        assert_eq!(value["status"], "caution");
    }

    #[test]
    fn pure_prose_still_yields_full_shape() {
        // No JSON-like structure at all.
        let raw = "Everything in this recording looks broadly unremarkable today.";
        let value = build_fallback(raw, ResponseKind::Eeg).unwrap();
        let validation = validate(&value, ResponseKind::Eeg);
        assert!(validation.is_valid, "fallback must satisfy the shape");
        assert!(value["analysis"]
            .as_str()
            .unwrap()
            .contains("unremarkable"));
    }

    #[test]
    fn status_keyword_scan_is_a_backstop() {
        let raw = "Overall the readings look 보통 with mild variability across channels.";
        let value = build_fallback(raw, ResponseKind::Eeg).unwrap();
        assert_eq!(value["status"], "보통");
    }

    #[test]
    fn quoted_sentence_becomes_analysis() {
        let raw = "model said \"heart rate variability sits near the demographic average\" then died";
        let value = build_fallback(raw, ResponseKind::Ppg).unwrap();
        assert_eq!(
            value["analysis"],
            "heart rate variability sits near the demographic average"
        );
    }

    #[test]
    fn absurd_scores_are_clamped() {
        let raw = "score: 250";
        let value = build_fallback(raw, ResponseKind::Eeg).unwrap();
        assert_eq!(value["score"], 100);
    }

    #[test]
    fn salvage_carries_only_recovered_fields() {
        let map = salvage_fields("score: 72");
        assert_eq!(map.len(), 1);
        assert_eq!(map["score"], 72);
    }

    #[test]
    fn empty_completion_is_a_contract_violation() {
        assert!(matches!(
            build_fallback("   \n ", ResponseKind::Eeg),
            Err(AnalysisError::EmptyCompletion)
        ));
    }

    #[test]
    fn kind_specific_shape_is_honored() {
        let value = build_fallback("no structure here whatsoever", ResponseKind::MentalHealthRisk)
            .unwrap();
        assert!(value["riskFactors"].is_array());
        assert!(validate(&value, ResponseKind::MentalHealthRisk).is_valid);
    }
}
