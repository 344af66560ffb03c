//! Textual repair of near-valid JSON completions.
//!
//! Models return JSON with markdown fences still attached, literal newlines
//! inside string values, unescaped quotes, trailing commas, or a truncated
//! tail. The sanitizer applies a fixed battery of repairs in order and records
//! every fix it applied. It never panics; failure is returned as data.

use serde_json::Value;

use super::truncation::{is_truncated, repair_truncation};

/// One textual repair applied by the sanitizer, in application order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppliedFix {
    StrippedFence,
    CollapsedControlChars,
    EscapedInnerQuotes,
    RepairedTruncation,
    RemovedTrailingCommas,
}

impl AppliedFix {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppliedFix::StrippedFence => "stripped_fence",
            AppliedFix::CollapsedControlChars => "collapsed_control_chars",
            AppliedFix::EscapedInnerQuotes => "escaped_inner_quotes",
            AppliedFix::RepairedTruncation => "repaired_truncation",
            AppliedFix::RemovedTrailingCommas => "removed_trailing_commas",
        }
    }
}

impl std::fmt::Display for AppliedFix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one sanitization run. Immutable; the input is never mutated.
///
/// Postcondition: when `success` is true, `sanitized_text` parses with
/// `serde_json::from_str`.
#[derive(Debug, Clone)]
pub struct SanitizationResult {
    pub success: bool,
    pub sanitized_text: String,
    pub applied_fixes: Vec<AppliedFix>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Repair one candidate substring into (hopefully) parseable JSON.
pub fn sanitize(text: &str) -> SanitizationResult {
    let mut applied_fixes = Vec::new();
    let mut warnings = Vec::new();
    let mut errors = Vec::new();

    let mut current = text.trim().to_string();

    if let Some(stripped) = strip_fences(&current) {
        current = stripped;
        applied_fixes.push(AppliedFix::StrippedFence);
    }

    let (collapsed, changed) = collapse_control_chars_in_strings(&current);
    if changed {
        current = collapsed;
        applied_fixes.push(AppliedFix::CollapsedControlChars);
    }

    let (escaped, changed) = escape_inner_quotes(&current);
    if changed {
        current = escaped;
        applied_fixes.push(AppliedFix::EscapedInnerQuotes);
    }

    if is_truncated(&current) {
        warnings.push("completion appears truncated (unbalanced brackets)".to_string());
        let repaired = repair_truncation(&current);
        if repaired != current {
            current = repaired;
            applied_fixes.push(AppliedFix::RepairedTruncation);
        }
    }

    let (decommaed, changed) = remove_trailing_commas(&current);
    if changed {
        current = decommaed;
        applied_fixes.push(AppliedFix::RemovedTrailingCommas);
    }

    let success = match serde_json::from_str::<Value>(&current) {
        Ok(_) => true,
        Err(e) => {
            errors.push(format!(
                "JSON parse failed at line {}, column {}: {e}",
                e.line(),
                e.column()
            ));
            false
        }
    };

    SanitizationResult {
        success,
        sanitized_text: current,
        applied_fixes,
        errors,
        warnings,
    }
}

/// Strip a residual markdown fence still wrapping the candidate.
fn strip_fences(text: &str) -> Option<String> {
    if !text.starts_with("```") {
        return None;
    }
    let body = match text.find('\n') {
        Some(pos) => &text[pos + 1..],
        // Opening fence with no newline: drop the fence marker and any label.
        None => text.trim_start_matches('`').trim_start_matches("json"),
    };
    let body = body.trim_end();
    let body = body.strip_suffix("```").unwrap_or(body);
    Some(body.trim().to_string())
}

/// Collapse literal newlines/tabs occurring inside string literals into the
/// escape sequences `\n`/`\t`. Structural whitespace between tokens is kept.
fn collapse_control_chars_in_strings(text: &str) -> (String, bool) {
    let mut out = String::with_capacity(text.len());
    let mut changed = false;
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
        if in_string {
            if escaped {
                escaped = false;
                out.push(c);
                continue;
            }
            match c {
                '\\' => {
                    escaped = true;
                    out.push(c);
                }
                '"' => {
                    in_string = false;
                    out.push(c);
                }
                '\n' => {
                    out.push_str("\\n");
                    changed = true;
                }
                '\t' => {
                    out.push_str("\\t");
                    changed = true;
                }
                '\r' => {
                    changed = true;
                }
                _ => out.push(c),
            }
        } else {
            if c == '"' {
                in_string = true;
            }
            out.push(c);
        }
    }
    (out, changed)
}

/// Escape unescaped double quotes that are content rather than terminators.
///
/// Heuristic: inside a string, a quote not preceded by `\` closes the string
/// only when the next non-whitespace character is structural (`:`, `,`, `}`,
/// `]`) or the text ends. Anything else means the quote belongs to the
/// content. Inherently ambiguous for pathological content; accepted as
/// best-effort.
fn escape_inner_quotes(text: &str) -> (String, bool) {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut changed = false;
    let mut in_string = false;
    let mut escaped = false;

    for i in 0..chars.len() {
        let c = chars[i];
        if !in_string {
            if c == '"' {
                in_string = true;
            }
            out.push(c);
            continue;
        }
        if escaped {
            escaped = false;
            out.push(c);
            continue;
        }
        match c {
            '\\' => {
                escaped = true;
                out.push(c);
            }
            '"' => {
                if closes_string(&chars, i + 1) {
                    in_string = false;
                    out.push(c);
                } else {
                    out.push_str("\\\"");
                    changed = true;
                }
            }
            _ => out.push(c),
        }
    }
    (out, changed)
}

/// Whether a quote at this position plausibly terminates its string: the next
/// non-whitespace character is structural, or the text ends.
fn closes_string(chars: &[char], mut next: usize) -> bool {
    while next < chars.len() && chars[next].is_whitespace() {
        next += 1;
    }
    match chars.get(next) {
        None => true,
        Some(':') | Some(',') | Some('}') | Some(']') => true,
        _ => false,
    }
}

/// Remove commas immediately preceding a closing `}` or `]`.
fn remove_trailing_commas(text: &str) -> (String, bool) {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut changed = false;
    let mut in_string = false;
    let mut escaped = false;

    for i in 0..chars.len() {
        let c = chars[i];
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            out.push(c);
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            ',' => {
                let mut next = i + 1;
                while next < chars.len() && chars[next].is_whitespace() {
                    next += 1;
                }
                if matches!(chars.get(next), Some('}') | Some(']')) {
                    changed = true;
                } else {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
    }
    (out, changed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_parses(result: &SanitizationResult) {
        assert!(
            result.success,
            "sanitize failed: {:?} / text: {}",
            result.errors, result.sanitized_text
        );
        serde_json::from_str::<Value>(&result.sanitized_text)
            .expect("success=true must imply parseable text");
    }

    #[test]
    fn valid_json_passes_untouched() {
        let text = "{\"score\": 72, \"status\": \"good\"}";
        let result = sanitize(text);
        assert_parses(&result);
        assert!(result.applied_fixes.is_empty());
        assert_eq!(result.sanitized_text, text);
    }

    #[test]
    fn strips_residual_fence() {
        let text = "```json\n{\"score\": 1}\n```";
        let result = sanitize(text);
        assert_parses(&result);
        assert!(result.applied_fixes.contains(&AppliedFix::StrippedFence));
        assert_eq!(result.sanitized_text, "{\"score\": 1}");
    }

    #[test]
    fn collapses_newline_inside_string() {
        let text = "{\"analysis\": \"first line\nsecond line\"}";
        let result = sanitize(text);
        assert_parses(&result);
        assert!(result
            .applied_fixes
            .contains(&AppliedFix::CollapsedControlChars));
        let value: Value = serde_json::from_str(&result.sanitized_text).unwrap();
        assert_eq!(value["analysis"], "first line\nsecond line");
    }

    #[test]
    fn structural_newlines_are_preserved() {
        let text = "{\n  \"score\": 5,\n  \"status\": \"ok\"\n}";
        let result = sanitize(text);
        assert_parses(&result);
        assert!(result.applied_fixes.is_empty());
        assert!(result.sanitized_text.contains('\n'));
    }

    #[test]
    fn escapes_unescaped_quotes_in_content() {
        // Quoted speech inside a narrative value.
        let text = "{\"analysis\": \"He said \"hi\" to me\", \"score\": 50, \"status\":\"x\",\"recommendations\":[],\"concerns\":[]}";
        let result = sanitize(text);
        assert_parses(&result);
        assert!(result
            .applied_fixes
            .contains(&AppliedFix::EscapedInnerQuotes));
        let value: Value = serde_json::from_str(&result.sanitized_text).unwrap();
        assert_eq!(value["analysis"], "He said \"hi\" to me");
        assert_eq!(value["score"], 50);
    }

    #[test]
    fn removes_trailing_comma_in_array() {
        let text = "{\"score\":1,\"status\":\"a\",\"analysis\":\"b\",\"recommendations\":[1,2,],\"concerns\":[]}";
        let result = sanitize(text);
        assert_parses(&result);
        assert!(result
            .applied_fixes
            .contains(&AppliedFix::RemovedTrailingCommas));
        let value: Value = serde_json::from_str(&result.sanitized_text).unwrap();
        assert_eq!(value["recommendations"], serde_json::json!([1, 2]));
    }

    #[test]
    fn removes_trailing_comma_before_object_close() {
        let text = "{\"score\": 3,}";
        let result = sanitize(text);
        assert_parses(&result);
    }

    #[test]
    fn repairs_truncated_object() {
        // Completion cut off mid-object.
        let text = "{\"score\": 80, \"status\": \"good\",";
        let result = sanitize(text);
        assert_parses(&result);
        assert!(result
            .applied_fixes
            .contains(&AppliedFix::RepairedTruncation));
        assert!(!result.warnings.is_empty());
        let value: Value = serde_json::from_str(&result.sanitized_text).unwrap();
        assert_eq!(value["score"], 80);
        assert_eq!(value["status"], "good");
    }

    #[test]
    fn truncated_array_inside_object_closes_in_order() {
        let text = "{\"score\": 9, \"concerns\": [\"sleep\", \"stress\"";
        let result = sanitize(text);
        assert_parses(&result);
        let value: Value = serde_json::from_str(&result.sanitized_text).unwrap();
        assert_eq!(value["concerns"], serde_json::json!(["sleep", "stress"]));
    }

    #[test]
    fn prose_fails_as_data_not_panic() {
        let result = sanitize("the patient seems fine, nothing to report");
        assert!(!result.success);
        assert!(!result.errors.is_empty());
        assert!(result.errors[0].contains("line"));
        assert!(result.errors[0].contains("column"));
    }

    #[test]
    fn empty_input_fails_cleanly() {
        let result = sanitize("");
        assert!(!result.success);
        assert!(!result.errors.is_empty());
    }

    #[test]
    fn combined_defects_fixed_in_one_pass() {
        let text = "```json\n{\"analysis\": \"multi\nline\", \"score\": 70, \"recommendations\": [\"rest\",]";
        let result = sanitize(text);
        assert_parses(&result);
        let value: Value = serde_json::from_str(&result.sanitized_text).unwrap();
        assert_eq!(value["score"], 70);
        assert_eq!(value["analysis"], "multi\nline");
    }

    #[test]
    fn fix_identifiers_are_stable() {
        assert_eq!(AppliedFix::StrippedFence.as_str(), "stripped_fence");
        assert_eq!(
            AppliedFix::RepairedTruncation.to_string(),
            "repaired_truncation"
        );
    }

    #[test]
    fn input_is_never_mutated() {
        let text = String::from("{\"score\": 2,}");
        let _ = sanitize(&text);
        assert_eq!(text, "{\"score\": 2,}");
    }
}
