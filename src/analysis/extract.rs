//! Locates JSON payload candidates inside a free-text model completion.
//!
//! Completions arrive wrapped in markdown fences, prefixed with commentary,
//! or cut off mid-stream. Extraction tries a fixed battery of patterns from
//! highest to lowest confidence and yields at most one candidate per pattern.

use std::sync::LazyLock;

use regex::Regex;

/// A substring of the raw completion hypothesized to contain a JSON object,
/// tagged with the 1-based extraction pattern that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub text: String,
    pub pattern: usize,
}

/// Number of extraction patterns tried, in confidence order.
pub const PATTERN_COUNT: usize = 5;

static JSON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```json\s*(.+?)\s*```").unwrap());

static ANY_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[a-zA-Z0-9_-]*\s*(.+?)\s*```").unwrap());

/// Lazy, deterministic sequence of extraction candidates for one completion.
///
/// Patterns that do not match are skipped; duplicate texts produced by a
/// looser pattern are suppressed so callers never re-parse the same bytes.
pub fn candidates(raw: &str) -> Candidates<'_> {
    Candidates {
        raw,
        next_pattern: 1,
        seen: Vec::new(),
    }
}

pub struct Candidates<'a> {
    raw: &'a str,
    next_pattern: usize,
    seen: Vec<String>,
}

impl Iterator for Candidates<'_> {
    type Item = Candidate;

    fn next(&mut self) -> Option<Candidate> {
        while self.next_pattern <= PATTERN_COUNT {
            let pattern = self.next_pattern;
            self.next_pattern += 1;

            let text = match pattern {
                1 => labeled_fence(self.raw),
                2 => any_fence(self.raw),
                3 => json_line(self.raw),
                4 => brace_region(self.raw),
                5 => whole_text(self.raw),
                _ => None,
            };

            if let Some(text) = text {
                if text.is_empty() || self.seen.iter().any(|s| s == &text) {
                    continue;
                }
                self.seen.push(text.clone());
                return Some(Candidate { text, pattern });
            }
        }
        None
    }
}

/// Pattern 1: a fenced code block explicitly labeled `json`.
fn labeled_fence(raw: &str) -> Option<String> {
    JSON_FENCE
        .captures(raw)
        .map(|c| c[1].trim().to_string())
}

/// Pattern 2: any fenced code block.
fn any_fence(raw: &str) -> Option<String> {
    ANY_FENCE
        .captures(raw)
        .map(|c| c[1].trim().to_string())
}

/// Pattern 3: a line starting with the word `json`, content to end of text.
fn json_line(raw: &str) -> Option<String> {
    let mut offset = 0usize;
    for line in raw.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix("json") {
            // Word boundary: "json" alone or followed by whitespace/colon,
            // not e.g. "jsonify".
            if rest.is_empty()
                || rest.starts_with(char::is_whitespace)
                || rest.starts_with(':')
            {
                let start = offset + (line.len() - trimmed.len()) + "json".len();
                let tail = raw[start..].trim_start_matches(':').trim();
                return Some(tail.to_string());
            }
        }
        offset += line.len();
    }
    None
}

/// Pattern 4: the region from the first `{` to the last `}`.
fn brace_region(raw: &str) -> Option<String> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    Some(raw[start..=end].to_string())
}

/// Pattern 5: the entire raw text (last resort).
fn whole_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
