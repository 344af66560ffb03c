//! Best-effort recovery of completions cut off mid-stream.
//!
//! A truncated completion shows up as unbalanced braces/brackets. Repair
//! drops a trailing incomplete fragment and appends the missing closers.
//! The result may still carry an incomplete final field; structural repair
//! downstream fills whatever that loses.

/// Bracket/brace tally of the text, ignoring string literal contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BracketCounts {
    pub open_braces: usize,
    pub close_braces: usize,
    pub open_brackets: usize,
    pub close_brackets: usize,
}

impl BracketCounts {
    pub fn balanced(&self) -> bool {
        self.open_braces == self.close_braces && self.open_brackets == self.close_brackets
    }
}

/// Count structural brackets, skipping characters inside string literals so
/// that braces occurring in content never trigger a bogus repair.
pub fn count_brackets(text: &str) -> BracketCounts {
    let mut counts = BracketCounts::default();
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => counts.open_braces += 1,
            '}' => counts.close_braces += 1,
            '[' => counts.open_brackets += 1,
            ']' => counts.close_brackets += 1,
            _ => {}
        }
    }
    counts
}

/// Whether the text looks cut off (either bracket pair unbalanced).
pub fn is_truncated(text: &str) -> bool {
    !count_brackets(text).balanced()
}

/// Repair a truncated completion. Total: always returns a string.
///
/// 1. If the last non-empty line does not end in `}`, `]`, or `,`, drop the
///    whole line — it is an incomplete key/value fragment.
/// 2. Close a dangling string literal, if one is still open.
/// 3. Append `]` for each unclosed bracket, then `}` for each unclosed brace;
///    arrays close before objects, matching the nesting of a trailing
///    incomplete array inside an object.
pub fn repair_truncation(text: &str) -> String {
    let counts = count_brackets(text);
    if counts.balanced() {
        return text.to_string();
    }

    let string_open = ends_inside_string(text);
    let mut kept = text.trim_end();
    if let Some(last_line_start) = kept.rfind('\n') {
        let last_line = kept[last_line_start + 1..].trim_end();
        if !last_line.is_empty() && !ends_structurally(last_line, string_open) {
            kept = kept[..last_line_start].trim_end();
        }
    } else if !kept.is_empty() && !ends_structurally(kept, string_open) {
        // Single-line text: drop the trailing incomplete token instead of the
        // whole line, cutting back to the last structural character.
        match kept.rfind([',', '}', ']']) {
            Some(pos) => kept = &kept[..=pos],
            None => {
                if !kept.trim_start().starts_with('{') && !kept.trim_start().starts_with('[') {
                    kept = "";
                }
            }
        }
    }

    let mut repaired = kept.to_string();
    if ends_inside_string(&repaired) {
        // A dangling string would swallow every closer we append.
        repaired.push('"');
    }
    while repaired.trim_end().ends_with(',') {
        // A comma directly before an appended closer is itself a defect.
        repaired.truncate(repaired.trim_end().len() - 1);
    }
    let counts = count_brackets(&repaired);
    for _ in counts.close_brackets..counts.open_brackets {
        repaired.push(']');
    }
    for _ in counts.close_braces..counts.open_braces {
        repaired.push('}');
    }
    repaired
}

fn ends_structurally(line: &str, string_open: bool) -> bool {
    match line.trim_end().chars().last() {
        Some('}') | Some(']') | Some(',') => true,
        // A closing quote on a completed string is a finished value; only the
        // container closers are missing.
        Some('"') => !string_open,
        _ => false,
    }
}

/// Whether a scan of the whole text ends inside an unterminated string literal.
fn ends_inside_string(text: &str) -> bool {
    let mut in_string = false;
    let mut escaped = false;
    for c in text.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
        }
    }
    in_string
}
