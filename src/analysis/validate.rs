//! Structural validation of parsed report objects.
//!
//! Checks a parsed value against the minimal required-field contract of its
//! response kind and scores completeness. Validation never gates beyond
//! "critical defects trigger repair"; numeric range drift is only warned
//! because downstream consumers clamp.

use serde_json::Value;

use super::kinds::{matches_type, required_fields, FieldType, ResponseKind};

/// How bad one structural defect is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Critical,
    Warning,
}

/// One structural defect found during validation.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub message: String,
    pub severity: Severity,
}

/// Outcome of validating one parsed response.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    /// Deterministic completeness metric, 0–100.
    pub score: u8,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn critical_count(&self) -> usize {
        self.errors
            .iter()
            .filter(|e| e.severity == Severity::Critical)
            .count()
    }
}

/// Penalty per critical defect when scoring completeness.
const CRITICAL_PENALTY: i32 = 20;

/// Penalty per warning when scoring completeness.
const WARNING_PENALTY: i32 = 5;

/// Check a parsed value against the minimal shape contract for `kind`.
pub fn validate(value: &Value, kind: ResponseKind) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    match value.as_object() {
        None => {
            errors.push(ValidationIssue {
                message: format!(
                    "{} response is not a JSON object (got {})",
                    kind.as_str(),
                    type_name(value)
                ),
                severity: Severity::Critical,
            });
            for spec in required_fields(kind) {
                errors.push(ValidationIssue {
                    message: format!("required field '{}' is missing", spec.name),
                    severity: Severity::Critical,
                });
            }
        }
        Some(map) => {
            for spec in required_fields(kind) {
                match map.get(spec.name) {
                    None => errors.push(ValidationIssue {
                        message: format!("required field '{}' is missing", spec.name),
                        severity: Severity::Critical,
                    }),
                    Some(field) if !matches_type(field, spec.ty) => {
                        errors.push(ValidationIssue {
                            message: format!(
                                "field '{}' has wrong type: expected {:?}, got {}",
                                spec.name,
                                spec.ty,
                                type_name(field)
                            ),
                            severity: Severity::Critical,
                        });
                    }
                    Some(field) => {
                        if spec.ty == FieldType::Number {
                            check_numeric_range(spec.name, field, &mut warnings);
                        }
                    }
                }
            }
        }
    }

    let critical = errors
        .iter()
        .filter(|e| e.severity == Severity::Critical)
        .count() as i32;
    let score = (100 - CRITICAL_PENALTY * critical - WARNING_PENALTY * warnings.len() as i32)
        .max(0) as u8;

    ValidationResult {
        is_valid: critical == 0,
        score,
        errors,
        warnings,
    }
}

/// Scores live on a 0–100 scale; out-of-range values are warned, not failed,
/// because consumers clamp for display.
fn check_numeric_range(name: &str, field: &Value, warnings: &mut Vec<String>) {
    if let Some(n) = field.as_f64() {
        if !(0.0..=100.0).contains(&n) {
            warnings.push(format!("field '{name}' value {n} is outside 0-100"));
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
