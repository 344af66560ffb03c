//! Structural repair: filling missing or malformed required fields with
//! documented safe defaults so downstream consumers never null-check.

use serde_json::{Map, Value};

use super::kinds::{default_for, matches_type, required_fields, ResponseKind};

/// Make a parsed value satisfy the minimal shape contract for `kind`.
///
/// Fields that already match their expected type pass through unchanged, as
/// do any extra fields. Non-object inputs are replaced with a fresh object.
/// Idempotent: repairing twice equals repairing once.
pub fn repair(value: &Value, kind: ResponseKind) -> Value {
    let mut map: Map<String, Value> = match value.as_object() {
        Some(obj) => obj.clone(),
        None => Map::new(),
    };

    for spec in required_fields(kind) {
        let needs_default = match map.get(spec.name) {
            Some(field) => !matches_type(field, spec.ty),
            None => true,
        };
        if needs_default {
            map.insert(spec.name.to_string(), default_for(spec));
        }
    }

    Value::Object(map)
}
