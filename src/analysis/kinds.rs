use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Which analysis a completion belongs to. Selects the prompt schema and the
/// required-field contract used by validation and repair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponseKind {
    #[serde(rename = "eeg")]
    Eeg,
    #[serde(rename = "ppg")]
    Ppg,
    #[serde(rename = "comprehensive")]
    Comprehensive,
    #[serde(rename = "mentalHealthRisk")]
    MentalHealthRisk,
}

impl ResponseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseKind::Eeg => "eeg",
            ResponseKind::Ppg => "ppg",
            ResponseKind::Comprehensive => "comprehensive",
            ResponseKind::MentalHealthRisk => "mentalHealthRisk",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "eeg" => Some(ResponseKind::Eeg),
            "ppg" => Some(ResponseKind::Ppg),
            "comprehensive" => Some(ResponseKind::Comprehensive),
            "mentalHealthRisk" => Some(ResponseKind::MentalHealthRisk),
            _ => None,
        }
    }
}

/// Expected JSON type of a required top-level field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Number,
    String,
    Array,
    Object,
}

/// One required top-level field of a response shape.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
}

const fn field(name: &'static str, ty: FieldType) -> FieldSpec {
    FieldSpec { name, ty }
}

/// Shared core of every report shape.
const BASE_FIELDS: [FieldSpec; 5] = [
    field("score", FieldType::Number),
    field("status", FieldType::String),
    field("analysis", FieldType::String),
    field("recommendations", FieldType::Array),
    field("concerns", FieldType::Array),
];

const COMPREHENSIVE_FIELDS: [FieldSpec; 6] = [
    field("score", FieldType::Number),
    field("status", FieldType::String),
    field("analysis", FieldType::String),
    field("recommendations", FieldType::Array),
    field("concerns", FieldType::Array),
    field("sections", FieldType::Object),
];

const MENTAL_HEALTH_RISK_FIELDS: [FieldSpec; 6] = [
    field("score", FieldType::Number),
    field("status", FieldType::String),
    field("analysis", FieldType::String),
    field("recommendations", FieldType::Array),
    field("concerns", FieldType::Array),
    field("riskFactors", FieldType::Array),
];

/// The minimal shape contract for a response kind.
pub fn required_fields(kind: ResponseKind) -> &'static [FieldSpec] {
    match kind {
        ResponseKind::Eeg | ResponseKind::Ppg => &BASE_FIELDS,
        ResponseKind::Comprehensive => &COMPREHENSIVE_FIELDS,
        ResponseKind::MentalHealthRisk => &MENTAL_HEALTH_RISK_FIELDS,
    }
}

/// Default score substituted for a missing or malformed `score` field.
pub const DEFAULT_SCORE: i64 = 65;

/// Default status substituted for a missing or malformed `status` field.
pub const DEFAULT_STATUS: &str = "normal";

/// Placeholder sentence substituted for missing narrative fields.
pub const DEFAULT_ANALYSIS: &str =
    "A full analysis could not be generated for this section; the values shown are provisional.";

/// The documented safe default for one required field.
pub fn default_for(spec: &FieldSpec) -> Value {
    match spec.ty {
        FieldType::Number => Value::from(DEFAULT_SCORE),
        FieldType::String => {
            if spec.name == "status" {
                Value::from(DEFAULT_STATUS)
            } else {
                Value::from(DEFAULT_ANALYSIS)
            }
        }
        FieldType::Array => Value::Array(Vec::new()),
        FieldType::Object => Value::Object(Map::new()),
    }
}

/// Check a value against an expected field type.
pub fn matches_type(value: &Value, ty: FieldType) -> bool {
    match ty {
        FieldType::Number => value.is_number(),
        FieldType::String => value.is_string(),
        FieldType::Array => value.is_array(),
        FieldType::Object => value.is_object(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_str() {
        for kind in [
            ResponseKind::Eeg,
            ResponseKind::Ppg,
            ResponseKind::Comprehensive,
            ResponseKind::MentalHealthRisk,
        ] {
            assert_eq!(ResponseKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(ResponseKind::from_str("spo2"), None);
    }

    #[test]
    fn kind_serializes_as_tag() {
        let json = serde_json::to_string(&ResponseKind::MentalHealthRisk).unwrap();
        assert_eq!(json, "\"mentalHealthRisk\"");
    }

    #[test]
    fn every_kind_requires_the_base_five() {
        for kind in [
            ResponseKind::Eeg,
            ResponseKind::Ppg,
            ResponseKind::Comprehensive,
            ResponseKind::MentalHealthRisk,
        ] {
            let names: Vec<&str> = required_fields(kind).iter().map(|f| f.name).collect();
            for base in ["score", "status", "analysis", "recommendations", "concerns"] {
                assert!(names.contains(&base), "{} missing {base}", kind.as_str());
            }
        }
    }

    #[test]
    fn defaults_match_declared_types() {
        for kind in [ResponseKind::Comprehensive, ResponseKind::MentalHealthRisk] {
            for spec in required_fields(kind) {
                assert!(
                    matches_type(&default_for(spec), spec.ty),
                    "default for {} has wrong type",
                    spec.name
                );
            }
        }
    }

    #[test]
    fn status_default_is_not_the_placeholder_sentence() {
        let status = default_for(&field("status", FieldType::String));
        assert_eq!(status, Value::from("normal"));
    }
}
