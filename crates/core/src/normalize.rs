//! Raw record → [`PatientFact`] coercion and range checking.

use std::collections::BTreeSet;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::ValidationError;
use crate::fact::{FactType, FactValue, PatientFact};
use crate::schema::{FactSchema, FieldSpec};

/// Validate and normalize a raw field-value record.
///
/// For each schema field the first non-empty value among the canonical name
/// and its aliases is coerced to the declared type and range-checked. Empty
/// strings and `null` count as absent. Unknown keys are ignored. Every
/// problem in the record is collected before failing.
pub fn normalize(raw: &Map<String, Value>, schema: &FactSchema) -> Result<PatientFact, ValidationError> {
    let mut fact = PatientFact::new();
    let mut errors = Vec::new();

    for spec in schema.fields().iter().filter(|f| f.derived.is_none()) {
        let Some(value) = first_present(raw, spec) else {
            if spec.required {
                errors.push(ValidationError::MissingField(spec.name.clone()));
            }
            continue;
        };

        match coerce(spec, value) {
            Ok(v) => fact.insert(spec.name.clone(), v),
            Err(e) => errors.push(e),
        }
    }

    for spec in schema.fields() {
        if let Some(v) = spec.derived.as_ref().and_then(|d| d.compute(&fact)) {
            fact.insert(spec.name.clone(), v);
        }
    }

    let ignored = raw.keys().filter(|k| schema.resolve(k).is_none()).count();
    if ignored > 0 {
        debug!(ignored, "ignored patient record keys with no schema field");
    }

    match errors.len() {
        0 => Ok(fact),
        1 => Err(errors.remove(0)),
        _ => Err(ValidationError::Multiple(errors)),
    }
}

fn first_present<'a>(raw: &'a Map<String, Value>, spec: &FieldSpec) -> Option<&'a Value> {
    spec.input_keys()
        .filter_map(|k| raw.get(k))
        .find(|v| !is_blank(v))
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn coerce(spec: &FieldSpec, value: &Value) -> Result<FactValue, ValidationError> {
    match spec.fact_type {
        FactType::Number => {
            let n = coerce_number(&spec.name, value)?;
            if let Some((min, max)) = spec.range {
                if n < min || n > max {
                    return Err(ValidationError::OutOfRange {
                        field: spec.name.clone(),
                        value: n,
                        min,
                        max,
                    });
                }
            }
            Ok(FactValue::Number(n))
        }
        FactType::Flag => coerce_flag(&spec.name, value).map(FactValue::Flag),
        FactType::Set => coerce_set(&spec.name, value).map(FactValue::Set),
    }
}

fn coerce_number(field: &str, value: &Value) -> Result<f64, ValidationError> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match n {
        Some(n) if n.is_finite() => Ok(n),
        Some(_) => Err(ValidationError::NonFinite {
            field: field.to_string(),
        }),
        None => Err(not_coercible(field, "number", value)),
    }
}

/// Survey answer codes use `1` for yes and `2` for no; other integer codes
/// (refused, don't know) are treated as "not set".
fn coerce_flag(field: &str, value: &Value) -> Result<bool, ValidationError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => match n.as_f64() {
            Some(v) if v.fract() == 0.0 => Ok(v == 1.0),
            _ => Err(not_coercible(field, "flag", value)),
        },
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "1" | "yes" | "y" | "true" => Ok(true),
            "0" | "2" | "no" | "n" | "false" => Ok(false),
            _ => Err(not_coercible(field, "flag", value)),
        },
        _ => Err(not_coercible(field, "flag", value)),
    }
}

fn coerce_set(field: &str, value: &Value) -> Result<BTreeSet<String>, ValidationError> {
    match value {
        Value::String(s) => Ok(split_items(s.split(','))),
        Value::Array(items) => {
            let mut parts = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(s) => parts.push(s.as_str()),
                    other => return Err(not_coercible(field, "list of strings", other)),
                }
            }
            Ok(split_items(parts.into_iter()))
        }
        _ => Err(not_coercible(field, "list of strings", value)),
    }
}

fn split_items<'a>(items: impl Iterator<Item = &'a str>) -> BTreeSet<String> {
    items
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn not_coercible(field: &str, expected: &'static str, value: &Value) -> ValidationError {
    ValidationError::NotCoercible {
        field: field.to_string(),
        expected,
        found: describe(value),
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("boolean {b}"),
        Value::Number(n) => format!("number {n}"),
        Value::String(s) => format!("string '{s}'"),
        Value::Array(_) => "array".to_string(),
        Value::Object(_) => "object".to_string(),
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("test record must be an object"),
        }
    }

    fn schema() -> FactSchema {
        FactSchema::diabetes()
    }

    #[test]
    fn normalizes_form_input() {
        let raw = record(json!({
            "has_diabetes": true,
            "hba1c": "9.5",
            "egfr": 80,
            "bmi": 31.2,
            "medications": "Metformin, liraglutide ,",
            "comorbidities": [],
        }));

        let fact = normalize(&raw, &schema()).unwrap();
        assert_eq!(fact.flag("has_diabetes"), Some(true));
        assert_eq!(fact.number("hba1c"), Some(9.5));
        assert_eq!(fact.number("egfr"), Some(80.0));
        assert!(fact.set_contains("medications", "metformin"));
        assert!(fact.set_contains("medications", "liraglutide"));
        assert_eq!(fact.get("medications").and_then(FactValue::as_set).map(|s| s.len()), Some(2));
        assert!(fact.get("comorbidities").is_some());
        assert!(!fact.contains("glucose"));
    }

    #[test]
    fn survey_aliases_resolve_to_canonical_fields() {
        let raw = record(json!({
            "DIQ010__questionnaire": 1,
            "LBXGH__response": 11.2,
            "MCQ160B__questionnaire": 2,
            "rxddrug": "insulin glargine",
            "SEQN": 12345,
        }));

        let fact = normalize(&raw, &schema()).unwrap();
        assert_eq!(fact.flag("has_diabetes"), Some(true));
        assert_eq!(fact.number("hba1c"), Some(11.2));
        assert_eq!(fact.flag("heart_failure"), Some(false));
        assert!(fact.set_contains("medications", "insulin glargine"));
    }

    #[test]
    fn canonical_name_wins_over_alias_and_blank_falls_through() {
        let raw = record(json!({
            "has_diabetes": "yes",
            "glucose": "",
            "lbxsgl": null,
            "lbxglu": "310",
            "lbxglt": "150",
        }));

        let fact = normalize(&raw, &schema()).unwrap();
        assert_eq!(fact.number("glucose"), Some(310.0));

        let raw = record(json!({ "has_diabetes": 1, "hba1c": 7.0, "lbxgh": 12.0 }));
        let fact = normalize(&raw, &schema()).unwrap();
        assert_eq!(fact.number("hba1c"), Some(7.0));
    }

    #[test]
    fn missing_required_field() {
        let raw = record(json!({ "hba1c": 8.0 }));
        let err = normalize(&raw, &schema()).unwrap_err();
        assert_eq!(err, ValidationError::MissingField("has_diabetes".to_string()));
    }

    #[test]
    fn blank_required_field_counts_as_missing() {
        let raw = record(json!({ "has_diabetes": "  " }));
        let err = normalize(&raw, &schema()).unwrap_err();
        assert_eq!(err.field(), Some("has_diabetes"));
    }

    #[test]
    fn hba1c_out_of_range() {
        let raw = record(json!({ "has_diabetes": true, "hba1c": 25 }));
        match normalize(&raw, &schema()).unwrap_err() {
            ValidationError::OutOfRange { field, value, min, max } => {
                assert_eq!(field, "hba1c");
                assert_eq!(value, 25.0);
                assert_eq!((min, max), (3.0, 20.0));
            }
            other => panic!("expected OutOfRange, got {other:?}"),
        }
    }

    #[test]
    fn range_bounds_are_inclusive() {
        for v in [3.0, 20.0] {
            let raw = record(json!({ "has_diabetes": true, "hba1c": v }));
            assert!(normalize(&raw, &schema()).is_ok());
        }
    }

    #[test]
    fn uncoercible_values_are_reported() {
        let raw = record(json!({ "has_diabetes": "maybe", "hba1c": "high" }));
        let err = normalize(&raw, &schema()).unwrap_err();
        let problems = err.problems();
        assert_eq!(problems.len(), 2);
        let fields: Vec<_> = problems.iter().filter_map(|e| e.field()).collect();
        assert_eq!(fields, vec!["has_diabetes", "hba1c"]);
        assert!(matches!(problems[0], ValidationError::NotCoercible { expected: "flag", .. }));
    }

    #[test]
    fn non_finite_number_rejected() {
        let raw = record(json!({ "has_diabetes": true, "egfr": "NaN" }));
        assert_eq!(
            normalize(&raw, &schema()).unwrap_err(),
            ValidationError::NonFinite { field: "egfr".to_string() }
        );
    }

    #[test]
    fn set_rejects_non_string_items() {
        let raw = record(json!({ "has_diabetes": true, "medications": ["metformin", 5] }));
        let err = normalize(&raw, &schema()).unwrap_err();
        assert!(matches!(err, ValidationError::NotCoercible { ref field, .. } if field == "medications"));
    }

    #[test]
    fn derived_fields_follow_their_inputs() {
        let raw = record(json!({ "has_diabetes": true, "bedtime_mgdl": 220, "morning_mgdl": "150" }));
        let fact = normalize(&raw, &schema()).unwrap();
        assert_eq!(fact.number("overnight_glucose_drop"), Some(70.0));

        // Derived values are never taken from input.
        let raw = record(json!({ "has_diabetes": true, "overnight_glucose_drop": 90 }));
        let fact = normalize(&raw, &schema()).unwrap();
        assert!(!fact.contains("overnight_glucose_drop"));
    }

    #[test]
    fn flag_coercion_table() {
        let cases = [
            (json!(true), Some(true)),
            (json!(false), Some(false)),
            (json!(1), Some(true)),
            (json!(2), Some(false)),
            (json!(9), Some(false)),
            (json!("Y"), Some(true)),
            (json!("No"), Some(false)),
            (json!(1.5), None),
            (json!("perhaps"), None),
        ];
        for (value, expected) in cases {
            assert_eq!(coerce_flag("f", &value).ok(), expected, "value {value}");
        }
    }
}
