//! Fact schema: declared fields, their types, valid ranges and input aliases.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::fact::{FactType, PatientFact};

/// Declaration of one patient attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub fact_type: FactType,
    /// Inclusive `(min, max)` bounds for numeric fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<(f64, f64)>,
    #[serde(default)]
    pub required: bool,
    /// Alternative input keys, tried in order after the canonical name.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Computed from other fields instead of read from input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived: Option<Derivation>,
}

/// How a derived field is computed from already-normalized fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Derivation {
    /// `minuend - subtrahend`, present only when both inputs are.
    Difference { minuend: String, subtrahend: String },
}

impl Derivation {
    pub fn compute(&self, fact: &PatientFact) -> Option<f64> {
        match self {
            Derivation::Difference { minuend, subtrahend } => {
                Some(fact.number(minuend)? - fact.number(subtrahend)?)
            }
        }
    }
}

impl FieldSpec {
    pub fn number(name: &str, min: f64, max: f64) -> Self {
        Self {
            name: name.to_string(),
            fact_type: FactType::Number,
            range: Some((min, max)),
            required: false,
            aliases: Vec::new(),
            description: None,
            derived: None,
        }
    }

    pub fn flag(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fact_type: FactType::Flag,
            range: None,
            required: false,
            aliases: Vec::new(),
            description: None,
            derived: None,
        }
    }

    pub fn set(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fact_type: FactType::Set,
            range: None,
            required: false,
            aliases: Vec::new(),
            description: None,
            derived: None,
        }
    }

    /// Numeric field computed as `minuend - subtrahend`.
    pub fn difference(name: &str, minuend: &str, subtrahend: &str) -> Self {
        Self {
            range: None,
            derived: Some(Derivation::Difference {
                minuend: minuend.to_string(),
                subtrahend: subtrahend.to_string(),
            }),
            ..Self::number(name, f64::MIN, f64::MAX)
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Input keys in lookup order: canonical name first, then aliases.
    pub fn input_keys(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

/// Ordered set of field declarations a [`PatientFact`] is validated against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactSchema {
    fields: Vec<FieldSpec>,
}

impl FactSchema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    /// Look up a field by canonical name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Resolve a canonical name or any alias to its field.
    pub fn resolve(&self, key: &str) -> Option<&FieldSpec> {
        self.fields
            .iter()
            .find(|f| f.input_keys().any(|k| k == key))
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Normalize a raw record against this schema. See [`crate::normalize`].
    pub fn normalize(
        &self,
        raw: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<PatientFact, ValidationError> {
        crate::normalize(raw, self)
    }

    /// Default schema for adult type 2 diabetes treatment selection.
    ///
    /// Aliases cover the short survey codes and the long
    /// `<CODE>__<section>` column names of national health survey exports.
    pub fn diabetes() -> Self {
        Self::new(vec![
            FieldSpec::flag("has_diabetes")
                .required()
                .aliases(&["diq010", "DIQ010__questionnaire"])
                .describe("Diagnosed type 2 diabetes"),
            FieldSpec::number("age", 0.0, 120.0).aliases(&["HSAGEU__demographics"]),
            FieldSpec::number("bmi", 10.0, 100.0)
                .aliases(&["BMXBMI__response"])
                .describe("Body mass index, kg/m^2"),
            FieldSpec::number("weight", 1.0, 500.0).aliases(&["BMXWT__response"]),
            FieldSpec::number("hba1c", 3.0, 20.0)
                .aliases(&["lbxgh", "LBXGH__response"])
                .describe("Glycated haemoglobin, %"),
            FieldSpec::number("glucose", 10.0, 1500.0)
                .aliases(&[
                    "lbxsgl",
                    "lbxglu",
                    "lbxglt",
                    "LBXSGL__response",
                    "LBXGLU__response",
                    "LBXGLT__response",
                ])
                .describe("Plasma glucose, mg/dL"),
            FieldSpec::number("egfr", 0.0, 200.0)
                .aliases(&["vnegfr", "VNEGFR__response"])
                .describe("Estimated GFR, mL/min/1.73m^2"),
            FieldSpec::number("urine_albumin", 0.0, 10000.0)
                .aliases(&["urxums", "urxuma", "URXUMS__response"])
                .describe("Urine albumin, mg/L"),
            FieldSpec::number("creatinine", 0.0, 30.0).aliases(&["lbxscr", "LBXSCR__response"]),
            FieldSpec::number("ldl", 0.0, 1000.0).aliases(&["lbdldl", "LBDLDL__response"]),
            FieldSpec::number("bedtime_glucose", 10.0, 1500.0).aliases(&["bedtime_mgdl"]),
            FieldSpec::number("morning_glucose", 10.0, 1500.0).aliases(&["morning_mgdl"]),
            FieldSpec::difference("overnight_glucose_drop", "bedtime_glucose", "morning_glucose")
                .describe("Bedtime minus next-morning glucose, mg/dL"),
            FieldSpec::flag("on_insulin").aliases(&["diq050", "DIQ050__response"]),
            FieldSpec::flag("on_oral_agents").aliases(&["diq070", "DIQ070__questionnaire"]),
            FieldSpec::flag("heart_failure").aliases(&["mcq160b", "MCQ160B__questionnaire"]),
            FieldSpec::flag("coronary_heart_disease")
                .aliases(&["mcq160c", "MCQ160C__questionnaire"]),
            FieldSpec::flag("myocardial_infarction")
                .aliases(&["mcq160e", "MCQ160E__questionnaire"]),
            FieldSpec::flag("stroke").aliases(&["mcq160f", "MCQ160F__questionnaire"]),
            FieldSpec::flag("liver_condition").aliases(&["mcq160l", "MCQ160L__questionnaire"]),
            FieldSpec::flag("cost_barrier"),
            FieldSpec::flag("catabolic_signs"),
            FieldSpec::flag("frequent_hypoglycemia"),
            FieldSpec::set("medications")
                .aliases(&["rxddrug", "RXDDRUG__medications"])
                .describe("Current medications, lowercased"),
            FieldSpec::set("comorbidities"),
        ])
    }
}

impl Default for FactSchema {
    fn default() -> Self {
        Self::diabetes()
    }
}
