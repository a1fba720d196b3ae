//! Condition tree as written in YAML.
//!
//! Operators are kept as strings here so an unknown operator surfaces as a
//! targeted load error (with a suggestion) instead of a generic parse error.

use serde::{Deserialize, Serialize};

/// A condition leaf or nested composition node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Condition {
    /// `{ field, op, value }` numeric comparison.
    Compare(CompareCondition),
    /// `{ field, contains }` set membership.
    Contains(ContainsCondition),
    /// `{ flag }` true when the flag is set.
    Flag(FlagCondition),
    /// `{ present }` true when the field has a value.
    Present(PresentCondition),
    /// Nested composition for recursive boolean logic.
    Nested(Composition),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CompareCondition {
    pub field: String,
    pub op: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ContainsCondition {
    pub field: String,
    pub contains: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FlagCondition {
    pub flag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PresentCondition {
    pub present: String,
}

/// Boolean composition of conditions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Composition {
    pub operator: String,
    pub conditions: Vec<Condition>,
}
