//! Normalized patient facts.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Declared type of a fact field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactType {
    Number,
    Flag,
    Set,
}

impl fmt::Display for FactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactType::Number => write!(f, "number"),
            FactType::Flag => write!(f, "flag"),
            FactType::Set => write!(f, "set"),
        }
    }
}

/// A single typed patient attribute.
///
/// Serializes untagged, so templates and JSON output see a plain number,
/// boolean or array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FactValue {
    Number(f64),
    Flag(bool),
    Set(BTreeSet<String>),
}

impl FactValue {
    pub fn fact_type(&self) -> FactType {
        match self {
            FactValue::Number(_) => FactType::Number,
            FactValue::Flag(_) => FactType::Flag,
            FactValue::Set(_) => FactType::Set,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FactValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            FactValue::Flag(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&BTreeSet<String>> {
        match self {
            FactValue::Set(v) => Some(v),
            _ => None,
        }
    }
}

impl From<f64> for FactValue {
    fn from(v: f64) -> Self {
        FactValue::Number(v)
    }
}

impl From<bool> for FactValue {
    fn from(v: bool) -> Self {
        FactValue::Flag(v)
    }
}

impl<S: Into<String>> FromIterator<S> for FactValue {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        FactValue::Set(iter.into_iter().map(Into::into).collect())
    }
}

/// The fact base for one evaluation: canonical field name → value.
///
/// Absent fields are simply not in the map. Backed by a `BTreeMap` so
/// iteration order (and everything derived from it) is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientFact {
    values: BTreeMap<String, FactValue>,
}

impl PatientFact {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for tests and programmatic callers.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FactValue>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<FactValue>) {
        self.values.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&FactValue> {
        self.values.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    pub fn number(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(FactValue::as_number)
    }

    pub fn flag(&self, field: &str) -> Option<bool> {
        self.get(field).and_then(FactValue::as_flag)
    }

    /// Whether a set-valued field contains `item` (case-insensitive).
    pub fn set_contains(&self, field: &str, item: &str) -> bool {
        let needle = item.to_lowercase();
        self.get(field)
            .and_then(FactValue::as_set)
            .map(|set| set.contains(&needle))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FactValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}
