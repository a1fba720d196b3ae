//! Compiled predicate grammar.
//!
//! A closed set of node types: numeric comparison, set membership, flag,
//! presence, and AND/OR/NOT composition. Rules never carry executable code.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use glyco_core::{FactType, FactValue, PatientFact};
use serde::{Deserialize, Serialize};

use crate::engine::EvaluationError;

/// Numeric comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOperator {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    Neq,
}

impl ComparisonOperator {
    /// Accepted spellings, used for "did you mean" suggestions.
    pub const NAMES: &'static [&'static str] = &["gt", "gte", "lt", "lte", "eq", "neq"];

    pub fn apply(self, left: f64, right: f64) -> bool {
        match self {
            ComparisonOperator::Gt => left > right,
            ComparisonOperator::Gte => left >= right,
            ComparisonOperator::Lt => left < right,
            ComparisonOperator::Lte => left <= right,
            ComparisonOperator::Eq => (left - right).abs() <= f64::EPSILON,
            ComparisonOperator::Neq => (left - right).abs() > f64::EPSILON,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            ComparisonOperator::Gt => ">",
            ComparisonOperator::Gte => ">=",
            ComparisonOperator::Lt => "<",
            ComparisonOperator::Lte => "<=",
            ComparisonOperator::Eq => "==",
            ComparisonOperator::Neq => "!=",
        }
    }
}

impl FromStr for ComparisonOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gt" | ">" => Ok(ComparisonOperator::Gt),
            "gte" | ">=" => Ok(ComparisonOperator::Gte),
            "lt" | "<" => Ok(ComparisonOperator::Lt),
            "lte" | "<=" => Ok(ComparisonOperator::Lte),
            "eq" | "==" => Ok(ComparisonOperator::Eq),
            "neq" | "!=" => Ok(ComparisonOperator::Neq),
            other => Err(format!("unknown comparison operator: '{}'", other)),
        }
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Logical operators for composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalOperator {
    And,
    Or,
    Not,
}

impl LogicalOperator {
    pub const NAMES: &'static [&'static str] = &["and", "or", "not"];
}

impl FromStr for LogicalOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "and" => Ok(LogicalOperator::And),
            "or" => Ok(LogicalOperator::Or),
            "not" => Ok(LogicalOperator::Not),
            other => Err(format!("unknown logical operator: '{}'", other)),
        }
    }
}

/// A compiled, type-checked condition tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    Compare {
        field: String,
        op: ComparisonOperator,
        value: f64,
    },
    Contains {
        field: String,
        item: String,
    },
    Flag {
        field: String,
    },
    Present {
        field: String,
    },
    All(Vec<Predicate>),
    Any(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn compare(field: &str, op: ComparisonOperator, value: f64) -> Self {
        Predicate::Compare {
            field: field.to_string(),
            op,
            value,
        }
    }

    pub fn gt(field: &str, value: f64) -> Self {
        Self::compare(field, ComparisonOperator::Gt, value)
    }

    pub fn gte(field: &str, value: f64) -> Self {
        Self::compare(field, ComparisonOperator::Gte, value)
    }

    pub fn lt(field: &str, value: f64) -> Self {
        Self::compare(field, ComparisonOperator::Lt, value)
    }

    pub fn lte(field: &str, value: f64) -> Self {
        Self::compare(field, ComparisonOperator::Lte, value)
    }

    /// Set membership; the item is stored lowercased like normalized sets.
    pub fn contains(field: &str, item: &str) -> Self {
        Predicate::Contains {
            field: field.to_string(),
            item: item.to_lowercase(),
        }
    }

    pub fn flag(field: &str) -> Self {
        Predicate::Flag {
            field: field.to_string(),
        }
    }

    pub fn present(field: &str) -> Self {
        Predicate::Present {
            field: field.to_string(),
        }
    }

    pub fn negate(self) -> Self {
        Predicate::Not(Box::new(self))
    }

    /// Every fact field the predicate reads.
    pub fn fields(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.visit_leaves(&mut |field, _| {
            out.insert(field);
        });
        out
    }

    /// Each leaf's field with the fact type it expects (`None` for presence).
    pub fn field_uses(&self) -> Vec<(&str, Option<FactType>)> {
        let mut out = Vec::new();
        self.visit_leaves(&mut |field, ty| out.push((field, ty)));
        out
    }

    /// Fields whose value leaves sit under an odd number of negations.
    /// An absent value makes such a leaf true, so the rule can fire without
    /// the data. Presence checks are excluded.
    pub fn negated_fields(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.collect_negated(false, &mut out);
        out
    }

    fn collect_negated<'a>(&'a self, negated: bool, out: &mut BTreeSet<&'a str>) {
        match self {
            Predicate::Compare { field, .. } | Predicate::Contains { field, .. } | Predicate::Flag { field } => {
                if negated {
                    out.insert(field);
                }
            }
            Predicate::Present { .. } => {}
            Predicate::All(children) | Predicate::Any(children) => {
                for child in children {
                    child.collect_negated(negated, out);
                }
            }
            Predicate::Not(inner) => inner.collect_negated(!negated, out),
        }
    }

    fn visit_leaves<'a>(&'a self, f: &mut dyn FnMut(&'a str, Option<FactType>)) {
        match self {
            Predicate::Compare { field, .. } => f(field, Some(FactType::Number)),
            Predicate::Contains { field, .. } => f(field, Some(FactType::Set)),
            Predicate::Flag { field } => f(field, Some(FactType::Flag)),
            Predicate::Present { field } => f(field, None),
            Predicate::All(children) | Predicate::Any(children) => {
                for child in children {
                    child.visit_leaves(f);
                }
            }
            Predicate::Not(inner) => inner.visit_leaves(f),
        }
    }

    /// Evaluate against a fact. An absent field makes its leaf false.
    /// A present field of the wrong type is an invariant violation.
    pub fn evaluate(&self, fact: &PatientFact, rule_id: &str) -> Result<bool, EvaluationError> {
        match self {
            Predicate::Compare { field, op, value } => match fact.get(field) {
                None => Ok(false),
                Some(FactValue::Number(v)) => Ok(op.apply(*v, *value)),
                Some(other) => Err(mismatch(rule_id, field, FactType::Number, other)),
            },
            Predicate::Contains { field, item } => match fact.get(field) {
                None => Ok(false),
                Some(FactValue::Set(set)) => Ok(set.contains(item)),
                Some(other) => Err(mismatch(rule_id, field, FactType::Set, other)),
            },
            Predicate::Flag { field } => match fact.get(field) {
                None => Ok(false),
                Some(FactValue::Flag(b)) => Ok(*b),
                Some(other) => Err(mismatch(rule_id, field, FactType::Flag, other)),
            },
            Predicate::Present { field } => Ok(fact.contains(field)),
            Predicate::All(children) => {
                for child in children {
                    if !child.evaluate(fact, rule_id)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Predicate::Any(children) => {
                for child in children {
                    if child.evaluate(fact, rule_id)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Predicate::Not(inner) => Ok(!inner.evaluate(fact, rule_id)?),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Compare { field, op, value } => write!(f, "{} {} {}", field, op, value),
            Predicate::Contains { field, item } => write!(f, "{} contains '{}'", field, item),
            Predicate::Flag { field } => write!(f, "{}", field),
            Predicate::Present { field } => write!(f, "{} present", field),
            Predicate::All(children) => write_joined(f, children, " AND "),
            Predicate::Any(children) => write_joined(f, children, " OR "),
            Predicate::Not(inner) => write!(f, "NOT ({})", inner),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, children: &[Predicate], sep: &str) -> fmt::Result {
    f.write_str("(")?;
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{}", child)?;
    }
    f.write_str(")")
}

fn mismatch(rule_id: &str, field: &str, expected: FactType, found: &FactValue) -> EvaluationError {
    EvaluationError::TypeMismatch {
        rule_id: rule_id.to_string(),
        field: field.to_string(),
        expected,
        found: found.fact_type(),
    }
}

// ── Tests ───────────────────────────────────────────────────────────
