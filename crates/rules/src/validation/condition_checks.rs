//! Condition compilation: YAML condition tree → typed [`Predicate`], plus
//! field checks against the fact schema.

use std::collections::BTreeSet;

use glyco_core::FactSchema;

use super::fuzzy::fuzzy_match;
use crate::loader::RuleLoadError;
use crate::predicate::{ComparisonOperator, LogicalOperator, Predicate};
use crate::schema::Condition;

/// Compile a condition tree. Every problem is pushed to `errors`; `None` is
/// returned if any node failed.
pub(crate) fn compile_condition(
    cond: &Condition,
    path: &str,
    rule_id: &str,
    errors: &mut Vec<RuleLoadError>,
) -> Option<Predicate> {
    match cond {
        Condition::Compare(c) => {
            let field = check_field_name(&c.field, path, rule_id, errors)?;
            if !c.value.is_finite() {
                errors.push(malformed(rule_id, format!("{path}.value must be a finite number")));
                return None;
            }
            match c.op.parse::<ComparisonOperator>() {
                Ok(op) => Some(Predicate::compare(field, op, c.value)),
                Err(_) => {
                    errors.push(RuleLoadError::UnknownOperator {
                        rule_id: rule_id.to_string(),
                        path: format!("{path}.op"),
                        operator: c.op.clone(),
                        suggestion: fuzzy_match(&c.op, ComparisonOperator::NAMES).map(str::to_string),
                    });
                    None
                }
            }
        }
        Condition::Contains(c) => {
            let field = check_field_name(&c.field, path, rule_id, errors)?;
            if c.contains.trim().is_empty() {
                errors.push(malformed(rule_id, format!("{path}.contains must not be empty")));
                return None;
            }
            Some(Predicate::contains(field, c.contains.trim()))
        }
        Condition::Flag(c) => check_field_name(&c.flag, path, rule_id, errors).map(Predicate::flag),
        Condition::Present(c) => {
            check_field_name(&c.present, path, rule_id, errors).map(Predicate::present)
        }
        Condition::Nested(comp) => {
            let operator = match comp.operator.parse::<LogicalOperator>() {
                Ok(op) => op,
                Err(_) => {
                    errors.push(RuleLoadError::UnknownOperator {
                        rule_id: rule_id.to_string(),
                        path: format!("{path}.operator"),
                        operator: comp.operator.clone(),
                        suggestion: fuzzy_match(&comp.operator, LogicalOperator::NAMES)
                            .map(str::to_string),
                    });
                    return None;
                }
            };

            match (operator, comp.conditions.len()) {
                (LogicalOperator::Not, 1) => {}
                (LogicalOperator::Not, n) => {
                    errors.push(malformed(
                        rule_id,
                        format!("{path}: 'not' takes exactly one condition, got {n}"),
                    ));
                    return None;
                }
                (_, 0) => {
                    errors.push(malformed(
                        rule_id,
                        format!("{path}: '{}' needs at least one condition", comp.operator),
                    ));
                    return None;
                }
                _ => {}
            }

            // Compile every child so all problems are reported in one pass.
            let children: Vec<Option<Predicate>> = comp
                .conditions
                .iter()
                .enumerate()
                .map(|(i, child)| {
                    compile_condition(child, &format!("{path}.conditions[{i}]"), rule_id, errors)
                })
                .collect();
            let mut children: Vec<Predicate> = children.into_iter().collect::<Option<_>>()?;

            Some(match operator {
                LogicalOperator::And => Predicate::All(children),
                LogicalOperator::Or => Predicate::Any(children),
                LogicalOperator::Not => Predicate::Not(Box::new(children.remove(0))),
            })
        }
    }
}

fn check_field_name<'a>(
    field: &'a str,
    path: &str,
    rule_id: &str,
    errors: &mut Vec<RuleLoadError>,
) -> Option<&'a str> {
    if field.trim().is_empty() {
        errors.push(malformed(rule_id, format!("{path}: field name must not be empty")));
        None
    } else {
        Some(field)
    }
}

fn malformed(rule_id: &str, message: String) -> RuleLoadError {
    RuleLoadError::Malformed {
        rule_id: rule_id.to_string(),
        message,
    }
}

/// Check a compiled predicate and its `requires` list against the schema:
/// every field must be declared, and each leaf must match the declared type.
pub(crate) fn check_predicate_fields(
    rule_id: &str,
    predicate: &Predicate,
    requires: &BTreeSet<String>,
    schema: &FactSchema,
) -> Vec<RuleLoadError> {
    let known = schema.field_names();
    let mut errors = Vec::new();
    let mut reported = BTreeSet::new();

    let mut unknown = |field: &str, errors: &mut Vec<RuleLoadError>| {
        if reported.insert(field.to_string()) {
            errors.push(RuleLoadError::UnknownField {
                rule_id: rule_id.to_string(),
                field: field.to_string(),
                suggestion: fuzzy_match(field, &known).map(str::to_string),
            });
        }
    };

    for (field, expected) in predicate.field_uses() {
        match (schema.field(field), expected) {
            (None, _) => unknown(field, &mut errors),
            (Some(spec), Some(expected)) if spec.fact_type != expected => {
                errors.push(RuleLoadError::FieldType {
                    rule_id: rule_id.to_string(),
                    field: field.to_string(),
                    expected,
                    declared: spec.fact_type,
                });
            }
            _ => {}
        }
    }
    for field in requires {
        if schema.field(field).is_none() {
            unknown(field, &mut errors);
        }
    }
    errors
}
