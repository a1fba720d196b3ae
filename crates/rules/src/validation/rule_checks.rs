//! Per-rule checks: metadata, spec fields, rationale template, and
//! compilation into a [`Rule`].

use std::collections::BTreeSet;

use glyco_core::FactSchema;

use super::condition_checks::{check_predicate_fields, compile_condition};
use super::fuzzy::is_kebab_case;
use super::ValidationReport;
use crate::loader::RuleLoadError;
use crate::rule::Rule;
use crate::schema::RuleDefinition;
use crate::templating::validate_template;

/// Validate one definition and compile it. Errors and warnings go to the
/// report; `None` means the definition had at least one error.
pub(crate) fn compile_definition(
    def: &RuleDefinition<'_>,
    origin: &str,
    schema: &FactSchema,
    strict_ids: bool,
    report: &mut ValidationReport,
) -> Option<Rule> {
    let id = def.metadata.id.as_str();
    let spec = def.spec;
    let mut errors = Vec::new();

    if id.trim().is_empty() {
        errors.push(malformed(id, "metadata.id must not be empty"));
    } else if !is_kebab_case(id) {
        let message = format!("id should be kebab-case (lowercase alphanumeric + hyphens), got '{id}'");
        if strict_ids {
            errors.push(malformed(id, &message));
        } else {
            report.warn(format!("{origin}: {id}.metadata.id"), message);
        }
    }
    if spec.category.trim().is_empty() {
        errors.push(malformed(id, "spec.category must not be empty"));
    }
    if spec.action.trim().is_empty() {
        errors.push(malformed(id, "spec.action must not be empty"));
    }
    if !(0.0..=1.0).contains(&spec.confidence) {
        errors.push(malformed(
            id,
            &format!("spec.confidence must be within [0, 1], got {}", spec.confidence),
        ));
    }
    if spec.rationale.trim().is_empty() {
        report.warn(format!("{origin}: {id}.spec.rationale"), "rationale is empty");
    }
    if let Err(message) = validate_template(&spec.rationale) {
        errors.push(RuleLoadError::Template {
            rule_id: id.to_string(),
            message,
        });
    }
    if matches!(&spec.guidance, Some(g) if g.is_empty()) {
        report.warn(format!("{origin}: {id}.spec.guidance"), "guidance block has no entries");
    }
    if !def.enabled {
        report.warn(
            format!("{origin}: {id}.metadata.enabled"),
            "rule is disabled and will not be loaded",
        );
    }

    let predicate = compile_condition(&spec.when, "spec.when", id, &mut errors);

    let rule = predicate.map(|predicate| {
        let read: BTreeSet<String> = predicate.fields().into_iter().map(str::to_string).collect();
        let requires = match &spec.requires {
            Some(explicit) => {
                let explicit: BTreeSet<String> = explicit.iter().cloned().collect();
                for unread in explicit.difference(&read) {
                    report.warn(
                        format!("{origin}: {id}.spec.requires"),
                        format!("'{unread}' is required but never read by the condition"),
                    );
                }
                for field in predicate.negated_fields() {
                    if !explicit.contains(field) {
                        report.warn(
                            format!("{origin}: {id}.spec.requires"),
                            format!("'{field}' is read under negation but not required; the rule fires when it is absent"),
                        );
                    }
                }
                explicit
            }
            None => read,
        };
        errors.extend(check_predicate_fields(id, &predicate, &requires, schema));

        Rule {
            id: id.to_string(),
            name: def.metadata.name.clone(),
            category: spec.category.trim().to_string(),
            action: spec.action.trim().to_string(),
            priority: spec.priority,
            confidence: spec.confidence,
            fallback: spec.fallback,
            requires,
            predicate,
            rationale: spec.rationale.clone(),
            guidance: spec.guidance.clone().filter(|g| !g.is_empty()),
            tags: def.metadata.tags.clone().unwrap_or_default(),
        }
    });

    let failed = !errors.is_empty();
    report.errors.extend(errors);
    report.rules_checked += 1;
    if failed {
        None
    } else {
        rule
    }
}

fn malformed(rule_id: &str, message: &str) -> RuleLoadError {
    RuleLoadError::Malformed {
        rule_id: rule_id.to_string(),
        message: message.to_string(),
    }
}
