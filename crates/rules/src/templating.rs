//! Minijinja rendering of rule rationale templates.
//!
//! Templates are arbitrary strings from rule definitions (not pre-registered),
//! so a fresh [`minijinja::Environment`] is created per render call. The
//! patient fact's fields are top-level template variables; the firing rule
//! is available as `rule`.

use glyco_core::PatientFact;
use serde::Serialize;

use crate::rule::Rule;

/// Context data available to rationale templates.
#[derive(Debug, Serialize)]
struct RationaleContext<'a> {
    #[serde(flatten)]
    fact: &'a PatientFact,
    rule: RuleContext<'a>,
}

/// Rule metadata exposed to templates.
#[derive(Debug, Serialize)]
struct RuleContext<'a> {
    id: &'a str,
    name: &'a str,
    category: &'a str,
    action: &'a str,
    priority: i32,
}

/// Build a configured minijinja environment with custom filters.
fn build_env() -> minijinja::Environment<'static> {
    let mut env = minijinja::Environment::new();
    env.add_filter("round", round_filter);
    env
}

/// Render a rule's rationale against a fact.
pub(crate) fn render_rationale(rule: &Rule, fact: &PatientFact) -> Result<String, String> {
    let ctx = RationaleContext {
        fact,
        rule: RuleContext {
            id: &rule.id,
            name: &rule.name,
            category: &rule.category,
            action: &rule.action,
            priority: rule.priority,
        },
    };
    build_env()
        .render_str(&rule.rationale, ctx)
        .map(|s| s.trim().to_string())
        .map_err(|e| e.to_string())
}

/// Check that a template string parses, without evaluating it.
pub(crate) fn validate_template(template: &str) -> Result<(), String> {
    let env = build_env();
    env.template_from_str(template).map_err(|e| e.to_string())?;
    Ok(())
}

/// Custom filter: round a float to N decimal places.
fn round_filter(value: f64, decimals: Option<u32>) -> String {
    let n = decimals.unwrap_or(0);
    format!("{:.prec$}", value, prec = n as usize)
}
