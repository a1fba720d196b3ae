//! Human-readable explanations of recommendations and evaluation traces.
//!
//! Output is deterministic: the same recommendation always yields the same
//! text.

use std::fmt::Write;

use crate::engine::{Evaluation, Outcome, Recommendation};

/// Explain one recommendation. Names only the rules that support it;
/// suppressed alternatives are reported as a count.
pub fn explain(rec: &Recommendation) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Recommendation: {}", rec.action);
    let _ = writeln!(
        out,
        "  Category: {} | priority {} | confidence {:.2}",
        rec.category, rec.priority, rec.confidence
    );
    let _ = writeln!(out, "  Supported by: {}", rec.supporting_rules.join(", "));

    for rationale in &rec.rationale {
        if rationale.text.is_empty() {
            let _ = writeln!(out, "  - [{}]", rationale.rule_id);
        } else {
            let _ = writeln!(out, "  - [{}] {}", rationale.rule_id, rationale.text);
        }
        let Some(guidance) = &rationale.guidance else {
            continue;
        };
        if let Some(dosage) = &guidance.dosage {
            let _ = writeln!(out, "      Dosage: {dosage}");
        }
        if let Some(reason) = &guidance.dosage_reason {
            let _ = writeln!(out, "      Why this dosage: {reason}");
        }
        match (&guidance.guideline_ref, &guidance.guideline_text) {
            (Some(r), Some(t)) => {
                let _ = writeln!(out, "      Guideline {r}: {t}");
            }
            (Some(r), None) => {
                let _ = writeln!(out, "      Guideline {r}");
            }
            (None, Some(t)) => {
                let _ = writeln!(out, "      Guideline: {t}");
            }
            (None, None) => {}
        }
    }

    if !rec.suppressed.is_empty() {
        let n = rec.suppressed.len();
        let _ = writeln!(
            out,
            "  {n} lower-priority alternative{} suppressed",
            if n == 1 { "" } else { "s" }
        );
    }
    out
}

/// Full audit trace of an evaluation: every recommendation, then the
/// suppressed and skipped rules, then the rule set fingerprint.
pub fn explain_evaluation(eval: &Evaluation) -> String {
    let mut out = String::new();

    match eval.outcome {
        Outcome::NoApplicableRecommendation => {
            out.push_str("No applicable recommendation for the supplied data.\n");
        }
        Outcome::Fallback => {
            out.push_str("No specific rule matched; fallback guidance applies.\n\n");
        }
        Outcome::Recommended => {}
    }

    for (i, rec) in eval.recommendations.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&explain(rec));
    }

    if !eval.suppressed.is_empty() {
        out.push_str("\nSuppressed:\n");
        for s in &eval.suppressed {
            let _ = writeln!(
                out,
                "  - {} ({}, priority {}: {}) superseded by {}",
                s.rule_id, s.category, s.priority, s.action, s.superseded_by
            );
        }
    }

    if !eval.skipped.is_empty() {
        out.push_str("\nSkipped (missing data):\n");
        for s in &eval.skipped {
            let _ = writeln!(out, "  - {}: {}", s.rule_id, s.missing.join(", "));
        }
    }

    let _ = writeln!(out, "\nRule set: {}", eval.rule_set_fingerprint);
    out
}
