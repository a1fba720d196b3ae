use glyco_core::FactType;

use super::*;
use crate::predicate::Predicate;
use crate::rule::Rule;

fn set(rules: Vec<Rule>) -> RuleSet {
    RuleSet::new(rules).unwrap()
}

fn hba1c(value: f64) -> PatientFact {
    PatientFact::new().with("has_diabetes", true).with("hba1c", value)
}

#[test]
fn higher_priority_wins_within_category() {
    let rules = set(vec![
        Rule::new("r1", "glycemic", "Intensify therapy", 10, Predicate::gt("hba1c", 9.0))
            .with_rationale("HbA1c {{ hba1c }} above 9."),
        Rule::new("r2", "glycemic", "Maintain therapy", 5, Predicate::gt("hba1c", 7.0)),
    ]);
    let eval = evaluate(&hba1c(9.5), &rules).unwrap();

    assert_eq!(eval.outcome, Outcome::Recommended);
    assert_eq!(eval.recommendations.len(), 1);
    let rec = &eval.recommendations[0];
    assert_eq!(rec.action, "Intensify therapy");
    assert_eq!(rec.supporting_rules, vec!["r1".to_string()]);
    assert_eq!(rec.rationale[0].text, "HbA1c 9.5 above 9.");
    assert_eq!(
        eval.suppressed,
        vec![SuppressedRule {
            rule_id: "r2".to_string(),
            category: "glycemic".to_string(),
            action: "Maintain therapy".to_string(),
            priority: 5,
            superseded_by: "r1".to_string(),
        }]
    );
    assert_eq!(rec.suppressed, eval.suppressed);
}

#[test]
fn different_categories_both_recommended_in_priority_order() {
    let rules = set(vec![
        Rule::new("r2", "lifestyle", "Lifestyle counseling", 5, Predicate::gt("hba1c", 7.0)),
        Rule::new("r1", "glycemic", "Intensify therapy", 10, Predicate::gt("hba1c", 9.0)),
    ]);
    let eval = evaluate(&hba1c(9.5), &rules).unwrap();

    assert_eq!(eval.actions(), vec!["Intensify therapy", "Lifestyle counseling"]);
    assert!(eval.suppressed.is_empty());
    assert_eq!(eval.recommendation("lifestyle").map(|r| r.priority), Some(5));
}

#[test]
fn equal_priority_ties_break_on_id() {
    let rules = set(vec![
        Rule::new("b-rule", "glycemic", "Option B", 10, Predicate::gt("hba1c", 9.0)),
        Rule::new("a-rule", "glycemic", "Option A", 10, Predicate::gt("hba1c", 9.0)),
    ]);
    let eval = evaluate(&hba1c(9.5), &rules).unwrap();
    assert_eq!(eval.actions(), vec!["Option A"]);
    assert_eq!(eval.suppressed[0].rule_id, "b-rule");
}

#[test]
fn agreeing_rules_support_one_recommendation() {
    let rules = set(vec![
        Rule::new("hf", "cardiorenal", "Add SGLT2 inhibitor", 60, Predicate::flag("heart_failure"))
            .with_confidence(0.7),
        Rule::new("ckd", "cardiorenal", "Add SGLT2 inhibitor", 70, Predicate::lt("egfr", 60.0))
            .with_confidence(0.9),
    ]);
    let fact = PatientFact::new().with("heart_failure", true).with("egfr", 45.0);
    let eval = evaluate(&fact, &rules).unwrap();

    let rec = &eval.recommendations[0];
    assert_eq!(rec.supporting_rules, vec!["ckd".to_string(), "hf".to_string()]);
    assert_eq!(rec.rationale.len(), 2);
    assert_eq!(rec.priority, 70);
    assert_eq!(rec.confidence, 0.9);
    assert!(eval.suppressed.is_empty());
}

#[test]
fn no_match_is_empty_not_error() {
    let rules = set(vec![Rule::new("r1", "glycemic", "Intensify", 10, Predicate::gt("hba1c", 9.0))]);
    let eval = evaluate(&hba1c(6.0), &rules).unwrap();
    assert!(eval.is_empty());
    assert_eq!(eval.outcome, Outcome::NoApplicableRecommendation);
    assert!(eval.suppressed.is_empty());

    let eval = evaluate(&hba1c(6.0), &RuleSet::empty()).unwrap();
    assert_eq!(eval.outcome, Outcome::NoApplicableRecommendation);
}

#[test]
fn fallback_only_when_nothing_else_fires() {
    let rules = set(vec![
        Rule::new("r1", "glycemic", "Intensify", 10, Predicate::gt("hba1c", 9.0)),
        Rule::new("fallback", "general", "Maintain lifestyle therapy and monitor.", 0, Predicate::flag("has_diabetes"))
            .as_fallback(),
    ]);

    let eval = evaluate(&hba1c(9.5), &rules).unwrap();
    assert_eq!(eval.outcome, Outcome::Recommended);
    assert_eq!(eval.actions(), vec!["Intensify"]);

    let eval = evaluate(&hba1c(6.0), &rules).unwrap();
    assert_eq!(eval.outcome, Outcome::Fallback);
    assert_eq!(eval.recommendations[0].supporting_rules, vec!["fallback".to_string()]);
    assert!(eval.suppressed.is_empty());
}

#[test]
fn unused_fallback_is_traced_as_suppressed() {
    let rules = set(vec![
        Rule::new("r1", "glycemic", "Intensify", 10, Predicate::gt("hba1c", 9.0)),
        Rule::new("fb", "general", "Maintain lifestyle therapy.", 0, Predicate::flag("has_diabetes")).as_fallback(),
    ]);

    let eval = evaluate(&hba1c(9.5), &rules).unwrap();
    assert_eq!(eval.actions(), vec!["Intensify"]);
    assert_eq!(
        eval.suppressed,
        vec![SuppressedRule {
            rule_id: "fb".to_string(),
            category: "general".to_string(),
            action: "Maintain lifestyle therapy.".to_string(),
            priority: 0,
            superseded_by: "r1".to_string(),
        }]
    );
    // Not attached to the winning recommendation, which is in another category.
    assert!(eval.recommendations[0].suppressed.is_empty());
    assert!(crate::explain::explain_evaluation(&eval).contains("  - fb (general, priority 0: Maintain lifestyle therapy.) superseded by r1"));
}

#[test]
fn skipped_rules_are_recorded() {
    let rules = set(vec![
        Rule::new("renal", "renal", "Reduce dose", 20, Predicate::lt("egfr", 45.0)),
        Rule::new("r1", "glycemic", "Intensify", 10, Predicate::gt("hba1c", 9.0)),
    ]);
    let eval = evaluate(&hba1c(9.5), &rules).unwrap();
    assert_eq!(
        eval.skipped,
        vec![SkippedRule {
            rule_id: "renal".to_string(),
            missing: vec!["egfr".to_string()],
        }]
    );
    assert_eq!(eval.actions(), vec!["Intensify"]);
}

#[test]
fn type_mismatch_is_evaluation_error() {
    let rules = set(vec![Rule::new("r1", "glycemic", "Intensify", 10, Predicate::gt("has_diabetes", 0.0))]);
    let err = evaluate(&hba1c(9.5), &rules).unwrap_err();
    assert_eq!(
        err,
        EvaluationError::TypeMismatch {
            rule_id: "r1".to_string(),
            field: "has_diabetes".to_string(),
            expected: FactType::Number,
            found: FactType::Flag,
        }
    );
}

#[test]
fn evaluation_is_deterministic_and_fingerprinted() {
    let rules = set(vec![
        Rule::new("r1", "glycemic", "Intensify", 10, Predicate::gt("hba1c", 9.0)),
        Rule::new("r2", "glycemic", "Maintain", 5, Predicate::gt("hba1c", 7.0)),
        Rule::new("r3", "lifestyle", "Counsel", 1, Predicate::flag("has_diabetes")),
    ]);
    let fact = hba1c(9.5);
    let first = evaluate(&fact, &rules).unwrap();
    for _ in 0..10 {
        assert_eq!(evaluate(&fact, &rules).unwrap(), first);
    }
    assert_eq!(first.rule_set_fingerprint, rules.fingerprint());
}
