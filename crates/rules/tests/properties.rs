//! Property tests for rule ordering, conflict resolution and determinism.

use std::collections::BTreeSet;

use glyco_core::PatientFact;
use glyco_rules::{evaluate, explain, Predicate, Rule, RuleAssessment, RuleSet};
use proptest::prelude::*;

const CATEGORIES: &[&str] = &["glycemic", "renal", "cardio"];
const ACTIONS: &[&str] = &["Start metformin", "Add SGLT2 inhibitor", "Add GLP-1 RA"];

/// (category, action, priority, hba1c threshold, fallback)
type RuleShape = (usize, usize, i32, f64, bool);

fn shapes() -> impl Strategy<Value = Vec<RuleShape>> {
    prop::collection::vec(
        (0..CATEGORIES.len(), 0..ACTIONS.len(), 0i32..20, 4.0f64..12.0, prop::bool::weighted(0.2)),
        1..16,
    )
}

fn build(shapes: &[RuleShape]) -> Vec<Rule> {
    shapes
        .iter()
        .enumerate()
        .map(|(i, &(cat, action, priority, threshold, fallback))| {
            let rule = Rule::new(
                format!("rule-{i:02}"),
                CATEGORIES[cat],
                ACTIONS[action],
                priority,
                Predicate::gt("hba1c", threshold),
            )
            .with_rationale("threshold exceeded");
            if fallback {
                rule.as_fallback()
            } else {
                rule
            }
        })
        .collect()
}

fn permuted(mut rules: Vec<Rule>, rotate: usize) -> Vec<Rule> {
    let len = rules.len();
    rules.rotate_left(rotate % len);
    rules.reverse();
    rules
}

proptest! {
    #[test]
    fn rule_set_order_is_priority_then_id(shapes in shapes()) {
        let set = RuleSet::new(build(&shapes)).unwrap();
        let keys: Vec<(i32, String)> = set.iter().map(|r| (-r.priority, r.id.clone())).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        prop_assert_eq!(keys, sorted);
    }

    #[test]
    fn evaluation_ignores_definition_order(shapes in shapes(), rotate in any::<usize>(), hba1c in 3.0f64..20.0) {
        let rules = build(&shapes);
        let a = RuleSet::new(rules.clone()).unwrap();
        let b = RuleSet::new(permuted(rules, rotate)).unwrap();
        prop_assert_eq!(a.fingerprint(), b.fingerprint());

        let fact = PatientFact::new().with("hba1c", hba1c);
        let first = evaluate(&fact, &a).unwrap();
        prop_assert_eq!(&first, &evaluate(&fact, &a).unwrap());
        prop_assert_eq!(&first, &evaluate(&fact, &b).unwrap());
    }

    #[test]
    fn one_recommendation_per_category(shapes in shapes(), hba1c in 3.0f64..20.0) {
        let set = RuleSet::new(build(&shapes)).unwrap();
        let fact = PatientFact::new().with("hba1c", hba1c);
        let eval = evaluate(&fact, &set).unwrap();

        let categories: BTreeSet<&str> = eval.recommendations.iter().map(|r| r.category.as_str()).collect();
        prop_assert_eq!(categories.len(), eval.recommendations.len());

        // Every matched rule, fallback rules included, either supports a
        // recommendation or shows up in the suppressed trace.
        let fired: BTreeSet<String> = set
            .assess(&fact)
            .unwrap()
            .into_iter()
            .filter_map(|a| match a {
                RuleAssessment::Matched(rule) => Some(rule.id.clone()),
                _ => None,
            })
            .collect();
        let mut accounted = BTreeSet::new();
        for rec in &eval.recommendations {
            for id in &rec.supporting_rules {
                let rule = set.get(id).unwrap();
                prop_assert_eq!(&rule.action, &rec.action);
                prop_assert_eq!(&rule.category, &rec.category);
                prop_assert!(accounted.insert(id.clone()));
            }
            for s in &rec.suppressed {
                prop_assert_eq!(&s.category, &rec.category);
                prop_assert!(s.priority <= rec.priority);
                prop_assert_ne!(&s.action, &rec.action);
                prop_assert!(eval.suppressed.contains(s));
            }
        }
        for s in &eval.suppressed {
            prop_assert!(accounted.insert(s.rule_id.clone()));
        }
        prop_assert_eq!(accounted, fired);
    }

    #[test]
    fn explanation_names_only_supporting_rules(shapes in shapes(), hba1c in 3.0f64..20.0) {
        let set = RuleSet::new(build(&shapes)).unwrap();
        let eval = evaluate(&PatientFact::new().with("hba1c", hba1c), &set).unwrap();
        for rec in &eval.recommendations {
            let text = explain(rec);
            for id in &rec.supporting_rules {
                prop_assert!(text.contains(id.as_str()));
            }
            for s in &rec.suppressed {
                prop_assert!(!text.contains(s.rule_id.as_str()), "{} leaked into:\n{}", s.rule_id, text);
            }
        }
    }
}
