//! Per-category conflict resolution.

use std::collections::HashMap;

use super::SuppressedRule;
use crate::rule::Rule;

/// One category's outcome: the winning rule and the rules that agree with it.
#[derive(Debug)]
pub(super) struct Slot<'a> {
    pub winner: &'a Rule,
    /// Winner first, then agreeing rules in priority order.
    pub supporting: Vec<&'a Rule>,
    pub suppressed: Vec<SuppressedRule>,
}

/// Resolve fired rules (already in priority order) into one slot per
/// category. Slots come out in winner order.
///
/// A later rule with the winner's action supports it; a later rule with a
/// different action is suppressed in the winner's favor.
pub(super) fn resolve<'a>(fired: &[&'a Rule]) -> Vec<Slot<'a>> {
    let mut slots: Vec<Slot<'a>> = Vec::new();
    let mut by_category: HashMap<&str, usize> = HashMap::new();

    for &rule in fired {
        match by_category.get(rule.category.as_str()) {
            None => {
                by_category.insert(rule.category.as_str(), slots.len());
                slots.push(Slot {
                    winner: rule,
                    supporting: vec![rule],
                    suppressed: Vec::new(),
                });
            }
            Some(&i) => {
                let slot = &mut slots[i];
                if same_action(&slot.winner.action, &rule.action) {
                    slot.supporting.push(rule);
                } else {
                    slot.suppressed.push(SuppressedRule {
                        rule_id: rule.id.clone(),
                        category: rule.category.clone(),
                        action: rule.action.clone(),
                        priority: rule.priority,
                        superseded_by: slot.winner.id.clone(),
                    });
                }
            }
        }
    }
    slots
}

fn same_action(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::Predicate;

    fn rule(id: &str, category: &str, action: &str, priority: i32) -> Rule {
        Rule::new(id, category, action, priority, Predicate::flag("has_diabetes"))
    }

    #[test]
    fn higher_priority_wins_category() {
        let r1 = rule("r1", "glycemic", "Intensify", 10);
        let r2 = rule("r2", "glycemic", "Maintain", 5);
        let slots = resolve(&[&r1, &r2]);

        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].winner.id, "r1");
        assert_eq!(slots[0].suppressed.len(), 1);
        assert_eq!(slots[0].suppressed[0].rule_id, "r2");
        assert_eq!(slots[0].suppressed[0].superseded_by, "r1");
    }

    #[test]
    fn distinct_categories_both_survive() {
        let r1 = rule("r1", "glycemic", "Intensify", 10);
        let r2 = rule("r2", "renal", "Reduce metformin", 5);
        let slots = resolve(&[&r1, &r2]);
        let winners: Vec<&str> = slots.iter().map(|s| s.winner.id.as_str()).collect();
        assert_eq!(winners, vec!["r1", "r2"]);
        assert!(slots.iter().all(|s| s.suppressed.is_empty()));
    }

    #[test]
    fn same_action_supports_winner() {
        let r1 = rule("r1", "cardio", "Add GLP-1 RA", 50);
        let r2 = rule("r2", "cardio", "add glp-1 ra ", 40);
        let r3 = rule("r3", "cardio", "Add SGLT2i", 30);
        let slots = resolve(&[&r1, &r2, &r3]);

        let supporting: Vec<&str> = slots[0].supporting.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(supporting, vec!["r1", "r2"]);
        assert_eq!(slots[0].suppressed[0].rule_id, "r3");
    }
}
