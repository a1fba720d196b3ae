//! Shared rule set snapshot with copy-and-swap publication.
//!
//! Readers clone the current `Arc<RuleSet>` and evaluate against it without
//! holding any lock; a reload builds a complete new rule set off to the side
//! and swaps the pointer. An in-flight evaluation always sees exactly one
//! snapshot, old or new, never a mix.

use std::sync::{Arc, PoisonError, RwLock};

use glyco_core::{FactSchema, PatientFact};
use tracing::{info, warn};

use crate::engine::{self, Evaluation, EvaluationError};
use crate::loader::{Result, RuleLoader, RuleSource};
use crate::ruleset::RuleSet;

/// Holder of the current rule set snapshot.
#[derive(Debug)]
pub struct RuleStore {
    current: RwLock<Arc<RuleSet>>,
}

impl RuleStore {
    pub fn new(rules: RuleSet) -> Self {
        Self {
            current: RwLock::new(Arc::new(rules)),
        }
    }

    /// The current snapshot. Cheap: clones an `Arc`.
    pub fn snapshot(&self) -> Arc<RuleSet> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Replace the current snapshot, returning the previous one.
    pub fn publish(&self, rules: RuleSet) -> Arc<RuleSet> {
        self.swap(Arc::new(rules))
    }

    fn swap(&self, next: Arc<RuleSet>) -> Arc<RuleSet> {
        let fingerprint = next.fingerprint().to_string();
        let count = next.len();
        let previous = {
            let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *guard, next)
        };
        info!(
            rules = count,
            fingerprint = %fingerprint,
            previous = %previous.fingerprint(),
            "published rule set"
        );
        previous
    }

    /// Load `source` and publish the result. On failure the current snapshot
    /// stays in place and the error is returned.
    pub fn reload(&self, source: &RuleSource, schema: &FactSchema) -> Result<Arc<RuleSet>> {
        self.reload_with(&RuleLoader::new(schema.clone()), source)
    }

    /// Like [`RuleStore::reload`] with a preconfigured loader.
    pub fn reload_with(&self, loader: &RuleLoader, source: &RuleSource) -> Result<Arc<RuleSet>> {
        match loader.load(source) {
            Ok(rules) => {
                let next = Arc::new(rules);
                self.swap(Arc::clone(&next));
                Ok(next)
            }
            Err(e) => {
                warn!(
                    source = %source.describe(),
                    error = %e,
                    kept = %self.snapshot().fingerprint(),
                    "rule reload failed, keeping previous rule set"
                );
                Err(e)
            }
        }
    }

    /// Evaluate against the current snapshot.
    pub fn evaluate(&self, fact: &PatientFact) -> std::result::Result<Evaluation, EvaluationError> {
        let rules = self.snapshot();
        engine::evaluate(fact, &rules)
    }
}

impl Default for RuleStore {
    fn default() -> Self {
        Self::new(RuleSet::empty())
    }
}
