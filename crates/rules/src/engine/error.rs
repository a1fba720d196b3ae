use glyco_core::FactType;

/// Internal invariant violation during evaluation. Fatal for that request
/// only; the shared rule set is never touched.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluationError {
    #[error("rule '{rule_id}' reads '{field}' as a {expected}, but the fact holds a {found}")]
    TypeMismatch {
        rule_id: String,
        field: String,
        expected: FactType,
        found: FactType,
    },

    #[error("rule '{rule_id}': rationale rendering failed: {message}")]
    Template { rule_id: String, message: String },
}

impl EvaluationError {
    pub fn rule_id(&self) -> &str {
        match self {
            EvaluationError::TypeMismatch { rule_id, .. } | EvaluationError::Template { rule_id, .. } => rule_id,
        }
    }
}
