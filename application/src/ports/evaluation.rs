//! Evaluation backend port
//!
//! Defines the interface for the scoring backends the judge panel calls.
//! Evaluation is read-only with respect to agent responses: backends
//! score and comment, they never generate answer content.

use super::generation::BackendError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Structured payload returned by an evaluation call.
///
/// Dimension values are kept as raw JSON: a backend may return a number,
/// a numeric string, or garbage for any dimension. The judge panel
/// resolves each dimension with [`score_for`](Self::score_for) and
/// substitutes the midpoint default when a value is missing or
/// non-numeric.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructuredEvaluation {
    /// Raw per-dimension values as reported by the backend
    #[serde(default)]
    pub scores: BTreeMap<String, serde_json::Value>,
    /// Free-text reasoning
    #[serde(default)]
    pub reasoning: String,
    /// Flagged issues, in the order reported
    #[serde(default)]
    pub issues: Vec<String>,
}

impl StructuredEvaluation {
    /// Numeric score for a dimension, if present and parseable.
    ///
    /// Accepts JSON numbers and numeric strings; anything else is `None`.
    pub fn score_for(&self, dimension: &str) -> Option<f64> {
        match self.scores.get(dimension)? {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Backend for scoring candidate answers against a rubric
#[async_trait]
pub trait EvaluationBackend: Send + Sync {
    /// Evaluate one candidate answer against the given rubric prompt
    async fn evaluate(
        &self,
        query: &str,
        candidate: &str,
        rubric_prompt: &str,
    ) -> Result<StructuredEvaluation, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_score_for_number() {
        let eval = StructuredEvaluation {
            scores: BTreeMap::from([("accuracy".to_string(), json!(8.5))]),
            ..Default::default()
        };
        assert_eq!(eval.score_for("accuracy"), Some(8.5));
    }

    #[test]
    fn test_score_for_numeric_string() {
        let eval = StructuredEvaluation {
            scores: BTreeMap::from([("accuracy".to_string(), json!("7"))]),
            ..Default::default()
        };
        assert_eq!(eval.score_for("accuracy"), Some(7.0));
    }

    #[test]
    fn test_score_for_garbage_is_none() {
        let eval = StructuredEvaluation {
            scores: BTreeMap::from([("accuracy".to_string(), json!(["not", "a", "score"]))]),
            ..Default::default()
        };
        assert_eq!(eval.score_for("accuracy"), None);
    }

    #[test]
    fn test_score_for_missing_is_none() {
        assert_eq!(StructuredEvaluation::default().score_for("accuracy"), None);
    }

    #[test]
    fn test_deserializes_from_backend_json() {
        let eval: StructuredEvaluation = serde_json::from_value(json!({
            "scores": {"accuracy": 8, "citations": "6"},
            "reasoning": "solid but lightly sourced",
            "issues": ["few citations"]
        }))
        .unwrap();
        assert_eq!(eval.score_for("accuracy"), Some(8.0));
        assert_eq!(eval.issues.len(), 1);
    }
}
