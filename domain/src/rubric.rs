//! Weighted scoring rubrics
//!
//! A rubric is a named set of scoring dimensions, each with a weight
//! summing to ~1.0, used to compute a judge's weighted total score.

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One scoring dimension of a rubric
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RubricDimension {
    /// Relative weight of this dimension (all weights sum to ~1.0)
    pub weight: f64,
    /// What the judge should assess on this dimension
    #[serde(default)]
    pub description: String,
}

impl RubricDimension {
    pub fn new(weight: f64, description: impl Into<String>) -> Self {
        Self {
            weight,
            description: description.into(),
        }
    }
}

/// A named set of weighted scoring dimensions
///
/// `BTreeMap` keeps dimension iteration deterministic, so rubric prompt
/// text and score aggregation are stable across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rubric {
    pub name: String,
    pub dimensions: BTreeMap<String, RubricDimension>,
}

impl Rubric {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dimensions: BTreeMap::new(),
        }
    }

    pub fn with_dimension(mut self, name: impl Into<String>, dimension: RubricDimension) -> Self {
        self.dimensions.insert(name.into(), dimension);
        self
    }

    /// Dimension names in deterministic order
    pub fn dimension_names(&self) -> impl Iterator<Item = &str> {
        self.dimensions.keys().map(String::as_str)
    }

    /// Weighted average of the dimension scores actually present.
    ///
    /// Dimensions missing from `scores` contribute neither score nor
    /// weight; zero total weight yields 0.
    pub fn weighted_score(&self, scores: &BTreeMap<String, f64>) -> f64 {
        let mut total = 0.0;
        let mut total_weight = 0.0;

        for (name, dimension) in &self.dimensions {
            if let Some(score) = scores.get(name) {
                total += score * dimension.weight;
                total_weight += dimension.weight;
            }
        }

        if total_weight == 0.0 {
            return 0.0;
        }
        total / total_weight
    }

    /// Format the rubric as prompt text for an evaluation backend
    pub fn prompt_text(&self) -> String {
        let mut lines = vec![format!(
            "RUBRIC FOR {} EVALUATION:\n",
            self.name.to_uppercase()
        )];

        for (name, dimension) in &self.dimensions {
            let weight_pct = (dimension.weight * 100.0).round() as i64;
            lines.push(format!(
                "- {} ({}%): {}",
                name.to_uppercase(),
                weight_pct,
                dimension.description
            ));
        }

        lines.push("\nScore each dimension from 0-10.".to_string());
        lines.join("\n")
    }

    /// Fail-fast validation: at least one dimension, weights summing to ~1.0
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.dimensions.is_empty() {
            return Err(DomainError::InvalidRubric(
                self.name.clone(),
                "no dimensions configured".to_string(),
            ));
        }

        let total: f64 = self.dimensions.values().map(|d| d.weight).sum();
        if (total - 1.0).abs() > 0.01 {
            return Err(DomainError::InvalidRubric(
                self.name.clone(),
                format!("dimension weights sum to {total:.3}, expected ~1.0"),
            ));
        }

        Ok(())
    }
}
