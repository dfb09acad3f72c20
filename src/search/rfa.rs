//! Recursive feature addition

use crate::dataset;
use crate::error::Result;
use crate::search::importance::{feature_importance, rank_by_importance};
use crate::search::{evaluate_model, SearchContext};
use ndarray::Array1;
use polars::prelude::*;

/// Greedy importance-ranked forward selection with early stopping.
///
/// Rank all candidate columns by importance, then walk the ranking: a
/// column is committed only when adding it strictly improves the
/// cross-validated score (direction-aware). The walk stops after
/// `early_stopping` consecutive non-improving candidates. Columns come
/// back in the order they were added.
#[derive(Debug, Clone)]
pub struct RecursiveFeatureAddition {
    early_stopping: usize,
}

impl Default for RecursiveFeatureAddition {
    fn default() -> Self {
        Self::new()
    }
}

impl RecursiveFeatureAddition {
    pub fn new() -> Self {
        Self { early_stopping: 3 }
    }

    pub fn with_early_stopping(mut self, early_stopping: usize) -> Self {
        self.early_stopping = early_stopping.max(1);
        self
    }

    pub fn fit(
        &self,
        x: &DataFrame,
        y: &Array1<f64>,
        ctx: &SearchContext,
    ) -> Result<Vec<String>> {
        let columns = dataset::numerical_columns(x);
        if columns.is_empty() {
            return Ok(Vec::new());
        }

        let matrix = dataset::columns_to_array2(x, &columns)?;
        let importances =
            feature_importance(ctx.model, &matrix, y, ctx.scoring, ctx.direction)?;
        let ranking = rank_by_importance(&importances);

        let mut selected: Vec<String> = Vec::new();
        let mut best_score: Option<f64> = None;
        let mut rejected_in_a_row = 0usize;

        for idx in ranking {
            let mut candidate_set = selected.clone();
            candidate_set.push(columns[idx].clone());

            let subset = x.select(candidate_set.iter().map(|s| s.as_str()))?;
            let score = evaluate_model(&subset, y, ctx, None)?;

            if ctx.direction.improved_opt(score, best_score) {
                selected = candidate_set;
                best_score = score;
                rejected_in_a_row = 0;
            } else {
                rejected_in_a_row += 1;
                if rejected_in_a_row >= self.early_stopping {
                    break;
                }
            }
        }

        Ok(selected)
    }
}
