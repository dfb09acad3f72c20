//! Dimensionality-reduction calculator: ternary search over the
//! component count per method

use crate::dataset;
use crate::error::Result;
use crate::search::calculators::ParamCalculator;
use crate::search::{evaluate_model, SearchContext};
use crate::transforms::{
    DimRedMethod, DimRedParams, DimensionalityReduction, Transform, TransformSpec,
};
use ndarray::Array1;
use polars::prelude::*;
use std::collections::BTreeMap;

/// Assumes the score-vs-components curve is approximately unimodal and
/// trisects the interval instead of scanning it: two interior points per
/// iteration, keep the better side. O(log n) evaluations per method.
#[derive(Debug, Clone, Copy, Default)]
pub struct DimensionalityReductionParamCalculator;

impl DimensionalityReductionParamCalculator {
    const METHODS: [DimRedMethod; 2] = [DimRedMethod::Pca, DimRedMethod::TruncatedSvd];
    const MAX_COMPONENTS: usize = 50;

    fn reducer(features: &[String], method: DimRedMethod, n_components: usize) -> Transform {
        Transform::DimensionalityReduction(DimensionalityReduction::new(DimRedParams {
            features: features.to_vec(),
            method,
            n_components,
        }))
    }

    /// Ternary search for the best component count in `[low, high]`.
    fn search_components(
        x: &DataFrame,
        y: &Array1<f64>,
        ctx: &SearchContext,
        features: &[String],
        method: DimRedMethod,
        mut low: usize,
        mut high: usize,
    ) -> Result<(usize, Option<f64>)> {
        let mut best_n = low;
        let mut best_score: Option<f64> = None;
        let mut memo: BTreeMap<usize, Option<f64>> = BTreeMap::new();

        while low < high {
            let mid1 = low + (high - low) / 3;
            let mid2 = high - (high - low) / 3;

            for &mid in &[mid1, mid2] {
                if !memo.contains_key(&mid) {
                    let handler = Self::reducer(features, method, mid);
                    let score = evaluate_model(x, y, ctx, Some(&handler))?;
                    memo.insert(mid, score);
                }
            }

            let score_1 = memo[&mid1];
            let score_2 = memo[&mid2];

            if ctx.direction.improved_opt(score_1, best_score) {
                best_score = score_1;
                best_n = mid1;
            }
            if ctx.direction.improved_opt(score_2, best_score) {
                best_score = score_2;
                best_n = mid2;
            }

            if ctx.direction.improved_opt(score_2, score_1) {
                low = mid1 + 1;
            } else {
                high = mid2.saturating_sub(1);
            }
        }

        Ok((best_n, best_score))
    }
}

impl ParamCalculator for DimensionalityReductionParamCalculator {
    fn calculate_best_params(
        &self,
        x: &DataFrame,
        y: &Array1<f64>,
        ctx: &SearchContext,
    ) -> Result<Option<TransformSpec>> {
        ctx.logger.task_start("Starting dimensionality reduction");

        let features = dataset::numerical_columns(x);
        let n_features = features.len();
        if n_features < 2 {
            ctx.logger
                .warn("No dimensionality reduction was applied: less than 2 columns");
            return Ok(None);
        }

        let base_score = evaluate_model(x, y, ctx, None)?;
        ctx.logger.baseline(&format!(
            "Base score: {}",
            base_score.map_or("n/a".to_string(), |s| format!("{s:.4}"))
        ));

        let high = Self::MAX_COMPONENTS.min(n_features);
        let mut best_score = base_score;
        let mut best: Option<(DimRedMethod, usize)> = None;

        for method in Self::METHODS {
            let (n_components, score) =
                Self::search_components(x, y, ctx, &features, method, 2, high)?;
            ctx.logger.progress(&format!(
                "   Tried '{method:?}' -> Score: {}",
                score.map_or("n/a".to_string(), |s| format!("{s:.4}"))
            ));

            if ctx.direction.improved_opt(score, best_score) {
                best_score = score;
                best = Some((method, n_components));
            }
        }

        let Some((method, n_components)) = best else {
            ctx.logger.warn("No dimensionality reduction was applied");
            return Ok(None);
        };

        ctx.logger.task_result(&format!(
            "Best method: {method:?} with {n_components} components"
        ));
        let transform = Self::reducer(&features, method, n_components);
        Ok(Some(transform.spec()?))
    }
}
