//! Scaling calculator: baseline-gated per-column search over scaler
//! kind and robust quantile ranges

use crate::dataset;
use crate::error::Result;
use crate::search::calculators::ParamCalculator;
use crate::search::{evaluate_model, SearchContext};
use crate::transforms::{ScaleMethod, ScaleParams, ScaleTransformation, Transform, TransformSpec};
use ndarray::Array1;
use polars::prelude::*;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default)]
pub struct ScaleTransformationParamCalculator;

impl ScaleTransformationParamCalculator {
    const METHODS: [ScaleMethod; 3] =
        [ScaleMethod::MinMax, ScaleMethod::Standard, ScaleMethod::Robust];
    const QUANTILE_RANGES: [(f64, f64); 2] = [(5.0, 95.0), (25.0, 75.0)];

    fn single_column(
        column: &str,
        method: ScaleMethod,
        quantile_range: Option<(f64, f64)>,
    ) -> Transform {
        let mut params = ScaleParams {
            transformation_options: BTreeMap::from([(column.to_string(), method)]),
            quantile_range: BTreeMap::new(),
        };
        if let Some(range) = quantile_range {
            params.quantile_range.insert(column.to_string(), range);
        }
        Transform::ScaleTransformation(ScaleTransformation::new(params))
    }
}

impl ParamCalculator for ScaleTransformationParamCalculator {
    fn calculate_best_params(
        &self,
        x: &DataFrame,
        y: &Array1<f64>,
        ctx: &SearchContext,
    ) -> Result<Option<TransformSpec>> {
        let columns = dataset::numerical_columns(x);
        let total = columns.len();
        let mut params = ScaleParams {
            transformation_options: BTreeMap::new(),
            quantile_range: BTreeMap::new(),
        };

        ctx.logger
            .task_start("Starting scale transformation parameter search");
        let base_score = evaluate_model(x, y, ctx, None)?;
        ctx.logger.baseline(&format!(
            "Base score: {}",
            base_score.map_or("n/a".to_string(), |s| format!("{s:.4}"))
        ));

        for (i, column) in columns.iter().enumerate() {
            ctx.logger.task_update(&format!(
                "[{}/{total}] Evaluating column: '{column}'",
                i + 1
            ));

            let mut best_score = base_score;
            let mut best: Option<(ScaleMethod, Option<(f64, f64)>)> = None;

            let mut candidates: Vec<(ScaleMethod, Option<(f64, f64)>)> = Vec::new();
            for method in Self::METHODS {
                if method == ScaleMethod::Robust {
                    for range in Self::QUANTILE_RANGES {
                        candidates.push((method, Some(range)));
                    }
                } else {
                    candidates.push((method, None));
                }
            }

            for (method, range) in candidates {
                let candidate = Self::single_column(column, method, range);
                let score = evaluate_model(x, y, ctx, Some(&candidate))?;
                ctx.logger.progress(&format!(
                    "   Tried '{method:?}'{} -> Score: {}",
                    range.map_or(String::new(), |r| format!(" with quantile range {r:?}")),
                    score.map_or("n/a".to_string(), |s| format!("{s:.4}"))
                ));

                if ctx.direction.improved_opt(score, best_score) {
                    best_score = score;
                    best = Some((method, range));
                }
            }

            if let Some((method, range)) = best {
                ctx.logger.task_result(&format!(
                    "Selected scale transformation for '{column}': {method:?}"
                ));
                params.transformation_options.insert(column.clone(), method);
                if let Some(range) = range {
                    params.quantile_range.insert(column.clone(), range);
                }
            }
        }

        if params.transformation_options.is_empty() {
            ctx.logger
                .warn("No scale transformation was applied to any column");
            return Ok(None);
        }

        ctx.logger.task_result(&format!(
            "Scale transformation applied to {} column(s)",
            params.transformation_options.len()
        ));
        let transform = Transform::ScaleTransformation(ScaleTransformation::new(params));
        Ok(Some(transform.spec()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DecisionTree, Direction, Scoring};
    use crate::search::NoopLogger;

    #[test]
    fn test_scale_invariant_model_yields_none() {
        let a: Vec<f64> = (0..40).map(|i| i as f64 * 1000.0).collect();
        let y: Array1<f64> = (0..40).map(|i| i as f64).collect();
        let df = DataFrame::new(vec![Series::new("a".into(), a).into()]).unwrap();

        let model = DecisionTree::regressor();
        let logger = NoopLogger;
        let ctx = SearchContext::new(&model, Scoring::R2, Direction::Maximize, &logger);

        let spec = ScaleTransformationParamCalculator
            .calculate_best_params(&df, &y, &ctx)
            .unwrap();
        assert!(spec.is_none());
    }
}
