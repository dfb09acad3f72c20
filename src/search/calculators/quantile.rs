//! Quantile-transformation calculator: baseline-gated per-column search

use crate::dataset;
use crate::error::Result;
use crate::search::calculators::ParamCalculator;
use crate::search::{evaluate_model, SearchContext};
use crate::transforms::{
    QuantileOutput, QuantileParams, QuantileTransformation, Transform, TransformSpec,
};
use ndarray::Array1;
use polars::prelude::*;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default)]
pub struct QuantileTransformationParamCalculator;

impl QuantileTransformationParamCalculator {
    const OPTIONS: [QuantileOutput; 2] = [QuantileOutput::Uniform, QuantileOutput::Normal];
}

impl ParamCalculator for QuantileTransformationParamCalculator {
    fn calculate_best_params(
        &self,
        x: &DataFrame,
        y: &Array1<f64>,
        ctx: &SearchContext,
    ) -> Result<Option<TransformSpec>> {
        let columns = dataset::numerical_columns(x);
        let total = columns.len();
        let mut transformation_options = BTreeMap::new();

        ctx.logger
            .task_start("Starting quantile transformation parameter search");
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
            let mut best: Option<QuantileOutput> = None;

            for output in Self::OPTIONS {
                let candidate =
                    Transform::QuantileTransformation(QuantileTransformation::new(QuantileParams {
                        transformation_options: BTreeMap::from([(column.clone(), output)]),
                    }));
                let score = evaluate_model(x, y, ctx, Some(&candidate))?;
                ctx.logger.progress(&format!(
                    "   Tried '{output:?}' -> Score: {}",
                    score.map_or("n/a".to_string(), |s| format!("{s:.4}"))
                ));

                if ctx.direction.improved_opt(score, best_score) {
                    best_score = score;
                    best = Some(output);
                }
            }

            if let Some(output) = best {
                ctx.logger.task_result(&format!(
                    "Selected transformation for '{column}': {output:?}"
                ));
                transformation_options.insert(column.clone(), output);
            }
        }

        if transformation_options.is_empty() {
            ctx.logger
                .warn("No quantile transformation was applied to any column");
            return Ok(None);
        }

        ctx.logger.task_result(&format!(
            "Quantile transformation applied to {} column(s)",
            transformation_options.len()
        ));
        let transform = Transform::QuantileTransformation(QuantileTransformation::new(
            QuantileParams {
                transformation_options,
            },
        ));
        Ok(Some(transform.spec()?))
    }
}
