//! Non-linear transformation trigger: skewness heuristic, no evaluator

use crate::dataset;
use crate::error::Result;
use crate::search::calculators::ParamCalculator;
use crate::search::SearchContext;
use crate::transforms::{
    NonLinearMethod, NonLinearParams, NonLinearTransformation, Transform, TransformSpec,
};
use ndarray::Array1;
use polars::prelude::*;
use std::collections::BTreeMap;

/// Applies Yeo-Johnson to every numeric column whose absolute skewness
/// reaches the threshold. Selection is independent of the evaluator.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonLinearTransformationParamCalculator;

impl NonLinearTransformationParamCalculator {
    const SKEWNESS_THRESHOLD: f64 = 0.5;
}

impl ParamCalculator for NonLinearTransformationParamCalculator {
    fn calculate_best_params(
        &self,
        x: &DataFrame,
        _y: &Array1<f64>,
        ctx: &SearchContext,
    ) -> Result<Option<TransformSpec>> {
        let columns = dataset::numerical_columns(x);
        let total = columns.len();
        let mut transformation_options = BTreeMap::new();

        ctx.logger
            .task_start("Starting non-linear transformation search");

        for (i, column) in columns.iter().enumerate() {
            ctx.logger.task_update(&format!(
                "[{}/{total}] Checking column: '{column}'",
                i + 1
            ));

            let values = dataset::column_f64_dropna(x, column)?;
            let skew = dataset::skewness(&values);
            ctx.logger.progress(&format!("   Skewness: {skew:.4}"));

            if skew.abs() < Self::SKEWNESS_THRESHOLD {
                continue;
            }

            transformation_options.insert(column.clone(), NonLinearMethod::YeoJohnson);
            ctx.logger
                .task_result(&format!("Selected 'yeo_johnson' for '{column}'"));
        }

        if transformation_options.is_empty() {
            ctx.logger.warn("No columns required non-linear transformation");
            return Ok(None);
        }

        ctx.logger.task_result(&format!(
            "Non-linear transformation applied to {} column(s)",
            transformation_options.len()
        ));
        let transform = Transform::NonLinearTransformation(NonLinearTransformation::new(
            NonLinearParams {
                transformation_options,
            },
        ));
        Ok(Some(transform.spec()?))
    }
}
