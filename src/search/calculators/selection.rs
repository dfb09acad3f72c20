//! Column-selection calculator: recursive feature addition over the
//! numeric columns

use crate::dataset;
use crate::error::Result;
use crate::search::calculators::ParamCalculator;
use crate::search::{RecursiveFeatureAddition, SearchContext};
use crate::transforms::{ColumnSelection, ColumnSelectionParams, Transform, TransformSpec};
use ndarray::Array1;
use polars::prelude::*;

#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnSelectionParamCalculator;

impl ParamCalculator for ColumnSelectionParamCalculator {
    fn calculate_best_params(
        &self,
        x: &DataFrame,
        y: &Array1<f64>,
        ctx: &SearchContext,
    ) -> Result<Option<TransformSpec>> {
        let numeric = dataset::numerical_columns(x);
        if numeric.is_empty() {
            ctx.logger.warn("No numeric columns available for selection");
            return Ok(None);
        }
        let subset = x.select(numeric.iter().map(|s| s.as_str()))?;

        ctx.logger.task_start("Starting feature selection");

        let selected = RecursiveFeatureAddition::new().fit(&subset, y, ctx)?;
        if selected.is_empty() {
            ctx.logger.warn("Feature selection kept no columns");
            return Ok(None);
        }

        ctx.logger
            .task_result(&format!("Selected {} features", selected.len()));

        let transform = Transform::ColumnSelection(ColumnSelection::new(ColumnSelectionParams {
            features: selected,
        }));
        Ok(Some(transform.spec()?))
    }
}
