//! Normalization calculator: baseline-gated per-column search

use crate::dataset;
use crate::error::Result;
use crate::search::calculators::ParamCalculator;
use crate::search::{evaluate_model, SearchContext};
use crate::transforms::{
    NormKind, Normalization, NormalizationParams, Transform, TransformSpec,
};
use ndarray::Array1;
use polars::prelude::*;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizationParamCalculator;

impl NormalizationParamCalculator {
    const OPTIONS: [NormKind; 2] = [NormKind::L1, NormKind::L2];
}

impl ParamCalculator for NormalizationParamCalculator {
    fn calculate_best_params(
        &self,
        x: &DataFrame,
        y: &Array1<f64>,
        ctx: &SearchContext,
    ) -> Result<Option<TransformSpec>> {
        let columns = dataset::numerical_columns(x);
        let total = columns.len();
        let mut transformation_options = BTreeMap::new();

        ctx.logger.task_start("Starting normalization parameter search");
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
            let mut best: Option<NormKind> = None;

            for kind in Self::OPTIONS {
                let candidate = Transform::Normalization(Normalization::new(NormalizationParams {
                    transformation_options: BTreeMap::from([(column.clone(), kind)]),
                }));
                let score = evaluate_model(x, y, ctx, Some(&candidate))?;
                ctx.logger.progress(&format!(
                    "   Tried '{kind:?}' -> Score: {}",
                    score.map_or("n/a".to_string(), |s| format!("{s:.4}"))
                ));

                if ctx.direction.improved_opt(score, best_score) {
                    best_score = score;
                    best = Some(kind);
                }
            }

            if let Some(kind) = best {
                ctx.logger
                    .task_result(&format!("Selected normalization for '{column}': {kind:?}"));
                transformation_options.insert(column.clone(), kind);
            }
        }

        if transformation_options.is_empty() {
            ctx.logger.warn("No normalization was applied to any column");
            return Ok(None);
        }

        ctx.logger.task_result(&format!(
            "Normalization applied to {} column(s)",
            transformation_options.len()
        ));
        let transform = Transform::Normalization(Normalization::new(NormalizationParams {
            transformation_options,
        }));
        Ok(Some(transform.spec()?))
    }
}
