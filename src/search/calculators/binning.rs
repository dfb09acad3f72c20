//! Numerical-binning calculator: baseline-gated per-column search over
//! strategy and bin count

use crate::dataset;
use crate::error::Result;
use crate::search::calculators::ParamCalculator;
use crate::search::{evaluate_model, SearchContext};
use crate::transforms::{
    BinningParams, BinningStrategy, NumericalBinning, Transform, TransformSpec,
};
use ndarray::Array1;
use polars::prelude::*;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default)]
pub struct NumericalBinningParamCalculator;

impl NumericalBinningParamCalculator {
    const STRATEGIES: [BinningStrategy; 2] = [BinningStrategy::Uniform, BinningStrategy::Quantile];
    const BIN_COUNTS: [usize; 3] = [3, 8, 20];
}

impl ParamCalculator for NumericalBinningParamCalculator {
    fn calculate_best_params(
        &self,
        x: &DataFrame,
        y: &Array1<f64>,
        ctx: &SearchContext,
    ) -> Result<Option<TransformSpec>> {
        let columns = dataset::numerical_columns(x);
        let total = columns.len();
        let mut transformation_options = BTreeMap::new();

        ctx.logger.task_start("Starting numerical binning search");
        let base_score = evaluate_model(x, y, ctx, None)?;
        ctx.logger.baseline(&format!(
            "Base score: {}",
            base_score.map_or("n/a".to_string(), |s| format!("{s:.4}"))
        ));

        for (i, column) in columns.iter().enumerate() {
            let distinct = dataset::n_unique(x, column)?;
            ctx.logger.task_update(&format!(
                "[{}/{total}] Evaluating column: '{column}'",
                i + 1
            ));

            let mut best_score = base_score;
            let mut best: Option<(BinningStrategy, usize)> = None;

            for strategy in Self::STRATEGIES {
                for n_bins in Self::BIN_COUNTS {
                    // Binning a column into at least as many bins as it has
                    // distinct values cannot add information
                    if distinct <= n_bins {
                        continue;
                    }

                    let candidate = Transform::NumericalBinning(NumericalBinning::new(
                        BinningParams {
                            transformation_options: BTreeMap::from([(
                                column.clone(),
                                (strategy, n_bins),
                            )]),
                        },
                    ));
                    let score = evaluate_model(x, y, ctx, Some(&candidate))?;
                    ctx.logger.progress(&format!(
                        "   Tried '{strategy:?}' with {n_bins} bins -> Score: {}",
                        score.map_or("n/a".to_string(), |s| format!("{s:.4}"))
                    ));

                    if ctx.direction.improved_opt(score, best_score) {
                        best_score = score;
                        best = Some((strategy, n_bins));
                    }
                }
            }

            if let Some((strategy, n_bins)) = best {
                ctx.logger.task_result(&format!(
                    "Selected numerical binning for '{column}': {strategy:?} with {n_bins} bins"
                ));
                transformation_options.insert(column.clone(), (strategy, n_bins));
            }
        }

        if transformation_options.is_empty() {
            ctx.logger.warn("No numerical binning was applied to any column");
            return Ok(None);
        }

        ctx.logger.task_result(&format!(
            "Numerical binning applied to {} column(s)",
            transformation_options.len()
        ));
        let transform = Transform::NumericalBinning(NumericalBinning::new(BinningParams {
            transformation_options,
        }));
        Ok(Some(transform.spec()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Direction, LinearRegression, Scoring};
    use crate::search::NoopLogger;

    #[test]
    fn test_low_cardinality_column_skipped_entirely() {
        // Only 3 distinct values: every bin count candidate is skipped,
        // so no spec can be emitted for this column.
        let a: Vec<f64> = (0..30).map(|i| (i % 3) as f64).collect();
        let y: Array1<f64> = (0..30).map(|i| (i % 3) as f64).collect();
        let df = DataFrame::new(vec![Series::new("a".into(), a).into()]).unwrap();

        let model = LinearRegression::new();
        let logger = NoopLogger;
        let ctx = SearchContext::new(&model, Scoring::R2, Direction::Maximize, &logger);

        let spec = NumericalBinningParamCalculator
            .calculate_best_params(&df, &y, &ctx)
            .unwrap();
        assert!(spec.is_none());
    }

    #[test]
    fn test_step_signal_benefits_from_binning() {
        // y is a coarse step function of x; a linear fit on raw x is poor,
        // but the binned ordinal tracks the steps.
        let n = 90;
        let a: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let y: Array1<f64> = (0..n)
            .map(|i| if i < 30 { 0.0 } else if i < 60 { 50.0 } else { -20.0 })
            .collect();
        let df = DataFrame::new(vec![Series::new("a".into(), a).into()]).unwrap();

        let model = LinearRegression::new();
        let logger = NoopLogger;
        let ctx = SearchContext::new(&model, Scoring::R2, Direction::Maximize, &logger);

        let spec = NumericalBinningParamCalculator
            .calculate_best_params(&df, &y, &ctx)
            .unwrap();
        assert!(spec.is_some());
    }
}
