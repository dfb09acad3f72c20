//! Outlier-handling calculator: baseline-gated combinatorial search with
//! a zero-outlier pre-filter

use crate::dataset;
use crate::error::Result;
use crate::search::calculators::ParamCalculator;
use crate::search::{evaluate_model, SearchContext};
use crate::transforms::{
    OutlierAction, OutlierMethod, OutliersHandler, OutliersHandlerParams, Transform, TransformSpec,
};
use ndarray::Array1;
use polars::prelude::*;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy)]
struct Candidate {
    action: OutlierAction,
    method: OutlierMethod,
    param: f64,
}

/// Enumerates `{action} x {detection method} x {method parameter}` per
/// numeric column, skipping candidates whose detection flags zero rows,
/// and keeps a column's best candidate only when it strictly beats the
/// no-op baseline.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutliersParamCalculator;

impl OutliersParamCalculator {
    const ACTIONS: [OutlierAction; 2] = [OutlierAction::Cap, OutlierAction::Median];
    const IQR_THRESHOLDS: [f64; 2] = [1.5, 3.0];
    const ZSCORE_THRESHOLDS: [f64; 2] = [2.5, 3.0];
    const IFOREST_CONTAMINATIONS: [f64; 2] = [0.05, 0.1];

    fn candidates() -> Vec<Candidate> {
        let mut all = Vec::new();
        for &action in &Self::ACTIONS {
            for &param in &Self::IQR_THRESHOLDS {
                all.push(Candidate {
                    action,
                    method: OutlierMethod::Iqr,
                    param,
                });
            }
            for &param in &Self::ZSCORE_THRESHOLDS {
                all.push(Candidate {
                    action,
                    method: OutlierMethod::Zscore,
                    param,
                });
            }
        }
        // The forest has no natural bounds to cap against, so it is
        // paired with median replacement only.
        for &param in &Self::IFOREST_CONTAMINATIONS {
            all.push(Candidate {
                action: OutlierAction::Median,
                method: OutlierMethod::Iforest,
                param,
            });
        }
        all
    }

    fn single_column_handler(column: &str, candidate: Candidate) -> Transform {
        let mut params = OutliersHandlerParams {
            transformation_options: BTreeMap::from([(
                column.to_string(),
                (candidate.action, candidate.method),
            )]),
            thresholds: BTreeMap::new(),
            lof_params: BTreeMap::new(),
            iforest_params: BTreeMap::new(),
        };
        match candidate.method {
            OutlierMethod::Iforest => {
                params
                    .iforest_params
                    .insert(column.to_string(), candidate.param);
            }
            _ => {
                params
                    .thresholds
                    .insert(column.to_string(), candidate.param);
            }
        }
        Transform::OutliersHandler(OutliersHandler::new(params))
    }

    fn describe(candidate: Candidate) -> String {
        format!(
            "action: {:?}, method: {:?}, param: {}",
            candidate.action, candidate.method, candidate.param
        )
    }
}

impl ParamCalculator for OutliersParamCalculator {
    fn calculate_best_params(
        &self,
        x: &DataFrame,
        y: &Array1<f64>,
        ctx: &SearchContext,
    ) -> Result<Option<TransformSpec>> {
        let columns = dataset::numerical_columns(x);
        let total = columns.len();

        ctx.logger.task_start("Starting outlier handling search");
        let base_score = evaluate_model(x, y, ctx, None)?;
        ctx.logger.baseline(&format!(
            "Base score: {}",
            base_score.map_or("n/a".to_string(), |s| format!("{s:.4}"))
        ));

        let mut params = OutliersHandlerParams {
            transformation_options: BTreeMap::new(),
            thresholds: BTreeMap::new(),
            lof_params: BTreeMap::new(),
            iforest_params: BTreeMap::new(),
        };

        for (i, column) in columns.iter().enumerate() {
            ctx.logger.task_update(&format!(
                "[{}/{total}] Evaluating column: '{column}'",
                i + 1
            ));

            let values = dataset::column_f64_dropna(x, column)?;
            let mut best_score = base_score;
            let mut best: Option<Candidate> = None;

            for candidate in Self::candidates() {
                // Skip evaluations that cannot change a single row
                if OutliersHandler::count_outliers(&values, candidate.method, candidate.param)?
                    == 0
                {
                    continue;
                }

                let handler = Self::single_column_handler(column, candidate);
                let score = evaluate_model(x, y, ctx, Some(&handler))?;
                ctx.logger.progress(&format!(
                    "   Tried '{}' -> Score: {}",
                    Self::describe(candidate),
                    score.map_or("n/a".to_string(), |s| format!("{s:.4}"))
                ));

                if ctx.direction.improved_opt(score, best_score) {
                    best_score = score;
                    best = Some(candidate);
                }
            }

            if let Some(candidate) = best {
                ctx.logger.task_result(&format!(
                    "Selected outlier handler for '{column}': {}",
                    Self::describe(candidate)
                ));
                params
                    .transformation_options
                    .insert(column.clone(), (candidate.action, candidate.method));
                match candidate.method {
                    OutlierMethod::Iforest => {
                        params.iforest_params.insert(column.clone(), candidate.param);
                    }
                    _ => {
                        params.thresholds.insert(column.clone(), candidate.param);
                    }
                }
            }
        }

        if params.transformation_options.is_empty() {
            ctx.logger.warn("No outlier handler was applied to any column");
            return Ok(None);
        }

        ctx.logger.task_result(&format!(
            "Outlier handler applied to {} column(s)",
            params.transformation_options.len()
        ));
        let transform = Transform::OutliersHandler(OutliersHandler::new(params));
        Ok(Some(transform.spec()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Direction, LinearRegression, Scoring};
    use crate::search::NoopLogger;

    #[test]
    fn test_corrupted_linear_data_gets_handler() {
        // Clean linear relation with a few wrecked rows; capping them
        // should clearly help a linear model.
        let n = 60;
        let mut a: Vec<f64> = (0..n).map(|i| i as f64).collect();
        a[7] = 10_000.0;
        a[23] = -8_000.0;
        a[41] = 12_000.0;
        let y: Array1<f64> = (0..n).map(|i| 2.0 * i as f64).collect();
        let df = DataFrame::new(vec![Series::new("a".into(), a).into()]).unwrap();

        let model = LinearRegression::new();
        let logger = NoopLogger;
        let ctx = SearchContext::new(
            &model,
            Scoring::NegMeanSquaredError,
            Direction::Maximize,
            &logger,
        );

        let spec = OutliersParamCalculator
            .calculate_best_params(&df, &y, &ctx)
            .unwrap();
        let spec = spec.expect("outlier handling should improve on corrupted data");
        assert_eq!(spec.name, "OutliersHandler");
    }

    #[test]
    fn test_clean_uniform_data_is_left_alone() {
        let n = 50;
        let a: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let y: Array1<f64> = (0..n).map(|i| 2.0 * i as f64).collect();
        let df = DataFrame::new(vec![Series::new("a".into(), a).into()]).unwrap();

        let model = LinearRegression::new();
        let logger = NoopLogger;
        let ctx = SearchContext::new(
            &model,
            Scoring::NegMeanSquaredError,
            Direction::Maximize,
            &logger,
        );

        let spec = OutliersParamCalculator
            .calculate_best_params(&df, &y, &ctx)
            .unwrap();
        // Perfectly linear data: nothing to fix, baseline already optimal
        assert!(spec.is_none());
    }
}
