//! Spline-expansion calculator: baseline-gated per-column search over
//! knots, degree, and extrapolation

use crate::dataset;
use crate::error::Result;
use crate::search::calculators::ParamCalculator;
use crate::search::{evaluate_model, SearchContext};
use crate::transforms::{
    Extrapolation, SplineOptions, SplineParams, SplineTransformation, Transform, TransformSpec,
};
use ndarray::Array1;
use polars::prelude::*;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default)]
pub struct SplineTransformationParamCalculator;

impl SplineTransformationParamCalculator {
    const N_KNOTS_OPTIONS: [usize; 2] = [5, 10];
    const DEGREE_OPTIONS: [usize; 2] = [3, 4];
    const EXTRAPOLATION_OPTIONS: [Extrapolation; 2] =
        [Extrapolation::Constant, Extrapolation::Linear];
}

impl ParamCalculator for SplineTransformationParamCalculator {
    fn calculate_best_params(
        &self,
        x: &DataFrame,
        y: &Array1<f64>,
        ctx: &SearchContext,
    ) -> Result<Option<TransformSpec>> {
        let columns = dataset::numerical_columns(x);
        let total = columns.len();
        let mut transformation_options = BTreeMap::new();

        ctx.logger.task_start("Starting spline transformations search");
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
            let mut best: Option<SplineOptions> = None;

            for n_knots in Self::N_KNOTS_OPTIONS {
                for degree in Self::DEGREE_OPTIONS {
                    for extrapolation in Self::EXTRAPOLATION_OPTIONS {
                        let options = SplineOptions {
                            degree,
                            n_knots,
                            extrapolation,
                        };
                        let candidate = Transform::SplineTransformation(
                            SplineTransformation::new(SplineParams {
                                transformation_options: BTreeMap::from([(
                                    column.clone(),
                                    options,
                                )]),
                            }),
                        );
                        let score = evaluate_model(x, y, ctx, Some(&candidate))?;
                        ctx.logger.progress(&format!(
                            "   Tried extrapolation={extrapolation:?}, degree={degree}, n_knots={n_knots} -> Score: {}",
                            score.map_or("n/a".to_string(), |s| format!("{s:.4}"))
                        ));

                        if ctx.direction.improved_opt(score, best_score) {
                            best_score = score;
                            best = Some(options);
                        }
                    }
                }
            }

            if let Some(options) = best {
                ctx.logger.task_result(&format!(
                    "Selected spline transformation for '{column}': extrapolation: {:?}, degree: {}, n_knots: {}",
                    options.extrapolation, options.degree, options.n_knots
                ));
                transformation_options.insert(column.clone(), options);
            }
        }

        if transformation_options.is_empty() {
            ctx.logger
                .warn("No spline transformations was applied to any column");
            return Ok(None);
        }

        ctx.logger.task_result(&format!(
            "Spline transformations applied to {} column(s)",
            transformation_options.len()
        ));
        let transform = Transform::SplineTransformation(SplineTransformation::new(SplineParams {
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
    fn test_periodic_signal_benefits_from_splines() {
        // A linear model cannot fit a sine wave from raw x, but can from
        // a spline basis of x.
        let n = 120;
        let a: Vec<f64> = (0..n).map(|i| i as f64 / 10.0).collect();
        let y: Array1<f64> = a.iter().map(|v| (v * 1.3).sin() * 10.0).collect();
        let df = DataFrame::new(vec![Series::new("a".into(), a).into()]).unwrap();

        let model = LinearRegression::new();
        let logger = NoopLogger;
        let ctx = SearchContext::new(&model, Scoring::R2, Direction::Maximize, &logger);

        let spec = SplineTransformationParamCalculator
            .calculate_best_params(&df, &y, &ctx)
            .unwrap();
        assert!(spec.is_some(), "sine-shaped target should gain from splines");
    }
}
