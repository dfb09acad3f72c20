//! Datetime expansion and cyclical-feature calculators (heuristic, no
//! evaluator involvement)

use crate::dataset;
use crate::error::Result;
use crate::search::calculators::ParamCalculator;
use crate::search::SearchContext;
use crate::transforms::{
    CyclicalFeaturesTransformer, CyclicalParams, DateTimeParams, DateTimeTransformer, Transform,
    TransformSpec,
};
use ndarray::Array1;
use polars::prelude::*;
use std::collections::BTreeMap;

/// Expands every datetime column into numeric components.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateTimeTransformerParamCalculator;

impl ParamCalculator for DateTimeTransformerParamCalculator {
    fn calculate_best_params(
        &self,
        x: &DataFrame,
        _y: &Array1<f64>,
        ctx: &SearchContext,
    ) -> Result<Option<TransformSpec>> {
        ctx.logger.task_start("Detecting datetime features");

        let features = dataset::datetime_columns(x);
        if features.is_empty() {
            ctx.logger
                .warn("No datetime transformations was applied to any column");
            return Ok(None);
        }

        ctx.logger.task_result(&format!(
            "Datetime transformations applied to {} column(s)",
            features.len()
        ));
        let transform =
            Transform::DateTimeTransformer(DateTimeTransformer::new(DateTimeParams { features }));
        Ok(Some(transform.spec()?))
    }
}

/// Infers cyclical periods from column-name suffixes (datetime component
/// naming) or from low-cardinality value sets.
#[derive(Debug, Clone, Copy, Default)]
pub struct CyclicalFeaturesTransformerParamCalculator;

impl CyclicalFeaturesTransformerParamCalculator {
    const SUFFIX_PERIODS: [(&'static str, f64); 6] = [
        ("_month", 12.0),
        ("_day", 31.0),
        ("_weekday", 7.0),
        ("_hour", 24.0),
        ("_minute", 60.0),
        ("_second", 60.0),
    ];
    const PCT_UNIQUE_THRESHOLD: f64 = 0.10;

    fn period_for(x: &DataFrame, column: &str) -> Result<Option<f64>> {
        let lower = column.to_lowercase();
        for (suffix, period) in Self::SUFFIX_PERIODS {
            if lower.ends_with(suffix) {
                return Ok(Some(period));
            }
        }

        let distinct = dataset::n_unique(x, column)?;
        let pct_unique = distinct as f64 / x.height().max(1) as f64;
        if distinct > 2 && pct_unique < Self::PCT_UNIQUE_THRESHOLD {
            return Ok(Some(distinct as f64));
        }

        Ok(None)
    }
}

impl ParamCalculator for CyclicalFeaturesTransformerParamCalculator {
    fn calculate_best_params(
        &self,
        x: &DataFrame,
        _y: &Array1<f64>,
        ctx: &SearchContext,
    ) -> Result<Option<TransformSpec>> {
        ctx.logger.task_start("Detecting cyclical features");

        let mut transformation_options = BTreeMap::new();
        for column in dataset::numerical_columns(x) {
            if let Some(period) = Self::period_for(x, &column)? {
                transformation_options.insert(column, period);
            }
        }

        if transformation_options.is_empty() {
            ctx.logger
                .warn("No cyclical features was applied to any column");
            return Ok(None);
        }

        ctx.logger.task_result(&format!(
            "Cyclical features applied to {} column(s)",
            transformation_options.len()
        ));
        let transform = Transform::CyclicalFeaturesTransformer(CyclicalFeaturesTransformer::new(
            CyclicalParams {
                transformation_options,
            },
        ));
        Ok(Some(transform.spec()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DecisionTree, Direction, Scoring};
    use crate::search::NoopLogger;

    #[test]
    fn test_suffix_period_detection() {
        let df = DataFrame::new(vec![
            Series::new(
                "ts_month".into(),
                (0..120).map(|i| (i % 12 + 1) as f64).collect::<Vec<_>>(),
            )
            .into(),
        ])
        .unwrap();
        let y: Array1<f64> = (0..120).map(|i| i as f64).collect();

        let model = DecisionTree::regressor();
        let logger = NoopLogger;
        let ctx = SearchContext::new(&model, Scoring::R2, Direction::Maximize, &logger);

        let spec = CyclicalFeaturesTransformerParamCalculator
            .calculate_best_params(&df, &y, &ctx)
            .unwrap()
            .unwrap();

        let rebuilt = Transform::from_spec(&spec).unwrap();
        match rebuilt {
            Transform::CyclicalFeaturesTransformer(t) => {
                assert_eq!(t.params().transformation_options["ts_month"], 12.0);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_high_cardinality_column_not_cyclical() {
        let df = DataFrame::new(vec![
            Series::new("a".into(), (0..50).map(|i| i as f64).collect::<Vec<_>>()).into(),
        ])
        .unwrap();
        let y: Array1<f64> = (0..50).map(|i| i as f64).collect();

        let model = DecisionTree::regressor();
        let logger = NoopLogger;
        let ctx = SearchContext::new(&model, Scoring::R2, Direction::Maximize, &logger);

        let spec = CyclicalFeaturesTransformerParamCalculator
            .calculate_best_params(&df, &y, &ctx)
            .unwrap();
        assert!(spec.is_none());
    }

    #[test]
    fn test_no_datetime_columns_yields_none() {
        let df = DataFrame::new(vec![
            Series::new("a".into(), &[1.0, 2.0, 3.0, 4.0, 5.0]).into(),
        ])
        .unwrap();
        let y: Array1<f64> = (0..5).map(|i| i as f64).collect();

        let model = DecisionTree::regressor();
        let logger = NoopLogger;
        let ctx = SearchContext::new(&model, Scoring::R2, Direction::Maximize, &logger);

        let spec = DateTimeTransformerParamCalculator
            .calculate_best_params(&df, &y, &ctx)
            .unwrap();
        assert!(spec.is_none());
    }
}
