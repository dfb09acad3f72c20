//! Categorical-encoding calculator: unconditional best-of-N per column

use crate::dataset;
use crate::error::Result;
use crate::search::calculators::ParamCalculator;
use crate::search::{evaluate_model, SearchContext};
use crate::transforms::{
    CategoricalEncoding, EncodingMethod, EncodingParams, Transform, TransformSpec,
};
use ndarray::Array1;
use polars::prelude::*;
use std::collections::BTreeMap;

/// Every categorical column gets its best-scoring encoding among the
/// enumerated options; leaving the column unencoded is not in the search
/// space (an unencoded column is dropped at the numeric boundary, which
/// is strictly worse than any encoding worth its name).
#[derive(Debug, Clone, Copy, Default)]
pub struct CategoricalEncodingParamCalculator;

impl CategoricalEncodingParamCalculator {
    const BASE_ENCODINGS: [EncodingMethod; 6] = [
        EncodingMethod::Binary,
        EncodingMethod::Count,
        EncodingMethod::Hashing,
        EncodingMethod::Label,
        EncodingMethod::Loo,
        EncodingMethod::Target,
    ];
    const MAX_DUMMY_CARDINALITY: usize = 15;

    fn encodings_for(x: &DataFrame, column: &str) -> Result<Vec<EncodingMethod>> {
        let mut encodings: Vec<EncodingMethod> = Self::BASE_ENCODINGS.to_vec();
        if dataset::n_unique(x, column)? <= Self::MAX_DUMMY_CARDINALITY {
            encodings.push(EncodingMethod::Dummy);
        }
        Ok(encodings)
    }
}

impl ParamCalculator for CategoricalEncodingParamCalculator {
    fn calculate_best_params(
        &self,
        x: &DataFrame,
        y: &Array1<f64>,
        ctx: &SearchContext,
    ) -> Result<Option<TransformSpec>> {
        let columns = dataset::categorical_columns(x);
        let total = columns.len();
        let mut transformation_options = BTreeMap::new();

        ctx.logger.task_start("Starting categorical encoding search");

        for (i, column) in columns.iter().enumerate() {
            ctx.logger.task_update(&format!(
                "[{}/{total}] Evaluating encodings for column: '{column}'",
                i + 1
            ));

            let mut best_score: Option<f64> = None;
            let mut best: Option<EncodingMethod> = None;

            for encoding in Self::encodings_for(x, column)? {
                let candidate = Transform::CategoricalEncoding(CategoricalEncoding::new(
                    EncodingParams {
                        transformation_options: BTreeMap::from([(column.clone(), encoding)]),
                    },
                ));
                let score = evaluate_model(x, y, ctx, Some(&candidate))?;
                ctx.logger.progress(&format!(
                    "   Tried '{encoding:?}' -> Score: {}",
                    score.map_or("n/a".to_string(), |s| format!("{s:.4}"))
                ));

                if ctx.direction.improved_opt(score, best_score) {
                    best_score = score;
                    best = Some(encoding);
                }
            }

            if let Some(encoding) = best {
                ctx.logger
                    .task_result(&format!("Selected encoding for '{column}': {encoding:?}"));
                transformation_options.insert(column.clone(), encoding);
            }
        }

        if transformation_options.is_empty() {
            ctx.logger.warn("No categorical encodings selected for any column");
            return Ok(None);
        }

        ctx.logger.task_result(&format!(
            "Encoding applied to {} column(s)",
            transformation_options.len()
        ));
        let transform = Transform::CategoricalEncoding(CategoricalEncoding::new(EncodingParams {
            transformation_options,
        }));
        Ok(Some(transform.spec()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DecisionTree, Direction, Scoring};
    use crate::search::NoopLogger;

    #[test]
    fn test_categorical_column_always_encoded() {
        // Three-category column fully determines the class label
        let n = 60;
        let categories: Vec<&str> = (0..n)
            .map(|i| match i % 3 {
                0 => "red",
                1 => "green",
                _ => "blue",
            })
            .collect();
        let y: Array1<f64> = (0..n).map(|i| (i % 3 == 0) as u8 as f64).collect();

        let df = DataFrame::new(vec![
            Series::new("color".into(), categories).into(),
        ])
        .unwrap();

        let model = DecisionTree::classifier();
        let logger = NoopLogger;
        let ctx = SearchContext::new(&model, Scoring::Accuracy, Direction::Maximize, &logger);

        let spec = CategoricalEncodingParamCalculator
            .calculate_best_params(&df, &y, &ctx)
            .unwrap()
            .expect("categorical columns always get an encoding");
        assert_eq!(spec.name, "CategoricalEncoding");
    }

    #[test]
    fn test_no_categorical_columns_yields_none() {
        let df = DataFrame::new(vec![
            Series::new("a".into(), (0..10).map(|i| i as f64).collect::<Vec<_>>()).into(),
        ])
        .unwrap();
        let y: Array1<f64> = (0..10).map(|i| i as f64).collect();

        let model = DecisionTree::regressor();
        let logger = NoopLogger;
        let ctx = SearchContext::new(&model, Scoring::R2, Direction::Maximize, &logger);

        let spec = CategoricalEncodingParamCalculator
            .calculate_best_params(&df, &y, &ctx)
            .unwrap();
        assert!(spec.is_none());
    }
}
