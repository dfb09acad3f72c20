//! Missing-value indicator and imputation calculators

use crate::dataset;
use crate::error::Result;
use crate::search::calculators::ParamCalculator;
use crate::search::{evaluate_model, SearchContext};
use crate::transforms::{
    ImputeStrategy, MissingValuesHandler, MissingValuesHandlerParams, MissingValuesIndicator,
    MissingValuesIndicatorParams, Transform, TransformSpec,
};
use ndarray::Array1;
use polars::prelude::*;
use std::collections::BTreeMap;

fn columns_with_nulls(x: &DataFrame) -> Vec<String> {
    let mut relevant = dataset::categorical_columns(x);
    relevant.extend(dataset::numerical_columns(x));

    relevant
        .into_iter()
        .filter(|name| {
            x.column(name)
                .map(|col| col.as_materialized_series().null_count() > 0)
                .unwrap_or(false)
        })
        .collect()
}

/// Emits an indicator-flag spec for every column carrying nulls. Pure
/// heuristic; the flags themselves are cheap and downstream pruning
/// removes the useless ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct MissingValuesIndicatorParamCalculator;

impl ParamCalculator for MissingValuesIndicatorParamCalculator {
    fn calculate_best_params(
        &self,
        x: &DataFrame,
        _y: &Array1<f64>,
        ctx: &SearchContext,
    ) -> Result<Option<TransformSpec>> {
        ctx.logger.task_start("Starting missing value indicators");

        let features = columns_with_nulls(x);
        if features.is_empty() {
            ctx.logger
                .warn("No missing values found. Skipping indicator transformation.");
            return Ok(None);
        }

        ctx.logger.task_result(&format!(
            "Selected {} columns with missing values",
            features.len()
        ));

        let transform = Transform::MissingValuesIndicator(MissingValuesIndicator::new(
            MissingValuesIndicatorParams { features },
        ));
        Ok(Some(transform.spec()?))
    }
}

/// Best-of-N imputation search per column with nulls. There is no no-op
/// baseline in the candidate set: columns with nulls always get an
/// imputation, the search only decides which one.
#[derive(Debug, Clone, Copy, Default)]
pub struct MissingValuesParamCalculator;

impl MissingValuesParamCalculator {
    const SHARED_STRATEGIES: [ImputeStrategy; 2] =
        [ImputeStrategy::Fill0, ImputeStrategy::MostFrequent];
    const NUMERIC_STRATEGIES: [ImputeStrategy; 2] = [ImputeStrategy::Mean, ImputeStrategy::Median];
    const KNN_NEIGHBOR_OPTIONS: [usize; 1] = [5];

    fn single_column_spec(
        column: &str,
        strategy: ImputeStrategy,
        n_neighbors: Option<usize>,
    ) -> Transform {
        let mut params = MissingValuesHandlerParams {
            transformation_options: BTreeMap::from([(column.to_string(), strategy)]),
            n_neighbors: BTreeMap::new(),
        };
        if let Some(k) = n_neighbors {
            params.n_neighbors.insert(column.to_string(), k);
        }
        Transform::MissingValuesHandler(MissingValuesHandler::new(params))
    }

    fn find_best_strategy_for_column(
        &self,
        x: &DataFrame,
        y: &Array1<f64>,
        ctx: &SearchContext,
        column: &str,
        is_numeric: bool,
    ) -> Result<Option<(ImputeStrategy, Option<usize>)>> {
        let mut best_score: Option<f64> = None;
        let mut best: Option<(ImputeStrategy, Option<usize>)> = None;

        let mut candidates: Vec<(ImputeStrategy, Option<usize>)> = Self::SHARED_STRATEGIES
            .iter()
            .map(|&s| (s, None))
            .collect();
        if is_numeric {
            candidates.extend(Self::NUMERIC_STRATEGIES.iter().map(|&s| (s, None)));
            candidates.extend(
                Self::KNN_NEIGHBOR_OPTIONS
                    .iter()
                    .map(|&k| (ImputeStrategy::Knn, Some(k))),
            );
        }

        for (strategy, n_neighbors) in candidates {
            let transform = Self::single_column_spec(column, strategy, n_neighbors);
            let score = evaluate_model(x, y, ctx, Some(&transform))?;
            ctx.logger.progress(&format!(
                "   Tried '{strategy:?}' -> Score: {}",
                score.map_or("n/a".to_string(), |s| format!("{s:.4}"))
            ));

            if ctx.direction.improved_opt(score, best_score) {
                best_score = score;
                best = Some((strategy, n_neighbors));
            }
        }

        Ok(best)
    }
}

impl ParamCalculator for MissingValuesParamCalculator {
    fn calculate_best_params(
        &self,
        x: &DataFrame,
        y: &Array1<f64>,
        ctx: &SearchContext,
    ) -> Result<Option<TransformSpec>> {
        ctx.logger
            .task_start("Starting missing value imputation optimization");

        let columns = columns_with_nulls(x);
        if columns.is_empty() {
            ctx.logger
                .warn("No missing values found. Skipping imputation transformation.");
            return Ok(None);
        }

        let numeric: Vec<String> = dataset::numerical_columns(x);
        let total = columns.len();
        let mut transformation_options = BTreeMap::new();
        let mut n_neighbors = BTreeMap::new();

        for (i, column) in columns.iter().enumerate() {
            ctx.logger.task_update(&format!(
                "[{}/{total}] Evaluating column: '{column}'",
                i + 1
            ));

            let best = self.find_best_strategy_for_column(
                x,
                y,
                ctx,
                column,
                numeric.contains(column),
            )?;

            if let Some((strategy, neighbors)) = best {
                ctx.logger.task_result(&format!(
                    "Selected imputation for '{column}': {strategy:?}"
                ));
                transformation_options.insert(column.clone(), strategy);
                if let Some(k) = neighbors {
                    n_neighbors.insert(column.clone(), k);
                }
            }
        }

        if transformation_options.is_empty() {
            ctx.logger.warn("No imputation was applied to any column");
            return Ok(None);
        }

        ctx.logger.task_result(&format!(
            "Imputation applied to {} column(s)",
            transformation_options.len()
        ));

        let transform = Transform::MissingValuesHandler(MissingValuesHandler::new(
            MissingValuesHandlerParams {
                transformation_options,
                n_neighbors,
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

    fn df_with_missing() -> (DataFrame, Array1<f64>) {
        let a: Vec<Option<f64>> = (0..40)
            .map(|i| if i % 10 == 0 { None } else { Some(i as f64) })
            .collect();
        let y: Array1<f64> = (0..40).map(|i| (i * 2) as f64).collect();
        let df = DataFrame::new(vec![Series::new("a".into(), a).into()]).unwrap();
        (df, y)
    }

    #[test]
    fn test_indicator_emitted_only_with_nulls() {
        let (df, y) = df_with_missing();
        let model = DecisionTree::regressor();
        let logger = NoopLogger;
        let ctx = SearchContext::new(&model, Scoring::R2, Direction::Maximize, &logger);

        let spec = MissingValuesIndicatorParamCalculator
            .calculate_best_params(&df, &y, &ctx)
            .unwrap();
        assert!(spec.is_some());
        assert_eq!(spec.unwrap().name, "MissingValuesIndicator");

        let clean = DataFrame::new(vec![
            Series::new("a".into(), (0..10).map(|i| i as f64).collect::<Vec<_>>()).into(),
        ])
        .unwrap();
        let y10: Array1<f64> = (0..10).map(|i| i as f64).collect();
        let spec = MissingValuesIndicatorParamCalculator
            .calculate_best_params(&clean, &y10, &ctx)
            .unwrap();
        assert!(spec.is_none());
    }

    #[test]
    fn test_imputation_always_selected_for_null_columns() {
        let (df, y) = df_with_missing();
        let model = DecisionTree::regressor();
        let logger = NoopLogger;
        let ctx = SearchContext::new(&model, Scoring::R2, Direction::Maximize, &logger);

        let spec = MissingValuesParamCalculator
            .calculate_best_params(&df, &y, &ctx)
            .unwrap()
            .expect("column with nulls must receive an imputation");
        assert_eq!(spec.name, "MissingValuesHandler");

        let rebuilt = Transform::from_spec(&spec).unwrap();
        assert_eq!(rebuilt.spec().unwrap(), spec);
    }
}
