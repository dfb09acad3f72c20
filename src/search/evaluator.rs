//! Cross-validated scoring of candidate transformers

use crate::dataset;
use crate::error::Result;
use crate::search::{CrossValidator, CvSplit, SearchContext};
use crate::transforms::Transform;
use ndarray::Array1;
use polars::prelude::*;
use rayon::prelude::*;

/// Score a dataset (optionally through a candidate transformer) with the
/// context's model, metric, and CV strategy.
///
/// Per fold: clone the unfitted transformer, fit it on the training rows,
/// transform both sides, keep the numeric columns with nulls filled as 0
/// (non-numeric columns are dropped at this boundary), fit a fresh model
/// clone, and score the test predictions. Returns the mean of fold
/// scores; `Ok(None)` when every fold was degenerate. A missing score is
/// never coerced to zero.
pub fn evaluate_model(
    x: &DataFrame,
    y: &Array1<f64>,
    ctx: &SearchContext,
    transformer: Option<&Transform>,
) -> Result<Option<f64>> {
    let splits = CrossValidator::new(ctx.cv).split(x.height(), ctx.groups)?;

    // Fold-level parallelism only; results are identical either way.
    let fold_scores: Vec<Option<f64>> = splits
        .par_iter()
        .map(|split| evaluate_fold(x, y, ctx, transformer, split))
        .collect::<Result<Vec<Option<f64>>>>()?;

    let scores: Vec<f64> = fold_scores.into_iter().flatten().collect();
    if scores.is_empty() {
        return Ok(None);
    }
    Ok(Some(scores.iter().sum::<f64>() / scores.len() as f64))
}

fn evaluate_fold(
    x: &DataFrame,
    y: &Array1<f64>,
    ctx: &SearchContext,
    transformer: Option<&Transform>,
    split: &CvSplit,
) -> Result<Option<f64>> {
    if split.train_indices.is_empty() || split.test_indices.is_empty() {
        return Ok(None);
    }

    let mut train_df = dataset::take_rows(x, &split.train_indices)?;
    let mut test_df = dataset::take_rows(x, &split.test_indices)?;
    let y_train = dataset::take_target(y, &split.train_indices);
    let y_test = dataset::take_target(y, &split.test_indices);

    if let Some(template) = transformer {
        let mut fitted = template.clone();
        fitted.fit(&train_df, Some(&y_train))?;
        train_df = fitted.transform(&train_df)?;
        test_df = fitted.transform(&test_df)?;
    }

    // Numeric-only boundary: anything still categorical or datetime here
    // is dropped, so earlier stages must have encoded what matters.
    let feature_cols = dataset::numerical_columns(&train_df);
    if feature_cols.is_empty() {
        return Ok(None);
    }

    let x_train = dataset::columns_to_array2(&train_df, &feature_cols)?;
    let x_test = dataset::columns_to_array2(&test_df, &feature_cols)?;
    if x_train.nrows() == 0 || x_test.nrows() == 0 {
        return Ok(None);
    }

    let mut model = ctx.model.clone_unfitted();
    model.fit(&x_train, &y_train)?;
    let predictions = model.predict(&x_test)?;

    Ok(ctx.scoring.compute(&y_test, &predictions))
}
