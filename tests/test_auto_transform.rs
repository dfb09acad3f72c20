//! Integration tests: end-to-end `auto_transform` scenarios

use featforge::prelude::*;
use featforge::transforms::{MathOperator, Transform};
use ndarray::Array1;
use polars::prelude::*;

fn pipeline_names(pipeline: &[TransformSpec]) -> Vec<&str> {
    pipeline.iter().map(|s| s.name.as_str()).collect()
}

/// One numeric column with 10% missing values and heavy right skew,
/// regression target: the pipeline must impute that column, and may
/// reshape its distribution only if that strictly improved the score.
#[test]
fn test_skewed_column_with_missing_values() {
    let n = 60;
    let values: Vec<Option<f64>> = (0..n)
        .map(|i| {
            if i % 10 == 0 {
                None
            } else {
                Some(((i % 12) as f64 + 1.0).powi(3))
            }
        })
        .collect();
    let y: Array1<f64> = (0..n)
        .map(|i| {
            let v = ((i % 12) as f64 + 1.0).powi(3);
            v.ln() * 10.0
        })
        .collect();

    let df = DataFrame::new(vec![Series::new("x".into(), values).into()]).unwrap();
    let model = DecisionTree::regressor();

    let pipeline = auto_transform(
        &df,
        &y,
        &model,
        Scoring::NegMeanSquaredError,
        Direction::Maximize,
        None,
        AutoTransformOptions::default(),
    )
    .unwrap();

    let names = pipeline_names(&pipeline);
    assert!(
        names.contains(&"MissingValuesHandler"),
        "imputation must be present, got {names:?}"
    );
    assert_eq!(names[0], "ColumnSelection", "pruning prepends a selector");

    // The imputation covers the skewed column
    let handler_spec = pipeline
        .iter()
        .find(|s| s.name == "MissingValuesHandler")
        .unwrap();
    match Transform::from_spec(handler_spec).unwrap() {
        Transform::MissingValuesHandler(h) => {
            assert!(h.params().transformation_options.contains_key("x"));
        }
        _ => unreachable!(),
    }
}

/// Categorical column with 3 unique values and a classification target:
/// the encoding family is unconditional best-of-N, so an encoding spec is
/// always present.
#[test]
fn test_categorical_column_always_encoded() {
    let n = 60;
    let categories: Vec<&str> = (0..n)
        .map(|i| match i % 3 {
            0 => "red",
            1 => "green",
            _ => "blue",
        })
        .collect();
    let noise: Vec<f64> = (0..n).map(|i| ((i * 17) % 23) as f64).collect();
    let y: Array1<f64> = (0..n).map(|i| (i % 3 == 0) as u8 as f64).collect();

    let df = DataFrame::new(vec![
        Series::new("color".into(), categories).into(),
        Series::new("noise".into(), noise).into(),
    ])
    .unwrap();
    let model = DecisionTree::classifier();

    let pipeline = auto_transform(
        &df,
        &y,
        &model,
        Scoring::Accuracy,
        Direction::Maximize,
        None,
        AutoTransformOptions::default(),
    )
    .unwrap();

    let names = pipeline_names(&pipeline);
    assert!(
        names.contains(&"CategoricalEncoding"),
        "encoding must always be selected, got {names:?}"
    );
}

/// Two numeric columns whose product is highly predictive while neither
/// is alone: the mathematical-operations stage must discover (a, b,
/// multiply).
#[test]
fn test_interaction_discovery() {
    let n = 80;
    let a: Vec<f64> = (0..n).map(|i| ((i * 7) % 13) as f64 - 6.0).collect();
    let b: Vec<f64> = (0..n).map(|i| ((i * 11) % 17) as f64 - 8.0).collect();
    let y: Array1<f64> = a.iter().zip(b.iter()).map(|(x, z)| x * z).collect();

    let df = DataFrame::new(vec![
        Series::new("a".into(), a).into(),
        Series::new("b".into(), b).into(),
    ])
    .unwrap();
    let model = DecisionTree::regressor().with_max_depth(4);

    let pipeline = auto_transform(
        &df,
        &y,
        &model,
        Scoring::R2,
        Direction::Maximize,
        None,
        AutoTransformOptions::default(),
    )
    .unwrap();

    let math_spec = pipeline
        .iter()
        .find(|s| s.name == "MathematicalOperations")
        .expect("a*b interaction should be in the pipeline");

    match Transform::from_spec(math_spec).unwrap() {
        Transform::MathematicalOperations(m) => {
            assert!(m.params().operations_options.contains(&(
                "a".to_string(),
                "b".to_string(),
                MathOperator::Multiply
            )));
        }
        _ => unreachable!(),
    }
}

/// The emitted pipeline applies cleanly, front to back, to the original
/// frame, and every column any spec references is reachable from the
/// prepended selector's columns.
#[test]
fn test_pipeline_replays_on_original_data() {
    let n = 50;
    let a: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let b: Vec<f64> = (0..n).map(|i| ((i * 3) % 11) as f64).collect();
    let y: Array1<f64> = a.iter().zip(b.iter()).map(|(x, z)| x * 2.0 + z).collect();

    let df = DataFrame::new(vec![
        Series::new("a".into(), a).into(),
        Series::new("b".into(), b).into(),
    ])
    .unwrap();
    let model = DecisionTree::regressor();

    let pipeline = auto_transform(
        &df,
        &y,
        &model,
        Scoring::R2,
        Direction::Maximize,
        None,
        AutoTransformOptions::default(),
    )
    .unwrap();

    // Replay: every stage fits and transforms without touching a column
    // that does not exist at that point.
    let mut current = df.clone();
    for spec in &pipeline {
        let mut transform = Transform::from_spec(spec).unwrap();
        current = transform
            .fit_transform(&current, Some(&y))
            .unwrap_or_else(|e| panic!("{} failed to replay: {e}", spec.name));
    }
    assert!(current.width() > 0);
    assert_eq!(current.height(), n);
}

/// Identical seeds and inputs reproduce the identical pipeline.
#[test]
fn test_search_is_reproducible() {
    let n = 40;
    let a: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let y: Array1<f64> = a.iter().map(|v| v * 3.0 + 1.0).collect();
    let df = DataFrame::new(vec![Series::new("a".into(), a).into()]).unwrap();
    let model = DecisionTree::regressor();

    let run = || {
        auto_transform(
            &df,
            &y,
            &model,
            Scoring::R2,
            Direction::Maximize,
            None,
            AutoTransformOptions::default(),
        )
        .unwrap()
    };

    assert_eq!(run(), run());
}
