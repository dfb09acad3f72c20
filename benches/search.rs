use criterion::{black_box, criterion_group, criterion_main, Criterion};
use featforge::model::{DecisionTree, Direction, Scoring};
use featforge::search::{evaluate_model, NoopLogger, SearchContext};
use ndarray::Array1;
use polars::prelude::*;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

fn synthetic_frame(n_rows: usize, n_features: usize) -> (DataFrame, Array1<f64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(7);

    let columns: Vec<Column> = (0..n_features)
        .map(|j| {
            let values: Vec<f64> = (0..n_rows).map(|_| rng.gen::<f64>() * 10.0).collect();
            Series::new(format!("feature_{j}").into(), values).into()
        })
        .collect();
    let df = DataFrame::new(columns).unwrap();

    let first = df
        .column("feature_0")
        .unwrap()
        .as_materialized_series()
        .f64()
        .unwrap()
        .clone();
    let y: Array1<f64> = (0..n_rows)
        .map(|i| first.get(i).unwrap_or(0.0) * 2.0 + rng.gen::<f64>())
        .collect();

    (df, y)
}

fn bench_evaluate(c: &mut Criterion) {
    let (df, y) = synthetic_frame(500, 8);
    let model = DecisionTree::regressor().with_max_depth(4);
    let logger = NoopLogger;
    let ctx = SearchContext::new(&model, Scoring::R2, Direction::Maximize, &logger);

    c.bench_function("evaluate_model_500x8", |b| {
        b.iter(|| {
            let score = evaluate_model(black_box(&df), black_box(&y), &ctx, None).unwrap();
            black_box(score)
        })
    });
}

criterion_group!(benches, bench_evaluate);
criterion_main!(benches);
