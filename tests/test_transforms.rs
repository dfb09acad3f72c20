//! Integration tests: transformation spec round-trips and lineage

use featforge::transforms::*;
use ndarray::Array1;
use polars::prelude::*;
use std::collections::BTreeMap;

fn sample_df() -> DataFrame {
    df!(
        "a" => &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0],
        "b" => &[10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0],
        "city" => &["ny", "la", "ny", "sf", "la", "ny", "sf", "ny"],
    )
    .unwrap()
}

fn target() -> Array1<f64> {
    Array1::from_vec(vec![1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0])
}

/// Every family must round-trip: rebuild(spec).spec() == spec.
#[test]
fn test_spec_round_trip_all_families() {
    let specs: Vec<Transform> = vec![
        Transform::MissingValuesIndicator(MissingValuesIndicator::new(
            MissingValuesIndicatorParams {
                features: vec!["a".to_string()],
            },
        )),
        Transform::MissingValuesHandler(MissingValuesHandler::new(MissingValuesHandlerParams {
            transformation_options: BTreeMap::from([("a".to_string(), ImputeStrategy::Knn)]),
            n_neighbors: BTreeMap::from([("a".to_string(), 5usize)]),
        })),
        Transform::OutliersHandler(OutliersHandler::new(OutliersHandlerParams {
            transformation_options: BTreeMap::from([(
                "a".to_string(),
                (OutlierAction::Cap, OutlierMethod::Iqr),
            )]),
            thresholds: BTreeMap::from([("a".to_string(), 1.5)]),
            lof_params: BTreeMap::new(),
            iforest_params: BTreeMap::new(),
        })),
        Transform::NonLinearTransformation(NonLinearTransformation::new(NonLinearParams {
            transformation_options: BTreeMap::from([(
                "a".to_string(),
                NonLinearMethod::YeoJohnson,
            )]),
        })),
        Transform::Normalization(Normalization::new(NormalizationParams {
            transformation_options: BTreeMap::from([("a".to_string(), NormKind::L2)]),
        })),
        Transform::QuantileTransformation(QuantileTransformation::new(QuantileParams {
            transformation_options: BTreeMap::from([(
                "a".to_string(),
                QuantileOutput::Normal,
            )]),
        })),
        Transform::ScaleTransformation(ScaleTransformation::new(ScaleParams {
            transformation_options: BTreeMap::from([("a".to_string(), ScaleMethod::Robust)]),
            quantile_range: BTreeMap::from([("a".to_string(), (5.0, 95.0))]),
        })),
        Transform::NumericalBinning(NumericalBinning::new(BinningParams {
            transformation_options: BTreeMap::from([(
                "a".to_string(),
                (BinningStrategy::Quantile, 3usize),
            )]),
        })),
        Transform::SplineTransformation(SplineTransformation::new(SplineParams {
            transformation_options: BTreeMap::from([(
                "a".to_string(),
                SplineOptions {
                    degree: 3,
                    n_knots: 5,
                    extrapolation: Extrapolation::Constant,
                },
            )]),
        })),
        Transform::MathematicalOperations(MathematicalOperations::new(MathOpsParams {
            operations_options: vec![(
                "a".to_string(),
                "b".to_string(),
                MathOperator::Multiply,
            )],
        })),
        Transform::DateTimeTransformer(DateTimeTransformer::new(DateTimeParams {
            features: vec!["ts".to_string()],
        })),
        Transform::CyclicalFeaturesTransformer(CyclicalFeaturesTransformer::new(CyclicalParams {
            transformation_options: BTreeMap::from([("month".to_string(), 12.0)]),
        })),
        Transform::CategoricalEncoding(CategoricalEncoding::new(EncodingParams {
            transformation_options: BTreeMap::from([(
                "city".to_string(),
                EncodingMethod::Target,
            )]),
        })),
        Transform::ColumnSelection(ColumnSelection::new(ColumnSelectionParams {
            features: vec!["a".to_string(), "b".to_string()],
        })),
        Transform::DimensionalityReduction(DimensionalityReduction::new(DimRedParams {
            features: vec!["a".to_string(), "b".to_string()],
            method: DimRedMethod::Pca,
            n_components: 2,
        })),
    ];

    for transform in specs {
        let spec = transform.spec().unwrap();
        let rebuilt = Transform::from_spec(&spec).unwrap();
        assert_eq!(
            rebuilt.spec().unwrap(),
            spec,
            "round-trip failed for {}",
            spec.name
        );
    }
}

/// Expanding transformers name exactly the columns they produce; in-place
/// rewrites expose empty lineage.
#[test]
fn test_lineage_matches_produced_columns() {
    let df = sample_df();
    let y = target();

    let mut mathops = Transform::MathematicalOperations(MathematicalOperations::new(
        MathOpsParams {
            operations_options: vec![(
                "a".to_string(),
                "b".to_string(),
                MathOperator::Add,
            )],
        },
    ));
    let before: Vec<String> = df.get_column_names().iter().map(|n| n.to_string()).collect();
    let out = mathops.fit_transform(&df, Some(&y)).unwrap();
    let produced: Vec<String> = out
        .get_column_names()
        .iter()
        .map(|n| n.to_string())
        .filter(|n| !before.contains(n))
        .collect();

    let lineage = mathops.lineage();
    assert_eq!(produced.len(), lineage.len());
    for column in &produced {
        assert!(lineage.contains_key(column), "missing lineage for {column}");
    }

    let mut scaler = Transform::ScaleTransformation(ScaleTransformation::new(ScaleParams {
        transformation_options: BTreeMap::from([("a".to_string(), ScaleMethod::Standard)]),
        quantile_range: BTreeMap::new(),
    }));
    scaler.fit_transform(&df, Some(&y)).unwrap();
    assert!(scaler.lineage().is_empty());
}

/// Encoding lineage appears only after fitting (dummy columns depend on
/// the observed categories).
#[test]
fn test_dummy_lineage_after_fit() {
    let df = sample_df();
    let y = target();

    let mut encoder = Transform::CategoricalEncoding(CategoricalEncoding::new(EncodingParams {
        transformation_options: BTreeMap::from([("city".to_string(), EncodingMethod::Dummy)]),
    }));
    let out = encoder.fit_transform(&df, Some(&y)).unwrap();
    let lineage = encoder.lineage();

    // ny and sf get indicator columns (la is the reference level)
    assert!(lineage.contains_key("city_ny"));
    assert!(lineage.contains_key("city_sf"));
    assert!(out.column("city_ny").is_ok());
    for sources in lineage.values() {
        assert!(sources.contains("city"));
    }
}

/// A fitted transformer applies its training-time state to new data.
#[test]
fn test_fit_state_carries_to_new_frames() {
    let train = df!("a" => &[0.0, 10.0, 20.0, 30.0, 40.0]).unwrap();
    let test = df!("a" => &[5.0, 15.0, 80.0]).unwrap();

    let mut scaler = Transform::ScaleTransformation(ScaleTransformation::new(ScaleParams {
        transformation_options: BTreeMap::from([("a".to_string(), ScaleMethod::MinMax)]),
        quantile_range: BTreeMap::new(),
    }));
    scaler.fit_transform(&train, None).unwrap();
    let out = scaler.transform(&test).unwrap();

    let ca = out.column("a").unwrap().as_materialized_series().f64().unwrap().clone();
    // Scaled by the training range [0, 40]; out-of-range values exceed 1
    assert!((ca.get(0).unwrap() - 0.125).abs() < 1e-12);
    assert!((ca.get(2).unwrap() - 2.0).abs() < 1e-12);
}
