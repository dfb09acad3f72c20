//! Per-family parameter calculators
//!
//! One calculator per transformation family. Each consumes the evaluator
//! through [`SearchContext`] and emits at most one transformation spec.
//! Two search disciplines exist and are a correctness contract per
//! family: baseline-gated calculators accept a candidate only when it
//! strictly improves on the no-op score, while best-of-N calculators
//! always pick the best enumerated option. Heuristic calculators
//! (datetime, cyclical, missing indicator, non-linear trigger) never
//! consult the evaluator at all.

mod binning;
mod dimred;
mod encoding;
mod mathops;
mod missing;
mod nonlinear;
mod normalization;
mod outliers;
mod periodic;
mod quantile;
mod scale;
mod selection;
mod spline;

pub use binning::NumericalBinningParamCalculator;
pub use dimred::DimensionalityReductionParamCalculator;
pub use encoding::CategoricalEncodingParamCalculator;
pub use mathops::MathematicalOperationsParamCalculator;
pub use missing::{MissingValuesIndicatorParamCalculator, MissingValuesParamCalculator};
pub use nonlinear::NonLinearTransformationParamCalculator;
pub use normalization::NormalizationParamCalculator;
pub use outliers::OutliersParamCalculator;
pub use periodic::{CyclicalFeaturesTransformerParamCalculator, DateTimeTransformerParamCalculator};
pub use quantile::QuantileTransformationParamCalculator;
pub use scale::ScaleTransformationParamCalculator;
pub use selection::ColumnSelectionParamCalculator;
pub use spline::SplineTransformationParamCalculator;

use crate::error::Result;
use crate::search::SearchContext;
use crate::transforms::TransformSpec;
use ndarray::Array1;
use polars::prelude::DataFrame;

/// Common calculator contract. Idempotent under identical inputs and
/// seeds; never mutates the dataset it receives. `Ok(None)` is the
/// normal "no beneficial transformation" outcome, not an error.
pub trait ParamCalculator {
    fn calculate_best_params(
        &self,
        x: &DataFrame,
        y: &Array1<f64>,
        ctx: &SearchContext,
    ) -> Result<Option<TransformSpec>>;
}
