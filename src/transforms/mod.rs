//! Column-level transformation library
//!
//! Every transformation family follows the same contract: construct from
//! typed params, `fit` on a training frame (optionally with a target),
//! `transform` any frame, expose `params()` for serialization and
//! `lineage()` mapping each newly produced column to the input columns it
//! was derived from. In-place column rewrites do not appear in lineage.
//!
//! The families form a closed set: [`Transform`] is a tagged sum type
//! with a single exhaustive-match constructor, [`Transform::from_spec`].
//! There is no string-keyed open registry; an unknown family name is a
//! configuration error at rebuild time.

mod binning;
mod cyclical;
mod datetime;
mod dimred;
mod encoding;
mod mathops;
mod missing;
mod nonlinear;
mod normalization;
mod outliers;
mod quantile;
mod scale;
mod selection;
mod spline;

pub use binning::{BinningParams, BinningStrategy, NumericalBinning};
pub use cyclical::{CyclicalFeaturesTransformer, CyclicalParams};
pub use datetime::{DateTimeParams, DateTimeTransformer};
pub use dimred::{DimRedMethod, DimRedParams, DimensionalityReduction};
pub use encoding::{CategoricalEncoding, EncodingMethod, EncodingParams};
pub use mathops::{MathOperator, MathOpsParams, MathematicalOperations};
pub use missing::{
    ImputeStrategy, MissingValuesHandler, MissingValuesHandlerParams, MissingValuesIndicator,
    MissingValuesIndicatorParams,
};
pub use nonlinear::{NonLinearMethod, NonLinearParams, NonLinearTransformation};
pub use normalization::{NormKind, Normalization, NormalizationParams};
pub use outliers::{OutlierAction, OutlierMethod, OutliersHandler, OutliersHandlerParams};
pub use quantile::{QuantileOutput, QuantileParams, QuantileTransformation};
pub use scale::{ScaleMethod, ScaleParams, ScaleTransformation};
pub use selection::{ColumnSelection, ColumnSelectionParams};
pub use spline::{Extrapolation, SplineOptions, SplineParams, SplineTransformation};

use crate::error::{FeatForgeError, Result};
use ndarray::Array1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Serializable description of one pipeline step: the family name plus the
/// constructor arguments. Round-trips through [`Transform::from_spec`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformSpec {
    pub name: String,
    pub params: serde_json::Value,
}

/// Output column → source columns it was derived from.
pub type Lineage = BTreeMap<String, BTreeSet<String>>;

/// Attach (or replace) a column on a copy of the frame.
pub(crate) fn with_series(df: &DataFrame, series: Series) -> Result<DataFrame> {
    let mut result = df.clone();
    result
        .with_column(series)
        .map_err(|e| FeatForgeError::DataError(e.to_string()))?;
    Ok(result)
}

/// Build a named Float64 series from optional values.
pub(crate) fn f64_series(name: &str, values: Vec<Option<f64>>) -> Series {
    Series::new(name.into(), values)
}

/// The closed set of transformation families.
#[derive(Debug, Clone)]
pub enum Transform {
    MissingValuesIndicator(MissingValuesIndicator),
    MissingValuesHandler(MissingValuesHandler),
    OutliersHandler(OutliersHandler),
    NonLinearTransformation(NonLinearTransformation),
    Normalization(Normalization),
    QuantileTransformation(QuantileTransformation),
    ScaleTransformation(ScaleTransformation),
    NumericalBinning(NumericalBinning),
    SplineTransformation(SplineTransformation),
    MathematicalOperations(MathematicalOperations),
    DateTimeTransformer(DateTimeTransformer),
    CyclicalFeaturesTransformer(CyclicalFeaturesTransformer),
    CategoricalEncoding(CategoricalEncoding),
    ColumnSelection(ColumnSelection),
    DimensionalityReduction(DimensionalityReduction),
}

macro_rules! dispatch {
    ($self:expr, $inner:ident => $body:expr) => {
        match $self {
            Transform::MissingValuesIndicator($inner) => $body,
            Transform::MissingValuesHandler($inner) => $body,
            Transform::OutliersHandler($inner) => $body,
            Transform::NonLinearTransformation($inner) => $body,
            Transform::Normalization($inner) => $body,
            Transform::QuantileTransformation($inner) => $body,
            Transform::ScaleTransformation($inner) => $body,
            Transform::NumericalBinning($inner) => $body,
            Transform::SplineTransformation($inner) => $body,
            Transform::MathematicalOperations($inner) => $body,
            Transform::DateTimeTransformer($inner) => $body,
            Transform::CyclicalFeaturesTransformer($inner) => $body,
            Transform::CategoricalEncoding($inner) => $body,
            Transform::ColumnSelection($inner) => $body,
            Transform::DimensionalityReduction($inner) => $body,
        }
    };
}

impl Transform {
    /// Rebuild a transformer from its spec. The single place where family
    /// names are resolved; unknown names are a configuration error.
    pub fn from_spec(spec: &TransformSpec) -> Result<Self> {
        let params = spec.params.clone();
        match spec.name.as_str() {
            "MissingValuesIndicator" => Ok(Transform::MissingValuesIndicator(
                MissingValuesIndicator::new(serde_json::from_value(params)?),
            )),
            "MissingValuesHandler" => Ok(Transform::MissingValuesHandler(
                MissingValuesHandler::new(serde_json::from_value(params)?),
            )),
            "OutliersHandler" => Ok(Transform::OutliersHandler(OutliersHandler::new(
                serde_json::from_value(params)?,
            ))),
            "NonLinearTransformation" => Ok(Transform::NonLinearTransformation(
                NonLinearTransformation::new(serde_json::from_value(params)?),
            )),
            "Normalization" => Ok(Transform::Normalization(Normalization::new(
                serde_json::from_value(params)?,
            ))),
            "QuantileTransformation" => Ok(Transform::QuantileTransformation(
                QuantileTransformation::new(serde_json::from_value(params)?),
            )),
            "ScaleTransformation" => Ok(Transform::ScaleTransformation(ScaleTransformation::new(
                serde_json::from_value(params)?,
            ))),
            "NumericalBinning" => Ok(Transform::NumericalBinning(NumericalBinning::new(
                serde_json::from_value(params)?,
            ))),
            "SplineTransformation" => Ok(Transform::SplineTransformation(
                SplineTransformation::new(serde_json::from_value(params)?),
            )),
            "MathematicalOperations" => Ok(Transform::MathematicalOperations(
                MathematicalOperations::new(serde_json::from_value(params)?),
            )),
            "DateTimeTransformer" => Ok(Transform::DateTimeTransformer(DateTimeTransformer::new(
                serde_json::from_value(params)?,
            ))),
            "CyclicalFeaturesTransformer" => Ok(Transform::CyclicalFeaturesTransformer(
                CyclicalFeaturesTransformer::new(serde_json::from_value(params)?),
            )),
            "CategoricalEncoding" => Ok(Transform::CategoricalEncoding(CategoricalEncoding::new(
                serde_json::from_value(params)?,
            ))),
            "ColumnSelection" => Ok(Transform::ColumnSelection(ColumnSelection::new(
                serde_json::from_value(params)?,
            ))),
            "DimensionalityReduction" => Ok(Transform::DimensionalityReduction(
                DimensionalityReduction::new(serde_json::from_value(params)?),
            )),
            other => Err(FeatForgeError::UnknownTransformer(other.to_string())),
        }
    }

    /// Family name used in specs.
    pub fn name(&self) -> &'static str {
        match self {
            Transform::MissingValuesIndicator(_) => "MissingValuesIndicator",
            Transform::MissingValuesHandler(_) => "MissingValuesHandler",
            Transform::OutliersHandler(_) => "OutliersHandler",
            Transform::NonLinearTransformation(_) => "NonLinearTransformation",
            Transform::Normalization(_) => "Normalization",
            Transform::QuantileTransformation(_) => "QuantileTransformation",
            Transform::ScaleTransformation(_) => "ScaleTransformation",
            Transform::NumericalBinning(_) => "NumericalBinning",
            Transform::SplineTransformation(_) => "SplineTransformation",
            Transform::MathematicalOperations(_) => "MathematicalOperations",
            Transform::DateTimeTransformer(_) => "DateTimeTransformer",
            Transform::CyclicalFeaturesTransformer(_) => "CyclicalFeaturesTransformer",
            Transform::CategoricalEncoding(_) => "CategoricalEncoding",
            Transform::ColumnSelection(_) => "ColumnSelection",
            Transform::DimensionalityReduction(_) => "DimensionalityReduction",
        }
    }

    /// Serializable spec reconstructing this transformer.
    pub fn spec(&self) -> Result<TransformSpec> {
        let params = dispatch!(self, t => serde_json::to_value(t.params())?);
        Ok(TransformSpec {
            name: self.name().to_string(),
            params,
        })
    }

    pub fn fit(&mut self, x: &DataFrame, y: Option<&Array1<f64>>) -> Result<()> {
        dispatch!(self, t => t.fit(x, y))
    }

    pub fn transform(&self, x: &DataFrame) -> Result<DataFrame> {
        dispatch!(self, t => t.transform(x))
    }

    pub fn fit_transform(&mut self, x: &DataFrame, y: Option<&Array1<f64>>) -> Result<DataFrame> {
        self.fit(x, y)?;
        self.transform(x)
    }

    /// Lineage of the fitted transformer. Empty for in-place rewrites.
    pub fn lineage(&self) -> Lineage {
        dispatch!(self, t => t.lineage())
    }
}

/// Trim a spec's column-keyed parameters down to `required` columns,
/// dropping the spec entirely when nothing remains. Used by backward
/// pruning; dispatches exhaustively over the closed family set.
pub fn retain_spec_columns(
    spec: &TransformSpec,
    required: &BTreeSet<String>,
) -> Result<Option<TransformSpec>> {
    let rebuilt = Transform::from_spec(spec)?;

    let trimmed: Option<Transform> = match rebuilt {
        Transform::MissingValuesIndicator(t) => {
            let mut params = t.params();
            params.features.retain(|c| required.contains(c));
            (!params.features.is_empty())
                .then(|| Transform::MissingValuesIndicator(MissingValuesIndicator::new(params)))
        }
        Transform::MissingValuesHandler(t) => {
            let mut params = t.params();
            params
                .transformation_options
                .retain(|c, _| required.contains(c));
            params.n_neighbors.retain(|c, _| required.contains(c));
            (!params.transformation_options.is_empty())
                .then(|| Transform::MissingValuesHandler(MissingValuesHandler::new(params)))
        }
        Transform::OutliersHandler(t) => {
            let mut params = t.params();
            params
                .transformation_options
                .retain(|c, _| required.contains(c));
            params.thresholds.retain(|c, _| required.contains(c));
            params.lof_params.retain(|c, _| required.contains(c));
            params.iforest_params.retain(|c, _| required.contains(c));
            (!params.transformation_options.is_empty())
                .then(|| Transform::OutliersHandler(OutliersHandler::new(params)))
        }
        Transform::NonLinearTransformation(t) => {
            let mut params = t.params();
            params
                .transformation_options
                .retain(|c, _| required.contains(c));
            (!params.transformation_options.is_empty())
                .then(|| Transform::NonLinearTransformation(NonLinearTransformation::new(params)))
        }
        Transform::Normalization(t) => {
            let mut params = t.params();
            params
                .transformation_options
                .retain(|c, _| required.contains(c));
            (!params.transformation_options.is_empty())
                .then(|| Transform::Normalization(Normalization::new(params)))
        }
        Transform::QuantileTransformation(t) => {
            let mut params = t.params();
            params
                .transformation_options
                .retain(|c, _| required.contains(c));
            (!params.transformation_options.is_empty())
                .then(|| Transform::QuantileTransformation(QuantileTransformation::new(params)))
        }
        Transform::ScaleTransformation(t) => {
            let mut params = t.params();
            params
                .transformation_options
                .retain(|c, _| required.contains(c));
            params.quantile_range.retain(|c, _| required.contains(c));
            (!params.transformation_options.is_empty())
                .then(|| Transform::ScaleTransformation(ScaleTransformation::new(params)))
        }
        Transform::NumericalBinning(t) => {
            let mut params = t.params();
            params
                .transformation_options
                .retain(|c, _| required.contains(c));
            (!params.transformation_options.is_empty())
                .then(|| Transform::NumericalBinning(NumericalBinning::new(params)))
        }
        Transform::SplineTransformation(t) => {
            let mut params = t.params();
            params
                .transformation_options
                .retain(|c, _| required.contains(c));
            (!params.transformation_options.is_empty())
                .then(|| Transform::SplineTransformation(SplineTransformation::new(params)))
        }
        Transform::MathematicalOperations(t) => {
            let mut params = t.params();
            params
                .operations_options
                .retain(|(a, b, _)| required.contains(a) && required.contains(b));
            (!params.operations_options.is_empty())
                .then(|| Transform::MathematicalOperations(MathematicalOperations::new(params)))
        }
        Transform::DateTimeTransformer(t) => {
            let mut params = t.params();
            params.features.retain(|c| required.contains(c));
            (!params.features.is_empty())
                .then(|| Transform::DateTimeTransformer(DateTimeTransformer::new(params)))
        }
        Transform::CyclicalFeaturesTransformer(t) => {
            let mut params = t.params();
            params
                .transformation_options
                .retain(|c, _| required.contains(c));
            (!params.transformation_options.is_empty()).then(|| {
                Transform::CyclicalFeaturesTransformer(CyclicalFeaturesTransformer::new(params))
            })
        }
        Transform::CategoricalEncoding(t) => {
            let mut params = t.params();
            params
                .transformation_options
                .retain(|c, _| required.contains(c));
            (!params.transformation_options.is_empty())
                .then(|| Transform::CategoricalEncoding(CategoricalEncoding::new(params)))
        }
        Transform::ColumnSelection(t) => {
            let mut params = t.params();
            params.features.retain(|c| required.contains(c));
            (!params.features.is_empty())
                .then(|| Transform::ColumnSelection(ColumnSelection::new(params)))
        }
        Transform::DimensionalityReduction(t) => {
            let mut params = t.params();
            params.features.retain(|c| required.contains(c));
            (!params.features.is_empty())
                .then(|| Transform::DimensionalityReduction(DimensionalityReduction::new(params)))
        }
    };

    trimmed.map(|t| t.spec()).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_transformer_is_config_error() {
        let spec = TransformSpec {
            name: "Bogus".to_string(),
            params: serde_json::json!({}),
        };
        assert!(matches!(
            Transform::from_spec(&spec),
            Err(FeatForgeError::UnknownTransformer(_))
        ));
    }

    #[test]
    fn test_spec_round_trip_column_selection() {
        let t = Transform::ColumnSelection(ColumnSelection::new(ColumnSelectionParams {
            features: vec!["a".to_string(), "b".to_string()],
        }));
        let spec = t.spec().unwrap();
        let rebuilt = Transform::from_spec(&spec).unwrap();
        assert_eq!(rebuilt.spec().unwrap(), spec);
    }

    #[test]
    fn test_retain_drops_emptied_spec() {
        let t = Transform::ColumnSelection(ColumnSelection::new(ColumnSelectionParams {
            features: vec!["a".to_string()],
        }));
        let spec = t.spec().unwrap();

        let mut required = BTreeSet::new();
        required.insert("z".to_string());
        assert!(retain_spec_columns(&spec, &required).unwrap().is_none());

        required.insert("a".to_string());
        assert!(retain_spec_columns(&spec, &required).unwrap().is_some());
    }

    #[test]
    fn test_retain_filters_pairwise_operations() {
        let t = Transform::MathematicalOperations(MathematicalOperations::new(MathOpsParams {
            operations_options: vec![
                ("a".to_string(), "b".to_string(), MathOperator::Multiply),
                ("a".to_string(), "c".to_string(), MathOperator::Add),
            ],
        }));
        let spec = t.spec().unwrap();

        let required: BTreeSet<String> =
            ["a", "b"].iter().map(|s| s.to_string()).collect();
        let trimmed = retain_spec_columns(&spec, &required).unwrap().unwrap();

        let rebuilt = Transform::from_spec(&trimmed).unwrap();
        match rebuilt {
            Transform::MathematicalOperations(m) => {
                assert_eq!(m.params().operations_options.len(), 1);
            }
            _ => unreachable!(),
        }
    }
}
