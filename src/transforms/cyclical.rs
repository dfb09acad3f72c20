//! Sine/cosine encoding of periodic columns

use crate::dataset;
use crate::error::{FeatForgeError, Result};
use crate::transforms::{f64_series, with_series, Lineage};
use ndarray::Array1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::TAU;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CyclicalParams {
    /// Column → period (e.g. 12 for months, 24 for hours).
    pub transformation_options: BTreeMap<String, f64>,
}

/// Replaces each periodic column with `{column}_sin` and `{column}_cos`.
#[derive(Debug, Clone)]
pub struct CyclicalFeaturesTransformer {
    transformation_options: BTreeMap<String, f64>,
}

impl CyclicalFeaturesTransformer {
    pub fn new(params: CyclicalParams) -> Self {
        Self {
            transformation_options: params.transformation_options,
        }
    }

    pub fn params(&self) -> CyclicalParams {
        CyclicalParams {
            transformation_options: self.transformation_options.clone(),
        }
    }

    pub fn fit(&mut self, _x: &DataFrame, _y: Option<&Array1<f64>>) -> Result<()> {
        for (column, period) in &self.transformation_options {
            if *period <= 0.0 {
                return Err(FeatForgeError::ConfigError(format!(
                    "period for '{column}' must be positive"
                )));
            }
        }
        Ok(())
    }

    pub fn transform(&self, x: &DataFrame) -> Result<DataFrame> {
        let mut result = x.clone();

        for (column, period) in &self.transformation_options {
            let values = dataset::column_f64(&result, column)?;

            let sin_values: Vec<Option<f64>> = values
                .iter()
                .map(|v| v.map(|v| (TAU * v / period).sin()))
                .collect();
            let cos_values: Vec<Option<f64>> = values
                .iter()
                .map(|v| v.map(|v| (TAU * v / period).cos()))
                .collect();

            result = with_series(&result, f64_series(&format!("{column}_sin"), sin_values))?;
            result = with_series(&result, f64_series(&format!("{column}_cos"), cos_values))?;
            result = result
                .drop(column)
                .map_err(|e| FeatForgeError::DataError(e.to_string()))?;
        }

        Ok(result)
    }

    pub fn lineage(&self) -> Lineage {
        self.transformation_options
            .keys()
            .flat_map(|column| {
                [
                    (
                        format!("{column}_sin"),
                        BTreeSet::from([column.clone()]),
                    ),
                    (
                        format!("{column}_cos"),
                        BTreeSet::from([column.clone()]),
                    ),
                ]
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_wraps_around() {
        let df = DataFrame::new(vec![
            Series::new("month".into(), &[1.0, 7.0, 13.0]).into(),
        ])
        .unwrap();

        let mut transformer = CyclicalFeaturesTransformer::new(CyclicalParams {
            transformation_options: BTreeMap::from([("month".to_string(), 12.0)]),
        });
        transformer.fit(&df, None).unwrap();
        let out = transformer.transform(&df).unwrap();

        assert!(out.column("month").is_err());

        let sin = out.column("month_sin").unwrap().as_materialized_series().f64().unwrap().clone();
        // Month 13 lands on the same angle as month 1
        assert!((sin.get(0).unwrap() - sin.get(2).unwrap()).abs() < 1e-9);
    }

    #[test]
    fn test_sin_cos_unit_circle() {
        let df = DataFrame::new(vec![
            Series::new("h".into(), &[0.0, 6.0, 12.0, 18.0]).into(),
        ])
        .unwrap();

        let mut transformer = CyclicalFeaturesTransformer::new(CyclicalParams {
            transformation_options: BTreeMap::from([("h".to_string(), 24.0)]),
        });
        transformer.fit(&df, None).unwrap();
        let out = transformer.transform(&df).unwrap();

        let sin = out.column("h_sin").unwrap().as_materialized_series().f64().unwrap().clone();
        let cos = out.column("h_cos").unwrap().as_materialized_series().f64().unwrap().clone();
        for row in 0..4 {
            let s = sin.get(row).unwrap();
            let c = cos.get(row).unwrap();
            assert!((s * s + c * c - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_zero_period_rejected() {
        let mut transformer = CyclicalFeaturesTransformer::new(CyclicalParams {
            transformation_options: BTreeMap::from([("a".to_string(), 0.0)]),
        });
        let df = DataFrame::new(vec![Series::new("a".into(), &[1.0]).into()]).unwrap();
        assert!(transformer.fit(&df, None).is_err());
    }
}
