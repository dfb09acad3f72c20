//! Column norm scaling

use crate::dataset;
use crate::error::{FeatForgeError, Result};
use crate::transforms::{f64_series, with_series, Lineage};
use ndarray::Array1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormKind {
    L1,
    L2,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizationParams {
    pub transformation_options: BTreeMap<String, NormKind>,
}

/// Divides each configured column by its training-set L1 or L2 norm.
#[derive(Debug, Clone)]
pub struct Normalization {
    transformation_options: BTreeMap<String, NormKind>,
    norms: BTreeMap<String, f64>,
}

impl Normalization {
    pub fn new(params: NormalizationParams) -> Self {
        Self {
            transformation_options: params.transformation_options,
            norms: BTreeMap::new(),
        }
    }

    pub fn params(&self) -> NormalizationParams {
        NormalizationParams {
            transformation_options: self.transformation_options.clone(),
        }
    }

    pub fn fit(&mut self, x: &DataFrame, _y: Option<&Array1<f64>>) -> Result<()> {
        self.norms.clear();

        for (column, kind) in &self.transformation_options {
            let values = dataset::column_f64_dropna(x, column)?;
            let norm = match kind {
                NormKind::L1 => values.iter().map(|v| v.abs()).sum::<f64>(),
                NormKind::L2 => values.iter().map(|v| v * v).sum::<f64>().sqrt(),
            };
            self.norms
                .insert(column.clone(), if norm <= 1e-12 { 1.0 } else { norm });
        }

        Ok(())
    }

    pub fn transform(&self, x: &DataFrame) -> Result<DataFrame> {
        let mut result = x.clone();

        for column in self.transformation_options.keys() {
            let norm = *self.norms.get(column).ok_or(FeatForgeError::NotFitted)?;
            let values: Vec<Option<f64>> = dataset::column_f64(&result, column)?
                .into_iter()
                .map(|v| v.map(|v| v / norm))
                .collect();
            result = with_series(&result, f64_series(column, values))?;
        }

        Ok(result)
    }

    pub fn lineage(&self) -> Lineage {
        Lineage::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l2_norm_is_unit() {
        let df = DataFrame::new(vec![
            Series::new("a".into(), &[3.0, 4.0]).into(),
        ])
        .unwrap();

        let mut norm = Normalization::new(NormalizationParams {
            transformation_options: BTreeMap::from([("a".to_string(), NormKind::L2)]),
        });
        norm.fit(&df, None).unwrap();
        let out = norm.transform(&df).unwrap();

        let ca = out.column("a").unwrap().as_materialized_series().f64().unwrap().clone();
        let sum_sq: f64 = ca.into_iter().flatten().map(|v| v * v).sum();
        assert!((sum_sq - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_column_unchanged() {
        let df = DataFrame::new(vec![
            Series::new("a".into(), &[0.0, 0.0, 0.0]).into(),
        ])
        .unwrap();

        let mut norm = Normalization::new(NormalizationParams {
            transformation_options: BTreeMap::from([("a".to_string(), NormKind::L1)]),
        });
        norm.fit(&df, None).unwrap();
        let out = norm.transform(&df).unwrap();

        let ca = out.column("a").unwrap().as_materialized_series().f64().unwrap().clone();
        assert_eq!(ca.get(0), Some(0.0));
    }
}
