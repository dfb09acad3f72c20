//! Per-column scaling

use crate::dataset;
use crate::error::{FeatForgeError, Result};
use crate::transforms::{f64_series, with_series, Lineage};
use ndarray::Array1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleMethod {
    /// (x - min) / (max - min)
    MinMax,
    /// (x - mean) / std
    Standard,
    /// (x - median) / (q_high - q_low), range configurable per column
    Robust,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScaleParams {
    pub transformation_options: BTreeMap<String, ScaleMethod>,
    #[serde(default)]
    pub quantile_range: BTreeMap<String, (f64, f64)>,
}

#[derive(Debug, Clone)]
struct FittedScale {
    center: f64,
    scale: f64,
}

/// Rewrites numeric columns in place with min-max, standard, or robust
/// scaling. Center/scale are fitted on the training frame.
#[derive(Debug, Clone)]
pub struct ScaleTransformation {
    transformation_options: BTreeMap<String, ScaleMethod>,
    quantile_range: BTreeMap<String, (f64, f64)>,
    fitted: BTreeMap<String, FittedScale>,
}

impl ScaleTransformation {
    pub fn new(params: ScaleParams) -> Self {
        Self {
            transformation_options: params.transformation_options,
            quantile_range: params.quantile_range,
            fitted: BTreeMap::new(),
        }
    }

    pub fn params(&self) -> ScaleParams {
        ScaleParams {
            transformation_options: self.transformation_options.clone(),
            quantile_range: self.quantile_range.clone(),
        }
    }

    pub fn fit(&mut self, x: &DataFrame, _y: Option<&Array1<f64>>) -> Result<()> {
        self.fitted.clear();

        for (column, method) in &self.transformation_options {
            let mut values = dataset::column_f64_dropna(x, column)?;
            if values.is_empty() {
                return Err(FeatForgeError::DataError(format!(
                    "column '{column}' has no non-null values"
                )));
            }
            values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            let n = values.len() as f64;

            let (center, scale) = match method {
                ScaleMethod::MinMax => {
                    let min = values[0];
                    let max = values[values.len() - 1];
                    (min, max - min)
                }
                ScaleMethod::Standard => {
                    let mean = values.iter().sum::<f64>() / n;
                    let std = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
                        / (n - 1.0).max(1.0))
                    .sqrt();
                    (mean, std)
                }
                ScaleMethod::Robust => {
                    let (q_low, q_high) = self
                        .quantile_range
                        .get(column)
                        .copied()
                        .unwrap_or((25.0, 75.0));
                    let median = Self::percentile(&values, 0.5);
                    let spread = Self::percentile(&values, q_high / 100.0)
                        - Self::percentile(&values, q_low / 100.0);
                    (median, spread)
                }
            };

            self.fitted.insert(
                column.clone(),
                FittedScale {
                    center,
                    scale: if scale.abs() <= 1e-12 { 1.0 } else { scale },
                },
            );
        }

        Ok(())
    }

    pub fn transform(&self, x: &DataFrame) -> Result<DataFrame> {
        let mut result = x.clone();

        for column in self.transformation_options.keys() {
            let fitted = self.fitted.get(column).ok_or(FeatForgeError::NotFitted)?;
            let values: Vec<Option<f64>> = dataset::column_f64(&result, column)?
                .into_iter()
                .map(|v| v.map(|v| (v - fitted.center) / fitted.scale))
                .collect();
            result = with_series(&result, f64_series(column, values))?;
        }

        Ok(result)
    }

    pub fn lineage(&self) -> Lineage {
        Lineage::new()
    }

    fn percentile(sorted: &[f64], q: f64) -> f64 {
        let pos = q * (sorted.len() - 1) as f64;
        let lo = pos.floor() as usize;
        let hi = pos.ceil() as usize;
        if lo == hi {
            sorted[lo]
        } else {
            sorted[lo] + (pos - lo as f64) * (sorted[hi] - sorted[lo])
        }
    }
}
