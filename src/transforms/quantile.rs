//! Rank-based quantile transformation

use crate::dataset;
use crate::error::{FeatForgeError, Result};
use crate::transforms::{f64_series, with_series, Lineage};
use ndarray::Array1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantileOutput {
    /// Map to the empirical CDF (values in [0, 1]).
    Uniform,
    /// Map through the empirical CDF into the standard normal.
    Normal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuantileParams {
    pub transformation_options: BTreeMap<String, QuantileOutput>,
}

/// Maps columns through their empirical distribution. Reference quantiles
/// are the sorted training values (subsampled to at most 1000 points).
#[derive(Debug, Clone)]
pub struct QuantileTransformation {
    transformation_options: BTreeMap<String, QuantileOutput>,
    references: BTreeMap<String, Vec<f64>>,
}

const MAX_QUANTILES: usize = 1000;
const EPS: f64 = 1e-7;

impl QuantileTransformation {
    pub fn new(params: QuantileParams) -> Self {
        Self {
            transformation_options: params.transformation_options,
            references: BTreeMap::new(),
        }
    }

    pub fn params(&self) -> QuantileParams {
        QuantileParams {
            transformation_options: self.transformation_options.clone(),
        }
    }

    pub fn fit(&mut self, x: &DataFrame, _y: Option<&Array1<f64>>) -> Result<()> {
        self.references.clear();

        for column in self.transformation_options.keys() {
            let mut values = dataset::column_f64_dropna(x, column)?;
            if values.is_empty() {
                return Err(FeatForgeError::DataError(format!(
                    "column '{column}' has no non-null values"
                )));
            }
            values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

            let reference = if values.len() <= MAX_QUANTILES {
                values
            } else {
                (0..MAX_QUANTILES)
                    .map(|i| {
                        let pos = i as f64 / (MAX_QUANTILES - 1) as f64
                            * (values.len() - 1) as f64;
                        values[pos.round() as usize]
                    })
                    .collect()
            };

            self.references.insert(column.clone(), reference);
        }

        Ok(())
    }

    pub fn transform(&self, x: &DataFrame) -> Result<DataFrame> {
        let mut result = x.clone();

        for (column, output) in &self.transformation_options {
            let reference = self
                .references
                .get(column)
                .ok_or(FeatForgeError::NotFitted)?;

            let values: Vec<Option<f64>> = dataset::column_f64(&result, column)?
                .into_iter()
                .map(|v| {
                    v.map(|v| {
                        let u = Self::empirical_cdf(reference, v);
                        match output {
                            QuantileOutput::Uniform => u,
                            QuantileOutput::Normal => {
                                Self::normal_ppf(u.clamp(EPS, 1.0 - EPS))
                            }
                        }
                    })
                })
                .collect();

            result = with_series(&result, f64_series(column, values))?;
        }

        Ok(result)
    }

    pub fn lineage(&self) -> Lineage {
        Lineage::new()
    }

    /// Interpolated position of `value` within the sorted reference.
    fn empirical_cdf(reference: &[f64], value: f64) -> f64 {
        let n = reference.len();
        if n == 1 {
            return 0.5;
        }

        let idx = reference.partition_point(|&r| r < value);
        if idx == 0 {
            return 0.0;
        }
        if idx >= n {
            return 1.0;
        }

        let lo = reference[idx - 1];
        let hi = reference[idx];
        let frac = if (hi - lo).abs() < 1e-15 {
            0.0
        } else {
            (value - lo) / (hi - lo)
        };
        ((idx - 1) as f64 + frac) / (n - 1) as f64
    }

    /// Inverse standard-normal CDF (Acklam's rational approximation).
    fn normal_ppf(p: f64) -> f64 {
        const A: [f64; 6] = [
            -3.969683028665376e+01,
            2.209460984245205e+02,
            -2.759285104469687e+02,
            1.383577518672690e+02,
            -3.066479806614716e+01,
            2.506628277459239e+00,
        ];
        const B: [f64; 5] = [
            -5.447609879822406e+01,
            1.615858368580409e+02,
            -1.556989798598866e+02,
            6.680131188771972e+01,
            -1.328068155288572e+01,
        ];
        const C: [f64; 6] = [
            -7.784894002430293e-03,
            -3.223964580411365e-01,
            -2.400758277161838e+00,
            -2.549732539343734e+00,
            4.374664141464968e+00,
            2.938163982698783e+00,
        ];
        const D: [f64; 4] = [
            7.784695709041462e-03,
            3.224671290700398e-01,
            2.445134137142996e+00,
            3.754408661907416e+00,
        ];
        const P_LOW: f64 = 0.02425;

        if p < P_LOW {
            let q = (-2.0 * p.ln()).sqrt();
            (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
                / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
        } else if p <= 1.0 - P_LOW {
            let q = p - 0.5;
            let r = q * q;
            (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
                / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
        } else {
            let q = (-2.0 * (1.0 - p).ln()).sqrt();
            -(((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
                / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_output_in_unit_interval() {
        let values: Vec<f64> = (0..200).map(|i| (i as f64).powi(2)).collect();
        let df = DataFrame::new(vec![Series::new("a".into(), values).into()]).unwrap();

        let mut qt = QuantileTransformation::new(QuantileParams {
            transformation_options: BTreeMap::from([("a".to_string(), QuantileOutput::Uniform)]),
        });
        qt.fit(&df, None).unwrap();
        let out = qt.transform(&df).unwrap();

        let ca = out.column("a").unwrap().as_materialized_series().f64().unwrap().clone();
        for v in ca.into_iter().flatten() {
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn test_normal_output_roughly_symmetric() {
        let values: Vec<f64> = (1..500).map(|i| (i as f64).sqrt()).collect();
        let df = DataFrame::new(vec![Series::new("a".into(), values).into()]).unwrap();

        let mut qt = QuantileTransformation::new(QuantileParams {
            transformation_options: BTreeMap::from([("a".to_string(), QuantileOutput::Normal)]),
        });
        qt.fit(&df, None).unwrap();
        let out = qt.transform(&df).unwrap();

        let transformed: Vec<f64> = out
            .column("a")
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        let mean = transformed.iter().sum::<f64>() / transformed.len() as f64;
        assert!(mean.abs() < 0.1);
        assert!(dataset::skewness(&transformed).abs() < 0.2);
    }

    #[test]
    fn test_normal_ppf_median_is_zero() {
        assert!(QuantileTransformation::normal_ppf(0.5).abs() < 1e-9);
        assert!((QuantileTransformation::normal_ppf(0.975) - 1.96).abs() < 1e-3);
    }
}
