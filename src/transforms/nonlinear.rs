//! Non-linear distribution-shaping transforms

use crate::dataset;
use crate::error::{FeatForgeError, Result};
use crate::transforms::{f64_series, with_series, Lineage};
use ndarray::Array1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NonLinearMethod {
    /// log(x + shift), shift chosen at fit time to keep arguments positive
    Log,
    /// exp(x)
    Exponential,
    /// Yeo-Johnson power transform with lambda estimated by grid-search MLE
    YeoJohnson,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NonLinearParams {
    pub transformation_options: BTreeMap<String, NonLinearMethod>,
}

#[derive(Debug, Clone)]
struct FittedNonLinear {
    method: NonLinearMethod,
    shift: f64,
    lambda: f64,
}

/// Rewrites skewed numeric columns in place.
#[derive(Debug, Clone)]
pub struct NonLinearTransformation {
    transformation_options: BTreeMap<String, NonLinearMethod>,
    fitted: BTreeMap<String, FittedNonLinear>,
}

impl NonLinearTransformation {
    pub fn new(params: NonLinearParams) -> Self {
        Self {
            transformation_options: params.transformation_options,
            fitted: BTreeMap::new(),
        }
    }

    pub fn params(&self) -> NonLinearParams {
        NonLinearParams {
            transformation_options: self.transformation_options.clone(),
        }
    }

    pub fn fit(&mut self, x: &DataFrame, _y: Option<&Array1<f64>>) -> Result<()> {
        self.fitted.clear();

        for (column, method) in &self.transformation_options {
            let values = dataset::column_f64_dropna(x, column)?;
            if values.is_empty() {
                return Err(FeatForgeError::DataError(format!(
                    "column '{column}' has no non-null values"
                )));
            }

            let min_val = values.iter().cloned().fold(f64::INFINITY, f64::min);
            let shift = if min_val <= 0.0 { -min_val + 1.0 } else { 0.0 };

            let lambda = match method {
                NonLinearMethod::YeoJohnson => Self::estimate_yeojohnson_lambda(&values),
                _ => 1.0,
            };

            self.fitted.insert(
                column.clone(),
                FittedNonLinear {
                    method: *method,
                    shift,
                    lambda,
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
                .map(|v| v.map(|v| Self::apply(fitted, v)))
                .collect();
            result = with_series(&result, f64_series(column, values))?;
        }

        Ok(result)
    }

    pub fn lineage(&self) -> Lineage {
        Lineage::new()
    }

    fn apply(fitted: &FittedNonLinear, value: f64) -> f64 {
        match fitted.method {
            NonLinearMethod::Log => (value + fitted.shift).max(1e-12).ln(),
            NonLinearMethod::Exponential => value.exp().min(f64::MAX / 2.0),
            NonLinearMethod::YeoJohnson => Self::yeojohnson(value, fitted.lambda),
        }
    }

    /// Yeo-Johnson transform of a single value.
    fn yeojohnson(x: f64, lambda: f64) -> f64 {
        if x >= 0.0 {
            if lambda.abs() < 1e-10 {
                (x + 1.0).ln()
            } else {
                ((x + 1.0).powf(lambda) - 1.0) / lambda
            }
        } else if (lambda - 2.0).abs() < 1e-10 {
            -(-x + 1.0).ln()
        } else {
            -((-x + 1.0).powf(2.0 - lambda) - 1.0) / (2.0 - lambda)
        }
    }

    /// Grid-search the lambda maximizing the Yeo-Johnson log-likelihood
    /// over [-2, 2] in 0.1 steps.
    fn estimate_yeojohnson_lambda(values: &[f64]) -> f64 {
        let mut best_lambda = 1.0;
        let mut best_ll = f64::NEG_INFINITY;

        for step in -20..=20 {
            let lambda = step as f64 * 0.1;
            let ll = Self::yeojohnson_log_likelihood(values, lambda);
            if ll > best_ll {
                best_ll = ll;
                best_lambda = lambda;
            }
        }

        best_lambda
    }

    fn yeojohnson_log_likelihood(values: &[f64], lambda: f64) -> f64 {
        let n = values.len() as f64;
        let transformed: Vec<f64> = values.iter().map(|&x| Self::yeojohnson(x, lambda)).collect();

        let mean = transformed.iter().sum::<f64>() / n;
        let var = transformed.iter().map(|t| (t - mean).powi(2)).sum::<f64>() / n;
        if var <= 1e-12 {
            return f64::NEG_INFINITY;
        }

        // Profile log-likelihood with the Jacobian term
        let jacobian: f64 = values
            .iter()
            .map(|&x| (x.abs() + 1.0).ln() * (lambda - 1.0) * x.signum())
            .sum();
        -0.5 * n * var.ln() + jacobian
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yeojohnson_reduces_right_skew() {
        let values: Vec<f64> = (1..100).map(|i| (i as f64).powi(3)).collect();
        let df = DataFrame::new(vec![Series::new("a".into(), values.clone()).into()]).unwrap();

        let mut transform = NonLinearTransformation::new(NonLinearParams {
            transformation_options: BTreeMap::from([(
                "a".to_string(),
                NonLinearMethod::YeoJohnson,
            )]),
        });
        transform.fit(&df, None).unwrap();
        let out = transform.transform(&df).unwrap();

        let transformed: Vec<f64> = out
            .column("a")
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .flatten()
            .collect();

        let skew_before = dataset::skewness(&values);
        let skew_after = dataset::skewness(&transformed);
        assert!(skew_after.abs() < skew_before.abs());
    }

    #[test]
    fn test_log_handles_nonpositive_values() {
        let df = DataFrame::new(vec![
            Series::new("a".into(), &[-5.0, 0.0, 5.0, 100.0]).into(),
        ])
        .unwrap();

        let mut transform = NonLinearTransformation::new(NonLinearParams {
            transformation_options: BTreeMap::from([("a".to_string(), NonLinearMethod::Log)]),
        });
        transform.fit(&df, None).unwrap();
        let out = transform.transform(&df).unwrap();

        let ca = out.column("a").unwrap().as_materialized_series().f64().unwrap().clone();
        for v in ca.into_iter().flatten() {
            assert!(v.is_finite());
        }
    }

    #[test]
    fn test_yeojohnson_lambda_one_is_identity_shift() {
        // lambda = 1 reduces to x for non-negative inputs
        assert!((NonLinearTransformation::yeojohnson(3.0, 1.0) - 3.0).abs() < 1e-12);
        assert!((NonLinearTransformation::yeojohnson(0.0, 1.0)).abs() < 1e-12);
    }
}
