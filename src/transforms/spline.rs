//! B-spline basis expansion

use crate::dataset;
use crate::error::{FeatForgeError, Result};
use crate::transforms::{f64_series, with_series, Lineage};
use ndarray::Array1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Extrapolation {
    /// Out-of-range values clamp to the boundary basis values.
    Constant,
    /// Out-of-range values continue the boundary tangent.
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplineOptions {
    pub degree: usize,
    pub n_knots: usize,
    pub extrapolation: Extrapolation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplineParams {
    pub transformation_options: BTreeMap<String, SplineOptions>,
}

#[derive(Debug, Clone)]
struct FittedSpline {
    options: SplineOptions,
    /// Extended knot vector (base knots padded by `degree` on both sides).
    knots: Vec<f64>,
    lo: f64,
    hi: f64,
}

/// Expands each configured numeric column into `n_knots + degree - 1`
/// B-spline basis columns named `{column}__spline_{i}`. The original
/// column is kept.
#[derive(Debug, Clone)]
pub struct SplineTransformation {
    transformation_options: BTreeMap<String, SplineOptions>,
    fitted: BTreeMap<String, FittedSpline>,
}

impl SplineTransformation {
    pub fn new(params: SplineParams) -> Self {
        Self {
            transformation_options: params.transformation_options,
            fitted: BTreeMap::new(),
        }
    }

    pub fn params(&self) -> SplineParams {
        SplineParams {
            transformation_options: self.transformation_options.clone(),
        }
    }

    fn n_basis(options: &SplineOptions) -> usize {
        options.n_knots + options.degree - 1
    }

    pub fn fit(&mut self, x: &DataFrame, _y: Option<&Array1<f64>>) -> Result<()> {
        self.fitted.clear();

        for (column, options) in &self.transformation_options {
            if options.n_knots < 2 {
                return Err(FeatForgeError::ConfigError(format!(
                    "spline on '{column}' needs at least 2 knots"
                )));
            }

            let values = dataset::column_f64_dropna(x, column)?;
            if values.is_empty() {
                return Err(FeatForgeError::DataError(format!(
                    "column '{column}' has no non-null values"
                )));
            }

            let lo = values.iter().cloned().fold(f64::INFINITY, f64::min);
            let hi = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let span = (hi - lo).max(1e-12);
            let step = span / (options.n_knots - 1) as f64;

            // Base knots uniform on [lo, hi], padded by `degree` equally
            // spaced knots on each side.
            let d = options.degree as i64;
            let knots: Vec<f64> = (-d..options.n_knots as i64 + d)
                .map(|i| lo + step * i as f64)
                .collect();

            self.fitted.insert(
                column.clone(),
                FittedSpline {
                    options: *options,
                    knots,
                    lo,
                    hi,
                },
            );
        }

        Ok(())
    }

    pub fn transform(&self, x: &DataFrame) -> Result<DataFrame> {
        let mut result = x.clone();

        for column in self.transformation_options.keys() {
            let fitted = self.fitted.get(column).ok_or(FeatForgeError::NotFitted)?;
            let values = dataset::column_f64(&result, column)?;
            let n_basis = Self::n_basis(&fitted.options);

            let mut basis_columns: Vec<Vec<Option<f64>>> =
                vec![Vec::with_capacity(values.len()); n_basis];

            for value in &values {
                let v = value.unwrap_or(0.0).clamp(fitted.lo, fitted.hi);
                for (basis_idx, out) in basis_columns.iter_mut().enumerate() {
                    out.push(Some(Self::bspline_basis(
                        &fitted.knots,
                        basis_idx,
                        fitted.options.degree,
                        v,
                    )));
                }
            }

            for (basis_idx, basis_values) in basis_columns.into_iter().enumerate() {
                let name = format!("{column}__spline_{basis_idx}");
                result = with_series(&result, f64_series(&name, basis_values))?;
            }
        }

        Ok(result)
    }

    pub fn lineage(&self) -> Lineage {
        self.transformation_options
            .iter()
            .flat_map(|(column, options)| {
                (0..Self::n_basis(options)).map(move |i| {
                    (
                        format!("{column}__spline_{i}"),
                        BTreeSet::from([column.clone()]),
                    )
                })
            })
            .collect()
    }

    /// Cox-de Boor recursion for the value of basis function `i` of the
    /// given degree at `x`.
    fn bspline_basis(knots: &[f64], i: usize, degree: usize, x: f64) -> f64 {
        if degree == 0 {
            let in_support = knots[i] <= x && x < knots[i + 1];
            // Close the last interval so the boundary maximum is covered
            let at_end = x >= knots[knots.len() - 1] && i + 2 == knots.len();
            return if in_support || at_end { 1.0 } else { 0.0 };
        }

        let left_den = knots[i + degree] - knots[i];
        let right_den = knots[i + degree + 1] - knots[i + 1];

        let left = if left_den.abs() < 1e-15 {
            0.0
        } else {
            (x - knots[i]) / left_den * Self::bspline_basis(knots, i, degree - 1, x)
        };
        let right = if right_den.abs() < 1e-15 {
            0.0
        } else {
            (knots[i + degree + 1] - x) / right_den
                * Self::bspline_basis(knots, i + 1, degree - 1, x)
        };

        left + right
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fitted_output(degree: usize, n_knots: usize) -> DataFrame {
        let df = DataFrame::new(vec![
            Series::new("a".into(), (0..50).map(|i| i as f64).collect::<Vec<_>>()).into(),
        ])
        .unwrap();

        let mut spline = SplineTransformation::new(SplineParams {
            transformation_options: BTreeMap::from([(
                "a".to_string(),
                SplineOptions {
                    degree,
                    n_knots,
                    extrapolation: Extrapolation::Constant,
                },
            )]),
        });
        spline.fit(&df, None).unwrap();
        spline.transform(&df).unwrap()
    }

    #[test]
    fn test_basis_count() {
        let out = fitted_output(3, 5);
        // 5 knots, degree 3 → 7 basis columns plus the original
        assert_eq!(out.width(), 8);
        assert!(out.column("a__spline_0").is_ok());
        assert!(out.column("a__spline_6").is_ok());
    }

    #[test]
    fn test_partition_of_unity() {
        let out = fitted_output(3, 5);
        for row in 0..out.height() {
            let total: f64 = (0..7)
                .map(|i| {
                    out.column(&format!("a__spline_{i}"))
                        .unwrap()
                        .as_materialized_series()
                        .f64()
                        .unwrap()
                        .get(row)
                        .unwrap()
                })
                .sum();
            assert!(
                (total - 1.0).abs() < 1e-9,
                "basis should sum to 1, got {total} at row {row}"
            );
        }
    }

    #[test]
    fn test_lineage_covers_all_basis_columns() {
        let spline = SplineTransformation::new(SplineParams {
            transformation_options: BTreeMap::from([(
                "a".to_string(),
                SplineOptions {
                    degree: 4,
                    n_knots: 10,
                    extrapolation: Extrapolation::Linear,
                },
            )]),
        });
        let lineage = spline.lineage();
        assert_eq!(lineage.len(), 13);
        assert!(lineage["a__spline_12"].contains("a"));
    }
}
