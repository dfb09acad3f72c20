//! Dimensionality reduction

use crate::dataset;
use crate::error::{FeatForgeError, Result};
use crate::transforms::{f64_series, with_series, Lineage};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimRedMethod {
    /// Principal component analysis (columns centered).
    Pca,
    /// Truncated SVD on the raw matrix (no centering).
    TruncatedSvd,
}

impl DimRedMethod {
    fn tag(&self) -> &'static str {
        match self {
            DimRedMethod::Pca => "pca",
            DimRedMethod::TruncatedSvd => "truncated_svd",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimRedParams {
    pub features: Vec<String>,
    pub method: DimRedMethod,
    pub n_components: usize,
}

/// Projects the configured feature columns onto their leading components,
/// replacing them with `{method}_{i}` columns. Non-feature columns pass
/// through untouched.
#[derive(Debug, Clone)]
pub struct DimensionalityReduction {
    features: Vec<String>,
    method: DimRedMethod,
    n_components: usize,
    means: Option<Array1<f64>>,
    components: Option<Array2<f64>>,
}

impl DimensionalityReduction {
    pub fn new(params: DimRedParams) -> Self {
        Self {
            features: params.features,
            method: params.method,
            n_components: params.n_components,
            means: None,
            components: None,
        }
    }

    pub fn params(&self) -> DimRedParams {
        DimRedParams {
            features: self.features.clone(),
            method: self.method,
            n_components: self.n_components,
        }
    }

    pub fn fit(&mut self, x: &DataFrame, _y: Option<&Array1<f64>>) -> Result<()> {
        if self.features.len() < 2 {
            return Err(FeatForgeError::ConfigError(
                "dimensionality reduction needs at least 2 feature columns".to_string(),
            ));
        }

        let matrix = dataset::columns_to_array2(x, &self.features)?;
        let n = matrix.nrows();
        let p = matrix.ncols();
        let k = self.n_components.min(p);

        let (centered, means) = match self.method {
            DimRedMethod::Pca => {
                let means: Array1<f64> = (0..p)
                    .map(|j| matrix.column(j).sum() / n.max(1) as f64)
                    .collect();
                let mut centered = matrix.clone();
                for j in 0..p {
                    for i in 0..n {
                        centered[[i, j]] -= means[j];
                    }
                }
                (centered, means)
            }
            DimRedMethod::TruncatedSvd => (matrix.clone(), Array1::zeros(p)),
        };

        // Gram matrix; its top eigenvectors are the projection directions.
        let mut gram = centered.t().dot(&centered) / (n.max(2) - 1) as f64;
        let mut components = Array2::zeros((p, k));
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        for comp in 0..k {
            let v = Self::power_iteration(&gram, &mut rng);
            let eigenvalue = v.dot(&gram.dot(&v));

            components.column_mut(comp).assign(&v);

            // Deflate before extracting the next direction
            for i in 0..p {
                for j in 0..p {
                    gram[[i, j]] -= eigenvalue * v[i] * v[j];
                }
            }
        }

        self.means = Some(means);
        self.components = Some(components);
        Ok(())
    }

    pub fn transform(&self, x: &DataFrame) -> Result<DataFrame> {
        let components = self.components.as_ref().ok_or(FeatForgeError::NotFitted)?;
        let means = self.means.as_ref().ok_or(FeatForgeError::NotFitted)?;

        let matrix = dataset::columns_to_array2(x, &self.features)?;
        let mut centered = matrix;
        for j in 0..centered.ncols() {
            for i in 0..centered.nrows() {
                centered[[i, j]] -= means[j];
            }
        }
        let projected = centered.dot(components);

        let mut result = x.clone();
        for feature in &self.features {
            result = result
                .drop(feature)
                .map_err(|e| FeatForgeError::DataError(e.to_string()))?;
        }

        for comp in 0..projected.ncols() {
            let values: Vec<Option<f64>> =
                projected.column(comp).iter().map(|&v| Some(v)).collect();
            let name = format!("{}_{}", self.method.tag(), comp + 1);
            result = with_series(&result, f64_series(&name, values))?;
        }

        Ok(result)
    }

    pub fn lineage(&self) -> Lineage {
        let sources: BTreeSet<String> = self.features.iter().cloned().collect();
        let k = self
            .components
            .as_ref()
            .map(|c| c.ncols())
            .unwrap_or_else(|| self.n_components.min(self.features.len()));

        (0..k)
            .map(|comp| {
                (
                    format!("{}_{}", self.method.tag(), comp + 1),
                    sources.clone(),
                )
            })
            .collect()
    }

    /// Leading eigenvector of a symmetric matrix by power iteration.
    fn power_iteration(matrix: &Array2<f64>, rng: &mut ChaCha8Rng) -> Array1<f64> {
        let p = matrix.nrows();
        let mut v: Array1<f64> = (0..p).map(|_| rng.gen::<f64>() - 0.5).collect();
        let norm = v.dot(&v).sqrt();
        if norm > 1e-12 {
            v /= norm;
        }

        for _ in 0..200 {
            let next = matrix.dot(&v);
            let norm = next.dot(&next).sqrt();
            if norm <= 1e-12 {
                break;
            }
            let next = next / norm;
            let delta = (&next - &v).mapv(f64::abs).sum();
            v = next;
            if delta < 1e-10 {
                break;
            }
        }

        v
    }
}
