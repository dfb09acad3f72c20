//! Probe feature selection

use crate::dataset;
use crate::error::Result;
use crate::search::importance::feature_importance;
use crate::search::SearchContext;
use ndarray::{Array1, Array2};
use polars::prelude::*;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const PROBE_SEED: u64 = 42;

/// Cheap batch filter: append a random standard-normal probe column, fit
/// the model once, and keep only the features whose importance strictly
/// exceeds the probe's. Anything a pure-noise column beats is not worth a
/// cross-validated evaluation.
#[derive(Debug, Clone, Copy)]
pub struct ProbeFeatureSelector;

impl ProbeFeatureSelector {
    pub fn fit(x: &DataFrame, y: &Array1<f64>, ctx: &SearchContext) -> Result<Vec<String>> {
        let columns = dataset::numerical_columns(x);
        if columns.is_empty() {
            return Ok(Vec::new());
        }

        let matrix = dataset::columns_to_array2(x, &columns)?;
        let with_probe = Self::append_probe(&matrix);

        let importances =
            feature_importance(ctx.model, &with_probe, y, ctx.scoring, ctx.direction)?;
        let probe_importance = importances[importances.len() - 1];

        Ok(columns
            .into_iter()
            .enumerate()
            .filter(|(i, _)| importances[*i] > probe_importance)
            .map(|(_, column)| column)
            .collect())
    }

    fn append_probe(matrix: &Array2<f64>) -> Array2<f64> {
        let n = matrix.nrows();
        let p = matrix.ncols();
        let mut rng = ChaCha8Rng::seed_from_u64(PROBE_SEED);

        let mut with_probe = Array2::zeros((n, p + 1));
        with_probe
            .slice_mut(ndarray::s![.., ..p])
            .assign(matrix);
        for row in 0..n {
            with_probe[[row, p]] = Self::standard_normal(&mut rng);
        }
        with_probe
    }

    /// Box-Muller draw from the standard normal.
    fn standard_normal(rng: &mut ChaCha8Rng) -> f64 {
        let u1: f64 = rng.gen_range(1e-12..1.0);
        let u2: f64 = rng.gen::<f64>();
        (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
    }
}
