//! Outlier detection and handling

use crate::anomaly::{IsolationForest, LocalOutlierFactor};
use crate::dataset;
use crate::error::{FeatForgeError, Result};
use crate::transforms::{f64_series, with_series, Lineage};
use ndarray::Array1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What to do with values flagged as outliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierAction {
    /// Clip to the detection bounds.
    Cap,
    /// Replace with the column median.
    Median,
}

/// How outliers are detected on a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierMethod {
    /// Interquartile-range rule; threshold is the IQR multiplier.
    Iqr,
    /// Standard-score rule; threshold is the z multiplier.
    Zscore,
    /// Local outlier factor; `lof_params` carries n_neighbors, threshold
    /// is the LOF cutoff (default 1.5).
    Lof,
    /// Isolation forest; `iforest_params` carries the contamination.
    Iforest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutliersHandlerParams {
    pub transformation_options: BTreeMap<String, (OutlierAction, OutlierMethod)>,
    #[serde(default)]
    pub thresholds: BTreeMap<String, f64>,
    #[serde(default)]
    pub lof_params: BTreeMap<String, usize>,
    #[serde(default)]
    pub iforest_params: BTreeMap<String, f64>,
}

#[derive(Debug, Clone)]
struct Bounds {
    lower: f64,
    upper: f64,
}

/// Caps or median-replaces values outside per-column bounds. Bounds come
/// from distribution rules (IQR, z-score) or from the value range the
/// model-based detectors keep.
#[derive(Debug, Clone)]
pub struct OutliersHandler {
    transformation_options: BTreeMap<String, (OutlierAction, OutlierMethod)>,
    thresholds: BTreeMap<String, f64>,
    lof_params: BTreeMap<String, usize>,
    iforest_params: BTreeMap<String, f64>,
    bounds: BTreeMap<String, Bounds>,
    statistics: BTreeMap<String, f64>,
}

impl OutliersHandler {
    pub fn new(params: OutliersHandlerParams) -> Self {
        Self {
            transformation_options: params.transformation_options,
            thresholds: params.thresholds,
            lof_params: params.lof_params,
            iforest_params: params.iforest_params,
            bounds: BTreeMap::new(),
            statistics: BTreeMap::new(),
        }
    }

    pub fn params(&self) -> OutliersHandlerParams {
        OutliersHandlerParams {
            transformation_options: self.transformation_options.clone(),
            thresholds: self.thresholds.clone(),
            lof_params: self.lof_params.clone(),
            iforest_params: self.iforest_params.clone(),
        }
    }

    pub fn fit(&mut self, x: &DataFrame, _y: Option<&Array1<f64>>) -> Result<()> {
        self.bounds.clear();
        self.statistics.clear();

        for (column, (action, method)) in &self.transformation_options {
            let values = dataset::column_f64_dropna(x, column)?;
            if values.is_empty() {
                return Err(FeatForgeError::DataError(format!(
                    "column '{column}' has no non-null values"
                )));
            }

            let bounds = match method {
                OutlierMethod::Iqr => {
                    let threshold = self.thresholds.get(column).copied().unwrap_or(1.5);
                    let (q1, q3) = Self::quartiles(&values);
                    let iqr = q3 - q1;
                    Bounds {
                        lower: q1 - threshold * iqr,
                        upper: q3 + threshold * iqr,
                    }
                }
                OutlierMethod::Zscore => {
                    let threshold = self.thresholds.get(column).copied().unwrap_or(3.0);
                    let (mean, std) = Self::mean_std(&values);
                    Bounds {
                        lower: mean - threshold * std,
                        upper: mean + threshold * std,
                    }
                }
                OutlierMethod::Lof => {
                    let n_neighbors = self.lof_params.get(column).copied().unwrap_or(20);
                    let cutoff = self.thresholds.get(column).copied().unwrap_or(1.5);
                    let mut lof = LocalOutlierFactor::new(n_neighbors);
                    lof.fit(&values)?;
                    let scores = lof.negative_outlier_factor()?;
                    Self::kept_range(&values, scores.iter().map(|&s| s >= -cutoff))?
                }
                OutlierMethod::Iforest => {
                    let contamination = self.iforest_params.get(column).copied().unwrap_or(0.05);
                    let mut forest = IsolationForest::new(contamination);
                    forest.fit(&values)?;
                    let flags = forest.predict(&values)?;
                    Self::kept_range(&values, flags.iter().map(|&flag| !flag))?
                }
            };

            if *action == OutlierAction::Median {
                let mut sorted = values.clone();
                sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                self.statistics
                    .insert(column.clone(), sorted[sorted.len() / 2]);
            }

            self.bounds.insert(column.clone(), bounds);
        }

        Ok(())
    }

    pub fn transform(&self, x: &DataFrame) -> Result<DataFrame> {
        let mut result = x.clone();

        for (column, (action, _)) in &self.transformation_options {
            let bounds = self.bounds.get(column).ok_or(FeatForgeError::NotFitted)?;
            let values = dataset::column_f64(&result, column)?;

            let rewritten: Vec<Option<f64>> = match action {
                OutlierAction::Cap => values
                    .into_iter()
                    .map(|v| v.map(|v| v.clamp(bounds.lower, bounds.upper)))
                    .collect(),
                OutlierAction::Median => {
                    let median = *self
                        .statistics
                        .get(column)
                        .ok_or(FeatForgeError::NotFitted)?;
                    values
                        .into_iter()
                        .map(|v| {
                            v.map(|v| {
                                if v < bounds.lower || v > bounds.upper {
                                    median
                                } else {
                                    v
                                }
                            })
                        })
                        .collect()
                }
            };

            result = with_series(&result, f64_series(column, rewritten))?;
        }

        Ok(result)
    }

    pub fn lineage(&self) -> Lineage {
        Lineage::new()
    }

    fn quartiles(values: &[f64]) -> (f64, f64) {
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        (
            Self::percentile(&sorted, 0.25),
            Self::percentile(&sorted, 0.75),
        )
    }

    /// Linear-interpolated percentile of pre-sorted values.
    fn percentile(sorted: &[f64], q: f64) -> f64 {
        if sorted.is_empty() {
            return 0.0;
        }
        let pos = q * (sorted.len() - 1) as f64;
        let lo = pos.floor() as usize;
        let hi = pos.ceil() as usize;
        if lo == hi {
            sorted[lo]
        } else {
            sorted[lo] + (pos - lo as f64) * (sorted[hi] - sorted[lo])
        }
    }

    fn mean_std(values: &[f64]) -> (f64, f64) {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0).max(1.0);
        (mean, var.sqrt())
    }

    /// Value range of the rows a detector keeps.
    fn kept_range(values: &[f64], keep: impl Iterator<Item = bool>) -> Result<Bounds> {
        let kept: Vec<f64> = values
            .iter()
            .zip(keep)
            .filter_map(|(&v, k)| k.then_some(v))
            .collect();
        if kept.is_empty() {
            return Err(FeatForgeError::DataError(
                "detector flagged every value as an outlier".to_string(),
            ));
        }
        Ok(Bounds {
            lower: kept.iter().cloned().fold(f64::INFINITY, f64::min),
            upper: kept.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
        })
    }

    /// Count of values outside the bounds a method/threshold pair would
    /// produce, without building a handler. Used by the search to skip
    /// candidates that would be no-ops.
    pub fn count_outliers(
        values: &[f64],
        method: OutlierMethod,
        param: f64,
    ) -> Result<usize> {
        if values.is_empty() {
            return Ok(0);
        }
        match method {
            OutlierMethod::Iqr => {
                let (q1, q3) = Self::quartiles(values);
                let iqr = q3 - q1;
                let (lower, upper) = (q1 - param * iqr, q3 + param * iqr);
                Ok(values.iter().filter(|&&v| v < lower || v > upper).count())
            }
            OutlierMethod::Zscore => {
                let (mean, std) = Self::mean_std(values);
                let (lower, upper) = (mean - param * std, mean + param * std);
                Ok(values.iter().filter(|&&v| v < lower || v > upper).count())
            }
            OutlierMethod::Iforest => {
                let mut forest = IsolationForest::new(param);
                forest.fit(values)?;
                Ok(forest.predict(values)?.into_iter().filter(|&f| f).count())
            }
            OutlierMethod::Lof => {
                let mut lof = LocalOutlierFactor::new(param as usize);
                lof.fit(values)?;
                Ok(lof
                    .negative_outlier_factor()?
                    .iter()
                    .filter(|&&s| s < -1.5)
                    .count())
            }
        }
    }
}
