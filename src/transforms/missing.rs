//! Missing-value indicator flags and imputation

use crate::dataset;
use crate::error::{FeatForgeError, Result};
use crate::transforms::{f64_series, with_series, Lineage};
use ndarray::Array1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Adds a `{column}__missing` 0/1 flag for each configured column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissingValuesIndicatorParams {
    pub features: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct MissingValuesIndicator {
    features: Vec<String>,
}

impl MissingValuesIndicator {
    pub fn new(params: MissingValuesIndicatorParams) -> Self {
        Self {
            features: params.features,
        }
    }

    pub fn params(&self) -> MissingValuesIndicatorParams {
        MissingValuesIndicatorParams {
            features: self.features.clone(),
        }
    }

    pub fn fit(&mut self, _x: &DataFrame, _y: Option<&Array1<f64>>) -> Result<()> {
        Ok(())
    }

    pub fn transform(&self, x: &DataFrame) -> Result<DataFrame> {
        let mut result = x.clone();
        for column in &self.features {
            let col = result
                .column(column)
                .map_err(|_| FeatForgeError::ColumnNotFound(column.clone()))?;
            let flags: Vec<Option<f64>> = col
                .as_materialized_series()
                .is_null()
                .into_iter()
                .map(|flag| Some(if flag.unwrap_or(false) { 1.0 } else { 0.0 }))
                .collect();
            result = with_series(&result, f64_series(&format!("{column}__missing"), flags))?;
        }
        Ok(result)
    }

    pub fn lineage(&self) -> Lineage {
        self.features
            .iter()
            .map(|column| {
                (
                    format!("{column}__missing"),
                    BTreeSet::from([column.clone()]),
                )
            })
            .collect()
    }
}

/// Per-column imputation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputeStrategy {
    Fill0,
    MostFrequent,
    Mean,
    Median,
    Knn,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissingValuesHandlerParams {
    pub transformation_options: BTreeMap<String, ImputeStrategy>,
    #[serde(default)]
    pub n_neighbors: BTreeMap<String, usize>,
}

/// Fitted fill value for one column.
#[derive(Debug, Clone)]
enum FillValue {
    Number(f64),
    Text(String),
}

/// Neighbor pool for KNN imputation of one column: the values of the
/// target column alongside the other numeric columns used as the
/// distance space.
#[derive(Debug, Clone)]
struct KnnState {
    feature_columns: Vec<String>,
    feature_rows: Vec<Vec<f64>>,
    target_values: Vec<f64>,
    fallback: f64,
}

/// Imputes missing values column by column. Numeric columns support all
/// strategies; categorical columns support `fill_0` (literal "0") and
/// `most_frequent`.
#[derive(Debug, Clone)]
pub struct MissingValuesHandler {
    transformation_options: BTreeMap<String, ImputeStrategy>,
    n_neighbors: BTreeMap<String, usize>,
    statistics: BTreeMap<String, FillValue>,
    knn_state: BTreeMap<String, KnnState>,
}

impl MissingValuesHandler {
    pub fn new(params: MissingValuesHandlerParams) -> Self {
        Self {
            transformation_options: params.transformation_options,
            n_neighbors: params.n_neighbors,
            statistics: BTreeMap::new(),
            knn_state: BTreeMap::new(),
        }
    }

    pub fn params(&self) -> MissingValuesHandlerParams {
        MissingValuesHandlerParams {
            transformation_options: self.transformation_options.clone(),
            n_neighbors: self.n_neighbors.clone(),
        }
    }

    pub fn fit(&mut self, x: &DataFrame, _y: Option<&Array1<f64>>) -> Result<()> {
        self.statistics.clear();
        self.knn_state.clear();

        for (column, strategy) in &self.transformation_options {
            let col = x
                .column(column)
                .map_err(|_| FeatForgeError::ColumnNotFound(column.clone()))?;
            let is_numeric =
                dataset::column_type(col.dtype()) == Some(dataset::ColumnType::Numeric);

            match (strategy, is_numeric) {
                (ImputeStrategy::Fill0, true) => {
                    self.statistics
                        .insert(column.clone(), FillValue::Number(0.0));
                }
                (ImputeStrategy::Fill0, false) => {
                    self.statistics
                        .insert(column.clone(), FillValue::Text("0".to_string()));
                }
                (ImputeStrategy::Mean, true) => {
                    let values = dataset::column_f64_dropna(x, column)?;
                    let mean = values.iter().sum::<f64>() / values.len().max(1) as f64;
                    self.statistics
                        .insert(column.clone(), FillValue::Number(mean));
                }
                (ImputeStrategy::Median, true) => {
                    let mut values = dataset::column_f64_dropna(x, column)?;
                    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                    let median = if values.is_empty() {
                        0.0
                    } else {
                        values[values.len() / 2]
                    };
                    self.statistics
                        .insert(column.clone(), FillValue::Number(median));
                }
                (ImputeStrategy::MostFrequent, true) => {
                    let values = dataset::column_f64_dropna(x, column)?;
                    let mode = Self::numeric_mode(&values);
                    self.statistics
                        .insert(column.clone(), FillValue::Number(mode));
                }
                (ImputeStrategy::MostFrequent, false) => {
                    let mode = Self::text_mode(x, column)?;
                    self.statistics.insert(column.clone(), FillValue::Text(mode));
                }
                (ImputeStrategy::Knn, true) => {
                    let state = self.fit_knn(x, column)?;
                    self.knn_state.insert(column.clone(), state);
                }
                (strategy, false) => {
                    return Err(FeatForgeError::ConfigError(format!(
                        "strategy {strategy:?} is not applicable to non-numeric column '{column}'"
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn transform(&self, x: &DataFrame) -> Result<DataFrame> {
        let mut result = x.clone();

        for (column, strategy) in &self.transformation_options {
            match strategy {
                ImputeStrategy::Knn => {
                    result = self.transform_knn(&result, column)?;
                }
                _ => match self.statistics.get(column) {
                    Some(FillValue::Number(fill)) => {
                        let values: Vec<Option<f64>> = dataset::column_f64(&result, column)?
                            .into_iter()
                            .map(|v| Some(v.unwrap_or(*fill)))
                            .collect();
                        result = with_series(&result, f64_series(column, values))?;
                    }
                    Some(FillValue::Text(fill)) => {
                        let col = result
                            .column(column)
                            .map_err(|_| FeatForgeError::ColumnNotFound(column.clone()))?;
                        let ca = col
                            .as_materialized_series()
                            .str()
                            .map_err(|e| FeatForgeError::DataError(e.to_string()))?;
                        let values: Vec<Option<String>> = ca
                            .into_iter()
                            .map(|v| Some(v.unwrap_or(fill).to_string()))
                            .collect();
                        result = with_series(&result, Series::new(column.as_str().into(), values))?;
                    }
                    None => return Err(FeatForgeError::NotFitted),
                },
            }
        }

        Ok(result)
    }

    pub fn lineage(&self) -> Lineage {
        Lineage::new()
    }

    fn numeric_mode(values: &[f64]) -> f64 {
        let mut counts: BTreeMap<i64, (usize, f64)> = BTreeMap::new();
        for &v in values {
            let key = (v * 1e9).round() as i64;
            let entry = counts.entry(key).or_insert((0, v));
            entry.0 += 1;
        }
        counts
            .into_values()
            .max_by_key(|&(count, _)| count)
            .map(|(_, v)| v)
            .unwrap_or(0.0)
    }

    fn text_mode(x: &DataFrame, column: &str) -> Result<String> {
        let col = x
            .column(column)
            .map_err(|_| FeatForgeError::ColumnNotFound(column.to_string()))?;
        let ca = col
            .as_materialized_series()
            .str()
            .map_err(|e| FeatForgeError::DataError(e.to_string()))?;

        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for value in ca.into_iter().flatten() {
            *counts.entry(value.to_string()).or_insert(0) += 1;
        }
        counts
            .into_iter()
            .max_by_key(|&(_, count)| count)
            .map(|(value, _)| value)
            .ok_or_else(|| {
                FeatForgeError::DataError(format!("column '{column}' has no non-null values"))
            })
    }

    fn fit_knn(&self, x: &DataFrame, column: &str) -> Result<KnnState> {
        let feature_columns: Vec<String> = dataset::numerical_columns(x)
            .into_iter()
            .filter(|c| c != column)
            .collect();

        let target = dataset::column_f64(x, column)?;
        let feature_data: Vec<Vec<Option<f64>>> = feature_columns
            .iter()
            .map(|c| dataset::column_f64(x, c))
            .collect::<Result<Vec<_>>>()?;

        let mut feature_rows = Vec::new();
        let mut target_values = Vec::new();

        for (row, value) in target.iter().enumerate() {
            if let Some(v) = *value {
                let features: Vec<f64> = feature_data
                    .iter()
                    .map(|col| col[row].unwrap_or(f64::NAN))
                    .collect();
                feature_rows.push(features);
                target_values.push(v);
            }
        }

        let fallback = if target_values.is_empty() {
            0.0
        } else {
            target_values.iter().sum::<f64>() / target_values.len() as f64
        };

        Ok(KnnState {
            feature_columns,
            feature_rows,
            target_values,
            fallback,
        })
    }

    fn transform_knn(&self, x: &DataFrame, column: &str) -> Result<DataFrame> {
        let state = self.knn_state.get(column).ok_or(FeatForgeError::NotFitted)?;
        let k = self.n_neighbors.get(column).copied().unwrap_or(5).max(1);

        let target = dataset::column_f64(x, column)?;
        let feature_data: Vec<Vec<Option<f64>>> = state
            .feature_columns
            .iter()
            .map(|c| dataset::column_f64(x, c))
            .collect::<Result<Vec<_>>>()?;

        let imputed: Vec<Option<f64>> = target
            .iter()
            .enumerate()
            .map(|(row, value)| {
                if value.is_some() {
                    return *value;
                }
                let sample: Vec<f64> = feature_data
                    .iter()
                    .map(|col| col[row].unwrap_or(f64::NAN))
                    .collect();
                Some(Self::knn_estimate(state, &sample, k))
            })
            .collect();

        with_series(x, f64_series(column, imputed))
    }

    /// Mean target value of the k nearest neighbor rows. Distances skip
    /// coordinates missing on either side, as in nan-aware Euclidean.
    fn knn_estimate(state: &KnnState, sample: &[f64], k: usize) -> f64 {
        let mut distances: Vec<(f64, f64)> = state
            .feature_rows
            .iter()
            .zip(state.target_values.iter())
            .filter_map(|(row, &target)| {
                let mut accum = 0.0;
                let mut count = 0usize;
                for (&a, &b) in sample.iter().zip(row.iter()) {
                    if a.is_nan() || b.is_nan() {
                        continue;
                    }
                    let d = a - b;
                    accum += d * d;
                    count += 1;
                }
                if count == 0 {
                    None
                } else {
                    Some(((accum / count as f64).sqrt(), target))
                }
            })
            .collect();

        if distances.is_empty() {
            return state.fallback;
        }

        distances.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        let k = k.min(distances.len());
        distances[..k].iter().map(|&(_, t)| t).sum::<f64>() / k as f64
    }
}
