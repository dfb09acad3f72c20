//! Categorical encoding

use crate::error::{FeatForgeError, Result};
use crate::transforms::{f64_series, with_series, Lineage};
use ndarray::Array1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodingMethod {
    /// Ordinal index of the category (unseen → -1), in place.
    Label,
    /// One-hot columns `{col}_{category}`, first category dropped.
    Dummy,
    /// Training-set frequency of the category, in place.
    Count,
    /// Smoothed mean target per category, in place. Needs a target.
    Target,
    /// Unsmoothed mean target per category, in place. Needs a target.
    Loo,
    /// Binary digits of the category index, columns `{col}_bin_{i}`.
    Binary,
    /// Hashed one-hot buckets, columns `{col}_hash_{i}`.
    Hashing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodingParams {
    pub transformation_options: BTreeMap<String, EncodingMethod>,
}

const UNKNOWN: &str = "Unknown";
const HASH_BUCKETS: usize = 8;
const TARGET_SMOOTHING: f64 = 1.0;

#[derive(Debug, Clone)]
enum FittedEncoding {
    Label(BTreeMap<String, f64>),
    Dummy(Vec<String>),
    Count(BTreeMap<String, f64>),
    Mean {
        by_category: BTreeMap<String, f64>,
        global: f64,
    },
    Binary {
        index: BTreeMap<String, usize>,
        n_digits: usize,
    },
    Hashing,
}

/// Turns categorical columns into numeric features. Nulls are treated as
/// the literal category "Unknown" on both fit and transform. Target-based
/// encodings are skipped silently when no target is supplied; the column
/// then passes through untouched.
#[derive(Debug, Clone)]
pub struct CategoricalEncoding {
    transformation_options: BTreeMap<String, EncodingMethod>,
    fitted: BTreeMap<String, FittedEncoding>,
}

impl CategoricalEncoding {
    pub fn new(params: EncodingParams) -> Self {
        Self {
            transformation_options: params.transformation_options,
            fitted: BTreeMap::new(),
        }
    }

    pub fn params(&self) -> EncodingParams {
        EncodingParams {
            transformation_options: self.transformation_options.clone(),
        }
    }

    fn string_values(df: &DataFrame, column: &str) -> Result<Vec<String>> {
        let col = df
            .column(column)
            .map_err(|_| FeatForgeError::ColumnNotFound(column.to_string()))?;
        let casted = col
            .cast(&DataType::String)
            .map_err(|e| FeatForgeError::DataError(e.to_string()))?;
        let values: Vec<String> = casted
            .str()
            .map_err(|e| FeatForgeError::DataError(e.to_string()))?
            .into_iter()
            .map(|v| v.unwrap_or(UNKNOWN).to_string())
            .collect();
        Ok(values)
    }

    fn fnv1a(value: &str) -> u64 {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in value.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
        hash
    }

    pub fn fit(&mut self, x: &DataFrame, y: Option<&Array1<f64>>) -> Result<()> {
        self.fitted.clear();

        for (column, method) in &self.transformation_options {
            let values = Self::string_values(x, column)?;
            let mut categories: Vec<String> = values.iter().cloned().collect();
            categories.sort();
            categories.dedup();

            let fitted = match method {
                EncodingMethod::Label => {
                    let mapping: BTreeMap<String, f64> = categories
                        .iter()
                        .enumerate()
                        .map(|(i, c)| (c.clone(), i as f64))
                        .collect();
                    FittedEncoding::Label(mapping)
                }
                EncodingMethod::Dummy => {
                    // First category is the reference level
                    FittedEncoding::Dummy(categories.iter().skip(1).cloned().collect())
                }
                EncodingMethod::Count => {
                    let mut counts: BTreeMap<String, f64> = BTreeMap::new();
                    for value in &values {
                        *counts.entry(value.clone()).or_insert(0.0) += 1.0;
                    }
                    FittedEncoding::Count(counts)
                }
                EncodingMethod::Target | EncodingMethod::Loo => {
                    let Some(y) = y else {
                        // No target available; legitimate no-op for this column
                        continue;
                    };
                    if y.len() != values.len() {
                        return Err(FeatForgeError::ShapeError {
                            expected: format!("{} targets", values.len()),
                            actual: format!("{} targets", y.len()),
                        });
                    }

                    let mut sums: BTreeMap<String, (f64, f64)> = BTreeMap::new();
                    for (value, &target) in values.iter().zip(y.iter()) {
                        let entry = sums.entry(value.clone()).or_insert((0.0, 0.0));
                        entry.0 += target;
                        entry.1 += 1.0;
                    }
                    let global = y.sum() / y.len().max(1) as f64;

                    let by_category: BTreeMap<String, f64> = sums
                        .into_iter()
                        .map(|(category, (sum, count))| {
                            let mean = if *method == EncodingMethod::Target {
                                (sum + TARGET_SMOOTHING * global) / (count + TARGET_SMOOTHING)
                            } else {
                                sum / count
                            };
                            (category, mean)
                        })
                        .collect();

                    FittedEncoding::Mean {
                        by_category,
                        global,
                    }
                }
                EncodingMethod::Binary => {
                    // Index 0 is reserved for unseen categories
                    let index: BTreeMap<String, usize> = categories
                        .iter()
                        .enumerate()
                        .map(|(i, c)| (c.clone(), i + 1))
                        .collect();
                    let n_digits = (usize::BITS - categories.len().leading_zeros()) as usize;
                    FittedEncoding::Binary { index, n_digits }
                }
                EncodingMethod::Hashing => FittedEncoding::Hashing,
            };

            self.fitted.insert(column.clone(), fitted);
        }

        Ok(())
    }

    pub fn transform(&self, x: &DataFrame) -> Result<DataFrame> {
        let mut result = x.clone();

        for column in self.transformation_options.keys() {
            let Some(fitted) = self.fitted.get(column) else {
                continue; // target encoding fitted without a target
            };
            let values = Self::string_values(&result, column)?;

            match fitted {
                FittedEncoding::Label(mapping) => {
                    let encoded: Vec<Option<f64>> = values
                        .iter()
                        .map(|v| Some(mapping.get(v).copied().unwrap_or(-1.0)))
                        .collect();
                    result = with_series(&result, f64_series(column, encoded))?;
                }
                FittedEncoding::Count(counts) => {
                    let encoded: Vec<Option<f64>> = values
                        .iter()
                        .map(|v| Some(counts.get(v).copied().unwrap_or(0.0)))
                        .collect();
                    result = with_series(&result, f64_series(column, encoded))?;
                }
                FittedEncoding::Mean {
                    by_category,
                    global,
                } => {
                    let encoded: Vec<Option<f64>> = values
                        .iter()
                        .map(|v| Some(by_category.get(v).copied().unwrap_or(*global)))
                        .collect();
                    result = with_series(&result, f64_series(column, encoded))?;
                }
                FittedEncoding::Dummy(categories) => {
                    for category in categories {
                        let flags: Vec<Option<f64>> = values
                            .iter()
                            .map(|v| Some(if v == category { 1.0 } else { 0.0 }))
                            .collect();
                        let name = format!("{column}_{category}");
                        result = with_series(&result, f64_series(&name, flags))?;
                    }
                    result = result
                        .drop(column)
                        .map_err(|e| FeatForgeError::DataError(e.to_string()))?;
                }
                FittedEncoding::Binary { index, n_digits } => {
                    for digit in 0..*n_digits {
                        let bits: Vec<Option<f64>> = values
                            .iter()
                            .map(|v| {
                                let idx = index.get(v).copied().unwrap_or(0);
                                Some(((idx >> digit) & 1) as f64)
                            })
                            .collect();
                        let name = format!("{column}_bin_{digit}");
                        result = with_series(&result, f64_series(&name, bits))?;
                    }
                    result = result
                        .drop(column)
                        .map_err(|e| FeatForgeError::DataError(e.to_string()))?;
                }
                FittedEncoding::Hashing => {
                    for bucket in 0..HASH_BUCKETS {
                        let flags: Vec<Option<f64>> = values
                            .iter()
                            .map(|v| {
                                let hashed = Self::fnv1a(v) as usize % HASH_BUCKETS;
                                Some(if hashed == bucket { 1.0 } else { 0.0 })
                            })
                            .collect();
                        let name = format!("{column}_hash_{bucket}");
                        result = with_series(&result, f64_series(&name, flags))?;
                    }
                    result = result
                        .drop(column)
                        .map_err(|e| FeatForgeError::DataError(e.to_string()))?;
                }
            }
        }

        Ok(result)
    }

    pub fn lineage(&self) -> Lineage {
        let mut lineage = Lineage::new();

        for (column, fitted) in &self.fitted {
            let source = BTreeSet::from([column.clone()]);
            match fitted {
                FittedEncoding::Dummy(categories) => {
                    for category in categories {
                        lineage.insert(format!("{column}_{category}"), source.clone());
                    }
                }
                FittedEncoding::Binary { n_digits, .. } => {
                    for digit in 0..*n_digits {
                        lineage.insert(format!("{column}_bin_{digit}"), source.clone());
                    }
                }
                FittedEncoding::Hashing => {
                    for bucket in 0..HASH_BUCKETS {
                        lineage.insert(format!("{column}_hash_{bucket}"), source.clone());
                    }
                }
                _ => {}
            }
        }

        lineage
    }
}
