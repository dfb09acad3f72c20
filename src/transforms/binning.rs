//! Numerical binning

use crate::dataset;
use crate::error::{FeatForgeError, Result};
use crate::transforms::{f64_series, with_series, Lineage};
use ndarray::Array1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinningStrategy {
    /// Equal-width bins over the training value range.
    Uniform,
    /// Equal-frequency bins from training quantiles.
    Quantile,
}

impl BinningStrategy {
    fn tag(&self) -> &'static str {
        match self {
            BinningStrategy::Uniform => "uniform",
            BinningStrategy::Quantile => "quantile",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinningParams {
    pub transformation_options: BTreeMap<String, (BinningStrategy, usize)>,
}

/// Adds an ordinal-encoded binned copy of each configured column as
/// `{column}__{strategy}_{n_bins}`, keeping the original. Nulls are
/// treated as 0 before binning, matching the downstream constant-fill.
#[derive(Debug, Clone)]
pub struct NumericalBinning {
    transformation_options: BTreeMap<String, (BinningStrategy, usize)>,
    edges: BTreeMap<String, Vec<f64>>,
}

impl NumericalBinning {
    pub fn new(params: BinningParams) -> Self {
        Self {
            transformation_options: params.transformation_options,
            edges: BTreeMap::new(),
        }
    }

    pub fn params(&self) -> BinningParams {
        BinningParams {
            transformation_options: self.transformation_options.clone(),
        }
    }

    fn output_name(column: &str, strategy: BinningStrategy, n_bins: usize) -> String {
        format!("{column}__{}_{n_bins}", strategy.tag())
    }

    pub fn fit(&mut self, x: &DataFrame, _y: Option<&Array1<f64>>) -> Result<()> {
        self.edges.clear();

        for (column, (strategy, n_bins)) in &self.transformation_options {
            if *n_bins < 2 {
                return Err(FeatForgeError::ConfigError(format!(
                    "binning '{column}' needs at least 2 bins"
                )));
            }

            let mut values: Vec<f64> = dataset::column_f64(x, column)?
                .into_iter()
                .map(|v| v.unwrap_or(0.0))
                .collect();
            if values.is_empty() {
                return Err(FeatForgeError::DataError(format!(
                    "column '{column}' is empty"
                )));
            }
            values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

            // Interior edges only; the outer bins are open-ended.
            let edges: Vec<f64> = match strategy {
                BinningStrategy::Uniform => {
                    let min = values[0];
                    let max = values[values.len() - 1];
                    let width = (max - min) / *n_bins as f64;
                    (1..*n_bins).map(|i| min + width * i as f64).collect()
                }
                BinningStrategy::Quantile => (1..*n_bins)
                    .map(|i| {
                        let pos =
                            i as f64 / *n_bins as f64 * (values.len() - 1) as f64;
                        values[pos.round() as usize]
                    })
                    .collect(),
            };

            self.edges.insert(column.clone(), edges);
        }

        Ok(())
    }

    pub fn transform(&self, x: &DataFrame) -> Result<DataFrame> {
        let mut result = x.clone();

        for (column, (strategy, n_bins)) in &self.transformation_options {
            let edges = self.edges.get(column).ok_or(FeatForgeError::NotFitted)?;
            let binned: Vec<Option<f64>> = dataset::column_f64(&result, column)?
                .into_iter()
                .map(|v| {
                    let v = v.unwrap_or(0.0);
                    Some(edges.partition_point(|&e| e <= v) as f64)
                })
                .collect();

            let name = Self::output_name(column, *strategy, *n_bins);
            result = with_series(&result, f64_series(&name, binned))?;
        }

        Ok(result)
    }

    pub fn lineage(&self) -> Lineage {
        self.transformation_options
            .iter()
            .map(|(column, (strategy, n_bins))| {
                (
                    Self::output_name(column, *strategy, *n_bins),
                    BTreeSet::from([column.clone()]),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_binning_splits_range() {
        let df = DataFrame::new(vec![
            Series::new("a".into(), (0..30).map(|i| i as f64).collect::<Vec<_>>()).into(),
        ])
        .unwrap();

        let mut binning = NumericalBinning::new(BinningParams {
            transformation_options: BTreeMap::from([(
                "a".to_string(),
                (BinningStrategy::Uniform, 3usize),
            )]),
        });
        binning.fit(&df, None).unwrap();
        let out = binning.transform(&df).unwrap();

        let ca = out
            .column("a__uniform_3")
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .clone();
        assert_eq!(ca.get(0), Some(0.0));
        assert_eq!(ca.get(15), Some(1.0));
        assert_eq!(ca.get(29), Some(2.0));

        // Original column is preserved
        assert!(out.column("a").is_ok());
    }

    #[test]
    fn test_quantile_binning_balances_counts() {
        let values: Vec<f64> = (0..100).map(|i| (i as f64).powi(3)).collect();
        let df = DataFrame::new(vec![Series::new("a".into(), values).into()]).unwrap();

        let mut binning = NumericalBinning::new(BinningParams {
            transformation_options: BTreeMap::from([(
                "a".to_string(),
                (BinningStrategy::Quantile, 4usize),
            )]),
        });
        binning.fit(&df, None).unwrap();
        let out = binning.transform(&df).unwrap();

        let ca = out
            .column("a__quantile_4")
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .clone();
        let mut counts = [0usize; 4];
        for v in ca.into_iter().flatten() {
            counts[v as usize] += 1;
        }
        for count in counts {
            assert!(count >= 20, "bins should be roughly balanced: {counts:?}");
        }
    }

    #[test]
    fn test_lineage_names_output() {
        let binning = NumericalBinning::new(BinningParams {
            transformation_options: BTreeMap::from([(
                "a".to_string(),
                (BinningStrategy::Uniform, 8usize),
            )]),
        });
        let lineage = binning.lineage();
        assert!(lineage["a__uniform_8"].contains("a"));
    }
}
