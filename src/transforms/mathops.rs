//! Pairwise arithmetic feature synthesis

use crate::dataset;
use crate::error::Result;
use crate::transforms::{f64_series, with_series, Lineage};
use ndarray::Array1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MathOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl MathOperator {
    pub fn tag(&self) -> &'static str {
        match self {
            MathOperator::Add => "add",
            MathOperator::Subtract => "subtract",
            MathOperator::Multiply => "multiply",
            MathOperator::Divide => "divide",
        }
    }

    /// Operators searched in one direction only; `divide` is the only one
    /// tried both ways.
    pub fn is_symmetric(&self) -> bool {
        !matches!(self, MathOperator::Divide)
    }

    fn apply(&self, a: f64, b: f64) -> Option<f64> {
        match self {
            MathOperator::Add => Some(a + b),
            MathOperator::Subtract => Some(a - b),
            MathOperator::Multiply => Some(a * b),
            MathOperator::Divide => {
                if b.abs() < 1e-12 {
                    None
                } else {
                    Some(a / b)
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MathOpsParams {
    pub operations_options: Vec<(String, String, MathOperator)>,
}

/// Synthesizes `{a}__{op}__{b}` columns from column pairs. Stateless;
/// the originals are kept.
#[derive(Debug, Clone)]
pub struct MathematicalOperations {
    operations_options: Vec<(String, String, MathOperator)>,
}

impl MathematicalOperations {
    pub fn new(params: MathOpsParams) -> Self {
        Self {
            operations_options: params.operations_options,
        }
    }

    pub fn params(&self) -> MathOpsParams {
        MathOpsParams {
            operations_options: self.operations_options.clone(),
        }
    }

    /// Name of the column an operation produces.
    pub fn output_name(a: &str, b: &str, op: MathOperator) -> String {
        format!("{a}__{}__{b}", op.tag())
    }

    pub fn fit(&mut self, _x: &DataFrame, _y: Option<&Array1<f64>>) -> Result<()> {
        Ok(())
    }

    pub fn transform(&self, x: &DataFrame) -> Result<DataFrame> {
        let mut result = x.clone();

        for (a, b, op) in &self.operations_options {
            let left = dataset::column_f64(&result, a)?;
            let right = dataset::column_f64(&result, b)?;

            let values: Vec<Option<f64>> = left
                .into_iter()
                .zip(right)
                .map(|(l, r)| match (l, r) {
                    (Some(l), Some(r)) => op.apply(l, r),
                    _ => None,
                })
                .collect();

            let name = Self::output_name(a, b, *op);
            result = with_series(&result, f64_series(&name, values))?;
        }

        Ok(result)
    }

    pub fn lineage(&self) -> Lineage {
        self.operations_options
            .iter()
            .map(|(a, b, op)| {
                (
                    Self::output_name(a, b, *op),
                    BTreeSet::from([a.clone(), b.clone()]),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn df() -> DataFrame {
        DataFrame::new(vec![
            Series::new("a".into(), &[1.0, 2.0, 3.0]).into(),
            Series::new("b".into(), &[4.0, 0.0, 6.0]).into(),
        ])
        .unwrap()
    }

    #[test]
    fn test_multiply() {
        let mut ops = MathematicalOperations::new(MathOpsParams {
            operations_options: vec![("a".to_string(), "b".to_string(), MathOperator::Multiply)],
        });
        ops.fit(&df(), None).unwrap();
        let out = ops.transform(&df()).unwrap();

        let ca = out
            .column("a__multiply__b")
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .clone();
        assert_eq!(ca.get(0), Some(4.0));
        assert_eq!(ca.get(2), Some(18.0));
    }

    #[test]
    fn test_divide_by_zero_is_null() {
        let mut ops = MathematicalOperations::new(MathOpsParams {
            operations_options: vec![("a".to_string(), "b".to_string(), MathOperator::Divide)],
        });
        ops.fit(&df(), None).unwrap();
        let out = ops.transform(&df()).unwrap();

        let ca = out
            .column("a__divide__b")
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .clone();
        assert_eq!(ca.get(1), None);
        assert_eq!(ca.get(2), Some(0.5));
    }

    #[test]
    fn test_lineage_names_both_sources() {
        let ops = MathematicalOperations::new(MathOpsParams {
            operations_options: vec![("a".to_string(), "b".to_string(), MathOperator::Add)],
        });
        let lineage = ops.lineage();
        let sources = &lineage["a__add__b"];
        assert!(sources.contains("a") && sources.contains("b"));
    }
}
