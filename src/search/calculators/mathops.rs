//! Mathematical-operations calculator: probe-then-refine search over
//! pairwise arithmetic features

use crate::dataset;
use crate::error::Result;
use crate::search::calculators::ParamCalculator;
use crate::search::{ProbeFeatureSelector, RecursiveFeatureAddition, SearchContext};
use crate::transforms::{
    MathOperator, MathOpsParams, MathematicalOperations, Transform, TransformSpec,
};
use ndarray::Array1;
use polars::prelude::*;
use std::collections::BTreeSet;

type Operation = (String, String, MathOperator);

/// For every column pair and operator, synthesize the derived column,
/// batch-filter with a single probe feature-selection pass per seed
/// column, then refine the survivors with the expensive RFA.
#[derive(Debug, Clone, Copy, Default)]
pub struct MathematicalOperationsParamCalculator;

impl MathematicalOperationsParamCalculator {
    const OPERATORS: [MathOperator; 4] = [
        MathOperator::Add,
        MathOperator::Subtract,
        MathOperator::Multiply,
        MathOperator::Divide,
    ];

    /// All operations seeded at `first_idx`: symmetric operators pair it
    /// with later columns only, `divide` with every other column.
    fn operations_for_column(columns: &[String], first_idx: usize) -> Vec<Operation> {
        let mut operations = Vec::new();
        for op in Self::OPERATORS {
            for (second_idx, second) in columns.iter().enumerate() {
                if op.is_symmetric() {
                    if first_idx >= second_idx {
                        continue;
                    }
                } else if first_idx == second_idx {
                    continue;
                }
                operations.push((columns[first_idx].clone(), second.clone(), op));
            }
        }
        operations
    }

    /// Operations whose derived column survived a selection pass.
    fn surviving(operations: &[Operation], selected: &BTreeSet<String>) -> Vec<Operation> {
        operations
            .iter()
            .filter(|(a, b, op)| selected.contains(&MathematicalOperations::output_name(a, b, *op)))
            .cloned()
            .collect()
    }
}

impl ParamCalculator for MathematicalOperationsParamCalculator {
    fn calculate_best_params(
        &self,
        x: &DataFrame,
        y: &Array1<f64>,
        ctx: &SearchContext,
    ) -> Result<Option<TransformSpec>> {
        let columns = dataset::numerical_columns(x);
        let total = columns.len();

        ctx.logger
            .task_start("Starting mathematical transformations search");

        let mut all_operations: Vec<Operation> = Vec::new();
        let mut probe_survivors: BTreeSet<String> = BTreeSet::new();

        for first_idx in 0..columns.len() {
            ctx.logger.task_update(&format!(
                "[{}/{total}] Evaluating column: '{}'",
                first_idx + 1,
                columns[first_idx]
            ));

            let operations = Self::operations_for_column(&columns, first_idx);
            if operations.is_empty() {
                continue;
            }

            let mut batch = Transform::MathematicalOperations(MathematicalOperations::new(
                MathOpsParams {
                    operations_options: operations.clone(),
                },
            ));
            let expanded = batch.fit_transform(x, Some(y))?;

            let selected = ProbeFeatureSelector::fit(&expanded, y, ctx)?;
            ctx.logger.progress(&format!(
                "   Tried {} operations -> Selected: {}",
                operations.len(),
                selected.len()
            ));

            probe_survivors.extend(selected);
            all_operations.extend(operations);
        }

        let mut selected_operations = Self::surviving(&all_operations, &probe_survivors);

        // The probe pass is generous; let RFA make the expensive final cut.
        if !selected_operations.is_empty() {
            ctx.logger.task_update("Refining selected operations using RFA");

            let mut refined = Transform::MathematicalOperations(MathematicalOperations::new(
                MathOpsParams {
                    operations_options: selected_operations.clone(),
                },
            ));
            let expanded = refined.fit_transform(x, Some(y))?;

            let kept: BTreeSet<String> = RecursiveFeatureAddition::new()
                .fit(&expanded, y, ctx)?
                .into_iter()
                .collect();
            selected_operations = Self::surviving(&all_operations, &kept);
        }

        if selected_operations.is_empty() {
            ctx.logger
                .warn("No mathematical transformations was applied to any column");
            return Ok(None);
        }

        ctx.logger.task_result(&format!(
            "Selected {} mathematical transformation(s)",
            selected_operations.len()
        ));
        let transform = Transform::MathematicalOperations(MathematicalOperations::new(
            MathOpsParams {
                operations_options: selected_operations,
            },
        ));
        Ok(Some(transform.spec()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DecisionTree, Direction, Scoring};
    use crate::search::NoopLogger;

    #[test]
    fn test_finds_multiplicative_interaction() {
        // y = a*b with a, b individually uninformative
        let n = 80;
        let a: Vec<f64> = (0..n).map(|i| ((i * 7) % 13) as f64 - 6.0).collect();
        let b: Vec<f64> = (0..n).map(|i| ((i * 11) % 17) as f64 - 8.0).collect();
        let y: Array1<f64> = a.iter().zip(b.iter()).map(|(x, z)| x * z).collect();

        let df = DataFrame::new(vec![
            Series::new("a".into(), a).into(),
            Series::new("b".into(), b).into(),
        ])
        .unwrap();

        let model = DecisionTree::regressor().with_max_depth(4);
        let logger = NoopLogger;
        let ctx = SearchContext::new(&model, Scoring::R2, Direction::Maximize, &logger);

        let spec = MathematicalOperationsParamCalculator
            .calculate_best_params(&df, &y, &ctx)
            .unwrap()
            .expect("a*b interaction should be discovered");

        let rebuilt = Transform::from_spec(&spec).unwrap();
        match rebuilt {
            Transform::MathematicalOperations(m) => {
                let ops = m.params().operations_options;
                assert!(ops.contains(&(
                    "a".to_string(),
                    "b".to_string(),
                    MathOperator::Multiply
                )));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_symmetric_pairs_enumerated_once() {
        let columns = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let ops = MathematicalOperationsParamCalculator::operations_for_column(&columns, 0);

        let multiplies: Vec<_> = ops
            .iter()
            .filter(|(_, _, op)| *op == MathOperator::Multiply)
            .collect();
        assert_eq!(multiplies.len(), 2); // (a,b) and (a,c), never (b,a)

        let divides: Vec<_> = ops
            .iter()
            .filter(|(_, _, op)| *op == MathOperator::Divide)
            .collect();
        assert_eq!(divides.len(), 2); // a/b and a/c; b/a comes from seed b
    }
}
