//! CART decision tree with native feature importances

use crate::error::{FeatForgeError, Result};
use crate::model::Model;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Prediction task the tree is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TreeTask {
    Classification,
    Regression,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// Binary decision tree. Classification splits minimize Gini impurity,
/// regression splits minimize variance. Impurity decrease accumulates
/// into per-feature importances during fitting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    task: TreeTask,
    max_depth: usize,
    min_samples_split: usize,
    root: Option<Node>,
    importances: Option<Array1<f64>>,
}

impl DecisionTree {
    pub fn classifier() -> Self {
        Self::new(TreeTask::Classification)
    }

    pub fn regressor() -> Self {
        Self::new(TreeTask::Regression)
    }

    fn new(task: TreeTask) -> Self {
        Self {
            task,
            max_depth: 6,
            min_samples_split: 2,
            root: None,
            importances: None,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth.max(1);
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    fn impurity(&self, targets: &[f64]) -> f64 {
        let n = targets.len() as f64;
        if n == 0.0 {
            return 0.0;
        }
        match self.task {
            TreeTask::Regression => {
                let mean = targets.iter().sum::<f64>() / n;
                targets.iter().map(|t| (t - mean).powi(2)).sum::<f64>() / n
            }
            TreeTask::Classification => {
                let mut counts: std::collections::BTreeMap<i64, usize> = Default::default();
                for &t in targets {
                    *counts.entry(t.round() as i64).or_insert(0) += 1;
                }
                1.0 - counts
                    .values()
                    .map(|&c| (c as f64 / n).powi(2))
                    .sum::<f64>()
            }
        }
    }

    fn leaf_value(&self, targets: &[f64]) -> f64 {
        let n = targets.len() as f64;
        match self.task {
            TreeTask::Regression => targets.iter().sum::<f64>() / n.max(1.0),
            TreeTask::Classification => {
                let mut counts: std::collections::BTreeMap<i64, usize> = Default::default();
                for &t in targets {
                    *counts.entry(t.round() as i64).or_insert(0) += 1;
                }
                counts
                    .into_iter()
                    .max_by_key(|&(_, c)| c)
                    .map(|(class, _)| class as f64)
                    .unwrap_or(0.0)
            }
        }
    }

    fn best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        rows: &[usize],
    ) -> Option<(usize, f64, f64)> {
        let parent_targets: Vec<f64> = rows.iter().map(|&i| y[i]).collect();
        let parent_impurity = self.impurity(&parent_targets);
        let n = rows.len() as f64;

        let mut best: Option<(usize, f64, f64)> = None;

        for feature in 0..x.ncols() {
            let mut values: Vec<f64> = rows.iter().map(|&i| x[[i, feature]]).collect();
            values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            values.dedup();
            if values.len() < 2 {
                continue;
            }

            for pair in values.windows(2) {
                let threshold = (pair[0] + pair[1]) / 2.0;
                let (left, right): (Vec<f64>, Vec<f64>) = rows
                    .iter()
                    .map(|&i| (x[[i, feature]], y[i]))
                    .partition_map(threshold);
                if left.is_empty() || right.is_empty() {
                    continue;
                }

                let child_impurity = (left.len() as f64 * self.impurity(&left)
                    + right.len() as f64 * self.impurity(&right))
                    / n;
                let gain = parent_impurity - child_impurity;

                if gain > best.map_or(1e-12, |(_, _, g)| g) {
                    best = Some((feature, threshold, gain));
                }
            }
        }

        best
    }

    fn build(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        rows: &[usize],
        depth: usize,
        importances: &mut [f64],
    ) -> Node {
        let targets: Vec<f64> = rows.iter().map(|&i| y[i]).collect();

        if depth >= self.max_depth
            || rows.len() < self.min_samples_split
            || self.impurity(&targets) <= 1e-12
        {
            return Node::Leaf {
                value: self.leaf_value(&targets),
            };
        }

        match self.best_split(x, y, rows) {
            Some((feature, threshold, gain)) => {
                importances[feature] += rows.len() as f64 * gain;

                let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
                    .iter()
                    .partition(|&&i| x[[i, feature]] <= threshold);

                Node::Split {
                    feature,
                    threshold,
                    left: Box::new(self.build(x, y, &left_rows, depth + 1, importances)),
                    right: Box::new(self.build(x, y, &right_rows, depth + 1, importances)),
                }
            }
            None => Node::Leaf {
                value: self.leaf_value(&targets),
            },
        }
    }

    fn predict_one(&self, node: &Node, row: &[f64]) -> f64 {
        match node {
            Node::Leaf { value } => *value,
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if row[*feature] <= *threshold {
                    self.predict_one(left, row)
                } else {
                    self.predict_one(right, row)
                }
            }
        }
    }
}

trait PartitionMap {
    fn partition_map(self, threshold: f64) -> (Vec<f64>, Vec<f64>);
}

impl<I: Iterator<Item = (f64, f64)>> PartitionMap for I {
    fn partition_map(self, threshold: f64) -> (Vec<f64>, Vec<f64>) {
        let mut left = Vec::new();
        let mut right = Vec::new();
        for (value, target) in self {
            if value <= threshold {
                left.push(target);
            } else {
                right.push(target);
            }
        }
        (left, right)
    }
}

impl Model for DecisionTree {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(FeatForgeError::ShapeError {
                expected: format!("{} targets", x.nrows()),
                actual: format!("{} targets", y.len()),
            });
        }
        if x.nrows() == 0 {
            return Err(FeatForgeError::DataError(
                "cannot fit on an empty matrix".to_string(),
            ));
        }

        let rows: Vec<usize> = (0..x.nrows()).collect();
        let mut importances = vec![0.0; x.ncols()];
        self.root = Some(self.build(x, y, &rows, 0, &mut importances));

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.importances = Some(Array1::from_vec(importances));
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(FeatForgeError::NotFitted)?;
        let preds: Vec<f64> = x
            .rows()
            .into_iter()
            .map(|row| {
                let values: Vec<f64> = row.iter().copied().collect();
                self.predict_one(root, &values)
            })
            .collect();
        Ok(Array1::from_vec(preds))
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        self.importances.clone()
    }

    fn clone_unfitted(&self) -> Box<dyn Model> {
        Box::new(Self {
            task: self.task,
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            root: None,
            importances: None,
        })
    }
}
