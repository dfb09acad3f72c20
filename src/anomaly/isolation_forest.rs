//! Isolation forest over a single column

use crate::error::{FeatForgeError, Result};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// One isolation tree. Splits are random thresholds on the value range;
/// isolation depth estimates how anomalous a value is.
#[derive(Debug, Clone, Serialize, Deserialize)]
enum IsolationTree {
    Internal {
        threshold: f64,
        left: Box<IsolationTree>,
        right: Box<IsolationTree>,
    },
    External {
        size: usize,
    },
}

impl IsolationTree {
    fn build(values: &[f64], height: usize, max_height: usize, rng: &mut ChaCha8Rng) -> Self {
        let n = values.len();
        if height >= max_height || n <= 1 {
            return IsolationTree::External { size: n };
        }

        let min_val = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max_val = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        if (max_val - min_val).abs() < 1e-12 {
            return IsolationTree::External { size: n };
        }

        let threshold = rng.gen_range(min_val..max_val);
        let (left_vals, right_vals): (Vec<f64>, Vec<f64>) =
            values.iter().partition(|&&v| v < threshold);

        if left_vals.is_empty() || right_vals.is_empty() {
            return IsolationTree::External { size: n };
        }

        IsolationTree::Internal {
            threshold,
            left: Box::new(Self::build(&left_vals, height + 1, max_height, rng)),
            right: Box::new(Self::build(&right_vals, height + 1, max_height, rng)),
        }
    }

    fn path_length(&self, value: f64, height: usize) -> f64 {
        match self {
            IsolationTree::External { size } => height as f64 + Self::c(*size),
            IsolationTree::Internal {
                threshold,
                left,
                right,
            } => {
                if value < *threshold {
                    left.path_length(value, height + 1)
                } else {
                    right.path_length(value, height + 1)
                }
            }
        }
    }

    /// Average path length of an unsuccessful BST search:
    /// c(n) = 2 H(n-1) - 2(n-1)/n
    fn c(n: usize) -> f64 {
        if n <= 1 {
            0.0
        } else if n == 2 {
            1.0
        } else {
            let n_f = n as f64;
            2.0 * ((n_f - 1.0).ln() + 0.577_215_664_9) - 2.0 * (n_f - 1.0) / n_f
        }
    }
}

/// Isolation forest anomaly detector for one numeric column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationForest {
    n_estimators: usize,
    max_samples: usize,
    contamination: f64,
    seed: u64,
    trees: Option<Vec<IsolationTree>>,
    threshold: Option<f64>,
    samples_per_tree: Option<usize>,
}

impl IsolationForest {
    pub fn new(contamination: f64) -> Self {
        Self {
            n_estimators: 100,
            max_samples: 256,
            contamination: contamination.clamp(0.0, 0.5),
            seed: 42,
            trees: None,
            threshold: None,
            samples_per_tree: None,
        }
    }

    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n.max(1);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Fit on the non-null values of a column and derive the decision
    /// threshold from the contamination ratio.
    pub fn fit(&mut self, values: &[f64]) -> Result<()> {
        if values.is_empty() {
            return Err(FeatForgeError::DataError(
                "cannot fit isolation forest on an empty column".to_string(),
            ));
        }

        let n = values.len();
        let samples_per_tree = self.max_samples.min(n);
        let max_height = (samples_per_tree as f64).log2().ceil() as usize;
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        let trees: Vec<IsolationTree> = (0..self.n_estimators)
            .map(|_| {
                let sample: Vec<f64> = (0..samples_per_tree)
                    .map(|_| values[rng.gen_range(0..n)])
                    .collect();
                IsolationTree::build(&sample, 0, max_height, &mut rng)
            })
            .collect();

        self.trees = Some(trees);
        self.samples_per_tree = Some(samples_per_tree);

        let scores = self.score_samples(values)?;
        let mut sorted: Vec<f64> = scores.clone();
        sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        let cutoff_idx = ((self.contamination * n as f64) as usize).min(n - 1);
        self.threshold = Some(sorted[cutoff_idx]);

        Ok(())
    }

    /// Anomaly score in (0, 1]; higher means more anomalous.
    pub fn score_samples(&self, values: &[f64]) -> Result<Vec<f64>> {
        let trees = self.trees.as_ref().ok_or(FeatForgeError::NotFitted)?;
        let c_n = IsolationTree::c(self.samples_per_tree.unwrap_or(256));

        Ok(values
            .iter()
            .map(|&v| {
                let avg_path: f64 = trees
                    .iter()
                    .map(|tree| tree.path_length(v, 0))
                    .sum::<f64>()
                    / trees.len() as f64;
                2.0_f64.powf(-avg_path / c_n)
            })
            .collect())
    }

    /// Outlier flags for each value (true = anomalous).
    pub fn predict(&self, values: &[f64]) -> Result<Vec<bool>> {
        let threshold = self.threshold.ok_or(FeatForgeError::NotFitted)?;
        let scores = self.score_samples(values)?;
        Ok(scores.into_iter().map(|s| s >= threshold).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_extreme_values() {
        let mut values: Vec<f64> = (0..100).map(|i| (i % 10) as f64).collect();
        values.push(500.0);
        values.push(-400.0);

        let mut forest = IsolationForest::new(0.05).with_seed(7);
        forest.fit(&values).unwrap();

        let scores = forest.score_samples(&values).unwrap();
        assert!(scores[100] > scores[0]);
        assert!(scores[101] > scores[0]);

        let flags = forest.predict(&values).unwrap();
        assert!(flags[100]);
        assert!(flags[101]);
    }

    #[test]
    fn test_deterministic_under_seed() {
        let values: Vec<f64> = (0..60).map(|i| (i as f64).sin() * 3.0).collect();

        let mut a = IsolationForest::new(0.1).with_seed(11);
        let mut b = IsolationForest::new(0.1).with_seed(11);
        a.fit(&values).unwrap();
        b.fit(&values).unwrap();

        assert_eq!(
            a.score_samples(&values).unwrap(),
            b.score_samples(&values).unwrap()
        );
    }
}
