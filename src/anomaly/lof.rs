//! Local Outlier Factor over a single column

use crate::error::{FeatForgeError, Result};
use serde::{Deserialize, Serialize};

/// Local Outlier Factor for one numeric column.
///
/// Scores follow the sklearn convention: `negative_outlier_factor` is
/// -LOF, so values much below -1 indicate low local density (outliers).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalOutlierFactor {
    n_neighbors: usize,
    scores: Option<Vec<f64>>,
}

impl LocalOutlierFactor {
    pub fn new(n_neighbors: usize) -> Self {
        Self {
            n_neighbors: n_neighbors.max(1),
            scores: None,
        }
    }

    /// Fit on the non-null values of a column, computing the negative
    /// outlier factor of every training value.
    pub fn fit(&mut self, values: &[f64]) -> Result<()> {
        let n = values.len();
        if n < 2 {
            return Err(FeatForgeError::DataError(
                "LOF requires at least two values".to_string(),
            ));
        }
        let k = self.n_neighbors.min(n - 1);

        // Sorted order makes nearest neighbors of a scalar a contiguous window.
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| {
            values[a]
                .partial_cmp(&values[b])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let sorted: Vec<f64> = order.iter().map(|&i| values[i]).collect();

        // k nearest neighbors (by sorted position) and k-distance per point
        let neighbors: Vec<Vec<usize>> = (0..n).map(|i| Self::knn_window(&sorted, i, k)).collect();
        let k_distance: Vec<f64> = (0..n)
            .map(|i| {
                neighbors[i]
                    .iter()
                    .map(|&j| (sorted[i] - sorted[j]).abs())
                    .fold(0.0f64, f64::max)
            })
            .collect();

        // Local reachability density
        let lrd: Vec<f64> = (0..n)
            .map(|i| {
                let reach_sum: f64 = neighbors[i]
                    .iter()
                    .map(|&j| (sorted[i] - sorted[j]).abs().max(k_distance[j]))
                    .sum();
                if reach_sum <= 1e-12 {
                    1e12
                } else {
                    neighbors[i].len() as f64 / reach_sum
                }
            })
            .collect();

        // LOF = mean neighbor lrd / own lrd; stored negated in input order
        let mut scores = vec![0.0; n];
        for i in 0..n {
            let neighbor_lrd: f64 =
                neighbors[i].iter().map(|&j| lrd[j]).sum::<f64>() / neighbors[i].len() as f64;
            let lof = if lrd[i] <= 1e-12 {
                1e12
            } else {
                neighbor_lrd / lrd[i]
            };
            scores[order[i]] = -lof;
        }

        self.scores = Some(scores);
        Ok(())
    }

    /// Negative outlier factor of each training value, in input order.
    pub fn negative_outlier_factor(&self) -> Result<&[f64]> {
        self.scores.as_deref().ok_or(FeatForgeError::NotFitted)
    }

    /// Indices of the k nearest sorted positions to position `i`.
    fn knn_window(sorted: &[f64], i: usize, k: usize) -> Vec<usize> {
        let n = sorted.len();
        let mut left = i;
        let mut right = i;
        let mut picked = Vec::with_capacity(k);

        while picked.len() < k {
            let take_left = if left == 0 {
                false
            } else if right + 1 >= n {
                true
            } else {
                (sorted[i] - sorted[left - 1]).abs() <= (sorted[right + 1] - sorted[i]).abs()
            };

            if take_left {
                left -= 1;
                picked.push(left);
            } else {
                right += 1;
                picked.push(right);
            }
        }

        picked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isolated_value_scores_low() {
        let mut values: Vec<f64> = (0..50).map(|i| i as f64 * 0.1).collect();
        values.push(100.0);

        let mut lof = LocalOutlierFactor::new(5);
        lof.fit(&values).unwrap();
        let scores = lof.negative_outlier_factor().unwrap();

        // The isolated point has much lower (more negative) score
        assert!(scores[50] < scores[0]);
        assert!(scores[50] < -1.5);
    }

    #[test]
    fn test_uniform_data_near_minus_one() {
        let values: Vec<f64> = (0..100).map(|i| i as f64).collect();

        let mut lof = LocalOutlierFactor::new(5);
        lof.fit(&values).unwrap();
        let scores = lof.negative_outlier_factor().unwrap();

        for &s in &scores[10..90] {
            assert!((s + 1.0).abs() < 0.5, "interior score {s} should be near -1");
        }
    }
}
