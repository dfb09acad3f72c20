//! Cross-validation splitters

use crate::error::{FeatForgeError, Result};
use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cross-validation strategy. The search default is 5-fold shuffled
/// k-fold with a fixed seed; group-aware splitting keeps all rows of a
/// group in the same fold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CvStrategy {
    KFold { n_splits: usize, shuffle: bool },
    GroupKFold { n_splits: usize },
}

impl Default for CvStrategy {
    fn default() -> Self {
        CvStrategy::KFold {
            n_splits: 5,
            shuffle: true,
        }
    }
}

/// One train/test split.
#[derive(Debug, Clone)]
pub struct CvSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
}

/// Deterministic splitter over row indices.
#[derive(Debug, Clone)]
pub struct CrossValidator {
    strategy: CvStrategy,
    seed: u64,
}

impl CrossValidator {
    pub fn new(strategy: CvStrategy) -> Self {
        Self { strategy, seed: 42 }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn split(
        &self,
        n_samples: usize,
        groups: Option<&Array1<i64>>,
    ) -> Result<Vec<CvSplit>> {
        match self.strategy {
            CvStrategy::KFold { n_splits, shuffle } => {
                self.k_fold(n_samples, n_splits, shuffle)
            }
            CvStrategy::GroupKFold { n_splits } => {
                let groups = groups.ok_or_else(|| {
                    FeatForgeError::ConfigError(
                        "GroupKFold requires group labels".to_string(),
                    )
                })?;
                self.group_k_fold(n_samples, groups, n_splits)
            }
        }
    }

    fn k_fold(&self, n_samples: usize, n_splits: usize, shuffle: bool) -> Result<Vec<CvSplit>> {
        if n_splits < 2 {
            return Err(FeatForgeError::ConfigError(
                "n_splits must be at least 2".to_string(),
            ));
        }
        if n_samples < n_splits {
            return Err(FeatForgeError::ConfigError(format!(
                "n_samples ({n_samples}) must be >= n_splits ({n_splits})"
            )));
        }

        let mut indices: Vec<usize> = (0..n_samples).collect();
        if shuffle {
            let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
            indices.shuffle(&mut rng);
        }

        let mut splits = Vec::with_capacity(n_splits);
        let mut start = 0;
        for fold in 0..n_splits {
            let base = n_samples / n_splits;
            let size = if fold < n_samples % n_splits {
                base + 1
            } else {
                base
            };

            let test_indices: Vec<usize> = indices[start..start + size].to_vec();
            let train_indices: Vec<usize> = indices[..start]
                .iter()
                .chain(indices[start + size..].iter())
                .copied()
                .collect();

            splits.push(CvSplit {
                train_indices,
                test_indices,
            });
            start += size;
        }

        Ok(splits)
    }

    fn group_k_fold(
        &self,
        n_samples: usize,
        groups: &Array1<i64>,
        n_splits: usize,
    ) -> Result<Vec<CvSplit>> {
        if groups.len() != n_samples {
            return Err(FeatForgeError::ShapeError {
                expected: format!("{n_samples} group labels"),
                actual: format!("{} group labels", groups.len()),
            });
        }

        let mut unique: Vec<i64> = groups.iter().copied().collect();
        unique.sort_unstable();
        unique.dedup();

        if unique.len() < n_splits {
            return Err(FeatForgeError::ConfigError(format!(
                "number of groups ({}) must be >= n_splits ({n_splits})",
                unique.len()
            )));
        }

        let group_to_fold: BTreeMap<i64, usize> = unique
            .iter()
            .enumerate()
            .map(|(i, &g)| (g, i % n_splits))
            .collect();

        let splits = (0..n_splits)
            .map(|fold| {
                let (test_indices, train_indices): (Vec<usize>, Vec<usize>) = (0..n_samples)
                    .partition(|&i| group_to_fold[&groups[i]] == fold);
                CvSplit {
                    train_indices,
                    test_indices,
                }
            })
            .collect();

        Ok(splits)
    }
}
