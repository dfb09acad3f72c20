//! Scoring metrics and comparison direction

use crate::error::{FeatForgeError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Whether higher or lower scores are better for the configured metric.
///
/// Threaded explicitly through every comparison in the engine; no score is
/// ever sign-flipped implicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Maximize,
    Minimize,
}

impl Direction {
    /// Sentinel seeding the "no candidate yet" state.
    pub fn worst(&self) -> f64 {
        match self {
            Direction::Maximize => f64::NEG_INFINITY,
            Direction::Minimize => f64::INFINITY,
        }
    }

    /// Strict direction-aware improvement check.
    pub fn improved(&self, score: f64, best: f64) -> bool {
        match self {
            Direction::Maximize => score > best,
            Direction::Minimize => score < best,
        }
    }

    /// Improvement check where either side may be a missing score.
    /// A present score always beats a missing one; two missing scores
    /// never improve on each other.
    pub fn improved_opt(&self, score: Option<f64>, best: Option<f64>) -> bool {
        match (score, best) {
            (Some(s), Some(b)) => self.improved(s, b),
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = FeatForgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "maximize" => Ok(Direction::Maximize),
            "minimize" => Ok(Direction::Minimize),
            other => Err(FeatForgeError::ConfigError(format!(
                "unknown direction: {other}"
            ))),
        }
    }
}

/// Scoring metric computed on per-fold predictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scoring {
    Accuracy,
    F1,
    R2,
    NegMeanSquaredError,
    NegRootMeanSquaredError,
    NegMeanAbsoluteError,
}

impl Scoring {
    /// Resolve a scoring identifier. Unknown names are a caller
    /// configuration error and abort the search immediately.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "accuracy" => Ok(Scoring::Accuracy),
            "f1" => Ok(Scoring::F1),
            "r2" => Ok(Scoring::R2),
            "neg_mean_squared_error" => Ok(Scoring::NegMeanSquaredError),
            "neg_root_mean_squared_error" => Ok(Scoring::NegRootMeanSquaredError),
            "neg_mean_absolute_error" => Ok(Scoring::NegMeanAbsoluteError),
            other => Err(FeatForgeError::UnknownScoring(other.to_string())),
        }
    }

    /// The direction under which this metric is conventionally optimized.
    /// Callers may still override it.
    pub fn default_direction(&self) -> Direction {
        Direction::Maximize
    }

    /// Compute the metric. `None` when the fold is degenerate (empty).
    pub fn compute(&self, y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Option<f64> {
        let n = y_true.len();
        if n == 0 || n != y_pred.len() {
            return None;
        }
        let n_f = n as f64;

        match self {
            Scoring::Accuracy => {
                let correct = y_true
                    .iter()
                    .zip(y_pred.iter())
                    .filter(|(t, p)| (**t - **p).abs() < 0.5)
                    .count();
                Some(correct as f64 / n_f)
            }
            Scoring::F1 => {
                let mut tp = 0usize;
                let mut fp = 0usize;
                let mut fn_ = 0usize;
                for (t, p) in y_true.iter().zip(y_pred.iter()) {
                    match (*t > 0.5, *p > 0.5) {
                        (true, true) => tp += 1,
                        (false, true) => fp += 1,
                        (true, false) => fn_ += 1,
                        (false, false) => {}
                    }
                }
                let denom = 2 * tp + fp + fn_;
                if denom == 0 {
                    Some(0.0)
                } else {
                    Some(2.0 * tp as f64 / denom as f64)
                }
            }
            Scoring::R2 => {
                let y_mean = y_true.sum() / n_f;
                let ss_tot: f64 = y_true.iter().map(|y| (y - y_mean).powi(2)).sum();
                let ss_res: f64 = y_true
                    .iter()
                    .zip(y_pred.iter())
                    .map(|(t, p)| (t - p).powi(2))
                    .sum();
                if ss_tot <= 0.0 {
                    Some(0.0)
                } else {
                    Some(1.0 - ss_res / ss_tot)
                }
            }
            Scoring::NegMeanSquaredError => {
                let mse: f64 = y_true
                    .iter()
                    .zip(y_pred.iter())
                    .map(|(t, p)| (t - p).powi(2))
                    .sum::<f64>()
                    / n_f;
                Some(-mse)
            }
            Scoring::NegRootMeanSquaredError => {
                let mse: f64 = y_true
                    .iter()
                    .zip(y_pred.iter())
                    .map(|(t, p)| (t - p).powi(2))
                    .sum::<f64>()
                    / n_f;
                Some(-mse.sqrt())
            }
            Scoring::NegMeanAbsoluteError => {
                let mae: f64 = y_true
                    .iter()
                    .zip(y_pred.iter())
                    .map(|(t, p)| (t - p).abs())
                    .sum::<f64>()
                    / n_f;
                Some(-mae)
            }
        }
    }
}
