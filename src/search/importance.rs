//! Feature importance: native when the model exposes it, permutation
//! importance otherwise

use crate::error::Result;
use crate::model::{Direction, Model, Scoring};
use ndarray::{Array1, Array2};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const N_REPEATS: usize = 5;
const SEED: u64 = 42;

/// Fit a fresh clone of the model and rank features. Uses the model's
/// native importance attribute when present, otherwise seeded permutation
/// importance: the direction-aware score drop when one column is
/// shuffled, averaged over repeats.
pub fn feature_importance(
    model: &dyn Model,
    x: &Array2<f64>,
    y: &Array1<f64>,
    scoring: Scoring,
    direction: Direction,
) -> Result<Array1<f64>> {
    let mut fitted = model.clone_unfitted();
    fitted.fit(x, y)?;

    if let Some(native) = fitted.feature_importances() {
        return Ok(native);
    }

    permutation_importance(fitted.as_ref(), x, y, scoring, direction)
}

fn permutation_importance(
    fitted: &dyn Model,
    x: &Array2<f64>,
    y: &Array1<f64>,
    scoring: Scoring,
    direction: Direction,
) -> Result<Array1<f64>> {
    let baseline = scoring
        .compute(y, &fitted.predict(x)?)
        .unwrap_or_else(|| direction.worst());

    let n_features = x.ncols();
    let mut importances = Array1::zeros(n_features);
    let mut rng = ChaCha8Rng::seed_from_u64(SEED);

    for feature in 0..n_features {
        let mut drop_sum = 0.0;

        for _ in 0..N_REPEATS {
            let mut shuffled_col: Vec<f64> = x.column(feature).iter().copied().collect();
            shuffled_col.shuffle(&mut rng);

            let mut x_shuffled = x.clone();
            for (row, &value) in shuffled_col.iter().enumerate() {
                x_shuffled[[row, feature]] = value;
            }

            let shuffled_score = scoring
                .compute(y, &fitted.predict(&x_shuffled)?)
                .unwrap_or_else(|| direction.worst());

            drop_sum += match direction {
                Direction::Maximize => baseline - shuffled_score,
                Direction::Minimize => shuffled_score - baseline,
            };
        }

        importances[feature] = drop_sum / N_REPEATS as f64;
    }

    Ok(importances)
}

/// Feature indices ordered by descending importance.
pub fn rank_by_importance(importances: &Array1<f64>) -> Vec<usize> {
    let mut order: Vec<usize> = (0..importances.len()).collect();
    order.sort_by(|&a, &b| {
        importances[b]
            .partial_cmp(&importances[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DecisionTree, LinearRegression};

    fn data() -> (Array2<f64>, Array1<f64>) {
        // Feature 0 drives the target; feature 1 is structured noise
        let n = 60;
        let mut values = Vec::with_capacity(n * 2);
        for i in 0..n {
            values.push(i as f64);
            values.push(((i * 13) % 5) as f64);
        }
        let x = Array2::from_shape_vec((n, 2), values).unwrap();
        let y: Array1<f64> = (0..n).map(|i| 2.0 * i as f64).collect();
        (x, y)
    }

    #[test]
    fn test_native_importance_path() {
        let (x, y) = data();
        let model = DecisionTree::regressor();
        let imp = feature_importance(&model, &x, &y, Scoring::R2, Direction::Maximize).unwrap();
        assert!(imp[0] > imp[1]);
    }

    #[test]
    fn test_permutation_importance_path() {
        let (x, y) = data();
        // Linear regression exposes no native importances
        let model = LinearRegression::new();
        let imp = feature_importance(&model, &x, &y, Scoring::R2, Direction::Maximize).unwrap();
        assert!(imp[0] > imp[1]);
        assert!(imp[0] > 0.0);
    }

    #[test]
    fn test_rank_by_importance() {
        let imp = Array1::from_vec(vec![0.1, 0.9, 0.5]);
        assert_eq!(rank_by_importance(&imp), vec![1, 2, 0]);
    }
}
