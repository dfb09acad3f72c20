//! Model contract and built-in models
//!
//! The search engine treats the predictive model as a collaborator: any
//! type implementing [`Model`] can drive the search. The crate ships a
//! decision tree (native feature importances) and linear/logistic
//! regression (importances via permutation) so the engine is usable and
//! testable out of the box.

mod decision_tree;
mod linear;
pub mod metrics;

pub use decision_tree::{DecisionTree, TreeTask};
pub use linear::{LinearRegression, LogisticRegression};
pub use metrics::{Direction, Scoring};

use crate::error::Result;
use ndarray::{Array1, Array2};

/// Contract every predictive model must satisfy.
///
/// The evaluator clones the caller's template once per fold via
/// [`Model::clone_unfitted`]; the template itself is never fitted.
pub trait Model: Send + Sync {
    /// Fit the model to training data.
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Predict targets (or class labels) for new data.
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Native feature importances, if the model exposes them.
    fn feature_importances(&self) -> Option<Array1<f64>> {
        None
    }

    /// Fresh, unfitted copy of this model with identical hyperparameters.
    fn clone_unfitted(&self) -> Box<dyn Model>;
}
