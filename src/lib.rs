//! FeatForge - automated feature-engineering search for tabular data
//!
//! Given a labeled dataset, a predictive model, and a scoring metric,
//! FeatForge searches a catalog of column-level transformations and
//! assembles an ordered pipeline of transformation specs that improves
//! the cross-validated score.
//!
//! # Modules
//!
//! ## Search engine
//! - [`search`] - evaluator, parameter calculators, feature selection,
//!   and the `auto_transform` orchestrator
//!
//! ## Collaborators
//! - [`transforms`] - the transformation families, their serializable
//!   specs, and column lineage tracking
//! - [`model`] - the model contract, built-in models, scoring metrics
//! - [`anomaly`] - column-level outlier detectors
//! - [`dataset`] - column typing and frame/matrix conversion helpers
//!
//! # Example
//!
//! ```no_run
//! use featforge::prelude::*;
//! use polars::prelude::*;
//!
//! let df = df!(
//!     "age" => &[25.0, 30.0, 35.0, 40.0],
//!     "income" => &[30_000.0, 45_000.0, 60_000.0, 75_000.0],
//! )
//! .unwrap();
//! let y = ndarray::Array1::from_vec(vec![0.0, 0.0, 1.0, 1.0]);
//!
//! let model = DecisionTree::classifier();
//! let pipeline = auto_transform(
//!     &df,
//!     &y,
//!     &model,
//!     Scoring::Accuracy,
//!     Direction::Maximize,
//!     None,
//!     AutoTransformOptions::default(),
//! )
//! .unwrap();
//!
//! for spec in &pipeline {
//!     println!("{}: {}", spec.name, spec.params);
//! }
//! ```

pub mod anomaly;
pub mod dataset;
pub mod error;
pub mod model;
pub mod search;
pub mod transforms;

pub use error::{FeatForgeError, Result};

/// Re-export of the commonly used types.
pub mod prelude {
    pub use crate::error::{FeatForgeError, Result};
    pub use crate::model::{
        DecisionTree, Direction, LinearRegression, LogisticRegression, Model, Scoring,
    };
    pub use crate::search::{
        auto_transform, evaluate_model, AutoTransformOptions, CvStrategy, NoopLogger,
        RecursiveFeatureAddition, SearchContext, SearchLogger, TracingLogger,
    };
    pub use crate::transforms::{Transform, TransformSpec};
}
