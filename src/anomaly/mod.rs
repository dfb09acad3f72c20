//! Column-level anomaly detection
//!
//! The outlier-handling transformation fits a detector on a single column
//! and derives clip/replace bounds from the rows the detector keeps.
//! Distribution-based rules (IQR, z-score) live directly in the outlier
//! transformer; the model-based detectors live here.

mod isolation_forest;
mod lof;

pub use isolation_forest::IsolationForest;
pub use lof::LocalOutlierFactor;
