//! The automated transformation search engine
//!
//! Composition, leaf to root: the [`evaluator`] turns a candidate
//! transformer into a cross-validated score; the per-family
//! [`calculators`] search their parameter spaces through that score; the
//! [`rfa`] selector and [`probe`] filter pick feature subsets; and the
//! [`auto`] orchestrator runs the calculators in dependency order,
//! tracks column lineage, and prunes the result.

pub mod auto;
pub mod calculators;
pub mod cross_validation;
pub mod evaluator;
pub mod importance;
pub mod logger;
pub mod probe;
pub mod rfa;

pub use auto::{auto_transform, AutoTransformOptions};
pub use cross_validation::{CrossValidator, CvSplit, CvStrategy};
pub use evaluator::evaluate_model;
pub use logger::{NoopLogger, SearchLogger, TracingLogger};
pub use probe::ProbeFeatureSelector;
pub use rfa::RecursiveFeatureAddition;

use crate::model::{Direction, Model, Scoring};
use ndarray::Array1;

/// Everything a calculator needs to score candidates: the model template,
/// the metric and its direction, the CV strategy, optional group labels,
/// and a progress sink. Borrowed for the duration of one search.
pub struct SearchContext<'a> {
    pub model: &'a dyn Model,
    pub scoring: Scoring,
    pub direction: Direction,
    pub cv: CvStrategy,
    pub groups: Option<&'a Array1<i64>>,
    pub logger: &'a dyn SearchLogger,
}

impl<'a> SearchContext<'a> {
    pub fn new(
        model: &'a dyn Model,
        scoring: Scoring,
        direction: Direction,
        logger: &'a dyn SearchLogger,
    ) -> Self {
        Self {
            model,
            scoring,
            direction,
            cv: CvStrategy::default(),
            groups: None,
            logger,
        }
    }

    pub fn with_cv(mut self, cv: CvStrategy) -> Self {
        self.cv = cv;
        self
    }

    pub fn with_groups(mut self, groups: &'a Array1<i64>) -> Self {
        self.groups = Some(groups);
        self
    }
}
