//! Column selection

use crate::error::{FeatForgeError, Result};
use crate::transforms::Lineage;
use ndarray::Array1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSelectionParams {
    pub features: Vec<String>,
}

/// Restricts the frame to the listed columns, in the listed order.
#[derive(Debug, Clone)]
pub struct ColumnSelection {
    features: Vec<String>,
}

impl ColumnSelection {
    pub fn new(params: ColumnSelectionParams) -> Self {
        Self {
            features: params.features,
        }
    }

    pub fn params(&self) -> ColumnSelectionParams {
        ColumnSelectionParams {
            features: self.features.clone(),
        }
    }

    pub fn fit(&mut self, _x: &DataFrame, _y: Option<&Array1<f64>>) -> Result<()> {
        Ok(())
    }

    pub fn transform(&self, x: &DataFrame) -> Result<DataFrame> {
        x.select(self.features.iter().map(|s| s.as_str()))
            .map_err(|_| {
                let missing = self
                    .features
                    .iter()
                    .find(|f| x.column(f).is_err())
                    .cloned()
                    .unwrap_or_default();
                FeatForgeError::ColumnNotFound(missing)
            })
    }

    pub fn lineage(&self) -> Lineage {
        Lineage::new()
    }
}
