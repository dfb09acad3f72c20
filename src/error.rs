//! Crate-wide error types

use thiserror::Error;

/// Errors produced by the feature-engineering search and its collaborators.
#[derive(Error, Debug)]
pub enum FeatForgeError {
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Unknown transformer: {0}")]
    UnknownTransformer(String),

    #[error("Unknown scoring metric: {0}")]
    UnknownScoring(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Transformer has not been fitted")]
    NotFitted,

    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FeatForgeError>;
