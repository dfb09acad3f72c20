//! Dataset helpers: column typing, casting, and matrix extraction
//!
//! The search engine works on polars DataFrames and hands ndarray matrices
//! to the model layer. Everything here is read-only with respect to the
//! input frame: helpers return new frames or arrays.

use crate::error::{FeatForgeError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;

/// Column data type as seen by the search engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ColumnType {
    Numeric,
    Categorical,
    DateTime,
    Boolean,
}

/// Classify a polars dtype into the engine's column taxonomy.
pub fn column_type(dtype: &DataType) -> Option<ColumnType> {
    match dtype {
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64
        | DataType::Float32
        | DataType::Float64 => Some(ColumnType::Numeric),
        DataType::String | DataType::Categorical(_, _) => Some(ColumnType::Categorical),
        DataType::Datetime(_, _) | DataType::Date => Some(ColumnType::DateTime),
        DataType::Boolean => Some(ColumnType::Boolean),
        _ => None,
    }
}

fn columns_of_type(df: &DataFrame, wanted: ColumnType) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|col| column_type(col.dtype()) == Some(wanted))
        .map(|col| col.name().to_string())
        .collect()
}

/// Names of numeric columns, in frame order. Booleans are not numeric here;
/// they enter the numeric path only after an explicit cast.
pub fn numerical_columns(df: &DataFrame) -> Vec<String> {
    columns_of_type(df, ColumnType::Numeric)
}

/// Names of categorical (string) columns, in frame order.
pub fn categorical_columns(df: &DataFrame) -> Vec<String> {
    columns_of_type(df, ColumnType::Categorical)
}

/// Names of datetime columns, in frame order.
pub fn datetime_columns(df: &DataFrame) -> Vec<String> {
    columns_of_type(df, ColumnType::DateTime)
}

/// Names of boolean columns, in frame order.
pub fn boolean_columns(df: &DataFrame) -> Vec<String> {
    columns_of_type(df, ColumnType::Boolean)
}

/// Cast every integer/float32/boolean column to Float64 for uniform
/// numeric processing. String and datetime columns pass through.
pub fn cast_numeric_to_f64(df: &DataFrame) -> Result<DataFrame> {
    let mut result = df.clone();
    for col in df.get_columns() {
        match col.dtype() {
            DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Boolean => {
                let casted = col
                    .cast(&DataType::Float64)
                    .map_err(|e| FeatForgeError::DataError(e.to_string()))?;
                result = result
                    .with_column(casted)
                    .map_err(|e| FeatForgeError::DataError(e.to_string()))?
                    .clone();
            }
            _ => {}
        }
    }
    Ok(result)
}

/// Extract a single column as `Vec<Option<f64>>`, casting if needed.
pub fn column_f64(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df
        .column(name)
        .map_err(|_| FeatForgeError::ColumnNotFound(name.to_string()))?;
    let casted = column
        .cast(&DataType::Float64)
        .map_err(|e| FeatForgeError::DataError(e.to_string()))?;
    let values: Vec<Option<f64>> = casted
        .f64()
        .map_err(|e| FeatForgeError::DataError(e.to_string()))?
        .into_iter()
        .collect();
    Ok(values)
}

/// Non-null values of a column as a plain Vec.
pub fn column_f64_dropna(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    Ok(column_f64(df, name)?.into_iter().flatten().collect())
}

/// Extract named columns into a row-major `Array2<f64>`, filling nulls
/// with 0.0. Columns are cast to Float64 on the way out.
pub fn columns_to_array2(df: &DataFrame, col_names: &[String]) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let n_cols = col_names.len();

    let col_data: Vec<Vec<f64>> = col_names
        .iter()
        .map(|col_name| {
            let values: Vec<f64> = column_f64(df, col_name)?
                .into_iter()
                .map(|v| v.unwrap_or(0.0))
                .collect();
            Ok(values)
        })
        .collect::<Result<Vec<Vec<f64>>>>()?;

    let col_refs: Vec<&[f64]> = col_data.iter().map(|c| c.as_slice()).collect();
    Ok(Array2::from_shape_fn((n_rows, n_cols), |(r, c)| {
        col_refs[c][r]
    }))
}

/// Row subset of a DataFrame by positional indices. Supports the column
/// types the engine produces (Float64, String, Boolean, Datetime/Date,
/// integers); anything else is an error rather than a silent drop.
pub fn take_rows(df: &DataFrame, indices: &[usize]) -> Result<DataFrame> {
    let mut columns: Vec<Column> = Vec::with_capacity(df.width());

    for col in df.get_columns() {
        let series = col.as_materialized_series();
        let name = col.name().clone();

        let taken: Series = match col.dtype() {
            DataType::Float64 => {
                let ca = series
                    .f64()
                    .map_err(|e| FeatForgeError::DataError(e.to_string()))?;
                let values: Vec<Option<f64>> = indices.iter().map(|&i| ca.get(i)).collect();
                Series::new(name, values)
            }
            DataType::String => {
                let ca = series
                    .str()
                    .map_err(|e| FeatForgeError::DataError(e.to_string()))?;
                let values: Vec<Option<String>> = indices
                    .iter()
                    .map(|&i| ca.get(i).map(|s| s.to_string()))
                    .collect();
                Series::new(name, values)
            }
            DataType::Boolean => {
                let ca = series
                    .bool()
                    .map_err(|e| FeatForgeError::DataError(e.to_string()))?;
                let values: Vec<Option<bool>> = indices.iter().map(|&i| ca.get(i)).collect();
                Series::new(name, values)
            }
            DataType::Datetime(_, _) | DataType::Date | DataType::Int64 | DataType::Int32 => {
                let casted = series
                    .cast(&DataType::Int64)
                    .map_err(|e| FeatForgeError::DataError(e.to_string()))?;
                let ca = casted
                    .i64()
                    .map_err(|e| FeatForgeError::DataError(e.to_string()))?;
                let values: Vec<Option<i64>> = indices.iter().map(|&i| ca.get(i)).collect();
                let s = Series::new(name, values);
                // Restore the original logical type
                s.cast(col.dtype())
                    .map_err(|e| FeatForgeError::DataError(e.to_string()))?
            }
            other => {
                return Err(FeatForgeError::DataError(format!(
                    "unsupported dtype in row subset: {other:?}"
                )))
            }
        };

        columns.push(taken.into());
    }

    DataFrame::new(columns).map_err(|e| FeatForgeError::DataError(e.to_string()))
}

/// Row subset of a target array.
pub fn take_target(y: &Array1<f64>, indices: &[usize]) -> Array1<f64> {
    Array1::from_iter(indices.iter().map(|&i| y[i]))
}

/// Sample skewness of the non-null values of a column (Fisher-Pearson,
/// the moment-based estimator). Returns 0.0 for degenerate columns.
pub fn skewness(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if n < 3.0 {
        return 0.0;
    }

    let mean = values.iter().sum::<f64>() / n;
    let m2 = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let m3 = values.iter().map(|v| (v - mean).powi(3)).sum::<f64>() / n;

    if m2 <= 1e-12 {
        return 0.0;
    }

    m3 / m2.powf(1.5)
}

/// Number of distinct non-null values of a column.
pub fn n_unique(df: &DataFrame, name: &str) -> Result<usize> {
    let column = df
        .column(name)
        .map_err(|_| FeatForgeError::ColumnNotFound(name.to_string()))?;
    let series = column.as_materialized_series();
    let unique = series
        .n_unique()
        .map_err(|e| FeatForgeError::DataError(e.to_string()))?;
    // n_unique counts the null bucket; the engine cares about values only
    if series.null_count() > 0 {
        Ok(unique.saturating_sub(1))
    } else {
        Ok(unique)
    }
}
