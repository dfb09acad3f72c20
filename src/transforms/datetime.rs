//! Datetime component expansion

use crate::error::{FeatForgeError, Result};
use crate::transforms::{f64_series, with_series, Lineage};
use chrono::{DateTime, Datelike, Timelike, Utc};
use ndarray::Array1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateTimeParams {
    pub features: Vec<String>,
}

const COMPONENTS: [&str; 7] = [
    "year", "month", "day", "weekday", "hour", "minute", "second",
];

/// Expands each datetime column into `{column}_year` … `{column}_second`
/// numeric components and drops the original column.
#[derive(Debug, Clone)]
pub struct DateTimeTransformer {
    features: Vec<String>,
}

impl DateTimeTransformer {
    pub fn new(params: DateTimeParams) -> Self {
        Self {
            features: params.features,
        }
    }

    pub fn params(&self) -> DateTimeParams {
        DateTimeParams {
            features: self.features.clone(),
        }
    }

    pub fn fit(&mut self, _x: &DataFrame, _y: Option<&Array1<f64>>) -> Result<()> {
        Ok(())
    }

    pub fn transform(&self, x: &DataFrame) -> Result<DataFrame> {
        let mut result = x.clone();

        for column in &self.features {
            let millis = Self::epoch_millis(&result, column)?;

            let mut components: Vec<Vec<Option<f64>>> = vec![Vec::new(); COMPONENTS.len()];
            for value in &millis {
                match value.and_then(DateTime::<Utc>::from_timestamp_millis) {
                    Some(dt) => {
                        let dt = dt.naive_utc();
                        components[0].push(Some(dt.year() as f64));
                        components[1].push(Some(dt.month() as f64));
                        components[2].push(Some(dt.day() as f64));
                        components[3].push(Some(dt.weekday().num_days_from_monday() as f64));
                        components[4].push(Some(dt.hour() as f64));
                        components[5].push(Some(dt.minute() as f64));
                        components[6].push(Some(dt.second() as f64));
                    }
                    None => {
                        for part in components.iter_mut() {
                            part.push(None);
                        }
                    }
                }
            }

            for (component, values) in COMPONENTS.iter().zip(components) {
                let name = format!("{column}_{component}");
                result = with_series(&result, f64_series(&name, values))?;
            }

            result = result
                .drop(column)
                .map_err(|e| FeatForgeError::DataError(e.to_string()))?;
        }

        Ok(result)
    }

    pub fn lineage(&self) -> Lineage {
        self.features
            .iter()
            .flat_map(|column| {
                COMPONENTS.iter().map(move |component| {
                    (
                        format!("{column}_{component}"),
                        BTreeSet::from([column.clone()]),
                    )
                })
            })
            .collect()
    }

    /// Millisecond epoch values of a datetime/date column, whatever its
    /// underlying time unit.
    fn epoch_millis(df: &DataFrame, column: &str) -> Result<Vec<Option<i64>>> {
        let col = df
            .column(column)
            .map_err(|_| FeatForgeError::ColumnNotFound(column.to_string()))?;

        let factor = match col.dtype() {
            DataType::Datetime(TimeUnit::Milliseconds, _) => 1,
            DataType::Datetime(TimeUnit::Microseconds, _) => 1_000,
            DataType::Datetime(TimeUnit::Nanoseconds, _) => 1_000_000,
            DataType::Date => 86_400_000,
            other => {
                return Err(FeatForgeError::DataError(format!(
                    "column '{column}' is not a datetime column: {other:?}"
                )))
            }
        };
        let divide = matches!(
            col.dtype(),
            DataType::Datetime(TimeUnit::Microseconds, _)
                | DataType::Datetime(TimeUnit::Nanoseconds, _)
        );

        let casted = col
            .cast(&DataType::Int64)
            .map_err(|e| FeatForgeError::DataError(e.to_string()))?;
        let values: Vec<Option<i64>> = casted
            .i64()
            .map_err(|e| FeatForgeError::DataError(e.to_string()))?
            .into_iter()
            .map(|v| {
                v.map(|v| if divide { v / factor } else { v * factor })
            })
            .collect();

        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datetime_df() -> DataFrame {
        // 2021-03-15T10:30:45 and 2022-12-01T00:00:00 (UTC), as ms epochs
        let millis: Vec<i64> = vec![1_615_804_245_000, 1_669_852_800_000];
        let s = Series::new("ts".into(), millis)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .unwrap();
        DataFrame::new(vec![s.into()]).unwrap()
    }

    #[test]
    fn test_component_extraction() {
        let mut transformer = DateTimeTransformer::new(DateTimeParams {
            features: vec!["ts".to_string()],
        });
        transformer.fit(&datetime_df(), None).unwrap();
        let out = transformer.transform(&datetime_df()).unwrap();

        assert!(out.column("ts").is_err(), "original column is dropped");

        let year = out.column("ts_year").unwrap().as_materialized_series().f64().unwrap().clone();
        assert_eq!(year.get(0), Some(2021.0));
        assert_eq!(year.get(1), Some(2022.0));

        let month = out.column("ts_month").unwrap().as_materialized_series().f64().unwrap().clone();
        assert_eq!(month.get(0), Some(3.0));

        let hour = out.column("ts_hour").unwrap().as_materialized_series().f64().unwrap().clone();
        assert_eq!(hour.get(0), Some(10.0));
    }

    #[test]
    fn test_lineage_links_components_to_source() {
        let transformer = DateTimeTransformer::new(DateTimeParams {
            features: vec!["ts".to_string()],
        });
        let lineage = transformer.lineage();
        assert_eq!(lineage.len(), 7);
        assert!(lineage["ts_weekday"].contains("ts"));
    }
}
