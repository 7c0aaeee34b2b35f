use super::types::PriceColumn;
use crate::error::{EventlabError, Result};
use polars::prelude::*;
use std::collections::HashMap;

pub struct DataValidator;

impl DataValidator {
    /// Resolve the price-table columns: timestamp and close are required,
    /// volume columns are picked up when present
    pub fn validate_prices(df: &DataFrame) -> Result<HashMap<PriceColumn, String>> {
        let mut column_map = HashMap::new();

        for required in PriceColumn::required() {
            match Self::find_column(df, &required) {
                Some(col_name) => {
                    column_map.insert(required, col_name.to_string());
                }
                None => {
                    return Err(EventlabError::DataLoading(format!(
                        "Missing required column: {} (tried aliases: {:?})",
                        required.as_str(),
                        required.aliases()
                    )));
                }
            }
        }
        for optional in PriceColumn::optional() {
            if let Some(col_name) = Self::find_column(df, &optional) {
                column_map.insert(optional, col_name.to_string());
            }
        }

        for (col, actual_name) in &column_map {
            let dtype = df.column(actual_name)?.dtype().clone();
            let valid = match col {
                PriceColumn::Timestamp => matches!(
                    dtype,
                    DataType::Datetime(_, _)
                        | DataType::Date
                        | DataType::String
                        | DataType::Int64
                        | DataType::UInt64
                ),
                _ => matches!(
                    dtype,
                    DataType::Float64
                        | DataType::Float32
                        | DataType::Int64
                        | DataType::Int32
                        | DataType::UInt64
                        | DataType::UInt32
                ),
            };
            if !valid {
                return Err(EventlabError::DataLoading(format!(
                    "Column '{}' ({}) has unsupported type {:?}",
                    actual_name,
                    col.as_str(),
                    dtype
                )));
            }
        }

        Self::validate_close(df, &column_map[&PriceColumn::Close])?;

        Ok(column_map)
    }

    /// Find column by checking aliases
    fn find_column(df: &DataFrame, column: &PriceColumn) -> Option<&'static str> {
        let columns = df.get_column_names();
        column
            .aliases()
            .into_iter()
            .find(|alias| columns.iter().any(|col| col.as_str() == *alias))
    }

    /// Prices must be positive where present
    fn validate_close(df: &DataFrame, close_col: &str) -> Result<()> {
        let close = df.column(close_col)?.cast(&DataType::Float64)?;
        let close = close.f64()?;

        for (i, value) in close.into_iter().enumerate() {
            if let Some(c) = value {
                if !(c.is_finite() && c > 0.0) {
                    return Err(EventlabError::DataLoading(format!(
                        "Invalid price at row {}: {}",
                        i, c
                    )));
                }
            }
        }
        Ok(())
    }

    /// Check for minimum required rows
    pub fn validate_minimum_rows(df: &DataFrame, min_rows: usize) -> Result<()> {
        if df.height() < min_rows {
            return Err(EventlabError::DataLoading(format!(
                "Insufficient data: {} rows, minimum {} required",
                df.height(),
                min_rows
            )));
        }
        Ok(())
    }

    /// Null counts per column, for columns that have any
    pub fn check_nulls(df: &DataFrame) -> Vec<(String, usize)> {
        df.get_columns()
            .iter()
            .filter(|c| c.null_count() > 0)
            .map(|c| (c.name().to_string(), c.null_count()))
            .collect()
    }
}
