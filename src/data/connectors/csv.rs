use super::{types::DatasetMetadata, types::PriceColumn, validator::DataValidator};
use crate::data::frame;
use crate::error::{EventlabError, Result};
use polars::prelude::*;
use std::path::Path;

pub struct CsvConnector;

impl CsvConnector {
    /// Load CSV file into DataFrame, parsing date-like columns
    pub fn load<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .map_parse_options(|opts| opts.with_try_parse_dates(true))
            .try_into_reader_with_file_path(Some(path.as_ref().to_path_buf()))?
            .finish()
            .map_err(|e| EventlabError::DataLoading(format!("Failed to read CSV: {}", e)))?;

        Ok(df)
    }

    /// Load, validate and normalize a price table
    pub fn load_and_validate<P: AsRef<Path>>(path: P, min_rows: Option<usize>) -> Result<DataFrame> {
        let df = Self::load(&path)?;

        DataValidator::validate_minimum_rows(&df, min_rows.unwrap_or(2))?;

        // Warn about nulls but don't fail
        let null_report = DataValidator::check_nulls(&df);
        if !null_report.is_empty() {
            log::warn!("Null values detected: {:?}", null_report);
        }

        Self::normalize_columns(df)
    }

    /// Create metadata for a loaded, normalized DataFrame
    pub fn create_metadata<P: AsRef<Path>>(path: P, df: &DataFrame) -> Result<DatasetMetadata> {
        let columns: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();

        let close = df.column(PriceColumn::Close.as_str())?.cast(&DataType::Float64)?;
        let close = close.f64()?;
        let price_range = (close.min().unwrap_or(0.0), close.max().unwrap_or(0.0));

        let stamps = frame::timestamps(df.column(PriceColumn::Timestamp.as_str())?)?;
        let date_range = stamps.first().copied().zip(stamps.last().copied());

        Ok(DatasetMetadata {
            file_path: path.as_ref().to_string_lossy().to_string(),
            num_rows: df.height(),
            columns,
            date_range,
            price_range,
            has_volume: df.column(PriceColumn::Volume.as_str()).is_ok(),
        })
    }

    /// Rename recognised columns to their standard lowercase names
    pub fn normalize_columns(mut df: DataFrame) -> Result<DataFrame> {
        let column_map = DataValidator::validate_prices(&df)?;

        for (column, actual_name) in column_map {
            let standard_name = column.as_str();
            if actual_name != standard_name {
                df.rename(&actual_name, standard_name.into()).map_err(|e| {
                    EventlabError::DataLoading(format!("Failed to rename column: {}", e))
                })?;
            }
        }

        Ok(df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;
    use std::io::Write;

    #[test]
    fn test_normalize_columns() {
        let df = df! {
            "Date" => &[1_i64, 2],
            "Close" => &[100.5, 102.0],
            "Vol" => &[1000.0, 1500.0],
        }
        .unwrap();

        let df = CsvConnector::normalize_columns(df).unwrap();
        let cols = df.get_column_names();
        assert!(cols.iter().any(|c| c.as_str() == "timestamp"));
        assert!(cols.iter().any(|c| c.as_str() == "close"));
        assert!(cols.iter().any(|c| c.as_str() == "volume"));
    }

    #[test]
    fn test_load_parses_dates() {
        let path = std::env::temp_dir().join(format!("eventlab_csv_{}.csv", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "Date,Close").unwrap();
        writeln!(file, "2021-01-04 00:00:00,100.0").unwrap();
        writeln!(file, "2021-01-05 00:00:00,101.5").unwrap();
        writeln!(file, "2021-01-06 00:00:00,99.0").unwrap();
        drop(file);

        let df = CsvConnector::load_and_validate(&path, None).unwrap();
        let meta = CsvConnector::create_metadata(&path, &df).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(meta.num_rows, 3);
        assert_eq!(meta.price_range, (99.0, 101.5));
        assert!(!meta.has_volume);
        let (first, last) = meta.date_range.unwrap();
        assert_eq!((last - first).num_days(), 2);
    }
}
