//! Conversions between polars tables and the typed core values

use super::connectors::{DataValidator, PriceColumn};
use crate::error::{EventlabError, Result};
use crate::ml::importance::ImportanceTable;
use crate::types::{Bars, Label, TimeSeries, Timestamp};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use polars::prelude::*;

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"];

/// Build [`Bars`] from a price table. Integer timestamps are read as epoch
/// milliseconds; null prices become NaN.
pub fn bars_from_frame(df: &DataFrame) -> Result<Bars> {
    let column_map = DataValidator::validate_prices(df)?;

    let index = timestamps(df.column(&column_map[&PriceColumn::Timestamp])?)?;
    let close = floats(df.column(&column_map[&PriceColumn::Close])?)?;
    let optional = |column: PriceColumn| -> Result<Option<Vec<f64>>> {
        column_map
            .get(&column)
            .map(|name| -> Result<Vec<f64>> { floats(df.column(name)?) })
            .transpose()
    };

    let bars = Bars {
        close: TimeSeries::new(index, close)?,
        volume: optional(PriceColumn::Volume)?,
        buy_volume: optional(PriceColumn::BuyVolume)?,
        dollar_volume: optional(PriceColumn::DollarVolume)?,
    };
    log::debug!("Loaded {} bars", bars.len());
    Ok(bars)
}

fn floats(column: &Column) -> Result<Vec<f64>> {
    let cast = column.cast(&DataType::Float64)?;
    Ok(cast.f64()?.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

pub(crate) fn timestamps(column: &Column) -> Result<Vec<Timestamp>> {
    let missing = |row: usize| {
        EventlabError::DataLoading(format!(
            "Missing or invalid timestamp in column '{}' at row {}",
            column.name(),
            row
        ))
    };

    if column.dtype() == &DataType::String {
        return column
            .str()?
            .into_iter()
            .enumerate()
            .map(|(row, value)| value.and_then(parse_timestamp).ok_or_else(|| missing(row)))
            .collect();
    }

    let (raw, unit) = match column.dtype() {
        DataType::Datetime(unit, _) => (column.cast(&DataType::Int64)?, *unit),
        DataType::Date => (
            column
                .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
                .cast(&DataType::Int64)?,
            TimeUnit::Milliseconds,
        ),
        DataType::Int64 | DataType::UInt64 => {
            (column.cast(&DataType::Int64)?, TimeUnit::Milliseconds)
        }
        other => {
            return Err(EventlabError::DataLoading(format!(
                "Column '{}' of type {:?} cannot hold timestamps",
                column.name(),
                other
            )))
        }
    };

    raw.i64()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            let value = value.ok_or_else(|| missing(row))?;
            match unit {
                TimeUnit::Nanoseconds => Some(DateTime::from_timestamp_nanos(value)),
                TimeUnit::Microseconds => DateTime::from_timestamp_micros(value),
                TimeUnit::Milliseconds => DateTime::from_timestamp_millis(value),
            }
            .ok_or_else(|| missing(row))
        })
        .collect()
}

fn parse_timestamp(value: &str) -> Option<Timestamp> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

fn datetime_column(name: &str, values: Vec<Option<i64>>) -> Result<Column> {
    let series = Series::new(name.into(), values)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;
    Ok(series.into_column())
}

/// Label table with columns `t0, t1, ret, bin, trgt, side`
pub fn labels_to_frame(labels: &[Label]) -> Result<DataFrame> {
    let t0 = labels.iter().map(|l| Some(l.t0.timestamp_millis())).collect();
    let t1 = labels.iter().map(|l| Some(l.t1.timestamp_millis())).collect();
    let ret: Vec<f64> = labels.iter().map(|l| l.ret).collect();
    let bin: Vec<i32> = labels.iter().map(|l| l.bin as i32).collect();
    let trgt: Vec<f64> = labels.iter().map(|l| l.trgt).collect();
    let side: Vec<Option<i32>> = labels
        .iter()
        .map(|l| l.side.map(|s| s.sign() as i32))
        .collect();

    Ok(DataFrame::new(vec![
        datetime_column("t0", t0)?,
        datetime_column("t1", t1)?,
        Series::new("ret".into(), ret).into_column(),
        Series::new("bin".into(), bin).into_column(),
        Series::new("trgt".into(), trgt).into_column(),
        Series::new("side".into(), side).into_column(),
    ])?)
}

/// Importance table with columns `feature, mean, std`, ascending by mean
pub fn importance_to_frame(table: &ImportanceTable) -> Result<DataFrame> {
    let feature: Vec<&str> = table.records().iter().map(|r| r.feature.as_str()).collect();
    let mean: Vec<f64> = table.records().iter().map(|r| r.mean).collect();
    let std: Vec<f64> = table.records().iter().map(|r| r.std).collect();

    Ok(DataFrame::new(vec![
        Series::new("feature".into(), feature).into_column(),
        Series::new("mean".into(), mean).into_column(),
        Series::new("std".into(), std).into_column(),
    ])?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ImportanceRecord, Side};
    use chrono::{Duration, TimeZone};
    use polars::df;

    #[test]
    fn test_bars_from_epoch_millis() {
        let start = Utc.with_ymd_and_hms(2022, 3, 1, 0, 0, 0).unwrap();
        let millis: Vec<i64> = (0..3)
            .map(|i| (start + Duration::hours(i)).timestamp_millis())
            .collect();
        let df = df! {
            "timestamp" => &millis,
            "close" => &[Some(10.0), None, Some(10.5)],
            "volume" => &[5_i64, 6, 7],
        }
        .unwrap();

        let bars = bars_from_frame(&df).unwrap();
        assert_eq!(bars.close.index()[2], start + Duration::hours(2));
        assert!(bars.close.values()[1].is_nan());
        assert_eq!(bars.volume, Some(vec![5.0, 6.0, 7.0]));
        assert!(bars.buy_volume.is_none());
    }

    #[test]
    fn test_bars_from_string_dates() {
        let df = df! {
            "date" => &["2022-03-01", "2022-03-02"],
            "close" => &[10.0, 11.0],
        }
        .unwrap();

        let bars = bars_from_frame(&df).unwrap();
        assert_eq!(
            bars.close.index()[1],
            Utc.with_ymd_and_hms(2022, 3, 2, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_unsorted_timestamps_are_rejected() {
        let df = df! {
            "timestamp" => &[2_i64, 1],
            "close" => &[10.0, 11.0],
        }
        .unwrap();
        assert!(bars_from_frame(&df).is_err());
    }

    #[test]
    fn test_label_frame_columns() {
        let t0 = Utc.with_ymd_and_hms(2022, 3, 1, 0, 0, 0).unwrap();
        let labels = vec![Label {
            t0,
            t1: t0 + Duration::days(1),
            ret: -0.02,
            bin: 0,
            trgt: 0.01,
            side: Some(Side::Short),
        }];

        let df = labels_to_frame(&labels).unwrap();
        assert_eq!(df.shape(), (1, 6));
        assert_eq!(df.column("bin").unwrap().i32().unwrap().get(0), Some(0));
        assert_eq!(df.column("side").unwrap().i32().unwrap().get(0), Some(-1));
        assert!(matches!(
            df.column("t1").unwrap().dtype(),
            DataType::Datetime(TimeUnit::Milliseconds, _)
        ));
    }

    #[test]
    fn test_importance_frame_keeps_order() {
        let table = ImportanceTable::new(vec![
            ImportanceRecord {
                feature: "b".to_string(),
                mean: 0.3,
                std: 0.1,
            },
            ImportanceRecord {
                feature: "a".to_string(),
                mean: 0.1,
                std: 0.1,
            },
        ]);
        let df = importance_to_frame(&table).unwrap();
        assert_eq!(df.column("feature").unwrap().str().unwrap().get(0), Some("a"));
    }
}
