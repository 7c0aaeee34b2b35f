use crate::types::Timestamp;
use serde::{Deserialize, Serialize};

/// Columns of a price table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriceColumn {
    Timestamp,
    Close,
    Volume,
    BuyVolume,
    DollarVolume,
}

impl PriceColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timestamp => "timestamp",
            Self::Close => "close",
            Self::Volume => "volume",
            Self::BuyVolume => "buy_volume",
            Self::DollarVolume => "dollar_volume",
        }
    }

    pub fn required() -> Vec<Self> {
        vec![Self::Timestamp, Self::Close]
    }

    pub fn optional() -> Vec<Self> {
        vec![Self::Volume, Self::BuyVolume, Self::DollarVolume]
    }

    /// Common alternative column names
    pub fn aliases(&self) -> Vec<&'static str> {
        match self {
            Self::Timestamp => vec![
                "timestamp", "Timestamp", "datetime", "DateTime", "date", "Date", "time", "Time",
            ],
            Self::Close => vec!["close", "Close", "CLOSE", "price", "Price", "c"],
            Self::Volume => vec!["volume", "Volume", "VOLUME", "vol", "Vol", "v"],
            Self::BuyVolume => vec!["buy_volume", "buyVolume", "BuyVolume", "buy_vol"],
            Self::DollarVolume => vec!["dollar_volume", "dollarVolume", "DollarVolume", "dv"],
        }
    }
}

/// Metadata about a loaded price table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub file_path: String,
    pub num_rows: usize,
    pub columns: Vec<String>,
    pub date_range: Option<(Timestamp, Timestamp)>,
    pub price_range: (f64, f64), // (min, max)
    pub has_volume: bool,
}
