use thiserror::Error;

#[derive(Error, Debug)]
pub enum EventlabError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Empty result: {0}")]
    EmptyResult(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Computation error: {0}")]
    Computation(String),

    #[error("Data loading error: {0}")]
    DataLoading(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Config source error: {0}")]
    ConfigSource(#[from] config::ConfigError),
}

pub type Result<T> = std::result::Result<T, EventlabError>;
