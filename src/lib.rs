pub mod config;
pub mod data;
pub mod error;
pub mod ml;
pub mod pipeline;
pub mod types;

pub use error::{EventlabError, Result};
pub use pipeline::{Pipeline, PipelineOutput, PortfolioReport};
