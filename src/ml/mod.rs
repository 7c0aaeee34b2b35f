pub mod dataset;
pub mod features;
pub mod filtering;
pub mod importance;
pub mod labeling;
pub mod models;
pub mod signals;
pub mod stats;
pub mod validation;
pub mod volatility;

pub use dataset::{FeatureMatrix, LabeledDataset};
pub use volatility::VolatilityEstimator;
