pub mod engineer;
pub mod frac_diff;
pub mod microstructure;

pub use engineer::{FeatureEngineer, FeatureKind, FeatureSpec};
pub use frac_diff::FracDiff;
pub use microstructure::{MarketCapabilities, MicrostructureKind, Trade};
