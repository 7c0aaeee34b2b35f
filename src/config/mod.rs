pub mod features;
pub mod importance;
pub mod labeling;
pub mod manager;
pub mod sampling;
pub mod traits;

pub use features::FeaturesConfig;
pub use importance::ImportanceConfig;
pub use labeling::LabelingConfig;
pub use manager::{AppConfig, ConfigManager};
pub use sampling::SamplingConfig;
pub use traits::ConfigSection;
