pub mod connectors;
pub mod frame;

pub use connectors::{CsvConnector, DataValidator, DatasetMetadata, PriceColumn};
pub use frame::{bars_from_frame, importance_to_frame, labels_to_frame};
