pub mod alpha;
pub mod types;

pub use alpha::{bollinger, ma_cross};
pub use types::AlphaModel;
