pub mod bins;
pub mod config;
pub mod fixed_horizon;
pub mod triple_barrier;

pub use bins::{bin_shares, drop_labels, BinLabeler};
pub use config::{BarrierConfig, BarrierType, LabelingMethod};
pub use fixed_horizon::fixed_horizon;
pub use triple_barrier::{first_touch, vertical_barriers, Touch, TouchStats, TripleBarrierLabeler};
