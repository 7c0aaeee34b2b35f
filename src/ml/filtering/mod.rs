pub mod cusum;

pub use cusum::{CusumEvents, CusumMode, CusumSampler};
