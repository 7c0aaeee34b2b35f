pub mod base;
pub mod purged_kfold;
pub mod types;

pub use base::CrossValidator;
pub use purged_kfold::PurgedKFold;
pub use types::{Fold, LabelSpan};
