//! Line network repair: point splits, crossing splits and endpoint snapping.

mod clean;
pub mod pool;
mod split;
mod split_at;

pub use clean::CleanNetwork;
pub use pool::{EdgeKey, EdgePool, PoolState};
pub use split::SplitLines;
pub use split_at::SplitAt;
