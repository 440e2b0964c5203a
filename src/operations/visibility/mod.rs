//! Visibility masking by sector decomposition.

mod mask;
pub mod wedge;

pub use mask::{MaskedBy, VisibilityParams};
pub use wedge::VisibilitySector;
