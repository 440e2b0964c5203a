pub mod attributes;
pub mod parts;
pub mod shape;

pub use attributes::{AttributeValue, Attributes};
pub use parts::GeometryParts;
pub use shape::{Shape, ShapeKind};
