pub mod error;
pub mod geometry;
pub mod graph;
pub mod kernel;
pub mod math;
pub mod operations;
pub mod operators;

pub use error::{Result, SpatiaError};
