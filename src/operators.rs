//! Operator surface for a hosting interpreter.
//!
//! Operators take their ambient context (the geometry kernel and the current
//! agent location) from an explicit [`Scope`] instead of global state.

use crate::error::Result;
use crate::geometry::Shape;
use crate::kernel::{GeometryKernel, PlanarKernel};
use crate::math::Point2;
use crate::operations::network::{CleanNetwork, SplitAt, SplitLines};
use crate::operations::visibility::{MaskedBy, VisibilityParams};

/// Ambient context of an operator call.
#[derive(Debug, Clone, Default)]
pub struct Scope<K = PlanarKernel> {
    kernel: K,
    location: Option<Point2>,
}

impl Scope<PlanarKernel> {
    /// A scope with the planar kernel and no location.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<K: GeometryKernel> Scope<K> {
    #[must_use]
    pub fn with_kernel(kernel: K) -> Self {
        Self {
            kernel,
            location: None,
        }
    }

    /// Sets the location of the calling agent.
    #[must_use]
    pub fn with_location(mut self, location: Point2) -> Self {
        self.location = Some(location);
        self
    }

    /// The calling agent's location, or the origin if none was set.
    #[must_use]
    pub fn location(&self) -> Point2 {
        self.location.unwrap_or_else(Point2::origin)
    }

    #[must_use]
    pub fn kernel(&self) -> &K {
        &self.kernel
    }
}

/// Repairs a line network: snaps endpoints within `tolerance`, then
/// optionally splits crossing lines and keeps the main connected component.
///
/// # Errors
///
/// Returns `OperationError::NonConvergence` if line splitting does not settle.
pub fn clean_network<K: GeometryKernel>(
    scope: &Scope<K>,
    lines: &[Shape],
    tolerance: f64,
    split_lines: bool,
    keep_main_component: bool,
) -> Result<Vec<Shape>> {
    CleanNetwork::new(lines.to_vec())
        .with_tolerance(tolerance)
        .with_split_lines(split_lines)
        .with_keep_main_component(keep_main_component)
        .execute(scope.kernel())
}

/// Splits lines at their intersections.
///
/// # Errors
///
/// Returns `OperationError::NonConvergence` if the attribute-preserving split
/// does not settle.
pub fn split_lines<K: GeometryKernel>(
    scope: &Scope<K>,
    lines: &[Shape],
    preserve_attributes: bool,
) -> Result<Vec<Shape>> {
    SplitLines::new(lines.to_vec())
        .with_preserve_attributes(preserve_attributes)
        .execute(scope.kernel())
}

/// Splits a line in two at `point`.
#[must_use]
pub fn split_at(line: &Shape, point: Point2) -> Vec<Shape> {
    SplitAt::new(line, point).execute()
}

/// The part of `source` visible from the scope's location through `obstacles`.
///
/// `precision` is the number of sectors, 120 when not given. Returns `None`
/// when everything is hidden.
#[must_use]
pub fn masked_by<K: GeometryKernel>(
    scope: &Scope<K>,
    source: &Shape,
    obstacles: &[Shape],
    precision: Option<usize>,
) -> Option<Shape> {
    let defaults = VisibilityParams::default();
    MaskedBy::new(source.clone(), obstacles.to_vec(), scope.location())
        .with_params(VisibilityParams {
            precision: precision.unwrap_or(defaults.precision),
            ..defaults
        })
        .execute(scope.kernel())
}
