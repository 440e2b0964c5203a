//! Planar boolean geometry kernel.
//!
//! The network and visibility operations only talk to geometry through the
//! [`GeometryKernel`] trait. [`PlanarKernel`] implements it on top of `geo`
//! boolean operations, with line noding and buffering done here, and wraps
//! every call in a fallback ladder (reduced precision, then a small positive
//! buffer) before giving up with `None`.

mod buffer;
pub mod noding;
mod overlay;
mod robust;

use geo::Geometry;

use crate::geometry::GeometryParts;

/// Boolean set operations consumed by the network and visibility operations.
///
/// Every method returns `None` only when the operation failed on all
/// fallbacks. An empty result is an empty `GeometryCollection`.
pub trait GeometryKernel {
    fn intersection(&self, a: &Geometry<f64>, b: &Geometry<f64>) -> Option<Geometry<f64>>;

    fn union(&self, a: &Geometry<f64>, b: &Geometry<f64>) -> Option<Geometry<f64>>;

    /// Points of `a` that are not in `b`.
    fn difference(&self, a: &Geometry<f64>, b: &Geometry<f64>) -> Option<Geometry<f64>>;

    /// Minkowski sum with a disc of radius `distance`, approximated with
    /// `quadrant_segments` edges per quarter circle.
    fn buffer(
        &self,
        geometry: &Geometry<f64>,
        distance: f64,
        quadrant_segments: usize,
    ) -> Option<Geometry<f64>>;
}

/// Parameters of the [`PlanarKernel`] fallback ladder.
#[derive(Debug, Clone, Copy)]
pub struct KernelParams {
    /// Coordinates are rounded to `1 / reduced_precision_scale` on the second attempt.
    pub reduced_precision_scale: f64,
    /// Distance by which polygonal inputs are inflated on the third attempt.
    pub fallback_buffer: f64,
    /// Quadrant segments used for that inflation.
    pub buffer_segments: usize,
}

impl Default for KernelParams {
    fn default() -> Self {
        Self {
            reduced_precision_scale: 1e6,
            fallback_buffer: 1e-6,
            buffer_segments: 8,
        }
    }
}

/// [`GeometryKernel`] for planar `f64` geometries.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanarKernel {
    params: KernelParams,
}

impl PlanarKernel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_params(mut self, params: KernelParams) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn params(&self) -> &KernelParams {
        &self.params
    }

    fn binary<F>(
        &self,
        op_name: &'static str,
        a: &Geometry<f64>,
        b: &Geometry<f64>,
        op: F,
    ) -> Option<Geometry<f64>>
    where
        F: Fn(&GeometryParts, &GeometryParts) -> GeometryParts,
    {
        let a = GeometryParts::from_geometry(a);
        let b = GeometryParts::from_geometry(b);
        robust::with_fallbacks(&self.params, op_name, &a, &b, op).map(GeometryParts::into_geometry)
    }
}

impl GeometryKernel for PlanarKernel {
    fn intersection(&self, a: &Geometry<f64>, b: &Geometry<f64>) -> Option<Geometry<f64>> {
        self.binary("intersection", a, b, overlay::intersection)
    }

    fn union(&self, a: &Geometry<f64>, b: &Geometry<f64>) -> Option<Geometry<f64>> {
        self.binary("union", a, b, overlay::union)
    }

    fn difference(&self, a: &Geometry<f64>, b: &Geometry<f64>) -> Option<Geometry<f64>> {
        self.binary("difference", a, b, overlay::difference)
    }

    fn buffer(
        &self,
        geometry: &Geometry<f64>,
        distance: f64,
        quadrant_segments: usize,
    ) -> Option<Geometry<f64>> {
        let parts = GeometryParts::from_geometry(geometry);
        robust::with_fallbacks(&self.params, "buffer", &parts, &GeometryParts::default(), |a, _| {
            buffer::buffer(a, distance, quadrant_segments)
        })
        .map(GeometryParts::into_geometry)
    }
}
