use thiserror::Error;

/// Top-level error type for the Spatia operator library.
#[derive(Debug, Error)]
pub enum SpatiaError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Operation(#[from] OperationError),
}

/// Errors related to geometric values.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    #[error("non-finite coordinate")]
    NonFinite,
}

/// Errors related to network and visibility operations.
#[derive(Debug, Error)]
pub enum OperationError {
    /// The line splitting fixed point did not settle within its insertion bound.
    ///
    /// Stopping early would leave crossing segments in the output, so this is
    /// always surfaced to the caller.
    #[error("line splitting did not converge after {insertions} insertions (limit {limit})")]
    NonConvergence { insertions: usize, limit: usize },
}

/// Convenience type alias for results using [`SpatiaError`].
pub type Result<T> = std::result::Result<T, SpatiaError>;
