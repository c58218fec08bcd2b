//! Error types for the trailmap engine.

use thiserror::Error;

/// Result type for trailmap operations.
pub type Result<T> = std::result::Result<T, TrailError>;

/// Why a single raw sample was refused by the aggregator.
///
/// These never fail a batch: the offending sample is skipped and reported,
/// the rest of the batch is aggregated as usual.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SampleError {
    /// NaN or an infinity in one of the coordinates.
    #[error("coordinate `{axis}` is not finite ({value})")]
    NonFinite { axis: &'static str, value: f64 },

    /// The floored coordinate does not fit in a grid cell index.
    #[error("coordinate `{axis}` is outside the grid range ({value})")]
    OutOfRange { axis: &'static str, value: f64 },

    /// The sample could not be decoded at the wire boundary.
    #[error("malformed sample: {0}")]
    Malformed(String),
}

/// Batch-level failures. Any of these leaves the ledger in its last
/// committed state.
#[derive(Error, Debug)]
pub enum TrailError {
    /// The durable store refused or failed the commit.
    #[error("storage operation failed: {0}")]
    Storage(#[from] rusqlite::Error),

    /// The session worker is gone (shut down or panicked).
    #[error("tracking session is closed")]
    SessionClosed,

    /// A blocking read task did not complete.
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
