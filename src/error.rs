use thiserror::Error;

/// Error types for the mogfit-rs library.
#[derive(Error, Debug)]
pub enum MogError {
    /// A vector or array argument had the wrong length or shape.
    #[error("Argument error: {0}")]
    ArgumentError(String),

    /// An index into the active parameter ordering was out of range.
    #[error("Index {index} out of range for {len} active parameters")]
    IndexError { index: usize, len: usize },

    /// A symbolic parameter name was not bound.
    #[error("Unknown parameter name: {0}")]
    KeyError(String),

    /// Error indicating a mismatch in matrix dimensions.
    #[error("Matrix dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Error indicating the algorithm failed to converge.
    #[error("Algorithm failed to converge: {0}")]
    ConvergenceFailure(String),

    /// A mixture with non-positive variances or non-positive-definite covariances.
    #[error("Invalid mixture: {0}")]
    InvalidMixture(String),

    /// Error during function evaluation.
    #[error("Function evaluation error: {0}")]
    FunctionEvaluation(String),

    /// I/O error wrapper.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type alias for mogfit-rs operations.
pub type Result<T> = std::result::Result<T, MogError>;
