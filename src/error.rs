use thiserror::Error;

use crate::parameters::bounds::BoundsError;

/// Error types for the mre-rs library.
#[derive(Error, Debug)]
pub enum MreError {
    /// Input array has an unsupported dimensionality or layout.
    #[error("Shape error: {0}")]
    Shape(String),

    /// Invalid input data.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Error indicating a mismatch in vector or matrix dimensions.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Error for parameter boundary problems.
    #[error("Bounds error: {0}")]
    Bounds(#[from] BoundsError),

    /// The data does not allow the requested statistic, e.g. a regression
    /// whose regressor has zero variance.
    #[error("Degenerate data: {0}")]
    DegenerateData(String),

    /// Error during function evaluation.
    #[error("Function evaluation error: {0}")]
    FunctionEvaluation(String),

    /// Error indicating the algorithm failed to converge.
    #[error("Algorithm failed to converge: {0}")]
    ConvergenceFailure(String),

    /// Linear algebra error.
    #[error("Linear algebra error: {0}")]
    LinearAlgebra(String),

    /// A fit function name that matches none of the built-in aliases.
    #[error("Unknown fit function: {0}")]
    UnknownModel(String),

    /// No starting parameters were supplied and the model has no defaults.
    #[error("Missing starting parameters: {0}")]
    MissingStartingParameters(String),

    /// Every starting point of a multi-start fit failed.
    #[error("No successful fit among {attempts} starting point(s)")]
    NoSuccessfulFit { attempts: usize },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ndarray::ShapeError> for MreError {
    fn from(err: ndarray::ShapeError) -> Self {
        MreError::Shape(err.to_string())
    }
}

/// Result type alias for mre-rs operations.
pub type Result<T> = std::result::Result<T, MreError>;
