use thiserror::Error;

use crate::symbolic::ExpressionError;

/// Error types for the calphad-paramselect library.
#[derive(Error, Debug)]
pub enum CalphadError {
    /// No dataset matched a property query for the configuration being fit.
    #[error("No {property} data for phase {phase} with components {components:?}")]
    NoData {
        property: String,
        phase: String,
        components: Vec<String>,
    },

    /// Fewer observations than candidate features.
    #[error("Insufficient observations: {observations} observations for {features} candidate features")]
    InsufficientObservations { observations: usize, features: usize },

    /// Invalid setup, e.g. a database with no degrees of freedom.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Not implemented functionality.
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Error indicating a mismatch in array dimensions.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Linear algebra error.
    #[error("Linear algebra error: {0}")]
    LinearAlgebra(String),

    /// Error while parsing, transforming or evaluating an expression.
    #[error("Expression error: {0}")]
    Expression(#[from] ExpressionError),

    /// A symbol requested for fitting is not defined in the database.
    #[error("Symbol not found in database: {0}")]
    SymbolNotFound(String),

    /// The phase model specification failed validation.
    #[error("Invalid phase model: {0}")]
    InvalidPhaseModel(String),

    /// A property name with no feature transform.
    #[error("Unknown property: {0}")]
    UnknownProperty(String),

    /// Error raised by a residual function implementation.
    #[error("Residual function '{name}' failed: {message}")]
    Residual { name: String, message: String },

    /// I/O error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for calphad-paramselect operations.
pub type Result<T> = std::result::Result<T, CalphadError>;
