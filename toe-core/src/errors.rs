use thiserror::Error;

/// Error type for invalid operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToeError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Dimension '{0}' not found")]
    DimensionNotFound(String),
    #[error("Cannot estimate grid spacing along '{dim}' from {len} point(s); at least 2 are required")]
    DegenerateGrid { dim: String, len: usize },
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Convenience type for `Result<T, ToeError>`.
pub type ToeResult<T> = Result<T, ToeError>;
