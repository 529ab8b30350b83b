use thiserror::Error;

/// Result type for every fallible operation of the chain
pub type ChainResult<T> = Result<T, ChainError>;

/// Errors raised while configuring or running a transmission chain
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChainError {
    /// A configuration value violates its constraints
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A stage was handed (or asked to emit) something it cannot process
    #[error("non-conformant input: {0}")]
    NonConformantInput(String),

    /// Writing results out failed
    #[error("i/o error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::Io(err.to_string())
    }
}

impl ChainError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        ChainError::InvalidParameter(msg.into())
    }

    pub fn non_conformant(msg: impl Into<String>) -> Self {
        ChainError::NonConformantInput(msg.into())
    }
}
