use thiserror::Error;

#[derive(Debug, Error)]
pub enum EstadError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("insufficient data: need at least {required} numeric values, found {found}")]
    InsufficientData { required: usize, found: usize },

    #[error("number of intervals must be between 1 and {max}, got {0}", max = crate::frequency::MAX_BINS)]
    InvalidBinCount(usize),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("remote generation failed: {0}")]
    Remote(String),
}

pub type EstadResult<T> = Result<T, EstadError>;
