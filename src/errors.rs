use thiserror::Error;

/// Error taxonomy for the engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Malformed order at construction: non-positive price/qty, empty id.
    /// Surfaced to the submitting adapter; never enters the log.
    #[error("invalid argument: {0}")]
    InvalidArg(String),

    /// Cancel for an unknown id. Reported to the caller; no state change.
    #[error("not found: {0}")]
    NotFound(String),

    /// Durable-log read/write failure. Fatal to the matcher.
    #[error("io error: {0}")]
    Io(String),

    /// A log record could not be decoded. Logged and skipped by the matcher.
    #[error("decode error: {0}")]
    Decode(String),

    /// Invariant violation (e.g. negative remaining quantity). Fatal.
    #[error("internal invariant violation: {0}")]
    Internal(String),
}

impl From<parity_db::Error> for EngineError {
    fn from(e: parity_db::Error) -> Self {
        EngineError::Io(e.to_string())
    }
}

impl From<bincode::error::EncodeError> for EngineError {
    fn from(e: bincode::error::EncodeError) -> Self {
        EngineError::Decode(e.to_string())
    }
}

impl From<bincode::error::DecodeError> for EngineError {
    fn from(e: bincode::error::DecodeError) -> Self {
        EngineError::Decode(e.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
