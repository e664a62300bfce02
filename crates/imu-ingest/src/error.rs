use thiserror::Error;

/// Why a snapshot did not yield a complete reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("no '*' start marker in snapshot")]
    MissingMarker,
    #[error("reading incomplete: {fields} of 3 fields present")]
    Incomplete { fields: usize },
    #[error("field {field} is not a decimal number")]
    Malformed { field: usize },
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("I/O error: {0}")]
    Io(String),
    #[error("port not found: {0}")]
    PortNotFound(String),
}
