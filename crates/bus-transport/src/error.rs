use thiserror::Error;

pub type Result<T, E = TransportError> = core::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("port not found: {0}")]
    PortNotFound(String),
    #[error("operation not supported on this backend: {0}")]
    Unsupported(&'static str),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("transport busy: peripheral cannot accept a new frame")]
    Busy,
    #[error("transmission not confirmed within {waited_ms} ms")]
    Timeout { waited_ms: u64 },
}
