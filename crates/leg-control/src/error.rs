use bus_transport::TransportError;
use dxl_protocol::FrameError;
use thiserror::Error;

/// Failure of a build-and-send cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("frame: {0}")]
    Frame(#[from] FrameError),
    #[error("transport: {0}")]
    Transport(#[from] TransportError),
}

impl CodecError {
    /// True when retrying on a later tick can succeed without intervention.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CodecError::Transport(TransportError::Busy | TransportError::Timeout { .. })
        )
    }
}
