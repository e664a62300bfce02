use crate::ProtocolVersion;
use thiserror::Error;

pub type Result<T, E = FrameError> = core::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("frame too large: {params} parameter bytes exceed capacity of {capacity}")]
    FrameTooLarge { params: usize, capacity: usize },
    #[error("output buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall { needed: usize, available: usize },
    #[error("unsupported data width: {0} (expected 1, 2 or 4)")]
    UnsupportedWidth(u16),
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u8),
    #[error("address 0x{address:04X} does not fit protocol {version}")]
    AddressOutOfRange {
        address: u16,
        version: ProtocolVersion,
    },
    #[error("unrecognised packet header")]
    BadHeader,
    #[error("not a broadcast sync write (id 0x{id:02X}, instruction 0x{instruction:02X})")]
    NotSyncWrite { id: u8, instruction: u8 },
    #[error("length field says {declared} bytes, frame carries {actual}")]
    LengthMismatch { declared: usize, actual: usize },
    #[error("checksum mismatch: expected 0x{expected:04X}, found 0x{found:04X}")]
    ChecksumMismatch { expected: u16, found: u16 },
    #[error("truncated frame ({0} bytes)")]
    Truncated(usize),
    #[error("parameter block of {params} bytes is not a multiple of entry size {entry}")]
    MisalignedParams { params: usize, entry: usize },
}
