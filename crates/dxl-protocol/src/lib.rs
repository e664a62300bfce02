//! dxl-protocol: Dynamixel sync-write framing for Protocol 1.0 and 2.0
//!
//! Both generations share the instruction set but differ in header, field widths
//! and error detection (additive checksum vs. table-driven CRC16). Frames are
//! built into caller-owned buffers and every precondition is checked before the
//! first byte is written.

mod types;
pub use types::{
    ControlAddress, DataWidth, Instruction, ProtocolVersion, SyncEntry, BROADCAST_ID,
    MAX_DEVICE_ID,
};

mod error;
pub use error::{FrameError, Result};

mod checksum;
pub use checksum::checksum;

mod crc;
pub use crc::{crc16, update_crc, CRC_TABLE};

mod frame;
pub use frame::{build_sync_write, SyncWrite, V1_HEADER, V2_HEADER};

mod inspect;
pub use inspect::{decode_sync_write, DecodedSyncWrite};

pub mod control_table;
pub mod value;
