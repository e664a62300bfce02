use crate::FrameError;
use core::fmt;
use serde::{Deserialize, Serialize};

/// Packet ID addressing every device on the bus.
pub const BROADCAST_ID: u8 = 0xFE;

/// Highest ID a single device may carry.
pub const MAX_DEVICE_ID: u8 = 0xFC;

/// Wire protocol generation. Both share one instruction set.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ProtocolVersion {
    /// Protocol 1.0: 2-byte header, 1-byte fields, additive checksum.
    V1,
    /// Protocol 2.0: 3-byte header + reserved byte, 2-byte fields, CRC16.
    V2,
}

impl ProtocolVersion {
    /// Default parameter-block capacity of a sync write on this bus.
    pub fn default_param_capacity(self) -> usize {
        match self {
            ProtocolVersion::V1 => 64,
            ProtocolVersion::V2 => 128,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            ProtocolVersion::V1 => 1,
            ProtocolVersion::V2 => 2,
        }
    }
}

impl TryFrom<u8> for ProtocolVersion {
    type Error = FrameError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(ProtocolVersion::V1),
            2 => Ok(ProtocolVersion::V2),
            other => Err(FrameError::UnsupportedVersion(other)),
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.0", self.number())
    }
}

/// Byte width of one control-table item.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum DataWidth {
    Byte,
    Word,
    DWord,
}

impl DataWidth {
    pub fn bytes(self) -> usize {
        match self {
            DataWidth::Byte => 1,
            DataWidth::Word => 2,
            DataWidth::DWord => 4,
        }
    }
}

impl TryFrom<u16> for DataWidth {
    type Error = FrameError;

    fn try_from(w: u16) -> Result<Self, Self::Error> {
        match w {
            1 => Ok(DataWidth::Byte),
            2 => Ok(DataWidth::Word),
            4 => Ok(DataWidth::DWord),
            other => Err(FrameError::UnsupportedWidth(other)),
        }
    }
}

/// A control-table location on one protocol generation.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ControlAddress {
    pub version: ProtocolVersion,
    pub address: u16,
    pub width: DataWidth,
}

impl ControlAddress {
    pub const fn new(version: ProtocolVersion, address: u16, width: DataWidth) -> Self {
        Self {
            version,
            address,
            width,
        }
    }
}

impl fmt::Display for ControlAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "p{} addr={} width={}",
            self.version,
            self.address,
            self.width.bytes()
        )
    }
}

/// One target of a sync write. Only the low `width` bytes of `value` go on the wire.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct SyncEntry {
    pub id: u8,
    pub value: u32,
}

impl SyncEntry {
    pub const fn new(id: u8, value: u32) -> Self {
        Self { id, value }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum Instruction {
    Ping = 0x01,
    Read = 0x02,
    Write = 0x03,
    RegWrite = 0x04,
    Action = 0x05,
    FactoryReset = 0x06,
    Reboot = 0x08,
    Clear = 0x10,
    Status = 0x55,
    SyncRead = 0x82,
    SyncWrite = 0x83,
    BulkRead = 0x92,
    BulkWrite = 0x93,
}

impl Instruction {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        let inst = match code {
            0x01 => Instruction::Ping,
            0x02 => Instruction::Read,
            0x03 => Instruction::Write,
            0x04 => Instruction::RegWrite,
            0x05 => Instruction::Action,
            0x06 => Instruction::FactoryReset,
            0x08 => Instruction::Reboot,
            0x10 => Instruction::Clear,
            0x55 => Instruction::Status,
            0x82 => Instruction::SyncRead,
            0x83 => Instruction::SyncWrite,
            0x92 => Instruction::BulkRead,
            0x93 => Instruction::BulkWrite,
            _ => return None,
        };
        Some(inst)
    }
}
