use crate::frame::{V1_HEADER, V2_HEADER};
use crate::{
    checksum, crc16, ControlAddress, DataWidth, FrameError, Instruction, ProtocolVersion, Result,
    SyncEntry, BROADCAST_ID,
};
use serde::Serialize;

/// A sync write recovered from wire bytes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DecodedSyncWrite {
    pub address: ControlAddress,
    pub entries: Vec<SyncEntry>,
}

/// Parse and verify a broadcast sync write of either protocol generation.
pub fn decode_sync_write(bytes: &[u8]) -> Result<DecodedSyncWrite> {
    if bytes.starts_with(&V2_HEADER) {
        decode_v2(bytes)
    } else if bytes.starts_with(&V1_HEADER) {
        decode_v1(bytes)
    } else {
        Err(FrameError::BadHeader)
    }
}

fn decode_v1(bytes: &[u8]) -> Result<DecodedSyncWrite> {
    // FF FF ID LEN INST ADDR WIDTH ... CHK
    if bytes.len() < 8 {
        return Err(FrameError::Truncated(bytes.len()));
    }
    let declared = usize::from(bytes[3]);
    let actual = bytes.len() - 4;
    if declared != actual {
        return Err(FrameError::LengthMismatch { declared, actual });
    }
    let last = bytes.len() - 1;
    let expected = checksum(&bytes[2..last]);
    if expected != bytes[last] {
        return Err(FrameError::ChecksumMismatch {
            expected: u16::from(expected),
            found: u16::from(bytes[last]),
        });
    }
    check_sync_write(bytes[2], bytes[4])?;
    let width = DataWidth::try_from(u16::from(bytes[6]))?;
    let address = ControlAddress::new(ProtocolVersion::V1, u16::from(bytes[5]), width);
    let entries = split_entries(&bytes[7..last], width)?;
    Ok(DecodedSyncWrite { address, entries })
}

fn decode_v2(bytes: &[u8]) -> Result<DecodedSyncWrite> {
    // FF FF FD 00 ID LEN_L LEN_H INST ADDR_L ADDR_H W_L W_H ... CRC_L CRC_H
    if bytes.len() < 14 {
        return Err(FrameError::Truncated(bytes.len()));
    }
    let declared = usize::from(u16::from_le_bytes([bytes[5], bytes[6]]));
    let actual = bytes.len() - 7;
    if declared != actual {
        return Err(FrameError::LengthMismatch { declared, actual });
    }
    let crc_at = bytes.len() - 2;
    let expected = crc16(&bytes[..crc_at]);
    let found = u16::from_le_bytes([bytes[crc_at], bytes[crc_at + 1]]);
    if expected != found {
        return Err(FrameError::ChecksumMismatch { expected, found });
    }
    check_sync_write(bytes[4], bytes[7])?;
    let width = DataWidth::try_from(u16::from_le_bytes([bytes[10], bytes[11]]))?;
    let address = ControlAddress::new(
        ProtocolVersion::V2,
        u16::from_le_bytes([bytes[8], bytes[9]]),
        width,
    );
    let entries = split_entries(&bytes[12..crc_at], width)?;
    Ok(DecodedSyncWrite { address, entries })
}

fn check_sync_write(id: u8, instruction: u8) -> Result<()> {
    if id != BROADCAST_ID || Instruction::from_code(instruction) != Some(Instruction::SyncWrite) {
        return Err(FrameError::NotSyncWrite { id, instruction });
    }
    Ok(())
}

fn split_entries(params: &[u8], width: DataWidth) -> Result<Vec<SyncEntry>> {
    let entry = 1 + width.bytes();
    if params.len() % entry != 0 {
        return Err(FrameError::MisalignedParams {
            params: params.len(),
            entry,
        });
    }
    Ok(params
        .chunks_exact(entry)
        .map(|chunk| {
            let mut le = [0u8; 4];
            le[..width.bytes()].copy_from_slice(&chunk[1..]);
            SyncEntry::new(chunk[0], u32::from_le_bytes(le))
        })
        .collect())
}
