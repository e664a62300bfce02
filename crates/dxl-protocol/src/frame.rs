use crate::{
    checksum, crc16, ControlAddress, FrameError, Instruction, ProtocolVersion, Result, SyncEntry,
    BROADCAST_ID,
};

/// Protocol 1.0 header.
pub const V1_HEADER: [u8; 2] = [0xFF, 0xFF];
/// Protocol 2.0 header followed by the reserved byte.
pub const V2_HEADER: [u8; 4] = [0xFF, 0xFF, 0xFD, 0x00];

// Header, id and length field: everything the length field does not count.
const V1_PREFIX: usize = 4;
const V2_PREFIX: usize = 7;
// Instruction, address, width and trailer: what the length field counts besides params.
const V1_FIXED: usize = 4;
const V2_FIXED: usize = 7;

/// A broadcast sync write, encoded on demand into a caller-provided buffer.
#[derive(Clone, Copy, Debug)]
pub struct SyncWrite<'a> {
    address: ControlAddress,
    entries: &'a [SyncEntry],
    param_capacity: usize,
}

impl<'a> SyncWrite<'a> {
    pub fn new(address: ControlAddress, entries: &'a [SyncEntry]) -> Self {
        Self {
            address,
            entries,
            param_capacity: address.version.default_param_capacity(),
        }
    }

    /// Override the parameter-block capacity of the target bus.
    pub fn with_param_capacity(mut self, capacity: usize) -> Self {
        self.param_capacity = capacity;
        self
    }

    pub fn address(&self) -> ControlAddress {
        self.address
    }

    pub fn entries(&self) -> &'a [SyncEntry] {
        self.entries
    }

    /// Bytes of `(id, payload)` pairs.
    pub fn param_len(&self) -> usize {
        self.entries.len() * (1 + self.address.width.bytes())
    }

    /// Value carried by the length field.
    pub fn length_field(&self) -> usize {
        match self.address.version {
            ProtocolVersion::V1 => V1_FIXED + self.param_len(),
            ProtocolVersion::V2 => V2_FIXED + self.param_len(),
        }
    }

    /// Total bytes on the wire.
    pub fn encoded_len(&self) -> usize {
        match self.address.version {
            ProtocolVersion::V1 => V1_PREFIX + self.length_field(),
            ProtocolVersion::V2 => V2_PREFIX + self.length_field(),
        }
    }

    /// Check every precondition without touching any buffer.
    pub fn validate(&self) -> Result<()> {
        let params = self.param_len();
        if params > self.param_capacity {
            return Err(FrameError::FrameTooLarge {
                params,
                capacity: self.param_capacity,
            });
        }
        match self.address.version {
            ProtocolVersion::V1 => {
                if self.address.address > u16::from(u8::MAX) {
                    return Err(FrameError::AddressOutOfRange {
                        address: self.address.address,
                        version: ProtocolVersion::V1,
                    });
                }
                let max = usize::from(u8::MAX) - V1_FIXED;
                if params > max {
                    return Err(FrameError::FrameTooLarge {
                        params,
                        capacity: max,
                    });
                }
            }
            ProtocolVersion::V2 => {
                let max = usize::from(u16::MAX) - V2_FIXED;
                if params > max {
                    return Err(FrameError::FrameTooLarge {
                        params,
                        capacity: max,
                    });
                }
            }
        }
        Ok(())
    }

    /// Encode into `buf`, returning the number of bytes written.
    ///
    /// On error `buf` is left exactly as it was.
    pub fn encode_into(&self, buf: &mut [u8]) -> Result<usize> {
        self.validate()?;
        let len = self.encoded_len();
        let mut w = FrameWriter::reserve(buf, len)?;
        let width = self.address.width.bytes();

        match self.address.version {
            ProtocolVersion::V1 => {
                w.put(&V1_HEADER);
                let body = w.pos();
                w.put_u8(BROADCAST_ID);
                w.put_u8(self.length_field() as u8);
                w.put_u8(Instruction::SyncWrite.code());
                w.put_u8(self.address.address as u8);
                w.put_u8(width as u8);
                for e in self.entries {
                    w.put_u8(e.id);
                    w.put_le(e.value, width);
                }
                let chk = checksum(w.written_from(body));
                w.put_u8(chk);
            }
            ProtocolVersion::V2 => {
                w.put(&V2_HEADER);
                w.put_u8(BROADCAST_ID);
                w.put_u16_le(self.length_field() as u16);
                w.put_u8(Instruction::SyncWrite.code());
                w.put_u16_le(self.address.address);
                w.put_u16_le(width as u16);
                for e in self.entries {
                    w.put_u8(e.id);
                    w.put_le(e.value, width);
                }
                let crc = crc16(w.written_from(0));
                w.put_u16_le(crc);
            }
        }

        let written = w.finish();
        debug_assert_eq!(written, len);
        tracing::trace!(
            address = %self.address,
            entries = self.entries.len(),
            len = written,
            "encoded sync write"
        );
        Ok(written)
    }

    pub fn to_vec(&self) -> Result<Vec<u8>> {
        self.validate()?;
        let mut out = vec![0u8; self.encoded_len()];
        let n = self.encode_into(&mut out)?;
        out.truncate(n);
        Ok(out)
    }
}

/// Encode a broadcast sync write into `buf` with the default capacity for its protocol.
pub fn build_sync_write(
    address: ControlAddress,
    entries: &[SyncEntry],
    buf: &mut [u8],
) -> Result<usize> {
    SyncWrite::new(address, entries).encode_into(buf)
}

/// Cursor over a window whose size was checked before the first write.
struct FrameWriter<'b> {
    buf: &'b mut [u8],
    pos: usize,
}

impl<'b> FrameWriter<'b> {
    fn reserve(buf: &'b mut [u8], len: usize) -> Result<Self> {
        let available = buf.len();
        match buf.get_mut(..len) {
            Some(window) => Ok(Self {
                buf: window,
                pos: 0,
            }),
            None => Err(FrameError::BufferTooSmall {
                needed: len,
                available,
            }),
        }
    }

    fn pos(&self) -> usize {
        self.pos
    }

    fn put_u8(&mut self, b: u8) {
        self.buf[self.pos] = b;
        self.pos += 1;
    }

    fn put(&mut self, bytes: &[u8]) {
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
    }

    fn put_u16_le(&mut self, v: u16) {
        self.put(&v.to_le_bytes());
    }

    fn put_le(&mut self, v: u32, width: usize) {
        self.put(&v.to_le_bytes()[..width]);
    }

    fn written_from(&self, start: usize) -> &[u8] {
        &self.buf[start..self.pos]
    }

    fn finish(self) -> usize {
        self.pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DataWidth;

    const V1_SPEED: ControlAddress = ControlAddress::new(ProtocolVersion::V1, 32, DataWidth::Word);
    const V1_TORQUE: ControlAddress =
        ControlAddress::new(ProtocolVersion::V1, 24, DataWidth::Byte);
    const V2_TORQUE: ControlAddress =
        ControlAddress::new(ProtocolVersion::V2, 64, DataWidth::Byte);
    const V2_POSITION: ControlAddress =
        ControlAddress::new(ProtocolVersion::V2, 116, DataWidth::DWord);

    fn reference_crc(data: &[u8]) -> u16 {
        let mut crc: u16 = 0;
        for &byte in data {
            crc ^= u16::from(byte) << 8;
            for _ in 0..8 {
                crc = if crc & 0x8000 != 0 {
                    (crc << 1) ^ 0x8005
                } else {
                    crc << 1
                };
            }
        }
        crc
    }

    fn reference_checksum(data: &[u8]) -> u8 {
        let sum: u32 = data.iter().map(|&b| u32::from(b)).sum();
        !((sum & 0xFF) as u8)
    }

    #[test]
    fn test_v1_wheel_speed_layout() -> anyhow::Result<()> {
        let entries = [SyncEntry::new(3, 100), SyncEntry::new(13, 1124)];
        let bytes = SyncWrite::new(V1_SPEED, &entries).to_vec()?;
        assert_eq!(
            bytes,
            vec![
                0xFF, 0xFF, 0xFE, 0x0A, 0x83, 0x20, 0x02, 0x03, 0x64, 0x00, 0x0D, 0x64, 0x04,
                0x76
            ]
        );
        Ok(())
    }

    #[test]
    fn test_v2_torque_layout() -> anyhow::Result<()> {
        let entries = [SyncEntry::new(1, 1), SyncEntry::new(2, 1)];
        let bytes = SyncWrite::new(V2_TORQUE, &entries).to_vec()?;
        assert_eq!(
            bytes,
            vec![
                0xFF, 0xFF, 0xFD, 0x00, 0xFE, 0x0B, 0x00, 0x83, 0x40, 0x00, 0x01, 0x00, 0x01,
                0x01, 0x02, 0x01, 0xC7, 0x64
            ]
        );
        Ok(())
    }

    #[test]
    fn test_v2_four_byte_values_little_endian() -> anyhow::Result<()> {
        let entries = [SyncEntry::new(1, 2048), SyncEntry::new(2, 0x1234_5678)];
        let bytes = SyncWrite::new(V2_POSITION, &entries).to_vec()?;
        assert_eq!(
            bytes,
            vec![
                0xFF, 0xFF, 0xFD, 0x00, 0xFE, 0x11, 0x00, 0x83, 0x74, 0x00, 0x04, 0x00, 0x01,
                0x00, 0x08, 0x00, 0x00, 0x02, 0x78, 0x56, 0x34, 0x12, 0x88, 0x90
            ]
        );
        Ok(())
    }

    #[test]
    fn test_zero_entries_is_valid() -> anyhow::Result<()> {
        let v1 = SyncWrite::new(V1_TORQUE, &[]).to_vec()?;
        assert_eq!(v1, vec![0xFF, 0xFF, 0xFE, 0x04, 0x83, 0x18, 0x01, 0x61]);
        let v2 = SyncWrite::new(V2_TORQUE, &[]).to_vec()?;
        assert_eq!(
            v2,
            vec![0xFF, 0xFF, 0xFD, 0x00, 0xFE, 0x07, 0x00, 0x83, 0x40, 0x00, 0x01, 0x00, 0x64, 0x15]
        );
        Ok(())
    }

    #[test]
    fn test_length_field_and_trailer_for_every_count() -> anyhow::Result<()> {
        let mut buf = [0u8; 256];
        for version in [ProtocolVersion::V1, ProtocolVersion::V2] {
            for width in [DataWidth::Byte, DataWidth::Word, DataWidth::DWord] {
                let address = ControlAddress::new(version, 30, width);
                let max = version.default_param_capacity() / (1 + width.bytes());
                for n in 0..=max {
                    let entries: Vec<SyncEntry> = (0..n)
                        .map(|i| SyncEntry::new(i as u8 + 1, 0x0102_0304u32.wrapping_mul(i as u32)))
                        .collect();
                    let len = build_sync_write(address, &entries, &mut buf)?;
                    let frame = &buf[..len];
                    match version {
                        ProtocolVersion::V1 => {
                            assert_eq!(usize::from(frame[3]), len - 4);
                            let body = &frame[2..len - 1];
                            assert_eq!(frame[len - 1], reference_checksum(body));
                        }
                        ProtocolVersion::V2 => {
                            let declared = usize::from(u16::from_le_bytes([frame[5], frame[6]]));
                            assert_eq!(declared, len - 7);
                            let crc = u16::from_le_bytes([frame[len - 2], frame[len - 1]]);
                            assert_eq!(crc, reference_crc(&frame[..len - 2]));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    #[test]
    fn test_too_large_leaves_buffer_untouched() {
        let entries: Vec<SyncEntry> = (0..13).map(|i| SyncEntry::new(i, 0)).collect();
        let address = ControlAddress::new(ProtocolVersion::V1, 30, DataWidth::DWord);
        let mut buf = [0xAAu8; 256];
        let err = build_sync_write(address, &entries, &mut buf);
        assert_eq!(
            err,
            Err(FrameError::FrameTooLarge {
                params: 65,
                capacity: 64
            })
        );
        assert!(buf.iter().all(|&b| b == 0xAA));
    }

    #[test]
    fn test_small_buffer_leaves_buffer_untouched() {
        let entries = [SyncEntry::new(1, 1)];
        let mut buf = [0x55u8; 8];
        let err = build_sync_write(V2_TORQUE, &entries, &mut buf);
        assert_eq!(
            err,
            Err(FrameError::BufferTooSmall {
                needed: 16,
                available: 8
            })
        );
        assert!(buf.iter().all(|&b| b == 0x55));
    }

    #[test]
    fn test_capacity_override() {
        let entries: Vec<SyncEntry> = (0..9).map(|i| SyncEntry::new(i, 0)).collect();
        let frame = SyncWrite::new(V2_POSITION, &entries);
        assert!(frame.validate().is_ok());
        assert!(matches!(
            frame.with_param_capacity(40).validate(),
            Err(FrameError::FrameTooLarge { params: 45, .. })
        ));
    }

    #[test]
    fn test_v1_rejects_wide_address() {
        let address = ControlAddress::new(ProtocolVersion::V1, 300, DataWidth::Byte);
        assert!(matches!(
            SyncWrite::new(address, &[]).validate(),
            Err(FrameError::AddressOutOfRange { address: 300, .. })
        ));
    }

    #[test]
    fn test_narrow_width_sends_low_bytes() -> anyhow::Result<()> {
        let entries = [SyncEntry::new(7, 0xABCD_0101)];
        let bytes = SyncWrite::new(V1_TORQUE, &entries).to_vec()?;
        assert_eq!(&bytes[7..9], &[7, 0x01]);
        Ok(())
    }
}
