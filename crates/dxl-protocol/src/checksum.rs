/// Protocol 1.0 checksum: bitwise complement of the byte sum, truncated to 8 bits.
///
/// `data` is the span from the packet ID through the last parameter byte; the
/// two `0xFF` header bytes are not part of it.
pub fn checksum(data: &[u8]) -> u8 {
    let sum = data.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    !sum
}
