use crc::{Crc, CRC_16_IBM_3740};

use crate::core::ClientSecret;

/// CRC-16/CCITT-FALSE: poly 0x1021, init 0xFFFF, no reflection, no xor-out
const CCITT_FALSE: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);

/// Computes the frame checksum over `frame || secret`
pub fn crc16(frame: &[u8], secret: &ClientSecret) -> u16 {
    let mut digest = CCITT_FALSE.digest();
    digest.update(frame);
    digest.update(secret.as_bytes());
    digest.finalize()
}

/// Appends the big-endian checksum; the secret itself is never sent
pub fn with_checksum(frame: &[u8], secret: &ClientSecret) -> Vec<u8> {
    let mut out = Vec::with_capacity(frame.len() + 2);
    out.extend_from_slice(frame);
    out.extend_from_slice(&crc16(frame, secret).to_be_bytes());
    out
}
