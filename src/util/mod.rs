//! Utility module
//! 
//! Fixed-width conversions used by the frame codec: temperatures, durations
//! and padded strings, plus the frame checksum.

pub mod checksum;

pub use self::checksum::{crc16, with_checksum};

use crate::core::{Error, Result};

/// Offset applied to one-byte preset temperatures (tenths of a degree)
const PRESET_TEMPERATURE_OFFSET: i32 = 256;

/// Seconds represented by one unit of a one-byte duration
const DURATION_UNIT_SECS: u32 = 10;

/// Encodes a preset temperature as `round(celsius * 10) - 256` in one byte
pub fn encode_preset_temperature(celsius: f64) -> Result<u8> {
    let tenths = (celsius * 10.0).round() as i32 - PRESET_TEMPERATURE_OFFSET;
    u8::try_from(tenths).map_err(|_| {
        Error::invalid_command(format!("temperature {:.1}C not representable in one byte", celsius))
    })
}

/// Decodes a one-byte preset temperature into degrees
pub fn decode_preset_temperature(byte: u8) -> f64 {
    (byte as i32 + PRESET_TEMPERATURE_OFFSET) as f64 / 10.0
}

/// Encodes a temperature as big-endian tenths of a degree
pub fn encode_temperature(celsius: f64) -> Result<[u8; 2]> {
    let tenths = (celsius * 10.0).round();
    if !(0.0..=u16::MAX as f64).contains(&tenths) {
        return Err(Error::invalid_command(format!("temperature {:.1}C out of range", celsius)));
    }
    Ok((tenths as u16).to_be_bytes())
}

/// Decodes big-endian tenths of a degree
pub fn decode_temperature(bytes: [u8; 2]) -> f64 {
    u16::from_be_bytes(bytes) as f64 / 10.0
}

/// Encodes seconds as one byte of 10-second units, rounding to the nearest unit
pub fn encode_duration(seconds: u32) -> Result<u8> {
    let units = seconds / DURATION_UNIT_SECS
        + u32::from(seconds % DURATION_UNIT_SECS >= DURATION_UNIT_SECS / 2);
    u8::try_from(units)
        .map_err(|_| Error::invalid_command(format!("duration {}s exceeds one byte", seconds)))
}

/// Decodes one byte of 10-second units into seconds
pub fn decode_duration(byte: u8) -> u32 {
    byte as u32 * DURATION_UNIT_SECS
}

/// Writes `text` as UTF-8 NUL-padded to exactly `width` bytes
///
/// Text longer than the field is rejected rather than truncated, since a cut
/// could split a multi-byte character.
pub fn pad_string(text: &str, width: usize) -> Result<Vec<u8>> {
    let bytes = text.as_bytes();
    if bytes.len() > width {
        return Err(Error::invalid_command(format!(
            "\"{}\" is {} bytes, field holds {}",
            text,
            bytes.len(),
            width
        )));
    }
    let mut field = Vec::with_capacity(width);
    field.extend_from_slice(bytes);
    field.resize(width, 0);
    Ok(field)
}

/// Reads a NUL-padded UTF-8 field, replacing invalid sequences
pub fn unpad_string(field: &[u8]) -> String {
    let end = field.iter().position(|b| *b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}
