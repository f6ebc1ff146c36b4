//! CRC16 checksum for the EMV trailer (tag 63).

use crate::{PixError, Result};

/// Id of the CRC field.
pub const CRC_ID: &str = "63";

/// Id and length prefix that precedes the four checksum digits.
pub const CRC_FIELD_PREFIX: &str = "6304";

/// Number of hex digits in the checksum value.
pub const CRC_LENGTH: usize = 4;

// CRC-16/CCITT-FALSE
// Poly: 0x1021
// Init: 0xFFFF
// No reflection, no final xor
pub fn crc16_ccitt(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        let x = ((crc >> 8) ^ (byte as u16)) & 0xFF;
        let x = x ^ (x >> 4);
        crc = (crc << 8) ^ (x << 12) ^ (x << 5) ^ x;
    }
    crc
}

/// Checksum of everything before the CRC value, `"6304"` included,
/// as four uppercase hex digits.
pub fn compute(payload: &str) -> String {
    format!("{:04X}", crc16_ccitt(payload.as_bytes()))
}

/// Checks that `raw` ends with `6304` + a checksum matching the rest.
pub fn verify(raw: &str) -> Result<()> {
    let len = raw.len();
    if len < CRC_FIELD_PREFIX.len() + CRC_LENGTH || !raw.is_char_boundary(len - CRC_LENGTH) {
        return Err(PixError::EmvIdIsRequired(CRC_ID.to_string()));
    }

    let (body, provided) = raw.split_at(len - CRC_LENGTH);
    if !body.ends_with(CRC_FIELD_PREFIX) {
        // CRC must be the last data object
        return Err(PixError::EmvIdIsRequired(CRC_ID.to_string()));
    }

    let calculated = compute(body);
    if !provided.eq_ignore_ascii_case(&calculated) {
        return Err(PixError::ChecksumMismatch {
            expected: calculated,
            actual: provided.to_string(),
        });
    }

    Ok(())
}
