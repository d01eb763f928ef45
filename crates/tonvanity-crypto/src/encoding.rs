//! Address encoding utilities: CRC16, Base64url

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EncodingError {
    #[error("Invalid character in input")]
    InvalidCharacter,
    #[error("Invalid length")]
    InvalidLength,
}

/// CRC16-XMODEM (poly 0x1021, init 0), the checksum of user-friendly TON addresses
pub fn crc16_xmodem(data: &[u8]) -> u16 {
    let mut crc: u16 = 0x0000;
    for byte in data {
        crc ^= (*byte as u16) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ 0x1021;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

/// Base64url encode (`-` and `_`, padded)
pub fn base64url_encode(data: &[u8]) -> String {
    URL_SAFE.encode(data)
}

/// Standard base64 encode, used for bag-of-cells output
pub fn base64_encode(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decode base64 in either the url-safe or the standard alphabet
pub fn base64_decode_any(input: &str) -> Result<Vec<u8>, EncodingError> {
    if input.len() % 4 != 0 {
        return Err(EncodingError::InvalidLength);
    }
    let normalized: String = input
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();
    URL_SAFE
        .decode(normalized)
        .map_err(|_| EncodingError::InvalidCharacter)
}
