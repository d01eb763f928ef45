//! TON account addresses
//!
//! User-friendly form: base64url of
//! `[tag(1)] [workchain(1)] [account_id(32)] [crc16(2)]`, 48 characters.
//! Raw form: `<workchain>:<hex account_id>`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tonvanity_crypto::encoding::{base64_decode_any, base64url_encode, crc16_xmodem};
use tonvanity_crypto::hex;

const TAG_BOUNCEABLE: u8 = 0x11;
const TAG_NON_BOUNCEABLE: u8 = 0x51;
const TAG_TESTNET: u8 = 0x80;

const FRIENDLY_LEN: usize = 48;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Invalid address length {0}")]
    InvalidLength(usize),
    #[error("Invalid address encoding")]
    InvalidEncoding,
    #[error("Address checksum mismatch")]
    Checksum,
    #[error("Unknown address tag 0x{0:02x}")]
    UnknownTag(u8),
    #[error("Invalid workchain '{0}'")]
    InvalidWorkchain(String),
}

/// Flags carried by the user-friendly form only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressFlags {
    pub bounceable: bool,
    pub testnet: bool,
}

impl Default for AddressFlags {
    fn default() -> Self {
        Self {
            bounceable: true,
            testnet: false,
        }
    }
}

/// A contract address: workchain plus the state-init hash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    pub workchain: i8,
    pub hash: [u8; 32],
}

impl Address {
    pub fn new(workchain: i8, hash: [u8; 32]) -> Self {
        Self { workchain, hash }
    }

    /// `workchain:hex`
    pub fn to_raw(&self) -> String {
        format!("{}:{}", self.workchain, hex::encode(self.hash))
    }

    /// URL-safe user-friendly form
    pub fn to_user_friendly(&self, flags: AddressFlags) -> String {
        let mut tag = if flags.bounceable {
            TAG_BOUNCEABLE
        } else {
            TAG_NON_BOUNCEABLE
        };
        if flags.testnet {
            tag |= TAG_TESTNET;
        }

        let mut data = Vec::with_capacity(36);
        data.push(tag);
        data.push(self.workchain as u8);
        data.extend_from_slice(&self.hash);

        let crc = crc16_xmodem(&data);
        data.extend_from_slice(&crc.to_be_bytes());

        base64url_encode(&data)
    }

    /// Parse the 48-character user-friendly form, verifying its checksum
    pub fn parse_user_friendly(s: &str) -> Result<(Self, AddressFlags), AddressError> {
        if s.len() != FRIENDLY_LEN {
            return Err(AddressError::InvalidLength(s.len()));
        }
        let data = base64_decode_any(s).map_err(|_| AddressError::InvalidEncoding)?;
        if data.len() != 36 {
            return Err(AddressError::InvalidLength(data.len()));
        }

        let expected = crc16_xmodem(&data[..34]);
        if data[34..] != expected.to_be_bytes() {
            return Err(AddressError::Checksum);
        }

        let testnet = data[0] & TAG_TESTNET != 0;
        let bounceable = match data[0] & !TAG_TESTNET {
            TAG_BOUNCEABLE => true,
            TAG_NON_BOUNCEABLE => false,
            _ => return Err(AddressError::UnknownTag(data[0])),
        };

        let mut hash = [0u8; 32];
        hash.copy_from_slice(&data[2..34]);
        Ok((
            Self::new(data[1] as i8, hash),
            AddressFlags { bounceable, testnet },
        ))
    }

    fn parse_raw(s: &str) -> Result<Self, AddressError> {
        let (wc, account) = s
            .split_once(':')
            .ok_or(AddressError::InvalidEncoding)?;
        let workchain: i8 = wc
            .parse()
            .map_err(|_| AddressError::InvalidWorkchain(wc.to_string()))?;
        let bytes = hex::decode(account).map_err(|_| AddressError::InvalidEncoding)?;
        if bytes.len() != 32 {
            return Err(AddressError::InvalidLength(bytes.len()));
        }
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&bytes);
        Ok(Self::new(workchain, hash))
    }
}

impl fmt::Display for Address {
    /// Bounceable mainnet user-friendly form
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_user_friendly(AddressFlags::default()))
    }
}

impl FromStr for Address {
    type Err = AddressError;

    /// Accepts both raw and user-friendly forms
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.contains(':') {
            Self::parse_raw(s)
        } else {
            Self::parse_user_friendly(s).map(|(address, _)| address)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_address() {
        let zero = Address::new(0, [0u8; 32]);
        assert_eq!(zero.to_string(), "EQAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAM9c");
        assert_eq!(
            zero.to_raw(),
            "0:0000000000000000000000000000000000000000000000000000000000000000"
        );
    }

    #[test]
    fn test_flags_change_tag() {
        let addr = Address::new(0, [0x5A; 32]);
        let bounceable = addr.to_user_friendly(AddressFlags::default());
        let plain = addr.to_user_friendly(AddressFlags { bounceable: false, testnet: false });
        let test = addr.to_user_friendly(AddressFlags { bounceable: true, testnet: true });
        assert!(bounceable.starts_with("EQ"));
        assert!(plain.starts_with("UQ"));
        assert!(test.starts_with("kQ"));

        let (parsed, flags) = Address::parse_user_friendly(&plain).unwrap();
        assert_eq!(parsed, addr);
        assert!(!flags.bounceable);
    }

    #[test]
    fn test_parse_rejects_bad_checksum() {
        let mut s = Address::new(0, [7u8; 32]).to_string().into_bytes();
        s[10] = if s[10] == b'A' { b'B' } else { b'A' };
        let s = String::from_utf8(s).unwrap();
        assert_eq!(s.parse::<Address>(), Err(AddressError::Checksum));
        assert_eq!("EQshort".parse::<Address>(), Err(AddressError::InvalidLength(7)));
    }

    #[test]
    fn test_parse_raw() {
        let addr = Address::new(-1, [0xAB; 32]);
        assert_eq!(addr.to_raw().parse::<Address>().unwrap(), addr);
        assert!(matches!(
            "x:00".parse::<Address>(),
            Err(AddressError::InvalidWorkchain(_))
        ));
    }
}
