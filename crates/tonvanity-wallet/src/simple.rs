//! Simple wallet
//!
//! Data: `public_key:bits256 seqno:uint32`

use std::sync::Arc;

use crate::cell::{Cell, CellBuilder, CellError};
use crate::contract::WalletContract;

// Opaque code blob, versioned with `CODE_VERSION`.
const CODE: &[u8] = &[
    0xff, 0x00, 0x20, 0xdd, 0x20, 0x82, 0x01, 0x4c, 0x97, 0xba, 0x97, 0x30, 0xed, 0x44, 0xd0,
    0xd7, 0x0b, 0x1f, 0xe0, 0xa4, 0xf2, 0x60, 0x81, 0x02, 0x00, 0xd7, 0x18, 0x20, 0xd7, 0x0b,
    0x1f, 0xed, 0x44, 0xd0, 0xd3, 0x1f, 0xd3, 0xff, 0xd1, 0x51, 0x12, 0xba, 0xf2, 0xa1,
];

const CODE_VERSION: &str = "wallet-simple/1";

/// Simple wallet contract
pub struct SimpleWallet;

impl WalletContract for SimpleWallet {
    fn name(&self) -> &'static str {
        "Simple Wallet"
    }

    fn code_version(&self) -> &'static str {
        CODE_VERSION
    }

    fn code(&self) -> Result<Arc<Cell>, CellError> {
        Cell::leaf(CODE).map(Arc::new)
    }

    fn data(&self, public_key: &[u8; 32]) -> Result<Cell, CellError> {
        let mut builder = CellBuilder::new();
        builder.store_bytes(public_key)?.store_uint(0, 32)?; // seqno
        Ok(builder.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_layout() {
        let key = [0x11; 32];
        let data = SimpleWallet.data(&key).unwrap();
        assert_eq!(data.bit_len(), 288);
        assert_eq!(&data.padded_data()[..32], &key);
        assert_eq!(&data.padded_data()[32..], &[0u8; 4]);
    }
}
