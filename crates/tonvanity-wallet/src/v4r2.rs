//! Wallet v4 r2
//!
//! Data: `seqno:uint32 wallet_id:uint32 public_key:bits256 plugins:(HashmapE 256)`

use std::sync::Arc;

use crate::cell::{Cell, CellBuilder, CellError};
use crate::contract::WalletContract;

/// Subwallet id stored at deployment
pub const WALLET_ID: u32 = 0;

// Opaque code blob, versioned with `CODE_VERSION`.
const CODE: &[u8] = &[
    0xff, 0x00, 0xf4, 0xa4, 0x13, 0xf4, 0xbc, 0xf2, 0xc8, 0x0b, 0x01, 0x02, 0x01, 0x20, 0x02,
    0x03, 0x02, 0x01, 0x48, 0x04, 0x05, 0x04, 0xf8, 0xf2, 0x83, 0x08, 0xd7, 0x18, 0x20, 0xd3,
    0x1f, 0xd3, 0x1f, 0xd3, 0x1f, 0x02, 0xf8, 0x23, 0xbb, 0xf2, 0x64, 0xed, 0x44, 0xd0, 0xd3,
    0x1f, 0xd3, 0x1f, 0xd3, 0xff, 0xf4, 0x04, 0xd1, 0x51, 0x43, 0xba, 0xf2, 0xa1,
];

const CODE_VERSION: &str = "wallet-v4r2/1";

/// Wallet v4 r2 contract
pub struct WalletV4R2;

impl WalletContract for WalletV4R2 {
    fn name(&self) -> &'static str {
        "Wallet V4R2"
    }

    fn code_version(&self) -> &'static str {
        CODE_VERSION
    }

    fn code(&self) -> Result<Arc<Cell>, CellError> {
        Cell::leaf(CODE).map(Arc::new)
    }

    fn data(&self, public_key: &[u8; 32]) -> Result<Cell, CellError> {
        let mut builder = CellBuilder::new();
        builder
            .store_uint(0, 32)? // seqno
            .store_uint(WALLET_ID as u64, 32)?
            .store_bytes(public_key)?
            .store_bit(false)?; // empty plugin dictionary
        Ok(builder.build())
    }
}
