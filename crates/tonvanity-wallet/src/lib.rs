//! TonVanity Wallet Derivation
//!
//! Cells, state-init construction and TON address encoding for the
//! supported wallet templates.

pub mod cell;
pub mod boc;
pub mod address;
pub mod contract;
pub mod derive;

// Template modules
pub mod v4r2;
pub mod simple;

// Re-exports
pub use address::{Address, AddressError, AddressFlags};
pub use cell::{Cell, CellBuilder, CellError};
pub use contract::{UnknownTemplate, WalletContract, WalletTemplate};
pub use derive::{derive_address, state_init, AddressDeriver, DerivedAddress, WORKCHAIN};
pub use simple::SimpleWallet;
pub use v4r2::WalletV4R2;
