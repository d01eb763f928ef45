//! TonVanity Crypto Primitives
//!
//! Low-level cryptographic operations for TON vanity address generation.

pub mod ed25519;
pub mod hash;
pub mod encoding;

pub use self::ed25519::{Ed25519Error, Ed25519Keypair, SEED_LEN, SECRET_KEY_LEN};

// Re-export dependencies for use by other crates
pub use hex;
