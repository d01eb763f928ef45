//! Ed25519 keypairs in the layout TON wallets use
//!
//! The secret key is 64 bytes: the 32-byte seed followed by the public key.

use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;

/// Length of the random seed a keypair is derived from
pub const SEED_LEN: usize = 32;
/// Length of the expanded secret key (seed || public key)
pub const SECRET_KEY_LEN: usize = 64;

#[derive(Error, Debug)]
pub enum Ed25519Error {
    #[error("Invalid secret key length {0} (expected 32 or 64 bytes)")]
    InvalidLength(usize),
    #[error("Secret key does not embed the public key of its seed")]
    PublicKeyMismatch,
    #[error("Secure randomness unavailable: {0}")]
    Randomness(String),
}

/// An Ed25519 keypair derived from a 32-byte seed
#[derive(Clone)]
pub struct Ed25519Keypair {
    signing_key: SigningKey,
}

impl Ed25519Keypair {
    /// Draw a fresh seed from the OS and derive a keypair from it
    pub fn generate() -> Result<Self, Ed25519Error> {
        let mut seed = [0u8; SEED_LEN];
        OsRng
            .try_fill_bytes(&mut seed)
            .map_err(|e| Ed25519Error::Randomness(e.to_string()))?;
        Ok(Self::from_seed(&seed))
    }

    /// Deterministically derive a keypair from a seed
    pub fn from_seed(seed: &[u8; SEED_LEN]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Rebuild from either a bare seed or a 64-byte secret key.
    ///
    /// A 64-byte key must carry the public key matching its seed half.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, Ed25519Error> {
        match bytes.len() {
            SEED_LEN => {
                let mut seed = [0u8; SEED_LEN];
                seed.copy_from_slice(bytes);
                Ok(Self::from_seed(&seed))
            }
            SECRET_KEY_LEN => {
                let mut seed = [0u8; SEED_LEN];
                seed.copy_from_slice(&bytes[..SEED_LEN]);
                let keypair = Self::from_seed(&seed);
                if keypair.public_key_bytes()[..] != bytes[SEED_LEN..] {
                    return Err(Ed25519Error::PublicKeyMismatch);
                }
                Ok(keypair)
            }
            other => Err(Ed25519Error::InvalidLength(other)),
        }
    }

    /// Get the seed (32 bytes)
    pub fn seed_bytes(&self) -> [u8; SEED_LEN] {
        self.signing_key.to_bytes()
    }

    /// Get the secret key (64 bytes: seed || pubkey)
    pub fn secret_key_bytes(&self) -> [u8; SECRET_KEY_LEN] {
        let mut result = [0u8; SECRET_KEY_LEN];
        result[..SEED_LEN].copy_from_slice(&self.signing_key.to_bytes());
        result[SEED_LEN..].copy_from_slice(self.signing_key.verifying_key().as_bytes());
        result
    }

    /// Get the public key as bytes (32 bytes)
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }
}
