//! Wallet contract trait and template ids

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cell::{Cell, CellError};
use crate::simple::SimpleWallet;
use crate::v4r2::WalletV4R2;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown wallet template '{0}' (expected v4r2 or simple)")]
pub struct UnknownTemplate(pub String);

/// Supported wallet layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletTemplate {
    /// Wallet v4 r2: seqno, wallet id, public key, plugin dictionary
    V4R2,
    /// Simple wallet: public key, seqno
    Simple,
}

impl WalletTemplate {
    /// All templates, in display order
    pub fn all() -> [WalletTemplate; 2] {
        [WalletTemplate::V4R2, WalletTemplate::Simple]
    }

    /// The contract implementing this template
    pub fn contract(&self) -> &'static dyn WalletContract {
        match self {
            WalletTemplate::V4R2 => &WalletV4R2,
            WalletTemplate::Simple => &SimpleWallet,
        }
    }

    /// Identifier used on the command line and in JSON
    pub fn id(&self) -> &'static str {
        match self {
            WalletTemplate::V4R2 => "v4r2",
            WalletTemplate::Simple => "simple",
        }
    }
}

impl fmt::Display for WalletTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for WalletTemplate {
    type Err = UnknownTemplate;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "v4r2" | "v4" => Ok(WalletTemplate::V4R2),
            "simple" => Ok(WalletTemplate::Simple),
            other => Err(UnknownTemplate(other.to_string())),
        }
    }
}

/// A wallet contract: fixed code plus a data layout over the public key
pub trait WalletContract: Send + Sync {
    /// Human-readable name
    fn name(&self) -> &'static str;

    /// Code version tag of the opaque code cell
    fn code_version(&self) -> &'static str;

    /// The code cell, identical for every wallet of this template
    fn code(&self) -> Result<Arc<Cell>, CellError>;

    /// Initial data cell for `public_key`
    fn data(&self, public_key: &[u8; 32]) -> Result<Cell, CellError>;
}
