//! TON Connect deep links

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

const TON_CONNECT_URL: &str = "https://tonconnect.io";

/// Connection envelope carried in the `connect` query parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectRequest {
    pub id: String,
    pub name: String,
    pub wallet: String,
}

/// Build a deep link asking `wallet_address` to connect to `app_name`.
///
/// Every call gets a fresh request id.
pub fn ton_connect_link(app_name: &str, wallet_address: &str) -> Result<Url> {
    let app_name = app_name.trim();
    let wallet_address = wallet_address.trim();
    if app_name.is_empty() {
        bail!("App name must not be empty");
    }
    if wallet_address.is_empty() {
        bail!("Wallet address must not be empty");
    }

    let request = ConnectRequest {
        id: Uuid::new_v4().to_string(),
        name: app_name.to_string(),
        wallet: wallet_address.to_string(),
    };

    let mut url = Url::parse(TON_CONNECT_URL)?;
    url.query_pairs_mut()
        .append_pair("connect", &serde_json::to_string(&request)?);
    Ok(url)
}
