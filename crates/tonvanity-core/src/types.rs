//! Requests, results and the events a session receives

use std::fmt;

use serde::{Deserialize, Serialize};

use tonvanity_pattern::{MatchKind, Pattern, PatternError};
use tonvanity_wallet::WalletTemplate;

/// Caller-supplied identity of a requesting session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// What to search for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub pattern: String,
    #[serde(rename = "type")]
    pub match_kind: MatchKind,
    pub case_sensitive: bool,
    #[serde(rename = "walletType")]
    pub template: WalletTemplate,
}

impl SearchRequest {
    pub fn new(
        pattern: impl Into<String>,
        match_kind: MatchKind,
        case_sensitive: bool,
        template: WalletTemplate,
    ) -> Self {
        Self {
            pattern: pattern.into(),
            match_kind,
            case_sensitive,
            template,
        }
    }

    pub fn to_pattern(&self) -> Pattern {
        Pattern::new(self.pattern.clone(), self.match_kind, self.case_sensitive)
    }

    /// Pattern length and alphabet check
    pub fn validate(&self) -> Result<(), PatternError> {
        self.to_pattern().validate()
    }
}

/// The winning keypair and its address
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VanityResult {
    pub address: String,
    pub public_key: String,
    /// seed ‖ public key, hex
    pub secret_key: String,
    #[serde(rename = "walletType")]
    pub template: WalletTemplate,
    pub pattern: String,
    /// Attempts across all workers of the job
    pub attempts: u64,
    /// Wall-clock seconds since the job started
    pub time_taken: f64,
    /// Base64 bag-of-cells of the wallet's state-init
    pub state_init: String,
}

impl fmt::Debug for VanityResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VanityResult")
            .field("address", &self.address)
            .field("public_key", &self.public_key)
            .field("secret_key", &"<redacted>")
            .field("template", &self.template)
            .field("pattern", &self.pattern)
            .field("attempts", &self.attempts)
            .field("time_taken", &self.time_taken)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchStatus {
    Running,
    Found,
    Stopped,
    Error,
}

/// Aggregated progress of one job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub attempts: u64,
    pub attempts_per_second: u64,
    /// `None` while the rate is unknown
    pub estimated_time_seconds: Option<u64>,
    pub status: SearchStatus,
}

/// Why a job ended without a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopReason {
    /// The caller asked to stop
    Requested,
    /// Every worker hit its attempt ceiling
    Exhausted,
    /// Every worker failed
    Failed,
}

/// Outbound events of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum SessionEvent {
    Progress(ProgressSnapshot),
    Found(VanityResult),
    Stopped { reason: StopReason },
    Error { message: String },
}
