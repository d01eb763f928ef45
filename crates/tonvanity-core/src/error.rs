//! Engine errors

use thiserror::Error;
use tonvanity_pattern::PatternError;

use crate::types::SessionId;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid pattern: {0}")]
    Validation(#[from] PatternError),
    #[error("Invalid engine configuration: {0}")]
    Config(String),
    #[error("Failed to parse engine configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),
    #[error("Session {0} is not connected")]
    UnknownSession(SessionId),
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}
