//! TonVanity Core Engine
//!
//! Multi-threaded vanity address search with one job per session.

mod config;
mod error;
mod manager;
mod progress;
mod types;
mod worker;

pub use config::EngineConfig;
pub use error::EngineError;
pub use manager::{JobManager, JobRegistry};
pub use progress::{estimate, ProgressAggregator};
pub use types::{
    ProgressSnapshot, SearchRequest, SearchStatus, SessionEvent, SessionId, StopReason,
    VanityResult,
};
pub use worker::{spawn_worker, FoundCandidate, SearchWorker, WorkerEvent, WorkerParams, WorkerState};

// Re-exports for convenience
pub use tonvanity_pattern::{calculate_difficulty, MatchKind, Pattern, PatternError};
pub use tonvanity_wallet::{derive_address, AddressDeriver, DerivedAddress, WalletTemplate};
