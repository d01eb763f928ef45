//! TonVanity Pattern Matching Engine
//!
//! Pattern kinds: prefix, suffix, contains over the user-friendly address.

mod matcher;
mod difficulty;

pub use matcher::{
    matches, prefix_reachable, MatchKind, Pattern, PatternError, MAX_PATTERN_LEN, MIN_PATTERN_LEN,
    PATTERN_ALPHABET,
};
pub use difficulty::{calculate_difficulty, format_attempts, format_duration, search_space};
