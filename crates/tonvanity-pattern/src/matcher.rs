//! Pattern matching implementation

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shortest accepted pattern
pub const MIN_PATTERN_LEN: usize = 3;
/// Longest accepted pattern
pub const MAX_PATTERN_LEN: usize = 6;

/// Characters a pattern may contain
pub const PATTERN_ALPHABET: &str = "0123456789abcdefABCDEF";

/// Two-character tags that open a user-friendly TON address
/// (bounceable / non-bounceable, mainnet / testnet, workchain 0)
const ADDRESS_TAGS: [&str; 4] = ["eq", "uq", "kq", "0q"];

/// Characters that can follow the tag of a workchain-0 address: the zero
/// workchain byte leaves only the top two hash bits in that position
const WORKCHAIN0_LEADING: &str = "ABCD";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("Pattern too short ({0} characters, min {min})", min = MIN_PATTERN_LEN)]
    TooShort(usize),
    #[error("Pattern too long ({0} characters, max {max})", max = MAX_PATTERN_LEN)]
    TooLong(usize),
    #[error("Pattern contains invalid character '{0}' (valid: {valid})", valid = PATTERN_ALPHABET)]
    InvalidCharacter(char),
    #[error("Unknown match kind '{0}' (expected prefix, suffix or contains)")]
    UnknownKind(String),
}

/// Where in the address the pattern must appear
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    /// Match at start of the address body (after the EQ/UQ tag)
    Prefix,
    /// Match at end of address
    Suffix,
    /// Match anywhere in address
    Contains,
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchKind::Prefix => write!(f, "prefix"),
            MatchKind::Suffix => write!(f, "suffix"),
            MatchKind::Contains => write!(f, "contains"),
        }
    }
}

impl FromStr for MatchKind {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "prefix" => Ok(MatchKind::Prefix),
            "suffix" => Ok(MatchKind::Suffix),
            "contains" => Ok(MatchKind::Contains),
            other => Err(PatternError::UnknownKind(other.to_string())),
        }
    }
}

/// Check `address` against `pattern`.
///
/// Case-insensitive matching lower-cases both sides first. Prefix matching
/// skips a leading TON address tag, so `EQabc...` has the prefix `abc`.
pub fn matches(address: &str, pattern: &str, kind: MatchKind, case_sensitive: bool) -> bool {
    if !case_sensitive {
        return matches(&address.to_lowercase(), &pattern.to_lowercase(), kind, true);
    }

    match kind {
        MatchKind::Prefix => address_body(address).starts_with(pattern),
        MatchKind::Suffix => address.ends_with(pattern),
        MatchKind::Contains => address.contains(pattern),
    }
}

/// Whether a prefix pattern can ever match a workchain-0 user-friendly address
pub fn prefix_reachable(pattern: &str, case_sensitive: bool) -> bool {
    match pattern.chars().next() {
        Some(c) if case_sensitive => WORKCHAIN0_LEADING.contains(c),
        Some(c) => WORKCHAIN0_LEADING.contains(c.to_ascii_uppercase()),
        None => true,
    }
}

fn address_body(address: &str) -> &str {
    let bytes = address.as_bytes();
    if bytes.len() > 2 {
        let tag = [bytes[0].to_ascii_lowercase(), bytes[1].to_ascii_lowercase()];
        if ADDRESS_TAGS.iter().any(|t| t.as_bytes() == tag) {
            return &address[2..];
        }
    }
    address
}

/// A pattern to search for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    /// The pattern string to match
    pub value: String,
    /// Type of matching
    pub kind: MatchKind,
    /// Exact-case matching
    pub case_sensitive: bool,
}

impl Pattern {
    pub fn new(value: impl Into<String>, kind: MatchKind, case_sensitive: bool) -> Self {
        Self {
            value: value.into(),
            kind,
            case_sensitive,
        }
    }

    /// Create a new case-insensitive prefix pattern
    pub fn prefix(value: impl Into<String>) -> Self {
        Self::new(value, MatchKind::Prefix, false)
    }

    /// Create a new case-insensitive suffix pattern
    pub fn suffix(value: impl Into<String>) -> Self {
        Self::new(value, MatchKind::Suffix, false)
    }

    /// Create a new case-insensitive contains pattern
    pub fn contains(value: impl Into<String>) -> Self {
        Self::new(value, MatchKind::Contains, false)
    }

    /// Make pattern case sensitive
    pub fn case_sensitive(mut self) -> Self {
        self.case_sensitive = true;
        self
    }

    /// Validate length and alphabet
    pub fn validate(&self) -> Result<(), PatternError> {
        let len = self.value.chars().count();
        if len < MIN_PATTERN_LEN {
            return Err(PatternError::TooShort(len));
        }
        if len > MAX_PATTERN_LEN {
            return Err(PatternError::TooLong(len));
        }
        if let Some(c) = self.value.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(PatternError::InvalidCharacter(c));
        }
        Ok(())
    }

    /// Check an address against this pattern
    pub fn matches(&self, address: &str) -> bool {
        matches(address, &self.value, self.kind, self.case_sensitive)
    }

    /// Pattern length in characters
    pub fn len(&self) -> usize {
        self.value.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}
