//! Difficulty and search-space estimates for vanity patterns

use crate::MatchKind;

/// Characters in a user-friendly address
const ADDRESS_LEN: usize = 48;
/// Base64url alphabet size
const ADDRESS_ALPHABET: f64 = 64.0;

/// Number of candidates for a hex pattern of `pattern_len` characters (16^len).
///
/// This is the figure the progress ETA is measured against.
pub fn search_space(pattern_len: usize) -> u64 {
    16u64.saturating_pow(pattern_len as u32)
}

/// Expected number of attempts to hit `pattern` in a base64url address
pub fn calculate_difficulty(pattern: &str, kind: MatchKind, case_sensitive: bool) -> f64 {
    let pattern_len = pattern.chars().count();
    let mut difficulty = ADDRESS_ALPHABET.powi(pattern_len as i32);

    if !case_sensitive {
        // Each letter matches both its cases
        let num_letters = pattern.chars().filter(|c| c.is_ascii_alphabetic()).count();
        difficulty /= 2.0_f64.powi(num_letters as i32);
    }

    if kind == MatchKind::Contains {
        let positions = (ADDRESS_LEN as f64 - pattern_len as f64 + 1.0).max(1.0);
        difficulty /= positions;
    }

    difficulty
}

/// Format an attempt count as human-readable string
pub fn format_attempts(attempts: u64) -> String {
    let n = attempts as f64;
    if n >= 1e12 {
        format!("{:.2}T", n / 1e12)
    } else if n >= 1e9 {
        format!("{:.2}G", n / 1e9)
    } else if n >= 1e6 {
        format!("{:.2}M", n / 1e6)
    } else if n >= 1e3 {
        format!("{:.2}K", n / 1e3)
    } else {
        format!("{}", attempts)
    }
}

/// Format duration in human-readable format
pub fn format_duration(seconds: f64) -> String {
    if seconds < 1.0 {
        format!("{:.0}ms", seconds * 1000.0)
    } else if seconds < 60.0 {
        format!("{:.1}s", seconds)
    } else if seconds < 3600.0 {
        let mins = seconds / 60.0;
        format!("{:.1}m", mins)
    } else if seconds < 86400.0 {
        let hours = seconds / 3600.0;
        format!("{:.1}h", hours)
    } else if seconds < 86400.0 * 365.0 {
        let days = seconds / 86400.0;
        format!("{:.1}d", days)
    } else {
        let years = seconds / (86400.0 * 365.0);
        format!("{:.1}y", years)
    }
}
