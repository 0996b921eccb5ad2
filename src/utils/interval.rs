// src/utils/interval.rs
use crate::error::EngineError;
use std::time::Duration;

/// Parses `"30s"`, `"5m"`, `"1h"`, `"1d"` or a bare number of seconds.
pub fn parse_interval(raw: &str) -> Result<Duration, EngineError> {
    let raw = raw.trim();
    let invalid = || EngineError::InvalidInterval(raw.to_string());

    let (digits, unit) = match raw.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => (&raw[..idx], Some(c)),
        Some(_) => (raw, None),
        None => return Err(invalid()),
    };

    let multiplier = match unit {
        None | Some('s') => 1,
        Some('m') => 60,
        Some('h') => 3_600,
        Some('d') => 86_400,
        Some(_) => return Err(invalid()),
    };

    let value: u64 = digits.parse().map_err(|_| invalid())?;
    let secs = value.checked_mul(multiplier).ok_or_else(invalid)?;
    Ok(Duration::from_secs(secs))
}
