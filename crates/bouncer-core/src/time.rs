use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A UTC wall-clock instant, serialized as RFC 3339 / epoch seconds at the
/// store boundary depending on backend needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The current instant.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Wrap an existing `DateTime<Utc>`.
    #[must_use]
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Construct from Unix epoch seconds.
    #[must_use]
    pub fn from_unix(secs: i64) -> Self {
        Self(DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now))
    }

    /// Unix epoch seconds.
    #[must_use]
    pub fn unix_timestamp(self) -> i64 {
        self.0.timestamp()
    }

    /// Add a duration given in seconds, saturating on overflow.
    #[must_use]
    pub fn plus_seconds(self, secs: i64) -> Self {
        Self(self.0 + chrono::Duration::seconds(secs))
    }

    /// True if this instant is strictly before now.
    #[must_use]
    pub fn is_past(self) -> bool {
        self.0 < Utc::now()
    }

    /// Seconds remaining until this instant, zero if already past.
    #[must_use]
    pub fn remaining_seconds(self) -> i64 {
        (self.0 - Utc::now()).num_seconds().max(0)
    }

    /// Unwrap into the underlying `chrono` type.
    #[must_use]
    pub fn into_inner(self) -> DateTime<Utc> {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%dT%H:%M:%SZ"))
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plus_seconds_moves_forward() {
        let now = Timestamp::now();
        let later = now.plus_seconds(60);
        assert!(later > now);
    }

    #[test]
    fn unix_round_trip() {
        let ts = Timestamp::from_unix(1_700_000_000);
        assert_eq!(ts.unix_timestamp(), 1_700_000_000);
    }

    #[test]
    fn remaining_seconds_zero_when_past() {
        let past = Timestamp::now().plus_seconds(-100);
        assert_eq!(past.remaining_seconds(), 0);
    }
}
