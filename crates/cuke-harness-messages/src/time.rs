//! Timestamps and durations for protocol messages.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

const NANOS_PER_MILLI: u128 = 1_000_000;
const MILLIS_PER_SECOND: u128 = 1_000;

/// A point in time as seconds and nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Timestamp {
    /// Whole seconds since the epoch.
    pub seconds: i64,
    /// Additional nanoseconds.
    pub nanos: i32,
}

impl Timestamp {
    /// Capture the current wall-clock time.
    ///
    /// A clock set before the Unix epoch yields the epoch itself.
    #[must_use]
    pub fn now() -> Self {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or_else(|_| Self::default(), |elapsed| {
                Self::from_millis(elapsed.as_millis())
            })
    }

    /// Build a timestamp from milliseconds since the epoch.
    #[must_use]
    pub fn from_millis(millis: u128) -> Self {
        Self {
            seconds: i64::try_from(millis / MILLIS_PER_SECOND).unwrap_or(i64::MAX),
            nanos: i32::try_from((millis % MILLIS_PER_SECOND) * NANOS_PER_MILLI).unwrap_or(0),
        }
    }
}

/// An elapsed duration as seconds and nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MessageDuration {
    /// Whole seconds.
    pub seconds: i64,
    /// Additional nanoseconds.
    pub nanos: i32,
}

impl MessageDuration {
    /// Build a duration from elapsed milliseconds.
    #[must_use]
    pub fn from_millis(millis: u128) -> Self {
        Self {
            seconds: i64::try_from(millis / MILLIS_PER_SECOND).unwrap_or(i64::MAX),
            nanos: i32::try_from((millis % MILLIS_PER_SECOND) * NANOS_PER_MILLI).unwrap_or(0),
        }
    }
}
