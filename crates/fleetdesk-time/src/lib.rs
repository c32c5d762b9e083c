//! Simple wrappers to make many errors hard to make

#![warn(unused_crate_dependencies)]

use std::{fmt::Display, time::Duration};

/// Intended to be similar to Duration but always clear that it is in Seconds
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, PartialOrd, Ord,
)]
pub struct Seconds(u64);

/// Seconds since the unix epoch. Keeps on ticking if the computer is sleeping
/// which is what we need when comparing against the `exp` claim of a token
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, PartialOrd, Ord,
)]
pub struct Timestamp(u64);

impl Timestamp {
    pub fn now() -> Self {
        Self(
            web_time::SystemTime::UNIX_EPOCH
                .elapsed()
                .map(|x| x.as_secs())
                .unwrap_or_default(),
        )
    }

    pub const fn from_secs_since_unix_epoch(secs: u64) -> Self {
        Self(secs)
    }

    pub fn as_secs_since_unix_epoch(&self) -> Seconds {
        self.0.into()
    }

    pub fn as_utc_datetime(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::from_timestamp(self.0.try_into().ok()?, 0)
    }

    /// Returns true if this timestamp is at or before the current time
    pub fn is_past(&self) -> bool {
        *self <= Self::now()
    }

    /// Returns the number of seconds since `past_time` or None if `past_time`
    /// is in the future
    pub fn seconds_since(self, past_time: Self) -> Option<Seconds> {
        if self.0 < past_time.0 {
            None
        } else {
            Some(Seconds(self.0 - past_time.0))
        }
    }

    /// Returns the number of seconds left until this timestamp or None if it
    /// has already passed
    pub fn remaining(self) -> Option<Seconds> {
        self.seconds_since(Self::now())
    }
}

impl std::ops::Add<Seconds> for Timestamp {
    type Output = Self;

    fn add(self, rhs: Seconds) -> Self::Output {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl std::ops::Sub<Seconds> for Timestamp {
    type Output = Self;

    fn sub(self, rhs: Seconds) -> Self::Output {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl TryFrom<chrono::DateTime<chrono::Utc>> for Timestamp {
    type Error = anyhow::Error;

    fn try_from(value: chrono::DateTime<chrono::Utc>) -> Result<Self, Self::Error> {
        let secs = value.timestamp();
        if secs < 0 {
            anyhow::bail!("timestamps before the unix epoch are not supported. Value: {value}");
        }
        Ok(Self(secs as u64))
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.as_utc_datetime() {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%SZ")),
            None => write!(f, "{}s since epoch", self.0),
        }
    }
}

impl Seconds {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }
}

impl From<u64> for Seconds {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Seconds> for u64 {
    fn from(value: Seconds) -> Self {
        value.0
    }
}

impl From<Seconds> for Duration {
    fn from(value: Seconds) -> Self {
        Duration::from_secs(value.0)
    }
}

impl From<Duration> for Seconds {
    fn from(value: Duration) -> Self {
        value.as_secs().into()
    }
}

impl Display for Seconds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
