//! In-game clock measured in seconds since midnight of day 1.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

pub const SECONDS_PER_MINUTE: u64 = 60;
pub const SECONDS_PER_HOUR: u64 = 3_600;
pub const SECONDS_PER_DAY: u64 = 86_400;
/// One combat round.
pub const SECONDS_PER_ROUND: u64 = 6;

/// Seconds since midnight of day 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameTime(u64);

/// Calendar components of a [`GameTime`]; `day` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameTimeBreakdown {
    pub day: u64,
    pub hour: u64,
    pub minute: u64,
    pub second: u64,
}

/// A span to move the clock forward by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeAdvance {
    #[serde(default)]
    pub seconds: u64,
    #[serde(default)]
    pub minutes: u64,
    #[serde(default)]
    pub hours: u64,
    #[serde(default)]
    pub days: u64,
    #[serde(default)]
    pub rounds: u64,
}

impl TimeAdvance {
    pub fn total_seconds(&self) -> Result<u64, DomainError> {
        let parts = [
            Some(self.seconds),
            self.minutes.checked_mul(SECONDS_PER_MINUTE),
            self.hours.checked_mul(SECONDS_PER_HOUR),
            self.days.checked_mul(SECONDS_PER_DAY),
            self.rounds.checked_mul(SECONDS_PER_ROUND),
        ];
        parts
            .into_iter()
            .try_fold(0u64, |acc, part| part.and_then(|p| acc.checked_add(p)))
            .ok_or_else(|| DomainError::validation("time advance is too large"))
    }
}

impl GameTime {
    pub fn from_seconds(seconds: u64) -> Self {
        Self(seconds)
    }

    /// Build from a 1-based day and clock components.
    pub fn from_parts(day: u64, hour: u64, minute: u64, second: u64) -> Result<Self, DomainError> {
        if day == 0 {
            return Err(DomainError::validation("day is 1-based and cannot be 0"));
        }
        if hour > 23 || minute > 59 || second > 59 {
            return Err(DomainError::validation(format!(
                "invalid clock time {}:{:02}:{:02}",
                hour, minute, second
            )));
        }
        (day - 1)
            .checked_mul(SECONDS_PER_DAY)
            .and_then(|d| {
                d.checked_add(hour * SECONDS_PER_HOUR + minute * SECONDS_PER_MINUTE + second)
            })
            .map(Self)
            .ok_or_else(|| DomainError::validation("game time is too large"))
    }

    pub fn seconds(&self) -> u64 {
        self.0
    }

    /// Move forward; advancing by zero is rejected.
    pub fn advance(self, by: &TimeAdvance) -> Result<Self, DomainError> {
        let seconds = by.total_seconds()?;
        if seconds == 0 {
            return Err(DomainError::validation("must advance by at least 1 second"));
        }
        self.0
            .checked_add(seconds)
            .map(Self)
            .ok_or_else(|| DomainError::validation("game time is too large"))
    }

    pub fn breakdown(&self) -> GameTimeBreakdown {
        let rem = self.0 % SECONDS_PER_DAY;
        GameTimeBreakdown {
            day: self.0 / SECONDS_PER_DAY + 1,
            hour: rem / SECONDS_PER_HOUR,
            minute: (rem % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE,
            second: rem % SECONDS_PER_MINUTE,
        }
    }
}

impl fmt::Display for GameTime {
    /// "Day 3, 2:05 PM", with seconds only when non-zero.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = self.breakdown();
        let period = if parts.hour < 12 { "AM" } else { "PM" };
        let display_hour = match parts.hour % 12 {
            0 => 12,
            h => h,
        };
        if parts.second > 0 {
            write!(
                f,
                "Day {}, {}:{:02}:{:02} {}",
                parts.day, display_hour, parts.minute, parts.second, period
            )
        } else {
            write!(
                f,
                "Day {}, {}:{:02} {}",
                parts.day, display_hour, parts.minute, period
            )
        }
    }
}
