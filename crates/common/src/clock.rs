use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::WindowError;

const MINUTES_PER_DAY: u16 = 24 * 60;

/// Wall-clock time of day with minute precision.
///
/// Unlike `chrono::NaiveTime` this can hold `24:00`, which studios use to
/// say a range runs until midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime(u16);

impl ClockTime {
    pub const MIDNIGHT: ClockTime = ClockTime(0);
    pub const END_OF_DAY: ClockTime = ClockTime(MINUTES_PER_DAY);

    /// Literal constructor; values past `24:00` saturate to `24:00`.
    pub const fn at(hour: u16, minute: u16) -> Self {
        let minutes = hour * 60 + minute;
        if minutes > MINUTES_PER_DAY {
            ClockTime(MINUTES_PER_DAY)
        } else {
            ClockTime(minutes)
        }
    }

    pub fn from_minutes(minutes: u16) -> Option<Self> {
        (minutes <= MINUTES_PER_DAY).then_some(ClockTime(minutes))
    }

    pub fn from_hm(hour: u16, minute: u16) -> Option<Self> {
        if minute >= 60 {
            return None;
        }
        Self::from_minutes(hour.checked_mul(60)?.checked_add(minute)?)
    }

    pub fn minutes(self) -> u16 {
        self.0
    }

    pub fn hour(self) -> u16 {
        self.0 / 60
    }

    pub fn minute(self) -> u16 {
        self.0 % 60
    }

    /// Treat `00:00` as `24:00`. Used when the value closes a range.
    pub fn as_end_bound(self) -> Self {
        if self.0 == 0 {
            Self::END_OF_DAY
        } else {
            self
        }
    }

    /// Parse a value that closes a range, so `00:00` reads as `24:00`.
    pub fn parse_end(s: &str) -> Result<Self, WindowError> {
        s.parse::<ClockTime>().map(ClockTime::as_end_bound)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for ClockTime {
    type Err = WindowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || WindowError::InvalidTime(s.to_string());
        let (hour, minute) = s.trim().split_once(':').ok_or_else(invalid)?;
        if hour.is_empty() || hour.len() > 2 || minute.len() != 2 {
            return Err(invalid());
        }
        let hour: u16 = hour.parse().map_err(|_| invalid())?;
        let minute: u16 = minute.parse().map_err(|_| invalid())?;
        ClockTime::from_hm(hour, minute).ok_or_else(invalid)
    }
}

impl From<chrono::NaiveTime> for ClockTime {
    fn from(t: chrono::NaiveTime) -> Self {
        use chrono::Timelike;
        ClockTime((t.hour() * 60 + t.minute()) as u16)
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
