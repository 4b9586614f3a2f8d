use thiserror::Error;

use crate::ClockTime;

/// Problems with a search window or the values it is built from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    #[error("invalid time `{0}`, expected HH:MM")]
    InvalidTime(String),

    #[error("invalid date `{0}`, expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("duration must be at least one hour")]
    ZeroDuration,

    #[error("start time {start} must be before end time {end}")]
    StartNotBeforeEnd { start: ClockTime, end: ClockTime },

    #[error("{hours}h does not fit between {start} and {end}")]
    DurationExceedsWindow {
        start: ClockTime,
        end: ClockTime,
        hours: u32,
    },

    #[error("select at least one studio")]
    NoStudios,

    #[error("at most {max} studios can be compared at once, got {got}")]
    TooManyStudios { max: usize, got: usize },
}
