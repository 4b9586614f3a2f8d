use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::{ClockTime, WindowError};

pub type StudioId = i64;

/// Upper bound on how many studios one comparison may include.
pub const MAX_SELECTED_STUDIOS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Studio {
    pub id: StudioId,
    pub name: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub address: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub hours: String,
    #[serde(default, alias = "self_booking_start", deserialize_with = "nullable_string")]
    pub self_booking_start: String,
    #[serde(default = "default_true", alias = "has_availability")]
    pub has_availability: bool,
}

impl Studio {
    /// A studio known only by id, used when its details could not be loaded.
    pub fn placeholder(id: StudioId) -> Self {
        Studio {
            id,
            name: format!("スタジオ #{}", id),
            address: String::new(),
            hours: String::new(),
            self_booking_start: String::new(),
            has_availability: true,
        }
    }
}

fn default_true() -> bool {
    true
}

pub(crate) fn nullable_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Date and time range a user wants to rehearse in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SearchWindow {
    pub date: NaiveDate,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    pub duration_hours: u32,
}

impl SearchWindow {
    pub fn new(date: NaiveDate, start_time: ClockTime, end_time: ClockTime, duration_hours: u32) -> Self {
        SearchWindow {
            date,
            start_time,
            end_time: end_time.as_end_bound(),
            duration_hours,
        }
    }

    /// Build a window from the textual form used on the command line and in
    /// query strings.
    pub fn parse(date: &str, start: &str, end: &str, duration_hours: u32) -> Result<Self, WindowError> {
        let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
            .map_err(|_| WindowError::InvalidDate(date.to_string()))?;
        Ok(SearchWindow::new(date, start.parse()?, ClockTime::parse_end(end)?, duration_hours))
    }

    /// Check ordering and that the duration fits. The aggregator trusts
    /// callers to have done this.
    pub fn validate(&self) -> Result<(), WindowError> {
        if self.duration_hours == 0 {
            return Err(WindowError::ZeroDuration);
        }
        if self.start_time >= self.end_time {
            return Err(WindowError::StartNotBeforeEnd {
                start: self.start_time,
                end: self.end_time,
            });
        }
        let span = u32::from(self.end_time.minutes() - self.start_time.minutes());
        let fits = self.duration_hours.checked_mul(60).is_some_and(|needed| span >= needed);
        if !fits {
            return Err(WindowError::DurationExceedsWindow {
                start: self.start_time,
                end: self.end_time,
                hours: self.duration_hours,
            });
        }
        Ok(())
    }

    /// Query parameters of the availability endpoint.
    pub fn query_pairs(&self) -> [(&'static str, String); 4] {
        [
            ("date", self.date.format("%Y-%m-%d").to_string()),
            ("start", self.start_time.to_string()),
            ("end", self.end_time.to_string()),
            ("duration", self.duration_hours.to_string()),
        ]
    }
}

/// Check the size of a studio selection.
pub fn validate_selection(count: usize) -> Result<(), WindowError> {
    match count {
        0 => Err(WindowError::NoStudios),
        n if n > MAX_SELECTED_STUDIOS => Err(WindowError::TooManyStudios {
            max: MAX_SELECTED_STUDIOS,
            got: n,
        }),
        _ => Ok(()),
    }
}

/// One contiguous bookable interval in one room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableTimeSlot {
    pub start: ClockTime,
    pub end: ClockTime,
    #[serde(default, alias = "room_name", deserialize_with = "nullable_string")]
    pub room_name: String,
    #[serde(default, alias = "starts_at_thirty")]
    pub starts_at_thirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudioAvailability {
    pub studio_id: StudioId,
    pub studio_name: String,
    pub available_ranges: Vec<AvailableTimeSlot>,
}

impl StudioAvailability {
    /// No open ranges: confirmed fully booked, not an error.
    pub fn is_full(&self) -> bool {
        self.available_ranges.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Network,
    Server,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchFailure {
    pub studio_id: StudioId,
    pub studio_name: String,
    pub error_message: String,
    pub error_code: String,
    pub kind: FailureKind,
}

/// What one studio's lookup produced during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FetchOutcome {
    Ok(StudioAvailability),
    Failed(FetchFailure),
}

impl FetchOutcome {
    pub fn studio_id(&self) -> StudioId {
        match self {
            FetchOutcome::Ok(a) => a.studio_id,
            FetchOutcome::Failed(f) => f.studio_id,
        }
    }

    pub fn studio_name(&self) -> &str {
        match self {
            FetchOutcome::Ok(a) => &a.studio_name,
            FetchOutcome::Failed(f) => &f.studio_name,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FetchOutcome::Failed(_))
    }
}
