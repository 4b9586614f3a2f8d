//! Turns a room's open slots into bookable ranges for a requested window.

use studionavi_common::{AvailableTimeSlot, ClockTime};
use thiserror::Error;

/// Nothing longer than a day fits in one day's slots.
pub const MAX_DURATION_HOURS: u32 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenSlot {
    pub start: ClockTime,
    pub end: ClockTime,
}

/// One room of a studio and the slots nobody has booked on a given day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomAvailability {
    pub room_name: String,
    /// Bookings in this room begin at half past the hour.
    pub starts_at_thirty: bool,
    pub slots: Vec<OpenSlot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckerError {
    #[error("利用時間は正の値である必要があります")]
    ZeroDuration,

    #[error("開始時刻({start})は終了時刻({end})より前である必要があります")]
    InvalidRange { start: ClockTime, end: ClockTime },

    #[error("利用時間({0}時間)は24時間以内である必要があります")]
    DurationTooLong(u32),
}

/// Find every range of at least `duration_hours` inside `start..end` that can
/// be booked on each room's grid.
pub fn find_available_slots(
    rooms: &[RoomAvailability],
    start: ClockTime,
    end: ClockTime,
    duration_hours: u32,
) -> Result<Vec<AvailableTimeSlot>, CheckerError> {
    if duration_hours == 0 {
        return Err(CheckerError::ZeroDuration);
    }
    if duration_hours > MAX_DURATION_HOURS {
        return Err(CheckerError::DurationTooLong(duration_hours));
    }
    let end = end.as_end_bound();
    if start >= end {
        return Err(CheckerError::InvalidRange { start, end });
    }

    let min_minutes = duration_hours * 60;
    let range_start = u32::from(start.minutes());
    let range_end = u32::from(end.minutes());

    let mut result = Vec::new();
    for room in rooms {
        let offset = if room.starts_at_thirty { 30 } else { 0 };
        for (slot_start, slot_end) in merge_slots(&room.slots) {
            let clipped_start = slot_start.max(range_start);
            let clipped_end = slot_end.min(range_end);
            if clipped_start >= clipped_end {
                continue;
            }

            let aligned_start = align_up(clipped_start, offset);
            let aligned_end = align_down(clipped_end, offset);
            if aligned_end < aligned_start || aligned_end - aligned_start < min_minutes {
                continue;
            }

            result.push(AvailableTimeSlot {
                start: to_clock(aligned_start),
                end: to_clock(aligned_end),
                room_name: room.room_name.clone(),
                starts_at_thirty: room.starts_at_thirty,
            });
        }
    }
    Ok(result)
}

/// Sorted, non-empty, non-touching intervals in minutes.
fn merge_slots(slots: &[OpenSlot]) -> Vec<(u32, u32)> {
    let mut intervals: Vec<(u32, u32)> = slots
        .iter()
        .map(|s| (u32::from(s.start.minutes()), u32::from(s.end.as_end_bound().minutes())))
        .filter(|(s, e)| s < e)
        .collect();
    intervals.sort_unstable();

    let mut merged: Vec<(u32, u32)> = Vec::with_capacity(intervals.len());
    for (start, end) in intervals {
        match merged.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }
    merged
}

/// Smallest grid point `>= minutes`, where the grid is every hour at `offset`.
fn align_up(minutes: u32, offset: u32) -> u32 {
    let shifted = minutes + 60 - offset;
    let rem = shifted % 60;
    if rem == 0 {
        minutes
    } else {
        minutes + 60 - rem
    }
}

/// Largest grid point `<= minutes`.
fn align_down(minutes: u32, offset: u32) -> u32 {
    let rem = (minutes + 60 - offset) % 60;
    minutes.saturating_sub(rem)
}

fn to_clock(minutes: u32) -> ClockTime {
    ClockTime::from_minutes(minutes.min(24 * 60) as u16).unwrap_or(ClockTime::END_OF_DAY)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> ClockTime {
        ClockTime::parse_end(s).unwrap()
    }

    fn room(name: &str, thirty: bool, slots: &[(&str, &str)]) -> RoomAvailability {
        RoomAvailability {
            room_name: name.to_string(),
            starts_at_thirty: thirty,
            slots: slots
                .iter()
                .map(|(s, e)| OpenSlot {
                    start: s.parse().unwrap(),
                    end: t(e),
                })
                .collect(),
        }
    }

    fn ranges(slots: &[AvailableTimeSlot]) -> Vec<(String, String)> {
        slots.iter().map(|s| (s.start.to_string(), s.end.to_string())).collect()
    }

    #[test]
    fn on_the_hour_room_is_clipped_to_window() {
        let rooms = [room("Studio A", false, &[("09:00", "12:00")])];
        let found = find_available_slots(&rooms, t("10:00"), t("11:00"), 1).unwrap();
        assert_eq!(ranges(&found), vec![("10:00".into(), "11:00".into())]);
        assert_eq!(found[0].room_name, "Studio A");
    }

    #[test]
    fn thirty_minute_room_needs_half_past_start() {
        let rooms = [room("Studio B", true, &[("09:00", "12:00")])];

        let found = find_available_slots(&rooms, t("10:00"), t("11:00"), 1).unwrap();
        assert!(found.is_empty());

        let found = find_available_slots(&rooms, t("10:30"), t("11:30"), 1).unwrap();
        assert_eq!(ranges(&found), vec![("10:30".into(), "11:30".into())]);
        assert!(found[0].starts_at_thirty);
    }

    #[test]
    fn thirty_minute_room_loses_trailing_half_hour() {
        let rooms = [room("Studio B", true, &[("10:00", "13:00")])];
        let found = find_available_slots(&rooms, t("09:00"), t("18:00"), 2).unwrap();
        assert_eq!(ranges(&found), vec![("10:30".into(), "12:30".into())]);
    }

    #[test]
    fn range_ending_at_midnight() {
        let rooms = [room("Studio D", false, &[("22:00", "00:00")])];
        let found = find_available_slots(&rooms, t("23:00"), t("00:00"), 1).unwrap();
        assert_eq!(ranges(&found), vec![("23:00".into(), "24:00".into())]);
    }

    #[test]
    fn edge_durations() {
        let rooms = [room("Studio E", false, &[("13:00", "18:00")])];

        let found = find_available_slots(&rooms, t("13:00"), t("18:00"), 5).unwrap();
        assert_eq!(found.len(), 1);

        let found = find_available_slots(&rooms, t("17:30"), t("19:00"), 1).unwrap();
        assert!(found.is_empty());

        assert_eq!(
            find_available_slots(&rooms, t("14:00"), t("15:00"), 0),
            Err(CheckerError::ZeroDuration)
        );
    }

    #[test]
    fn oversized_duration_is_rejected() {
        let rooms = [room("Studio A", false, &[("00:00", "00:00")])];
        assert_eq!(
            find_available_slots(&rooms, t("10:00"), t("12:00"), 71_582_789),
            Err(CheckerError::DurationTooLong(71_582_789))
        );
        assert_eq!(
            find_available_slots(&rooms, t("10:00"), t("12:00"), u32::MAX),
            Err(CheckerError::DurationTooLong(u32::MAX))
        );
        let whole_day = find_available_slots(&rooms, ClockTime::MIDNIGHT, t("00:00"), 24).unwrap();
        assert_eq!(ranges(&whole_day), vec![("00:00".into(), "24:00".into())]);
    }

    #[test]
    fn inverted_range_is_rejected() {
        let rooms = [room("A", false, &[("10:00", "12:00")])];
        assert!(matches!(
            find_available_slots(&rooms, t("12:00"), t("10:00"), 1),
            Err(CheckerError::InvalidRange { .. })
        ));
    }

    #[test]
    fn touching_and_overlapping_slots_merge() {
        let rooms = [room(
            "A",
            false,
            &[("14:00", "16:00"), ("10:00", "12:00"), ("12:00", "13:00"), ("12:30", "14:00")],
        )];
        let found = find_available_slots(&rooms, ClockTime::MIDNIGHT, t("00:00"), 6).unwrap();
        assert_eq!(ranges(&found), vec![("10:00".into(), "16:00".into())]);
    }

    #[test]
    fn short_fragments_are_dropped() {
        let rooms = [room("A", false, &[("10:00", "11:00"), ("13:00", "16:00")])];
        let found = find_available_slots(&rooms, t("09:00"), t("20:00"), 2).unwrap();
        assert_eq!(ranges(&found), vec![("13:00".into(), "16:00".into())]);
    }

    #[test]
    fn rooms_keep_their_order() {
        let rooms = [
            room("B", false, &[("18:00", "20:00")]),
            room("A", false, &[("10:00", "12:00")]),
            room("C", false, &[]),
        ];
        let found = find_available_slots(&rooms, t("09:00"), t("22:00"), 1).unwrap();
        let names: Vec<&str> = found.iter().map(|s| s.room_name.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
    }

    #[test]
    fn grid_alignment() {
        assert_eq!(align_up(600, 0), 600);
        assert_eq!(align_up(601, 0), 660);
        assert_eq!(align_up(600, 30), 630);
        assert_eq!(align_up(630, 30), 630);
        assert_eq!(align_down(1439, 0), 1380);
        assert_eq!(align_down(1440, 30), 1410);
        assert_eq!(align_down(20, 30), 0);
    }
}
