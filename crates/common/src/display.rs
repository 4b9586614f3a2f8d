use serde::Serialize;

use crate::AvailableTimeSlot;

/// Shown in place of a missing room name.
pub const UNSPECIFIED_ROOM: &str = "未指定";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomTimeRanges {
    pub room_name: String,
    pub time_ranges: Vec<String>,
}

/// Group slots by room, keeping rooms in order of first appearance, and
/// render each slot as `start〜end`.
pub fn group_by_room(slots: &[AvailableTimeSlot]) -> Vec<RoomTimeRanges> {
    let mut groups: Vec<RoomTimeRanges> = Vec::new();
    for slot in slots {
        let room = if slot.room_name.trim().is_empty() {
            UNSPECIFIED_ROOM
        } else {
            slot.room_name.as_str()
        };
        let range = format!("{}〜{}", slot.start, slot.end);
        match groups.iter_mut().find(|g| g.room_name == room) {
            Some(group) => group.time_ranges.push(range),
            None => groups.push(RoomTimeRanges {
                room_name: room.to_string(),
                time_ranges: vec![range],
            }),
        }
    }
    groups
}
