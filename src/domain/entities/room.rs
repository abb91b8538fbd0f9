//! Room entity and name policy.
//!
//! Rooms are named broadcast groups. Only the name policy and the
//! listing projection live here; membership is owned by the relay hub.

use serde::Serialize;

/// Minimum room name length in characters.
pub const ROOM_NAME_MIN_LEN: usize = 3;

/// Maximum room name length in characters.
pub const ROOM_NAME_MAX_LEN: usize = 30;

/// Check a room name against the format policy.
///
/// Names are 3-30 characters of ASCII letters, digits, `-` and `_`.
pub fn validate_room(name: &str) -> bool {
    let len = name.chars().count();
    (ROOM_NAME_MIN_LEN..=ROOM_NAME_MAX_LEN).contains(&len)
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Public listing entry for a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub name: String,
    pub member_count: usize,
}
