//! Relay error taxonomy.

/// Failures of a single inbound operation.
///
/// None of these close the connection; the router turns them into an
/// `error` reply or drops them, see [`RelayError::reply`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    #[error("Malformed input")]
    MalformedInput,

    #[error("{0}")]
    Validation(String),

    #[error("Message too large ({size} bytes, limit {max})")]
    FrameTooLarge { size: usize, max: usize },

    #[error("Invalid room name")]
    InvalidRoomName,

    #[error("Room {0} does not exist")]
    RoomNotFound(String),

    #[error("Maximum number of rooms reached")]
    RoomLimitExceeded { max: usize },

    #[error("Not a member of room {0}")]
    NotInRoom(String),

    #[error("Target device not found or offline")]
    TargetUnavailable(String),

    #[error("Session {0} is already registered")]
    DuplicateSession(String),

    #[error("Session {0} is not registered")]
    UnknownSession(String),
}

impl RelayError {
    /// Text of the `error` reply for this failure, `None` when it is
    /// dropped without a reply.
    pub fn reply(&self) -> Option<String> {
        match self {
            RelayError::MalformedInput | RelayError::UnknownSession(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// Stable label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::MalformedInput => "malformed",
            RelayError::Validation(_) => "validation",
            RelayError::FrameTooLarge { .. } => "frame_too_large",
            RelayError::InvalidRoomName => "invalid_room",
            RelayError::RoomNotFound(_) => "room_not_found",
            RelayError::RoomLimitExceeded { .. } => "room_limit",
            RelayError::NotInRoom(_) => "not_in_room",
            RelayError::TargetUnavailable(_) => "target_unavailable",
            RelayError::DuplicateSession(_) => "duplicate_session",
            RelayError::UnknownSession(_) => "unknown_session",
        }
    }
}
