//! Room listing handler.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::domain::RoomSummary;
use crate::startup::AppState;

#[derive(Debug, Serialize)]
pub struct RoomsResponse {
    pub rooms: Vec<RoomSummary>,
}

/// `GET /api/rooms` - room names with their current member counts
pub async fn list_rooms(State(state): State<AppState>) -> Json<RoomsResponse> {
    Json(RoomsResponse {
        rooms: state.relay.room_summaries(),
    })
}
