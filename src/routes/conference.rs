use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json},
    Extension,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::Result,
    middleware::auth::Claims,
    models::video_conference::VideoConferenceRoom,
    routes::acting_assessor,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct AddRoleplayerPayload {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct RoomResponse {
    pub id: Uuid,
    pub external_room_id: Option<String>,
    pub is_locked: bool,
    pub roleplayer_ids: Vec<Uuid>,
}

impl From<VideoConferenceRoom> for RoomResponse {
    fn from(room: VideoConferenceRoom) -> Self {
        Self {
            id: room.id,
            external_room_id: room.external_room_id,
            is_locked: room.is_locked,
            roleplayer_ids: room.roleplayer_ids,
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/events/{id}/assessees/{assessee_id}/room",
    params(
        ("id" = Uuid, Path, description = "Assessment event ID"),
        ("assessee_id" = Uuid, Path, description = "Assessee ID")
    ),
    responses(
        (status = 200, description = "Room ready to join"),
        (status = 400, description = "Event not running or room locked"),
        (status = 401, description = "Caller is not a member of the room")
    )
)]
#[axum::debug_handler]
pub async fn initiate_room(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((id, assessee_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse> {
    let principal = state.identity_service.resolve_principal(&claims.sub).await?;
    let room = state
        .conference_service
        .initiate_room(id, assessee_id, principal.id())
        .await?;
    Ok(Json(RoomResponse::from(room)))
}

#[utoipa::path(
    post,
    path = "/api/rooms/{id}/roleplayers",
    params(
        ("id" = Uuid, Path, description = "Room ID")
    ),
    responses(
        (status = 200, description = "Roleplayer added"),
        (status = 400, description = "Unknown assessor or locked room"),
        (status = 401, description = "Caller is not the paired assessor")
    )
)]
#[axum::debug_handler]
pub async fn add_roleplayer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddRoleplayerPayload>,
) -> Result<impl IntoResponse> {
    let assessor = acting_assessor(&state, &claims).await?;
    let room = state
        .conference_service
        .add_roleplayer(id, &payload.email, assessor.id)
        .await?;
    Ok(Json(RoomResponse::from(room)))
}

#[utoipa::path(
    post,
    path = "/api/rooms/{id}/lock",
    params(
        ("id" = Uuid, Path, description = "Room ID")
    ),
    responses(
        (status = 200, description = "Room locked; repeated calls are no-ops"),
        (status = 401, description = "Caller is not the paired assessor")
    )
)]
#[axum::debug_handler]
pub async fn lock_room(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let assessor = acting_assessor(&state, &claims).await?;
    let room = state.conference_service.lock_room(id, assessor.id).await?;
    Ok(Json(RoomResponse::from(room)))
}
