use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;

use crate::{
    dto::participant_dto::{AddParticipantsPayload, ParticipantListResponse, ParticipantResponse},
    error::Result,
    middleware::auth::Claims,
    models::user::Actor,
    routes::{acting_actor, acting_company},
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/events/{id}/participants",
    params(
        ("id" = Uuid, Path, description = "Assessment event ID")
    ),
    responses(
        (status = 200, description = "Counts of added and already registered assessees"),
        (status = 400, description = "Unknown assessee or assessor; nothing was added"),
        (status = 403, description = "Event belongs to another company")
    )
)]
#[axum::debug_handler]
pub async fn add_participants(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddParticipantsPayload>,
) -> Result<impl IntoResponse> {
    let company = acting_company(&state, &claims).await?;
    let res = state
        .participation_service
        .add_participants(id, company.id, payload)
        .await?;
    Ok(Json(res))
}

/// Companies get the full roster; assessors get their own pairs while the
/// event runs.
#[utoipa::path(
    get,
    path = "/api/events/{id}/participants",
    params(
        ("id" = Uuid, Path, description = "Assessment event ID")
    ),
    responses(
        (status = 200, description = "Participants visible to the caller"),
        (status = 403, description = "Caller has no relation to the event")
    )
)]
#[axum::debug_handler]
pub async fn list_participants(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let rows = match acting_actor(&state, &claims).await? {
        Actor::Company(company) => {
            state
                .participation_service
                .list_participants(id, company.id)
                .await?
        }
        Actor::Assessor(assessor) => {
            state
                .participation_service
                .active_participants(id, assessor.id)
                .await?
        }
    };
    Ok(Json(ParticipantListResponse {
        items: rows
            .into_iter()
            .map(|(part, assessee)| ParticipantResponse::new(part, assessee))
            .collect(),
    }))
}
