use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;

use crate::{
    dto::attempt_dto::{AttemptListResponse, AttemptResponse, GradeAttemptPayload, SubmitAttemptPayload},
    error::Result,
    middleware::auth::Claims,
    routes::{acting_assessee, acting_assessor},
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/events/{id}/tools/{tool_id}/submission",
    params(
        ("id" = Uuid, Path, description = "Assessment event ID"),
        ("tool_id" = Uuid, Path, description = "Tool ID")
    ),
    responses(
        (status = 200, description = "Submission stored"),
        (status = 400, description = "Event not running, tool not open, or already submitted"),
        (status = 401, description = "Caller does not take part in the event")
    )
)]
#[axum::debug_handler]
pub async fn submit_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((id, tool_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<SubmitAttemptPayload>,
) -> Result<impl IntoResponse> {
    let assessee = acting_assessee(&state, &claims).await?;
    let attempt = state
        .attempt_service
        .submit_attempt(id, tool_id, &assessee, payload.submission)
        .await?;
    Ok(Json(AttemptResponse::from(attempt)))
}

#[utoipa::path(
    get,
    path = "/api/events/{id}/assessees/{assessee_id}/attempts",
    params(
        ("id" = Uuid, Path, description = "Assessment event ID"),
        ("assessee_id" = Uuid, Path, description = "Assessee ID")
    ),
    responses(
        (status = 200, description = "Attempts of the assessee in flow order"),
        (status = 401, description = "Caller is not the paired assessor")
    )
)]
#[axum::debug_handler]
pub async fn list_attempts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((id, assessee_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse> {
    let assessor = acting_assessor(&state, &claims).await?;
    let items = state
        .attempt_service
        .list_attempts(id, assessee_id, assessor.id)
        .await?;
    Ok(Json(AttemptListResponse { items }))
}

#[utoipa::path(
    patch,
    path = "/api/events/{id}/attempts/{attempt_id}/grade",
    params(
        ("id" = Uuid, Path, description = "Assessment event ID"),
        ("attempt_id" = Uuid, Path, description = "Tool attempt ID")
    ),
    responses(
        (status = 200, description = "Grade and note merged into the attempt"),
        (status = 400, description = "Grade is not a number or note is not text"),
        (status = 401, description = "Caller is not the paired assessor")
    )
)]
#[axum::debug_handler]
pub async fn grade_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((id, attempt_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<GradeAttemptPayload>,
) -> Result<impl IntoResponse> {
    let assessor = acting_assessor(&state, &claims).await?;
    let attempt = state
        .grading_service
        .record_grade(attempt_id, id, assessor.id, payload)
        .await?;
    Ok(Json(AttemptResponse::from(attempt)))
}
