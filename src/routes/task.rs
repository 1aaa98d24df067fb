use axum::{
    extract::{Path, State},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json,
    },
    Extension,
};
use futures_util::StreamExt;
use uuid::Uuid;

use crate::{
    dto::task_dto::ReleasedToolListResponse,
    error::Result,
    middleware::auth::Claims,
    routes::acting_assessee,
    AppState,
};

/// Live release stream for one assessee. The first frame has a null
/// payload; each later frame carries exactly one released tool.
#[utoipa::path(
    get,
    path = "/api/events/{id}/tasks/stream",
    params(
        ("id" = Uuid, Path, description = "Assessment event ID")
    ),
    responses(
        (status = 200, description = "Server-sent events, one per released tool"),
        (status = 401, description = "Caller does not take part in the event"),
        (status = 404, description = "No running event with this id")
    )
)]
#[axum::debug_handler]
pub async fn stream_tasks(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let assessee = acting_assessee(&state, &claims).await?;
    let releases = state.release_service.subscribe(id, &assessee).await?;
    let stream = releases.map(|msg| Event::default().id(msg.id.clone()).json_data(&msg));

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(state.settings.keepalive)
            .text("ping"),
    ))
}

#[utoipa::path(
    get,
    path = "/api/events/{id}/tasks/released",
    params(
        ("id" = Uuid, Path, description = "Assessment event ID")
    ),
    responses(
        (status = 200, description = "Tools already released to the caller"),
        (status = 401, description = "Caller does not take part in the event")
    )
)]
#[axum::debug_handler]
pub async fn released_tasks(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let assessee = acting_assessee(&state, &claims).await?;
    let items = state.release_service.released_tools(id, &assessee).await?;
    Ok(Json(ReleasedToolListResponse { items }))
}
