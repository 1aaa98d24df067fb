use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;

use crate::{
    dto::event_dto::{CreateEventPayload, EventListResponse, UpdateEventPayload},
    error::Result,
    middleware::auth::Claims,
    models::event::AssessmentEvent,
    routes::{acting_actor, acting_assessee, acting_assessor, acting_company},
    AppState,
};

async fn describe_all(state: &AppState, events: Vec<AssessmentEvent>) -> Result<EventListResponse> {
    let mut items = Vec::with_capacity(events.len());
    for event in events {
        items.push(state.event_service.describe(event).await?);
    }
    Ok(EventListResponse { items })
}

#[utoipa::path(
    post,
    path = "/api/events",
    responses(
        (status = 201, description = "Assessment event scheduled"),
        (status = 400, description = "Invalid name, start date or test flow")
    )
)]
#[axum::debug_handler]
pub async fn create_event(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateEventPayload>,
) -> Result<impl IntoResponse> {
    let company = acting_company(&state, &claims).await?;
    let event = state.event_service.create_event(company.id, payload).await?;
    let body = state.event_service.describe(event).await?;
    Ok((StatusCode::CREATED, Json(body)))
}

#[utoipa::path(
    get,
    path = "/api/events",
    responses(
        (status = 200, description = "Events of the caller's company, by start date")
    )
)]
#[axum::debug_handler]
pub async fn list_events(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let actor = acting_actor(&state, &claims).await?;
    let events = state.event_service.list_events(actor.company_id()).await?;
    Ok(Json(describe_all(&state, events).await?))
}

#[utoipa::path(
    get,
    path = "/api/events/{id}",
    params(
        ("id" = Uuid, Path, description = "Assessment event ID")
    ),
    responses(
        (status = 200, description = "Event with its computed end and state"),
        (status = 403, description = "Caller has no relation to the event"),
        (status = 404, description = "Event not found")
    )
)]
#[axum::debug_handler]
pub async fn get_event(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let principal = state.identity_service.resolve_principal(&claims.sub).await?;
    let event = state.event_service.get_visible_event(id, &principal).await?;
    Ok(Json(state.event_service.describe(event).await?))
}

#[utoipa::path(
    patch,
    path = "/api/events/{id}",
    params(
        ("id" = Uuid, Path, description = "Assessment event ID")
    ),
    responses(
        (status = 200, description = "Event updated"),
        (status = 400, description = "Invalid field or event already started"),
        (status = 403, description = "Event belongs to another company")
    )
)]
#[axum::debug_handler]
pub async fn update_event(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateEventPayload>,
) -> Result<impl IntoResponse> {
    let company = acting_company(&state, &claims).await?;
    let event = state.event_service.update_event(id, company.id, payload).await?;
    Ok(Json(state.event_service.describe(event).await?))
}

#[utoipa::path(
    delete,
    path = "/api/events/{id}",
    params(
        ("id" = Uuid, Path, description = "Assessment event ID")
    ),
    responses(
        (status = 405, description = "Events cannot be deleted")
    )
)]
#[axum::debug_handler]
pub async fn delete_event(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let company = acting_company(&state, &claims).await?;
    state.event_service.delete_event(id, company.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/assessor/events/active",
    responses(
        (status = 200, description = "Running events the assessor takes part in")
    )
)]
#[axum::debug_handler]
pub async fn active_events_for_assessor(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let assessor = acting_assessor(&state, &claims).await?;
    let events = state
        .event_service
        .active_events_for_assessor(assessor.id)
        .await?;
    Ok(Json(describe_all(&state, events).await?))
}

#[utoipa::path(
    get,
    path = "/api/assessee/events",
    responses(
        (status = 200, description = "Events the assessee is registered for")
    )
)]
#[axum::debug_handler]
pub async fn events_for_assessee(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let assessee = acting_assessee(&state, &claims).await?;
    let events = state.event_service.events_for_assessee(assessee.id).await?;
    Ok(Json(describe_all(&state, events).await?))
}
