pub mod attempt;
pub mod conference;
pub mod event;
pub mod health;
pub mod participant;
pub mod task;
pub mod test_flow;
pub mod tool;

use axum::{
    routing::{get, post},
    Router,
};

use crate::error::{Error, Result};
use crate::middleware::auth::{require_bearer_auth, Claims};
use crate::models::user::{Actor, Assessee, Assessor, Company};
use crate::AppState;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/api/tools", get(tool::list_tools).post(tool::create_tool))
        .route("/api/tools/:id", get(tool::get_tool))
        .route(
            "/api/test-flows",
            get(test_flow::list_test_flows).post(test_flow::create_test_flow),
        )
        .route("/api/test-flows/:id", get(test_flow::get_test_flow))
        .route("/api/events", get(event::list_events).post(event::create_event))
        .route(
            "/api/events/:id",
            get(event::get_event)
                .patch(event::update_event)
                .delete(event::delete_event),
        )
        .route(
            "/api/events/:id/participants",
            get(participant::list_participants).post(participant::add_participants),
        )
        .route("/api/events/:id/tasks/stream", get(task::stream_tasks))
        .route("/api/events/:id/tasks/released", get(task::released_tasks))
        .route(
            "/api/events/:id/tools/:tool_id/submission",
            post(attempt::submit_attempt),
        )
        .route(
            "/api/events/:id/assessees/:assessee_id/attempts",
            get(attempt::list_attempts),
        )
        .route(
            "/api/events/:id/attempts/:attempt_id/grade",
            axum::routing::patch(attempt::grade_attempt),
        )
        .route(
            "/api/events/:id/assessees/:assessee_id/room",
            post(conference::initiate_room),
        )
        .route("/api/rooms/:id/roleplayers", post(conference::add_roleplayer))
        .route("/api/rooms/:id/lock", post(conference::lock_room))
        .route("/api/assessor/events/active", get(event::active_events_for_assessor))
        .route("/api/assessee/events", get(event::events_for_assessee))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_bearer_auth,
        ));

    Router::new()
        .route("/health", get(health::health))
        .merge(api)
        .with_state(state)
}

pub(crate) async fn acting_actor(state: &AppState, claims: &Claims) -> Result<Actor> {
    state
        .identity_service
        .resolve_company_or_assessor(&claims.sub)
        .await
}

pub(crate) async fn acting_company(state: &AppState, claims: &Claims) -> Result<Company> {
    match acting_actor(state, claims).await? {
        Actor::Company(company) => Ok(company),
        Actor::Assessor(_) => Err(Error::Forbidden(
            "Only the company account can perform this action".to_string(),
        )),
    }
}

pub(crate) async fn acting_assessor(state: &AppState, claims: &Claims) -> Result<Assessor> {
    state.identity_service.resolve_assessor(&claims.sub).await
}

pub(crate) async fn acting_assessee(state: &AppState, claims: &Claims) -> Result<Assessee> {
    state.identity_service.resolve_assessee(&claims.sub).await
}
