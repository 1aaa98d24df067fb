use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;

use crate::{
    dto::test_flow_dto::{CreateTestFlowPayload, TestFlowListResponse, TestFlowResponse},
    error::Result,
    middleware::auth::Claims,
    routes::{acting_actor, acting_company},
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/test-flows",
    responses(
        (status = 201, description = "Test flow created with its tools in release order"),
        (status = 400, description = "Invalid name, time or unknown tool")
    )
)]
#[axum::debug_handler]
pub async fn create_test_flow(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateTestFlowPayload>,
) -> Result<impl IntoResponse> {
    let company = acting_company(&state, &claims).await?;
    let flow = state.test_flow_service.create_flow(company.id, payload).await?;
    Ok((StatusCode::CREATED, Json(TestFlowResponse::from(flow))))
}

#[utoipa::path(
    get,
    path = "/api/test-flows",
    responses(
        (status = 200, description = "Test flows of the caller's company")
    )
)]
#[axum::debug_handler]
pub async fn list_test_flows(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let actor = acting_actor(&state, &claims).await?;
    let flows = state.test_flow_service.list_flows(actor.company_id()).await?;
    Ok(Json(TestFlowListResponse {
        items: flows.into_iter().map(TestFlowResponse::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/test-flows/{id}",
    params(
        ("id" = Uuid, Path, description = "Test flow ID")
    ),
    responses(
        (status = 200, description = "Test flow found"),
        (status = 404, description = "Test flow not found")
    )
)]
#[axum::debug_handler]
pub async fn get_test_flow(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let actor = acting_actor(&state, &claims).await?;
    let flow = state.test_flow_service.get_flow(id, actor.company_id()).await?;
    Ok(Json(TestFlowResponse::from(flow)))
}
