use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;

use crate::{
    dto::tool_dto::{CreateToolPayload, ToolListResponse, ToolResponse},
    error::Result,
    middleware::auth::Claims,
    routes::{acting_actor, acting_company},
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/tools",
    responses(
        (status = 201, description = "Assessment tool created"),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Caller is not a company")
    )
)]
#[axum::debug_handler]
pub async fn create_tool(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateToolPayload>,
) -> Result<impl IntoResponse> {
    let company = acting_company(&state, &claims).await?;
    let tool = state.tool_service.create_tool(company.id, payload).await?;
    Ok((StatusCode::CREATED, Json(ToolResponse::from(tool))))
}

#[utoipa::path(
    get,
    path = "/api/tools",
    responses(
        (status = 200, description = "Tools of the caller's company")
    )
)]
#[axum::debug_handler]
pub async fn list_tools(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let actor = acting_actor(&state, &claims).await?;
    let tools = state.tool_service.list_tools(actor.company_id()).await?;
    Ok(Json(ToolListResponse {
        items: tools.into_iter().map(ToolResponse::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/tools/{id}",
    params(
        ("id" = Uuid, Path, description = "Tool ID")
    ),
    responses(
        (status = 200, description = "Tool found"),
        (status = 404, description = "Tool not found")
    )
)]
#[axum::debug_handler]
pub async fn get_tool(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let actor = acting_actor(&state, &claims).await?;
    let tool = state.tool_service.get_tool(id, actor.company_id()).await?;
    Ok(Json(ToolResponse::from(tool)))
}
