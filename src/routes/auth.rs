use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::auth::{LoginRequest, TokenResponse},
    error::AppResult,
    middleware::json::JsonBody,
    response::ApiResponse,
    services::auth_service::login,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/token/login", post(token_login))
}

#[utoipa::path(
    post,
    path = "/api/auth/token/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Issue an auth token", body = ApiResponse<TokenResponse>),
        (status = 400, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
pub async fn token_login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> AppResult<Json<ApiResponse<TokenResponse>>> {
    let resp = login(&state, payload).await?;
    Ok(Json(resp))
}
