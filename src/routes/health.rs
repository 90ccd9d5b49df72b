use axum::{Json, Router, extract::State, routing::get};

use crate::dto::health::HealthResponse;
use crate::services::health_service;
use crate::state::SharedState;

#[utoipa::path(
    get,
    path = "/healthcheck",
    responses((status = 200, description = "Service health report", body = HealthResponse))
)]
/// Return the current health status of the bridge and ping the user store.
pub async fn healthcheck(State(state): State<SharedState>) -> Json<HealthResponse> {
    let status = health_service::health_status(&state).await;
    Json(status)
}

/// Configure the health routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/healthcheck", get(healthcheck))
}
