use std::convert::Infallible;

use axum::{Router, extract::Query, extract::State, response::sse::Sse, routing::get};
use futures::Stream;
use tracing::info;

use crate::dto::api::EventsQuery;
use crate::services::sse_service;
use crate::state::SharedState;

#[utoipa::path(
    get,
    path = "/api/events",
    tag = "events",
    params(EventsQuery),
    responses((status = 200, description = "Per-user event stream", content_type = "text/event-stream", body = String))
)]
/// Stream every frame observed on this user's game-server session.
pub async fn events(
    State(state): State<SharedState>,
    Query(query): Query<EventsQuery>,
) -> Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>> {
    let receiver = sse_service::subscribe(&state, &query.username);
    info!(username = %query.username, "new SSE subscriber");
    sse_service::to_sse_stream(receiver)
}

/// Configure the SSE endpoint.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/api/events", get(events))
}
