//! Bridge-side orchestration of game operations: resolve the acting
//! username, forward a frame on that user's TCP session, and either return
//! immediately or wait for the correlated push frame.

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use serde_json::{Map, Value, json};
use tracing::warn;

use crate::dto::api::CreateGameRequest;
use crate::dto::sse::ServerEvent;
use crate::error::ServiceError;
use crate::services::auth_service;
use crate::state::SharedState;

/// Open (or reuse) the per-user session toward the game server.
pub async fn connect(state: &SharedState, username: &str) -> Result<(), ServiceError> {
    state
        .sessions()
        .connect(username, &state.config().tcp_addr(), state.sse().clone())
        .await
        .map(|_| ())
}

/// Resolve the acting username: explicit body field, then the `X-Username`
/// header, then the subject of a bearer token.
pub async fn resolve_username(
    state: &SharedState,
    headers: &HeaderMap,
    explicit: Option<String>,
) -> Result<String, ServiceError> {
    if let Some(username) = explicit.filter(|name| !name.trim().is_empty()) {
        return Ok(username);
    }

    if let Some(username) = headers
        .get("x-username")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .filter(|name| !name.trim().is_empty())
    {
        return Ok(username);
    }

    if let Some(token) = bearer_token(headers) {
        let user =
            auth_service::identify(state.users(), &state.config().jwt_secret, &token).await?;
        return Ok(user.username);
    }

    Err(ServiceError::InvalidInput(
        "username could not be resolved".into(),
    ))
}

/// Extract the token from an `Authorization: Bearer …` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// LIST_GAMES, correlated with the GAMES_LIST push frame.
pub async fn list_games(state: &SharedState, username: &str) -> Result<Vec<Value>, ServiceError> {
    let session = state.sessions().get(username)?;
    let reply = session
        .request_and_wait(&json!({"type": "LIST_GAMES"}), "GAMES_LIST", |_| true)
        .await?;
    Ok(reply
        .get("games")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default())
}

/// CREATE_GAME, correlated with the GAME_CREATED push frame.
pub async fn create_game(
    state: &SharedState,
    username: &str,
    request: CreateGameRequest,
) -> Result<Value, ServiceError> {
    let session = state.sessions().get(username)?;

    let mut frame = Map::new();
    frame.insert("type".into(), json!("CREATE_GAME"));
    frame.insert("username".into(), json!(username));
    if let Some(theme) = request.theme {
        frame.insert("theme".into(), json!(theme));
    }
    if let Some(is_public) = request.is_public {
        frame.insert("isPublic".into(), json!(is_public));
    }
    if let Some(max_players) = request.max_players {
        frame.insert("maxPlayers".into(), json!(max_players));
    }

    let reply = session
        .request_and_wait(&Value::Object(frame), "GAME_CREATED", |_| true)
        .await?;
    Ok(reply.get("game").cloned().unwrap_or(Value::Null))
}

/// JOIN_GAME, correlated with the JOINED_GAME frame for the same PIN.
pub async fn join_game(
    state: &SharedState,
    username: &str,
    pin: &str,
) -> Result<Value, ServiceError> {
    let session = state.sessions().get(username)?;
    let reply = session
        .request_and_wait(
            &json!({"type": "JOIN_GAME", "pin": pin, "username": username}),
            "JOINED_GAME",
            |frame| frame["game"]["pin"].as_str() == Some(pin),
        )
        .await?;
    Ok(reply.get("game").cloned().unwrap_or(Value::Null))
}

/// Forward a frame without waiting for a reply; the outcome reaches the
/// browser over SSE. A forwarding failure is also surfaced there as an
/// internal ERROR event.
pub fn forward(state: &SharedState, username: &str, frame: Value) -> Result<(), ServiceError> {
    let session = state.sessions().get(username)?;
    if let Err(err) = session.send(&frame) {
        warn!(username, error = %err, "failed to forward frame");
        state
            .sse()
            .broadcast(username, ServerEvent::error_frame("Failed to reach game server"));
        return Err(err);
    }
    Ok(())
}
