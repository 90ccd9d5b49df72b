use axum::http::HeaderMap;
use axum::{Json, Router, extract::State, routing::post};
use serde_json::json;
use validator::Validate;

use crate::dto::api::{
    ChatRequest, ConnectRequest, CreateGameRequest, CreateGameResponse, GameIdRequest,
    JoinGameRequest, JoinGameResponse, ListGamesRequest, ListGamesResponse, OkResponse,
    PinRequest, SendAnswerRequest, SubmitQuestionRequest,
};
use crate::error::AppError;
use crate::services::game_service;
use crate::state::SharedState;

#[utoipa::path(
    post,
    path = "/api/connect",
    tag = "game",
    request_body = ConnectRequest,
    responses(
        (status = 200, description = "Session established or reused", body = OkResponse),
        (status = 400, description = "Invalid username"),
        (status = 500, description = "Game server unreachable or handshake timed out")
    )
)]
/// Open the per-user TCP session toward the game server.
pub async fn connect(
    State(state): State<SharedState>,
    Json(payload): Json<ConnectRequest>,
) -> Result<Json<OkResponse>, AppError> {
    payload
        .validate()
        .map_err(|err| AppError::BadRequest(err.to_string()))?;
    game_service::connect(&state, &payload.username).await?;
    Ok(Json(OkResponse::ok()))
}

#[utoipa::path(
    post,
    path = "/api/listGames",
    tag = "game",
    request_body = ListGamesRequest,
    responses(
        (status = 200, description = "Public lobby games", body = ListGamesResponse),
        (status = 400, description = "No session for this user"),
        (status = 500, description = "Timed out waiting for GAMES_LIST")
    )
)]
/// List public lobby games, waiting for the correlated GAMES_LIST frame.
pub async fn list_games(
    State(state): State<SharedState>,
    headers: HeaderMap,
    payload: Option<Json<ListGamesRequest>>,
) -> Result<Json<ListGamesResponse>, AppError> {
    let explicit = payload.and_then(|Json(body)| body.username);
    let username = game_service::resolve_username(&state, &headers, explicit).await?;
    let games = game_service::list_games(&state, &username).await?;
    Ok(Json(ListGamesResponse {
        success: true,
        games,
    }))
}

#[utoipa::path(
    post,
    path = "/api/createGame",
    tag = "game",
    request_body = CreateGameRequest,
    responses(
        (status = 200, description = "Game created", body = CreateGameResponse),
        (status = 400, description = "No session for this user"),
        (status = 500, description = "Timed out waiting for GAME_CREATED")
    )
)]
/// Create a game, waiting for the correlated GAME_CREATED frame.
pub async fn create_game(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(payload): Json<CreateGameRequest>,
) -> Result<Json<CreateGameResponse>, AppError> {
    let username =
        game_service::resolve_username(&state, &headers, payload.username.clone()).await?;
    let game = game_service::create_game(&state, &username, payload).await?;
    Ok(Json(CreateGameResponse {
        success: true,
        game,
    }))
}

#[utoipa::path(
    post,
    path = "/api/joinGame",
    tag = "game",
    request_body = JoinGameRequest,
    responses(
        (status = 200, description = "Joined", body = JoinGameResponse),
        (status = 400, description = "No session for this user"),
        (status = 500, description = "Timed out waiting for JOINED_GAME")
    )
)]
/// Join a lobby, waiting for the JOINED_GAME frame carrying the same PIN.
pub async fn join_game(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(payload): Json<JoinGameRequest>,
) -> Result<Json<JoinGameResponse>, AppError> {
    let username = game_service::resolve_username(&state, &headers, payload.username).await?;
    let game = game_service::join_game(&state, &username, &payload.game_id).await?;
    Ok(Json(JoinGameResponse { ok: true, game }))
}

#[utoipa::path(
    post,
    path = "/api/startGame",
    tag = "game",
    request_body = PinRequest,
    responses((status = 200, description = "Forwarded", body = OkResponse))
)]
/// Fire-and-forget START_GAME; the outcome arrives over SSE.
pub async fn start_game(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(payload): Json<PinRequest>,
) -> Result<Json<OkResponse>, AppError> {
    let username = game_service::resolve_username(&state, &headers, payload.username).await?;
    game_service::forward(
        &state,
        &username,
        json!({"type": "START_GAME", "pin": payload.pin, "username": username}),
    )?;
    Ok(Json(OkResponse::ok()))
}

#[utoipa::path(
    post,
    path = "/api/exitGame",
    tag = "game",
    request_body = GameIdRequest,
    responses((status = 200, description = "Forwarded", body = OkResponse))
)]
/// Fire-and-forget EXIT_GAME.
pub async fn exit_game(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(payload): Json<GameIdRequest>,
) -> Result<Json<OkResponse>, AppError> {
    let username = game_service::resolve_username(&state, &headers, payload.username).await?;
    game_service::forward(
        &state,
        &username,
        json!({"type": "EXIT_GAME", "pin": payload.game_id, "username": username}),
    )?;
    Ok(Json(OkResponse::ok()))
}

#[utoipa::path(
    post,
    path = "/api/sendAnswer",
    tag = "game",
    request_body = SendAnswerRequest,
    responses((status = 200, description = "Forwarded", body = OkResponse))
)]
/// Fire-and-forget ANSWER; scores arrive as SCORE_UPDATE frames over SSE.
pub async fn send_answer(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(payload): Json<SendAnswerRequest>,
) -> Result<Json<OkResponse>, AppError> {
    let username = game_service::resolve_username(&state, &headers, payload.username).await?;
    game_service::forward(
        &state,
        &username,
        json!({
            "type": "ANSWER",
            "pin": payload.game_id,
            "correct": payload.answer,
            "username": username,
        }),
    )?;
    Ok(Json(OkResponse::ok()))
}

#[utoipa::path(
    post,
    path = "/api/nextQuestion",
    tag = "game",
    request_body = GameIdRequest,
    responses((status = 200, description = "Forwarded", body = OkResponse))
)]
/// Fire-and-forget NEXT_QUESTION.
pub async fn next_question(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(payload): Json<GameIdRequest>,
) -> Result<Json<OkResponse>, AppError> {
    let username = game_service::resolve_username(&state, &headers, payload.username).await?;
    game_service::forward(
        &state,
        &username,
        json!({"type": "NEXT_QUESTION", "pin": payload.game_id, "username": username}),
    )?;
    Ok(Json(OkResponse::ok()))
}

#[utoipa::path(
    post,
    path = "/api/endGame",
    tag = "game",
    request_body = GameIdRequest,
    responses((status = 200, description = "Forwarded", body = OkResponse))
)]
/// Fire-and-forget END_GAME.
pub async fn end_game(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(payload): Json<GameIdRequest>,
) -> Result<Json<OkResponse>, AppError> {
    let username = game_service::resolve_username(&state, &headers, payload.username).await?;
    game_service::forward(
        &state,
        &username,
        json!({"type": "END_GAME", "pin": payload.game_id, "username": username}),
    )?;
    Ok(Json(OkResponse::ok()))
}

#[utoipa::path(
    post,
    path = "/api/submitQuestion",
    tag = "game",
    request_body = SubmitQuestionRequest,
    responses((status = 200, description = "Forwarded", body = OkResponse))
)]
/// Fire-and-forget SUBMIT_QUESTION.
pub async fn submit_question(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(payload): Json<SubmitQuestionRequest>,
) -> Result<Json<OkResponse>, AppError> {
    let username = game_service::resolve_username(&state, &headers, payload.username).await?;
    game_service::forward(
        &state,
        &username,
        json!({
            "type": "SUBMIT_QUESTION",
            "pin": payload.pin,
            "question": payload.question,
            "answerTrue": payload.answer_true,
            "username": username,
        }),
    )?;
    Ok(Json(OkResponse::ok()))
}

#[utoipa::path(
    post,
    path = "/api/chat",
    tag = "game",
    request_body = ChatRequest,
    responses((status = 200, description = "Forwarded", body = OkResponse))
)]
/// Fire-and-forget CHAT.
pub async fn chat(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<OkResponse>, AppError> {
    let username = game_service::resolve_username(&state, &headers, payload.username).await?;
    game_service::forward(
        &state,
        &username,
        json!({
            "type": "CHAT",
            "pin": payload.pin,
            "message": payload.message,
            "username": username,
        }),
    )?;
    Ok(Json(OkResponse::ok()))
}

/// Configure the game operation routes.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/api/connect", post(connect))
        .route("/api/listGames", post(list_games))
        .route("/api/createGame", post(create_game))
        .route("/api/joinGame", post(join_game))
        .route("/api/startGame", post(start_game))
        .route("/api/exitGame", post(exit_game))
        .route("/api/sendAnswer", post(send_answer))
        .route("/api/nextQuestion", post(next_question))
        .route("/api/endGame", post(end_game))
        .route("/api/submitQuestion", post(submit_question))
        .route("/api/chat", post(chat))
}
