use axum::http::{HeaderMap, StatusCode};
use axum::{Json, Router, extract::State, routing::get, routing::post};
use validator::Validate;

use crate::dto::api::{
    AwardWinnerRequest, LoginRequest, LoginResponse, MeResponse, OkResponse, ScoreboardResponse,
    SignupRequest,
};
use crate::error::{AppError, ServiceError};
use crate::services::{auth_service, game_service};
use crate::state::SharedState;

#[utoipa::path(
    post,
    path = "/api/signup",
    tag = "auth",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = OkResponse),
        (status = 400, description = "Invalid username or password"),
        (status = 409, description = "Username already taken")
    )
)]
/// Create an account with a salted password hash.
pub async fn signup(
    State(state): State<SharedState>,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<OkResponse>), AppError> {
    payload
        .validate()
        .map_err(|err| AppError::BadRequest(err.to_string()))?;
    auth_service::signup(state.users(), &payload.username, &payload.password).await?;
    Ok((StatusCode::CREATED, Json(OkResponse::ok())))
}

#[utoipa::path(
    post,
    path = "/api/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
/// Verify credentials and issue a week-long session token.
pub async fn login(
    State(state): State<SharedState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let (token, user) = auth_service::login(
        state.users(),
        &state.config().jwt_secret,
        &payload.username,
        &payload.password,
    )
    .await?;
    Ok(Json(LoginResponse {
        token,
        user: user.into(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/me",
    tag = "auth",
    responses(
        (status = 200, description = "Profile of the token holder", body = MeResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Token subject no longer exists")
    )
)]
/// Return the profile belonging to the bearer token.
pub async fn me(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<MeResponse>, AppError> {
    let token = game_service::bearer_token(&headers)
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".into()))?;
    let user =
        auth_service::identify(state.users(), &state.config().jwt_secret, &token).await?;
    Ok(Json(MeResponse { user: user.into() }))
}

#[utoipa::path(
    get,
    path = "/api/scoreboard",
    tag = "auth",
    responses((status = 200, description = "Top winners", body = ScoreboardResponse))
)]
/// Top ten players by wins.
pub async fn scoreboard(
    State(state): State<SharedState>,
) -> Result<Json<ScoreboardResponse>, AppError> {
    let leaders = state
        .users()
        .top_winners()
        .await
        .map_err(ServiceError::from)?;
    Ok(Json(ScoreboardResponse {
        leaders: leaders.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/awardWinner",
    tag = "auth",
    request_body = AwardWinnerRequest,
    responses((status = 200, description = "Win recorded", body = OkResponse))
)]
/// Atomically increment the winner's `wins` counter.
pub async fn award_winner(
    State(state): State<SharedState>,
    Json(payload): Json<AwardWinnerRequest>,
) -> Result<Json<OkResponse>, AppError> {
    state
        .users()
        .award_win(&payload.username)
        .await
        .map_err(ServiceError::from)?;
    Ok(Json(OkResponse::ok()))
}

/// Configure the account and scoreboard routes.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/api/signup", post(signup))
        .route("/api/login", post(login))
        .route("/api/me", get(me))
        .route("/api/scoreboard", get(scoreboard))
        .route("/api/awardWinner", post(award_winner))
}
