//! Request and response bodies for the bridge HTTP surface.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::dao::users::{Leader, UserRecord};
use crate::dto::validation::validate_username;

/// Payload for account creation.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SignupRequest {
    /// Unique display name for the new account.
    #[validate(custom(function = validate_username))]
    pub username: String,
    /// Plaintext password; only its salted hash is stored.
    #[validate(length(min = 1, message = "password must not be empty"))]
    pub password: String,
}

/// Payload for credential login.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Payload opening (or reusing) the per-user game-server session.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ConnectRequest {
    /// Identity the TCP session is registered under.
    #[validate(custom(function = validate_username))]
    pub username: String,
}

/// Optional body for endpoints that only need a username override.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct ListGamesRequest {
    pub username: Option<String>,
}

/// Game creation options forwarded to the game server.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateGameRequest {
    pub username: Option<String>,
    /// Free-form theme label shown in listings.
    pub theme: Option<String>,
    /// Whether the lobby appears in public listings. Defaults to true.
    pub is_public: Option<bool>,
    /// Player capacity. Defaults to 20.
    pub max_players: Option<usize>,
}

/// Join request targeting a lobby by PIN.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JoinGameRequest {
    /// PIN of the game to join.
    pub game_id: String,
    #[serde(default)]
    pub username: Option<String>,
}

/// Fire-and-forget request carrying a PIN under the `pin` key.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PinRequest {
    pub pin: String,
    #[serde(default)]
    pub username: Option<String>,
}

/// Fire-and-forget request carrying a PIN under the `gameId` key.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameIdRequest {
    pub game_id: String,
    #[serde(default)]
    pub username: Option<String>,
}

/// Answer submission for the current question.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendAnswerRequest {
    pub game_id: String,
    /// Correctness flag, forwarded verbatim; the game server coerces it.
    #[schema(value_type = Object)]
    pub answer: Value,
    #[serde(default)]
    pub username: Option<String>,
}

/// Question submission while a game sits in the lobby.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitQuestionRequest {
    pub pin: String,
    /// Question text.
    pub question: String,
    /// Truthiness-coerced correct answer.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub answer_true: Value,
    #[serde(default)]
    pub username: Option<String>,
}

/// Chat line relayed to everyone in the same game.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ChatRequest {
    pub pin: String,
    pub message: String,
    #[serde(default)]
    pub username: Option<String>,
}

/// Scoreboard increment for the winner of a finished game.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AwardWinnerRequest {
    pub username: String,
}

/// Query string for the SSE event stream.
#[derive(Debug, Deserialize, IntoParams)]
pub struct EventsQuery {
    /// Username whose session frames are streamed.
    pub username: String,
}

/// Generic acknowledgement body.
#[derive(Debug, Serialize, ToSchema)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

/// Reply to `/api/listGames`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ListGamesResponse {
    pub success: bool,
    /// Serialized lobby games as sent by the game server.
    #[schema(value_type = Vec<Object>)]
    pub games: Vec<Value>,
}

/// Reply to `/api/createGame`.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreateGameResponse {
    pub success: bool,
    #[schema(value_type = Object)]
    pub game: Value,
}

/// Reply to `/api/joinGame`.
#[derive(Debug, Serialize, ToSchema)]
pub struct JoinGameResponse {
    pub ok: bool,
    #[schema(value_type = Object)]
    pub game: Value,
}

/// Token plus identity returned by `/api/login`.
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    /// Signed session token, valid for seven days.
    pub token: String,
    pub user: UserSummary,
}

/// Minimal identity embedded in the login reply.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserSummary {
    pub id: String,
    pub username: String,
}

/// Profile returned by `/api/me`.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub wins: i64,
    pub created_at: String,
}

/// Envelope for `/api/me`.
#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    pub user: UserProfile,
}

/// One scoreboard row.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeaderDto {
    pub username: String,
    pub wins: i64,
}

/// Reply to `/api/scoreboard`: top winners, ten at most.
#[derive(Debug, Serialize, ToSchema)]
pub struct ScoreboardResponse {
    pub leaders: Vec<LeaderDto>,
}

impl From<UserRecord> for UserSummary {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            username: user.username,
        }
    }
}

impl From<UserRecord> for UserProfile {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            username: user.username,
            wins: user.wins,
            created_at: user.created_at,
        }
    }
}

impl From<Leader> for LeaderDto {
    fn from(leader: Leader) -> Self {
        Self {
            username: leader.username,
            wins: leader.wins,
        }
    }
}
