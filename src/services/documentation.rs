use utoipa::OpenApi;

use crate::dto::{api, health};
use crate::routes;

/// Aggregated OpenAPI document for the bridge HTTP surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "quizwire bridge",
        description = "HTTP/SSE bridge in front of the authoritative quiz game server"
    ),
    paths(
        routes::health::healthcheck,
        routes::auth::signup,
        routes::auth::login,
        routes::auth::me,
        routes::auth::scoreboard,
        routes::auth::award_winner,
        routes::game::connect,
        routes::game::list_games,
        routes::game::create_game,
        routes::game::join_game,
        routes::game::start_game,
        routes::game::exit_game,
        routes::game::send_answer,
        routes::game::next_question,
        routes::game::end_game,
        routes::game::submit_question,
        routes::game::chat,
        routes::events::events,
    ),
    components(schemas(
        api::SignupRequest,
        api::LoginRequest,
        api::ConnectRequest,
        api::ListGamesRequest,
        api::CreateGameRequest,
        api::JoinGameRequest,
        api::PinRequest,
        api::GameIdRequest,
        api::SendAnswerRequest,
        api::SubmitQuestionRequest,
        api::ChatRequest,
        api::AwardWinnerRequest,
        api::OkResponse,
        api::ListGamesResponse,
        api::CreateGameResponse,
        api::JoinGameResponse,
        api::LoginResponse,
        api::UserSummary,
        api::UserProfile,
        api::MeResponse,
        api::LeaderDto,
        api::ScoreboardResponse,
        health::HealthResponse,
    )),
    tags(
        (name = "auth", description = "Accounts, tokens and the scoreboard"),
        (name = "game", description = "Game operations forwarded over TCP"),
        (name = "events", description = "Per-user server-sent events")
    )
)]
pub struct ApiDoc;
