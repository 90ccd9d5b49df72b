use serde::Serialize;
use utoipa::ToSchema;

/// Liveness report for the bridge and its collaborators.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `ok` when every dependency answers, `degraded` otherwise.
    pub status: String,
    /// Whether the user store answered a ping.
    pub database: bool,
    /// Address of the authoritative game server.
    pub game_server: String,
}
