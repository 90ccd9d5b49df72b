use crate::dto::health::HealthResponse;
use crate::state::SharedState;

/// Build the health report: user-store reachability plus the game-server
/// address the bridge dials.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let database = state.users().ping().await;
    HealthResponse {
        status: if database { "ok" } else { "degraded" }.into(),
        database,
        game_server: state.config().tcp_addr(),
    }
}
