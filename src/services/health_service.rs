use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report `ok` while the repository answers, `degraded` otherwise.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let live_games = state.live_game_codes().len();
    match state.repository().health_check().await {
        Ok(()) => HealthResponse::ok(live_games),
        Err(err) => {
            warn!(backend = err.backend(), error = %err, "storage health check failed");
            HealthResponse::degraded(live_games)
        }
    }
}
