use serde::Serialize;
use utoipa::ToSchema;

/// Health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Games currently held in memory.
    pub live_games: usize,
}

impl HealthResponse {
    /// The repository answered.
    pub fn ok(live_games: usize) -> Self {
        Self {
            status: "ok".to_string(),
            live_games,
        }
    }

    /// The repository is failing; live games keep running from memory.
    pub fn degraded(live_games: usize) -> Self {
        Self {
            status: "degraded".to_string(),
            live_games,
        }
    }
}
