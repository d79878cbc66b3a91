use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    dao::models::DrawingEntity,
    dto::{
        common::{PlayerSummary, Role},
        format_system_time,
    },
};

/// Payload used to open a new game lobby.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameRequest {
    /// Player who will host the game.
    pub host_id: Uuid,
}

/// Returned once a lobby exists.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreateGameResponse {
    /// Always `true` on success.
    pub success: bool,
    /// Human readable outcome.
    pub message: String,
    /// Join code to share with the other players.
    pub code: String,
}

/// Payload used to join a lobby by code.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JoinGameRequest {
    /// Player asking to join.
    pub player_id: Uuid,
}

/// Plain acknowledgement for commands without a payload.
#[derive(Debug, Serialize, ToSchema)]
pub struct AckResponse {
    /// Always `true` on success.
    pub success: bool,
    /// Human readable outcome.
    pub message: String,
}

impl AckResponse {
    /// Successful acknowledgement carrying `message`.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Whether a player currently belongs to a live game.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActiveGameResponse {
    /// Always `true`; not being in a game is not an error.
    pub success: bool,
    /// Human readable outcome.
    pub message: String,
    /// Whether the player belongs to a live game.
    pub in_game: bool,
    /// Join code of that game.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Role of the player in that game.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

/// Query of the player list endpoint.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListPlayersQuery {
    /// Username of the member asking for the list.
    pub username: String,
}

/// Roster of a game, in join order.
#[derive(Debug, Serialize, ToSchema)]
pub struct PlayersResponse {
    /// Always `true` on success.
    pub success: bool,
    /// Human readable outcome.
    pub message: String,
    /// Members of the game.
    pub players: Vec<PlayerSummary>,
}

/// Drawing upload. The image is opaque to the server.
///
/// Both fields are optional on the wire so a missing one surfaces as `missing_data`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitDrawingRequest {
    /// Player submitting the drawing.
    pub player_id: Option<Uuid>,
    /// Image payload, usually a data URL.
    pub image_data: Option<String>,
}

/// Public projection of a submitted drawing.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DrawingSummary {
    /// Drawing id.
    pub id: Uuid,
    /// Author of the drawing.
    pub player_id: Uuid,
    /// Image payload as submitted.
    pub image_data: String,
    /// RFC 3339 submission time.
    pub submitted_at: String,
}

impl From<DrawingEntity> for DrawingSummary {
    fn from(drawing: DrawingEntity) -> Self {
        Self {
            id: drawing.id,
            player_id: drawing.player_id,
            image_data: drawing.image_data,
            submitted_at: format_system_time(drawing.submitted_at),
        }
    }
}

/// Drawings submitted in a game.
#[derive(Debug, Serialize, ToSchema)]
pub struct DrawingsResponse {
    /// Always `true` on success.
    pub success: bool,
    /// Human readable outcome.
    pub message: String,
    /// Drawings in submission order.
    pub drawings: Vec<DrawingSummary>,
}
