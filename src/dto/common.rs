use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::state::game::Player;

/// Role of a player inside a game.
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Owner of the game, allowed to drive its phases.
    Host,
    /// Any other member.
    Player,
}

impl Role {
    /// Role of `player_id` in a game hosted by `host_id`.
    pub fn of(host_id: Uuid, player_id: Uuid) -> Self {
        if host_id == player_id {
            Role::Host
        } else {
            Role::Player
        }
    }
}

/// Public projection of a game member.
#[derive(Debug, Serialize, ToSchema, Clone, PartialEq, Eq)]
pub struct PlayerSummary {
    /// Player id.
    pub id: Uuid,
    /// Unique username.
    pub username: String,
}

impl From<&Player> for PlayerSummary {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id,
            username: player.username.clone(),
        }
    }
}
