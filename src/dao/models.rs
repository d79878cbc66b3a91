use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

/// Registered player account. Credentials live outside this service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserEntity {
    /// Stable identifier for the user.
    pub id: Uuid,
    /// Unique login handle.
    pub username: String,
    /// Display name.
    pub name: String,
    /// Registration timestamp.
    pub created_at: SystemTime,
}

/// Drawing prompt that can be assigned to a game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromptEntity {
    /// Stable identifier for the prompt.
    pub id: Uuid,
    /// Text shown to the players.
    pub content: String,
}

/// Persisted phase of a game.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PhaseEntity {
    /// Waiting for players.
    Lobby,
    /// Players are drawing.
    Whiteboard,
    /// Grace window for late drawings.
    Submission,
    /// Players vote on the drawings.
    Voting,
    /// Results are on screen.
    Results,
    /// Game is over.
    Closed,
}

/// Durable facts about a game, written whenever its phase or roster changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameEntity {
    /// Primary key of the game.
    pub id: Uuid,
    /// Shareable join code.
    pub code: String,
    /// Phase the game was in when last saved.
    pub phase: PhaseEntity,
    /// Player holding host privileges.
    pub host_id: Uuid,
    /// Maximum number of members accepted at join time.
    pub capacity: u32,
    /// Prompt drawn at creation.
    pub prompt_id: Uuid,
    /// Entry time of the current timed phase.
    pub phase_started_at: Option<SystemTime>,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
    /// Last time the game entity was updated.
    pub updated_at: SystemTime,
}

/// Durable link between a player and the game they belong to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MembershipEntity {
    /// Member player.
    pub player_id: Uuid,
    /// Game the player belongs to.
    pub game_id: Uuid,
    /// Time the player joined.
    pub joined_at: SystemTime,
}

/// Drawing submitted by a player. Content is opaque (usually a data URL).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DrawingEntity {
    /// Primary key of the drawing.
    pub id: Uuid,
    /// Game the drawing belongs to.
    pub game_id: Uuid,
    /// Author of the drawing.
    pub player_id: Uuid,
    /// Image payload as sent by the client.
    pub image_data: String,
    /// Time the drawing was accepted.
    pub submitted_at: SystemTime,
}
