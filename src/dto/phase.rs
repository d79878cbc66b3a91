use serde::Serialize;
use utoipa::ToSchema;

use crate::state::state_machine::GamePhase;

/// Publicly visible game phase exposed to clients (REST/WebSocket).
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisibleGamePhase {
    /// Waiting for players; the host may start.
    Lobby,
    /// Players are drawing.
    Whiteboard,
    /// Grace window for late drawings.
    Submission,
    /// Players vote on drawings.
    Voting,
    /// Results are shown.
    Results,
    /// Game is over.
    Closed,
}

impl From<GamePhase> for VisibleGamePhase {
    fn from(value: GamePhase) -> Self {
        match value {
            GamePhase::Lobby => VisibleGamePhase::Lobby,
            GamePhase::Whiteboard => VisibleGamePhase::Whiteboard,
            GamePhase::Submission => VisibleGamePhase::Submission,
            GamePhase::Voting => VisibleGamePhase::Voting,
            GamePhase::Results => VisibleGamePhase::Results,
            GamePhase::Closed => VisibleGamePhase::Closed,
        }
    }
}
