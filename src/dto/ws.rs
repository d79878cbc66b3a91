//! Messages exchanged over the `/ws` event channel, framed as `{"event": ..., "data": {...}}`.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::dto::{
    common::{PlayerSummary, Role},
    phase::VisibleGamePhase,
    validation::validate_game_code,
};

/// Commands accepted from WebSocket clients.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Attach this socket to a game the player is a member of and resync its state.
    RejoinGame(RejoinGamePayload),
    /// Host starts the game.
    StartGame(HostCommandPayload),
    /// Detach this socket from a room without touching membership.
    LeaveRoom(LeaveRoomPayload),
    /// Host moves from voting to results.
    ShowResults(HostCommandPayload),
    /// Host ends the game after the results.
    EndGame(HostCommandPayload),
}

impl ClientMessage {
    /// Parse and validate a text frame.
    pub fn from_json_str(raw: &str) -> Result<Self, InboundError> {
        let message: Self = serde_json::from_str(raw)?;
        message.validate()?;
        Ok(message)
    }

    /// Event name, echoed back in `command_failed`.
    pub fn name(&self) -> &'static str {
        match self {
            ClientMessage::RejoinGame(_) => "rejoin_game",
            ClientMessage::StartGame(_) => "start_game",
            ClientMessage::LeaveRoom(_) => "leave_room",
            ClientMessage::ShowResults(_) => "show_results",
            ClientMessage::EndGame(_) => "end_game",
        }
    }

    /// Game code targeted by the command.
    pub fn code(&self) -> &str {
        match self {
            ClientMessage::RejoinGame(payload) => &payload.code,
            ClientMessage::LeaveRoom(payload) => &payload.code,
            ClientMessage::StartGame(payload)
            | ClientMessage::ShowResults(payload)
            | ClientMessage::EndGame(payload) => &payload.code,
        }
    }
}

impl Validate for ClientMessage {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(e) = validate_game_code(self.code()) {
            errors.add("code", e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Inbound frame could not be turned into a [`ClientMessage`].
#[derive(Debug, thiserror::Error)]
pub enum InboundError {
    /// Frame is not valid JSON or names an unknown message.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    /// Frame parsed but its payload failed validation.
    #[error("invalid message: {0}")]
    Invalid(#[from] ValidationErrors),
}

/// Payload of `rejoin_game`.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RejoinGamePayload {
    /// Player reattaching to the game.
    pub player_id: Uuid,
    /// Join code of the game.
    pub code: String,
}

/// Payload shared by the host commands.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HostCommandPayload {
    /// Player claiming host rights.
    pub host_id: Uuid,
    /// Join code of the game.
    pub code: String,
}

/// Payload of `leave_room`.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq, ToSchema)]
pub struct LeaveRoomPayload {
    /// Join code of the room to leave.
    pub code: String,
}

/// Events pushed to WebSocket clients.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Roster changed.
    PlayerList(PlayerListEvent),
    /// Phase changed, or resync after a rejoin.
    GameState(GameStateEvent),
    /// Drawing time is over; late drawings still count.
    GameSubmit(PhaseEvent),
    /// Voting is open.
    GameVote(PhaseEvent),
    /// Game is over for everyone in the room.
    GameClosed(GameClosedEvent),
    /// Rejoin was refused.
    RejoinFailed(RejoinFailedEvent),
    /// A command sent on this connection failed.
    CommandFailed(CommandFailedEvent),
}

/// Current roster of a game, host first.
#[derive(Debug, Serialize, Clone, PartialEq, Eq, ToSchema)]
pub struct PlayerListEvent {
    /// Join code of the game.
    pub code: String,
    /// Members in join order.
    pub players: Vec<PlayerSummary>,
}

/// Full state of a game, broadcast on phase changes and unicast on rejoin.
#[derive(Debug, Serialize, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameStateEvent {
    /// Join code of the game.
    pub code: String,
    /// Phase the game is in.
    pub phase: VisibleGamePhase,
    /// Prompt players are drawing.
    pub prompt: String,
    /// Seconds left before the phase deadline; zero when untimed.
    pub remaining_seconds: u64,
    /// Full length of the current phase deadline; zero when the phase is untimed.
    pub duration_seconds: u64,
    /// Present only when sent to a single player.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

/// Bare phase notification used by `game_submit` and `game_vote`.
#[derive(Debug, Serialize, Clone, PartialEq, Eq, ToSchema)]
pub struct PhaseEvent {
    /// Join code of the game.
    pub code: String,
    /// Phase the game entered.
    pub phase: VisibleGamePhase,
}

/// The game was closed and its room torn down.
#[derive(Debug, Serialize, Clone, PartialEq, Eq, ToSchema)]
pub struct GameClosedEvent {
    /// Join code of the closed game.
    pub code: String,
}

/// Sent to the caller when `rejoin_game` cannot be honoured.
#[derive(Debug, Serialize, Clone, PartialEq, Eq, ToSchema)]
pub struct RejoinFailedEvent {
    /// Join code the client asked for.
    pub code: String,
    /// Why the rejoin was refused.
    pub message: String,
}

/// Sent to the caller when any other command fails.
#[derive(Debug, Serialize, Clone, PartialEq, Eq, ToSchema)]
pub struct CommandFailedEvent {
    /// Client message that failed.
    pub command: String,
    /// Stable error code, same vocabulary as the REST `error` field.
    pub error: String,
    /// Human readable reason.
    pub message: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_tagged_commands() {
        let host_id = Uuid::new_v4();
        let raw = json!({
            "event": "start_game",
            "data": { "hostId": host_id, "code": "AB12CD34" }
        })
        .to_string();

        let message = ClientMessage::from_json_str(&raw).unwrap();
        assert_eq!(
            message,
            ClientMessage::StartGame(HostCommandPayload {
                host_id,
                code: "AB12CD34".into()
            })
        );
        assert_eq!(message.name(), "start_game");
    }

    #[test]
    fn rejects_unknown_events_and_bad_codes() {
        let unknown = json!({ "event": "buzz", "data": {} }).to_string();
        assert!(matches!(
            ClientMessage::from_json_str(&unknown),
            Err(InboundError::Malformed(_))
        ));

        let bad_code = json!({ "event": "leave_room", "data": { "code": "nope" } }).to_string();
        assert!(matches!(
            ClientMessage::from_json_str(&bad_code),
            Err(InboundError::Invalid(_))
        ));
    }

    #[test]
    fn server_events_use_event_and_data_framing() {
        let message = ServerMessage::GameState(GameStateEvent {
            code: "AB12CD34".into(),
            phase: VisibleGamePhase::Whiteboard,
            prompt: "A robot gardening".into(),
            remaining_seconds: 10,
            duration_seconds: 10,
            role: None,
        });

        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "event": "game_state",
                "data": {
                    "code": "AB12CD34",
                    "phase": "whiteboard",
                    "prompt": "A robot gardening",
                    "remainingSeconds": 10,
                    "durationSeconds": 10
                }
            })
        );
    }
}
