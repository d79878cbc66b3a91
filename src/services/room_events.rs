use tracing::{debug, warn};

use crate::{
    dto::{
        common::{PlayerSummary, Role},
        phase::VisibleGamePhase,
        ws::{
            CommandFailedEvent, GameClosedEvent, GameStateEvent, PhaseEvent, PlayerListEvent,
            RejoinFailedEvent, ServerMessage,
        },
    },
    error::ServiceError,
    state::{SharedState, game::LiveGame, rooms::ConnectionHandle, state_machine::GamePhase},
};

/// Broadcast the roster of `game` to its room.
pub fn broadcast_player_list(state: &SharedState, game: &LiveGame) {
    let message = ServerMessage::PlayerList(player_list_event(game));
    send_room_event(state, &game.code, &message);
}

/// Broadcast the event matching the phase `game` just entered.
pub fn broadcast_phase_changed(state: &SharedState, game: &LiveGame) {
    let message = match game.phase() {
        GamePhase::Lobby | GamePhase::Whiteboard | GamePhase::Results => {
            ServerMessage::GameState(game_state_event(state, game, None))
        }
        GamePhase::Submission => ServerMessage::GameSubmit(phase_event(game)),
        GamePhase::Voting => ServerMessage::GameVote(phase_event(game)),
        GamePhase::Closed => ServerMessage::GameClosed(GameClosedEvent {
            code: game.code.clone(),
        }),
    };
    send_room_event(state, &game.code, &message);
}

/// Full state snapshot, optionally tailored with the recipient's role.
pub fn game_state_event(
    state: &SharedState,
    game: &LiveGame,
    role: Option<Role>,
) -> GameStateEvent {
    let config = state.config();
    GameStateEvent {
        code: game.code.clone(),
        phase: game.phase().into(),
        prompt: game.prompt.text.clone(),
        remaining_seconds: game.remaining_seconds(config, state.now()),
        duration_seconds: game
            .phase_duration(config)
            .map(|duration| duration.as_secs())
            .unwrap_or(0),
        role,
    }
}

/// Current roster of `game`, in join order.
pub fn player_list_event(game: &LiveGame) -> PlayerListEvent {
    PlayerListEvent {
        code: game.code.clone(),
        players: game.players.values().map(PlayerSummary::from).collect(),
    }
}

/// Resync a single connection after a rejoin.
pub fn send_rejoin_state(
    state: &SharedState,
    connection: &ConnectionHandle,
    game: &LiveGame,
    role: Role,
) {
    send_direct(
        state,
        connection,
        ServerMessage::GameState(game_state_event(state, game, Some(role))),
    );
    if game.phase() == GamePhase::Lobby {
        send_direct(state, connection, ServerMessage::PlayerList(player_list_event(game)));
    }
}

/// Tell a single connection why its rejoin was refused.
pub fn send_rejoin_failed(
    state: &SharedState,
    connection: &ConnectionHandle,
    code: &str,
    err: &ServiceError,
) {
    send_direct(
        state,
        connection,
        ServerMessage::RejoinFailed(RejoinFailedEvent {
            code: code.to_owned(),
            message: err.to_string(),
        }),
    );
}

/// Report a rejected host command back to its sender.
pub fn send_command_failed(
    state: &SharedState,
    connection: &ConnectionHandle,
    command: &str,
    err: &ServiceError,
) {
    send_direct(
        state,
        connection,
        ServerMessage::CommandFailed(CommandFailedEvent {
            command: command.to_owned(),
            error: err.code().to_owned(),
            message: err.to_string(),
        }),
    );
}

fn phase_event(game: &LiveGame) -> PhaseEvent {
    PhaseEvent {
        code: game.code.clone(),
        phase: VisibleGamePhase::from(game.phase()),
    }
}

fn send_room_event(state: &SharedState, code: &str, message: &ServerMessage) {
    let delivered = state.rooms().broadcast(code, message);
    debug!(code, delivered, "room event sent");
}

fn send_direct(state: &SharedState, connection: &ConnectionHandle, message: ServerMessage) {
    if let Err(err) = state.rooms().send_to(connection, message) {
        warn!(error = %err, "failed to deliver direct message");
    }
}
