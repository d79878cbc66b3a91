use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle, time::timeout};
use tracing::{debug, info, warn};

use crate::{
    dto::ws::{ClientMessage, CommandFailedEvent, InboundError, ServerMessage},
    error::ServiceError,
    services::{
        game_service,
        room_events::{send_command_failed, send_rejoin_failed},
    },
    state::{SharedState, rooms::ConnectionHandle},
};

const WRITER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// Handle the full lifecycle of one client WebSocket session.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (connection, mut events_rx) = ConnectionHandle::new();
    let (control_tx, mut control_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps room events flowing even while we await inbound frames.
    let connection_id = connection.id;
    let writer_task = tokio::spawn(async move {
        loop {
            let frame = tokio::select! {
                Some(event) = events_rx.recv() => match serde_json::to_string(&event) {
                    Ok(payload) => Message::Text(payload.into()),
                    Err(err) => {
                        warn!(error = %err, "failed to serialize event `{event:?}`");
                        continue;
                    }
                },
                Some(control) = control_rx.recv() => control,
                else => break,
            };
            let closing = matches!(frame, Message::Close(_));
            if sender.send(frame).await.is_err() || closing {
                break;
            }
        }
        debug!(connection_id = %connection_id, "websocket writer stopped");
    });

    info!(connection_id = %connection.id, "websocket connected");

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                debug!(connection_id = %connection.id, payload = %text, "received client message");
                match ClientMessage::from_json_str(&text) {
                    Ok(command) => dispatch(&state, &connection, command).await,
                    Err(err) => {
                        warn!(
                            connection_id = %connection.id,
                            error = %err,
                            "failed to parse or validate client message"
                        );
                        reject_message(&connection, &err);
                    }
                }
            }
            Ok(Message::Ping(payload)) => {
                let _ = control_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                let _ = control_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) | Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(connection_id = %connection.id, error = %err, "websocket error");
                break;
            }
        }
    }

    state.rooms().disconnect(connection.id);
    info!(connection_id = %connection.id, "websocket disconnected");

    finalize(writer_task, connection, control_tx).await;
}

/// Route a validated command to the orchestrator and report failures to the caller.
pub async fn dispatch(state: &SharedState, connection: &ConnectionHandle, command: ClientMessage) {
    let result: Result<(), ServiceError> = match &command {
        ClientMessage::RejoinGame(payload) => {
            game_service::rejoin_game(state, payload.player_id, &payload.code, connection).await
        }
        ClientMessage::StartGame(payload) => {
            game_service::start_game(state, payload.host_id, &payload.code).await
        }
        ClientMessage::LeaveRoom(payload) => {
            game_service::leave_room(state, &payload.code, connection);
            Ok(())
        }
        ClientMessage::ShowResults(payload) => {
            game_service::show_results(state, payload.host_id, &payload.code).await
        }
        ClientMessage::EndGame(payload) => {
            game_service::end_game(state, payload.host_id, &payload.code).await
        }
    };

    let Err(err) = result else {
        return;
    };

    warn!(
        connection_id = %connection.id,
        command = command.name(),
        code = command.code(),
        error = %err,
        "client command failed"
    );
    match &command {
        ClientMessage::RejoinGame(payload) => {
            send_rejoin_failed(state, connection, &payload.code, &err)
        }
        _ => send_command_failed(state, connection, command.name(), &err),
    }
}

fn reject_message(connection: &ConnectionHandle, err: &InboundError) {
    let message = ServerMessage::CommandFailed(CommandFailedEvent {
        command: "unknown".into(),
        error: "validation_failed".into(),
        message: err.to_string(),
    });
    if connection.send(message).is_err() {
        debug!(connection_id = %connection.id, "writer gone before rejection was sent");
    }
}

async fn finalize(
    mut writer_task: JoinHandle<()>,
    connection: ConnectionHandle,
    control_tx: mpsc::UnboundedSender<Message>,
) {
    drop(connection);
    drop(control_tx);
    if timeout(WRITER_SHUTDOWN_TIMEOUT, &mut writer_task).await.is_err() {
        warn!("websocket writer did not stop in time; aborting");
        writer_task.abort();
    }
}
