use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::dto::ws::ServerMessage;

/// Outbound half of a live WebSocket session.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    /// Identifier of the socket session, distinct from the player using it.
    pub id: Uuid,
    tx: mpsc::UnboundedSender<ServerMessage>,
}

/// The writer task behind a connection has gone away.
#[derive(Debug, Error)]
#[error("connection {0} is closed")]
pub struct DeliveryError(pub Uuid);

impl ConnectionHandle {
    /// Create a handle and the receiver the socket writer drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                id: Uuid::new_v4(),
                tx,
            },
            rx,
        )
    }

    /// Queue a message without waiting on the transport.
    pub fn send(&self, message: ServerMessage) -> Result<(), DeliveryError> {
        self.tx.send(message).map_err(|_| DeliveryError(self.id))
    }
}

/// Game code to live connections, keyed by the player owning each connection.
///
/// Rooms are independent of durable membership: a member may have no connection and a
/// connection may linger briefly after its membership is gone.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: DashMap<String, DashMap<Uuid, ConnectionHandle>>,
}

impl RoomRegistry {
    /// Registry without any room.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `connection` for `player_id` under `code`, replacing a stale one for that player.
    pub fn join(&self, code: &str, player_id: Uuid, connection: ConnectionHandle) {
        let connection_id = connection.id;
        let room = self.rooms.entry(code.to_owned()).or_default();
        if let Some(previous) = room.insert(player_id, connection)
            && previous.id != connection_id
        {
            debug!(
                code,
                player_id = %player_id,
                connection_id = %previous.id,
                "replaced stale connection"
            );
        }
    }

    /// Detach a connection from a room. No effect when it is not registered there.
    pub fn leave(&self, code: &str, connection_id: Uuid) -> bool {
        let removed = match self.rooms.get(code) {
            Some(room) => {
                let before = room.len();
                room.retain(|_, connection| connection.id != connection_id);
                before != room.len()
            }
            None => false,
        };
        self.drop_if_empty(code);
        removed
    }

    /// Detach whatever connection `player_id` holds in the room.
    pub fn remove_player(&self, code: &str, player_id: Uuid) -> Option<ConnectionHandle> {
        let removed = self
            .rooms
            .get(code)
            .and_then(|room| room.remove(&player_id).map(|(_, connection)| connection));
        self.drop_if_empty(code);
        removed
    }

    /// Deliver `message` to every connection in the room and return how many accepted it.
    ///
    /// Recipients are snapshotted first; a dead connection is evicted without affecting others.
    pub fn broadcast(&self, code: &str, message: &ServerMessage) -> usize {
        let recipients: Vec<(Uuid, ConnectionHandle)> = match self.rooms.get(code) {
            Some(room) => room
                .iter()
                .map(|entry| (*entry.key(), entry.value().clone()))
                .collect(),
            None => return 0,
        };

        let mut delivered = 0;
        let mut dead = Vec::new();
        for (player_id, connection) in recipients {
            match connection.send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(err) => {
                    debug!(code, player_id = %player_id, error = %err, "dropping dead connection");
                    dead.push((player_id, connection.id));
                }
            }
        }

        if !dead.is_empty() {
            if let Some(room) = self.rooms.get(code) {
                for (player_id, connection_id) in dead {
                    room.remove_if(&player_id, |_, connection| connection.id == connection_id);
                }
            }
            self.drop_if_empty(code);
        }

        delivered
    }

    /// Unicast to a single connection.
    pub fn send_to(
        &self,
        connection: &ConnectionHandle,
        message: ServerMessage,
    ) -> Result<(), DeliveryError> {
        connection.send(message)
    }

    /// Drop the whole room, returning the connections it held.
    pub fn close_room(&self, code: &str) -> Vec<ConnectionHandle> {
        self.rooms
            .remove(code)
            .map(|(_, room)| room.into_iter().map(|(_, connection)| connection).collect())
            .unwrap_or_default()
    }

    /// Forget a socket session in every room it was registered in.
    pub fn disconnect(&self, connection_id: Uuid) {
        let codes: Vec<String> = self
            .rooms
            .iter()
            .filter(|room| room.value().iter().any(|c| c.id == connection_id))
            .map(|room| room.key().clone())
            .collect();

        for code in codes {
            self.leave(&code, connection_id);
        }
    }

    /// Number of live connections registered under `code`.
    pub fn connection_count(&self, code: &str) -> usize {
        self.rooms.get(code).map(|room| room.len()).unwrap_or(0)
    }

    fn drop_if_empty(&self, code: &str) {
        self.rooms.remove_if(code, |_, room| room.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::ws::GameClosedEvent;

    fn closed(code: &str) -> ServerMessage {
        ServerMessage::GameClosed(GameClosedEvent { code: code.into() })
    }

    #[test]
    fn broadcast_reaches_every_connection() {
        let rooms = RoomRegistry::new();
        let (first, mut first_rx) = ConnectionHandle::new();
        let (second, mut second_rx) = ConnectionHandle::new();
        rooms.join("ROOM0001", Uuid::new_v4(), first);
        rooms.join("ROOM0001", Uuid::new_v4(), second);

        assert_eq!(rooms.broadcast("ROOM0001", &closed("ROOM0001")), 2);
        assert!(first_rx.try_recv().is_ok());
        assert!(second_rx.try_recv().is_ok());
        assert_eq!(rooms.broadcast("OTHER000", &closed("OTHER000")), 0);
    }

    #[test]
    fn dead_connection_does_not_block_others() {
        let rooms = RoomRegistry::new();
        let (alive, mut alive_rx) = ConnectionHandle::new();
        let (dead, dead_rx) = ConnectionHandle::new();
        drop(dead_rx);
        rooms.join("ROOM0001", Uuid::new_v4(), dead);
        rooms.join("ROOM0001", Uuid::new_v4(), alive);

        assert_eq!(rooms.broadcast("ROOM0001", &closed("ROOM0001")), 1);
        assert!(alive_rx.try_recv().is_ok());
        assert_eq!(rooms.connection_count("ROOM0001"), 1);
    }

    #[test]
    fn rejoin_replaces_stale_connection_for_same_player() {
        let rooms = RoomRegistry::new();
        let player = Uuid::new_v4();
        let (stale, mut stale_rx) = ConnectionHandle::new();
        let (fresh, mut fresh_rx) = ConnectionHandle::new();
        let (other, _other_rx) = ConnectionHandle::new();

        rooms.join("ROOM0001", player, stale.clone());
        rooms.join("ROOM0001", Uuid::new_v4(), other);
        rooms.join("ROOM0001", player, fresh);

        assert_eq!(rooms.connection_count("ROOM0001"), 2);
        rooms.broadcast("ROOM0001", &closed("ROOM0001"));
        assert!(stale_rx.try_recv().is_err());
        assert!(fresh_rx.try_recv().is_ok());
        assert!(!rooms.leave("ROOM0001", stale.id));
    }

    #[test]
    fn leave_and_disconnect_empty_the_room() {
        let rooms = RoomRegistry::new();
        let (connection, _rx) = ConnectionHandle::new();
        let id = connection.id;
        rooms.join("ROOM0001", Uuid::new_v4(), connection.clone());
        rooms.join("ROOM0002", Uuid::new_v4(), connection);

        assert!(rooms.leave("ROOM0001", id));
        assert!(!rooms.leave("ROOM0001", id));
        assert_eq!(rooms.connection_count("ROOM0001"), 0);

        rooms.disconnect(id);
        assert_eq!(rooms.connection_count("ROOM0002"), 0);
    }

    #[test]
    fn close_room_returns_members() {
        let rooms = RoomRegistry::new();
        let (connection, _rx) = ConnectionHandle::new();
        rooms.join("ROOM0001", Uuid::new_v4(), connection);
        assert_eq!(rooms.close_room("ROOM0001").len(), 1);
        assert!(rooms.close_room("ROOM0001").is_empty());
    }
}
