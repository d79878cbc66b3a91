/// Time source for phase deadlines.
pub mod clock;
/// Live game records.
pub mod game;
/// At-most-once drawing submissions.
pub mod ledger;
/// WebSocket rooms per game.
pub mod rooms;
/// Game phase state machine.
pub mod state_machine;
/// Transition helpers tying phases to persistence.
pub mod transitions;

use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{config::AppConfig, dao::repository::Repository};

pub use self::state_machine::{AbortError, ApplyError, Plan, PlanError, PlanId};
use self::{clock::Clock, game::LiveGame, ledger::SubmissionLedger, rooms::RoomRegistry};

/// State shared by every handler and background task.
pub type SharedState = Arc<AppState>;

/// A live game behind its own lock. Commands on different games never contend.
pub type GameHandle = Arc<Mutex<LiveGame>>;

/// Central application state: live game table, player index, rooms and collaborators.
pub struct AppState {
    config: Arc<AppConfig>,
    repository: Arc<dyn Repository>,
    clock: Arc<dyn Clock>,
    games: DashMap<String, GameHandle>,
    active_players: DashMap<Uuid, String>,
    rooms: RoomRegistry,
    ledger: SubmissionLedger,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(
        config: AppConfig,
        repository: Arc<dyn Repository>,
        clock: Arc<dyn Clock>,
    ) -> SharedState {
        Arc::new(Self {
            config: Arc::new(config),
            repository,
            clock,
            games: DashMap::new(),
            active_players: DashMap::new(),
            rooms: RoomRegistry::new(),
            ledger: SubmissionLedger::new(),
        })
    }

    /// Loaded runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Durable store shared by every command.
    pub fn repository(&self) -> Arc<dyn Repository> {
        self.repository.clone()
    }

    /// Current UTC time according to the installed clock.
    pub fn now(&self) -> OffsetDateTime {
        self.clock.now()
    }

    /// Handle of the live game registered under `code`.
    pub fn game(&self, code: &str) -> Option<GameHandle> {
        self.games.get(code).map(|entry| entry.value().clone())
    }

    /// Snapshot of live game codes; the table may change right after.
    pub fn live_game_codes(&self) -> Vec<String> {
        self.games.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Register a new game unless its code is already taken.
    pub fn insert_game_if_vacant(&self, code: &str, game: GameHandle) -> bool {
        match self.games.entry(code.to_owned()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(game);
                true
            }
        }
    }

    /// Drop `code` from the live game table.
    pub fn remove_game(&self, code: &str) -> Option<GameHandle> {
        self.games.remove(code).map(|(_, game)| game)
    }

    /// Atomically bind a player to `code`. Fails when the player already belongs to a game.
    pub fn reserve_player(&self, player_id: Uuid, code: &str) -> bool {
        match self.active_players.entry(player_id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(code.to_owned());
                true
            }
        }
    }

    /// Release the player only if still bound to `code`.
    pub fn release_player(&self, player_id: Uuid, code: &str) -> bool {
        self.active_players
            .remove_if(&player_id, |_, bound| bound == code)
            .is_some()
    }

    /// Code of the game the player currently belongs to.
    pub fn active_game_of(&self, player_id: Uuid) -> Option<String> {
        self.active_players
            .get(&player_id)
            .map(|entry| entry.value().clone())
    }

    /// Registry of connected sockets grouped by game code.
    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    /// Drawing submission ledger.
    pub fn ledger(&self) -> &SubmissionLedger {
        &self.ledger
    }
}
