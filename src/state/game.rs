use std::time::{Duration, SystemTime};

use indexmap::IndexMap;
use time::{OffsetDateTime, UtcOffset};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::models::{GameEntity, PhaseEntity, PromptEntity, UserEntity},
    state::state_machine::{GameStateMachine, GamePhase},
};

/// Prompt assigned to a game at creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// Prompt id.
    pub id: Uuid,
    /// Prompt text shown to players.
    pub text: String,
}

/// Member of a live game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Player id.
    pub id: Uuid,
    /// Unique username.
    pub username: String,
    /// Display name.
    pub name: String,
}

/// Authoritative in-memory copy of a game that is still running.
///
/// Always accessed through the per-game mutex held in [`crate::state::AppState`], so every
/// read-modify-write of phase, timing or roster is serialized per game.
#[derive(Debug)]
pub struct LiveGame {
    /// Primary key shared with the repository.
    pub id: Uuid,
    /// Shareable join code.
    pub code: String,
    /// Player holding host privileges. Always a member.
    pub host_id: Uuid,
    /// Maximum number of members accepted at join time.
    pub capacity: u32,
    /// Prompt drawn at creation; never changes.
    pub prompt: Prompt,
    /// Entry time of the current timed phase, in UTC.
    pub phase_started_at: Option<OffsetDateTime>,
    /// Members in join order, host first.
    pub players: IndexMap<Uuid, Player>,
    /// Creation timestamp.
    pub created_at: OffsetDateTime,
    pub(crate) machine: GameStateMachine,
}

impl LiveGame {
    /// Build a lobby with the host as its only member.
    pub fn new(
        code: String,
        host: Player,
        capacity: u32,
        prompt: Prompt,
        now: OffsetDateTime,
    ) -> Self {
        let host_id = host.id;
        let mut players = IndexMap::new();
        players.insert(host.id, host);

        Self {
            id: Uuid::new_v4(),
            code,
            host_id,
            capacity,
            prompt,
            phase_started_at: None,
            players,
            created_at: now,
            machine: GameStateMachine::new(),
        }
    }

    /// Current phase of the game.
    pub fn phase(&self) -> GamePhase {
        self.machine.phase()
    }

    /// Whether `player_id` hosts this game.
    pub fn is_host(&self, player_id: Uuid) -> bool {
        self.host_id == player_id
    }

    /// Whether `player_id` is in the roster.
    pub fn is_member(&self, player_id: Uuid) -> bool {
        self.players.contains_key(&player_id)
    }

    /// Whether the roster reached capacity.
    pub fn is_full(&self) -> bool {
        self.players.len() >= self.capacity as usize
    }

    /// Record entry into `phase`, stamping the start time only for timed phases.
    pub(crate) fn enter_phase(&mut self, phase: GamePhase, now: OffsetDateTime) {
        self.phase_started_at = phase
            .is_timed()
            .then(|| now.to_offset(UtcOffset::UTC));
    }

    /// Full length of the deadline attached to the current phase, if any.
    ///
    /// The lobby reports the whiteboard duration since that clock has not started yet.
    pub fn phase_duration(&self, config: &AppConfig) -> Option<Duration> {
        match self.phase() {
            GamePhase::Lobby | GamePhase::Whiteboard => Some(config.whiteboard_duration()),
            GamePhase::Submission => Some(config.grace_window()),
            GamePhase::Voting => Some(config.voting_window()),
            GamePhase::Results => Some(config.results_window()),
            GamePhase::Closed => None,
        }
    }

    /// Seconds left in the current phase; zero for phases without a deadline.
    pub fn remaining_seconds(&self, config: &AppConfig, now: OffsetDateTime) -> u64 {
        match (self.phase(), self.phase_duration(config)) {
            (GamePhase::Lobby, Some(duration)) => remaining_seconds(duration, None, now),
            (_, Some(duration)) => remaining_seconds(duration, self.phase_started_at, now),
            (_, None) => 0,
        }
    }

    /// Persistable view of the game as it would look after entering `phase` at `now`.
    pub fn entity_for(&self, phase: GamePhase, now: OffsetDateTime) -> GameEntity {
        let phase_started_at = if phase == self.phase() {
            self.phase_started_at
        } else {
            phase.is_timed().then_some(now)
        };

        GameEntity {
            id: self.id,
            code: self.code.clone(),
            phase: phase.into(),
            host_id: self.host_id,
            capacity: self.capacity,
            prompt_id: self.prompt.id,
            phase_started_at: phase_started_at.map(SystemTime::from),
            created_at: SystemTime::from(self.created_at),
            updated_at: SystemTime::from(now),
        }
    }

    /// Persistable view of the game in its current phase.
    pub fn to_entity(&self, now: OffsetDateTime) -> GameEntity {
        self.entity_for(self.phase(), now)
    }
}

/// Remaining whole seconds of a `duration`-long phase that began at `started_at`.
///
/// Timestamps are normalized to UTC before subtracting. A phase that has not started yet
/// reports its full duration; a start time in the future counts as zero elapsed.
pub fn remaining_seconds(
    duration: Duration,
    started_at: Option<OffsetDateTime>,
    now: OffsetDateTime,
) -> u64 {
    let total = duration.as_secs();
    let Some(started_at) = started_at else {
        return total;
    };

    let elapsed = now.to_offset(UtcOffset::UTC) - started_at.to_offset(UtcOffset::UTC);
    let elapsed = u64::try_from(elapsed.whole_seconds()).unwrap_or(0);
    total.saturating_sub(elapsed)
}

impl From<GamePhase> for PhaseEntity {
    fn from(value: GamePhase) -> Self {
        match value {
            GamePhase::Lobby => PhaseEntity::Lobby,
            GamePhase::Whiteboard => PhaseEntity::Whiteboard,
            GamePhase::Submission => PhaseEntity::Submission,
            GamePhase::Voting => PhaseEntity::Voting,
            GamePhase::Results => PhaseEntity::Results,
            GamePhase::Closed => PhaseEntity::Closed,
        }
    }
}

impl From<PhaseEntity> for GamePhase {
    fn from(value: PhaseEntity) -> Self {
        match value {
            PhaseEntity::Lobby => GamePhase::Lobby,
            PhaseEntity::Whiteboard => GamePhase::Whiteboard,
            PhaseEntity::Submission => GamePhase::Submission,
            PhaseEntity::Voting => GamePhase::Voting,
            PhaseEntity::Results => GamePhase::Results,
            PhaseEntity::Closed => GamePhase::Closed,
        }
    }
}

impl From<UserEntity> for Player {
    fn from(value: UserEntity) -> Self {
        Self {
            id: value.id,
            username: value.username,
            name: value.name,
        }
    }
}

impl From<PromptEntity> for Prompt {
    fn from(value: PromptEntity) -> Self {
        Self {
            id: value.id,
            text: value.content,
        }
    }
}
