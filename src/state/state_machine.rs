use std::{fmt, time::Instant};

use thiserror::Error;
use uuid::Uuid;

/// Phases a game moves through, in order. `Closed` is terminal and reachable from any phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GamePhase {
    /// Players gather; the host can start once ready.
    Lobby,
    /// Timed drawing phase.
    Whiteboard,
    /// Drawings are collected during the grace window.
    Submission,
    /// Players vote on the collected drawings.
    Voting,
    /// Final results are displayed.
    Results,
    /// Game torn down; no further transitions.
    Closed,
}

impl GamePhase {
    /// Position along the fixed cycle, used to assert forward-only progress.
    pub fn ordinal(self) -> u8 {
        match self {
            GamePhase::Lobby => 0,
            GamePhase::Whiteboard => 1,
            GamePhase::Submission => 2,
            GamePhase::Voting => 3,
            GamePhase::Results => 4,
            GamePhase::Closed => 5,
        }
    }

    /// Phases whose entry time is recorded because a deadline applies.
    pub fn is_timed(self) -> bool {
        matches!(
            self,
            GamePhase::Whiteboard | GamePhase::Submission | GamePhase::Voting | GamePhase::Results
        )
    }

    /// Terminal phase check.
    pub fn is_closed(self) -> bool {
        matches!(self, GamePhase::Closed)
    }

    /// Drawings are accepted while the whiteboard is open and during the grace window.
    pub fn accepts_drawings(self) -> bool {
        matches!(self, GamePhase::Whiteboard | GamePhase::Submission)
    }

    /// Stable lowercase name, used in logs and errors.
    pub fn as_str(self) -> &'static str {
        match self {
            GamePhase::Lobby => "lobby",
            GamePhase::Whiteboard => "whiteboard",
            GamePhase::Submission => "submission",
            GamePhase::Voting => "voting",
            GamePhase::Results => "results",
            GamePhase::Closed => "closed",
        }
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a game was torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The host left the game.
    HostLeft,
    /// The results were shown and the game ended, by the host or by the clock.
    Finished,
}

/// Events that can be applied to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    /// Host starts the game from the lobby.
    StartGame,
    /// The whiteboard deadline passed.
    WhiteboardElapsed,
    /// The post-submission grace window passed.
    GraceElapsed,
    /// Host moves from voting to the results screen.
    ShowResults,
    /// Voting stayed open for its whole window without the host moving on.
    VotingElapsed,
    /// Tear the game down.
    Close(CloseReason),
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event was received.
    pub from: GamePhase,
    /// The event that cannot be applied from this phase.
    pub event: GameEvent,
}

/// Errors that can occur when planning a state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// A transition is already pending and must be applied or aborted.
    AlreadyPending,
    /// The requested transition is not valid from the current phase.
    InvalidTransition(InvalidTransition),
}

/// Errors that can occur when applying a planned state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
    /// State machine phase changed since the plan was created.
    PhaseMismatch {
        /// Phase when plan was created.
        expected: GamePhase,
        /// Current phase.
        actual: GamePhase,
    },
    /// State machine version changed since the plan was created.
    VersionMismatch {
        /// Version when plan was created.
        expected: usize,
        /// Current version.
        actual: usize,
    },
}

/// Errors that can occur when aborting a planned state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
}

/// Unique identifier for a planned state transition.
pub type PlanId = Uuid;

/// A planned state machine transition that has been validated but not yet applied.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Unique identifier for this plan.
    pub id: PlanId,
    /// Phase the state machine is currently in.
    pub from: GamePhase,
    /// Phase the state machine will transition to.
    pub to: GamePhase,
    /// Event that triggered this transition.
    pub event: GameEvent,
    /// Version number after applying this transition.
    pub version_next: usize,
    /// Timestamp when this plan was created.
    pub pending_since: Instant,
}

/// Per-game state machine. Transitions are planned, backed by persistence work, then applied.
#[derive(Debug, Clone)]
pub struct GameStateMachine {
    phase: GamePhase,
    version: usize,
    pending: Option<Plan>,
}

impl Default for GameStateMachine {
    fn default() -> Self {
        Self {
            phase: GamePhase::Lobby,
            version: 0,
            pending: None,
        }
    }
}

impl GameStateMachine {
    /// Create a new state machine initialised in the lobby.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    /// Identifier of the pending plan, if any.
    pub fn pending_id(&self) -> Option<PlanId> {
        self.pending.as_ref().map(|plan| plan.id)
    }

    /// Plan a transition by validating that the event can be applied from the current phase.
    /// Returns a Plan that can later be applied or aborted.
    pub fn plan(&mut self, event: GameEvent) -> Result<Plan, PlanError> {
        if self.pending.is_some() {
            return Err(PlanError::AlreadyPending);
        }

        let next = self
            .compute_transition(event)
            .map_err(PlanError::InvalidTransition)?;

        let plan = Plan {
            id: Uuid::new_v4(),
            from: self.phase,
            to: next,
            event,
            version_next: self.version + 1,
            pending_since: Instant::now(),
        };

        self.pending = Some(plan.clone());

        Ok(plan)
    }

    /// Apply a planned transition, moving the state machine to the next phase.
    /// Returns the new phase after the transition.
    pub fn apply(&mut self, plan_id: PlanId) -> Result<GamePhase, ApplyError> {
        let plan = self.pending.take().ok_or(ApplyError::NoPending)?;

        if plan.id != plan_id {
            let expected_plan_id = plan.id;
            self.pending = Some(plan);
            return Err(ApplyError::IdMismatch {
                expected: expected_plan_id,
                got: plan_id,
            });
        }

        if self.phase != plan.from {
            return Err(ApplyError::PhaseMismatch {
                expected: plan.from,
                actual: self.phase,
            });
        }

        if self.version + 1 != plan.version_next {
            return Err(ApplyError::VersionMismatch {
                expected: plan.version_next,
                actual: self.version + 1,
            });
        }

        self.phase = plan.to;
        self.version = plan.version_next;

        Ok(self.phase)
    }

    /// Abort a planned transition without applying it, returning the state machine to its
    /// previous state.
    pub fn abort(&mut self, plan_id: PlanId) -> Result<(), AbortError> {
        let plan = self.pending.as_ref().ok_or(AbortError::NoPending)?;

        if plan.id != plan_id {
            return Err(AbortError::IdMismatch {
                expected: plan.id,
                got: plan_id,
            });
        }

        self.pending = None;
        Ok(())
    }

    /// Compute a transition from an event if the transition is valid.
    fn compute_transition(&self, event: GameEvent) -> Result<GamePhase, InvalidTransition> {
        let next = match (self.phase, event) {
            (GamePhase::Lobby, GameEvent::StartGame) => GamePhase::Whiteboard,
            (GamePhase::Whiteboard, GameEvent::WhiteboardElapsed) => GamePhase::Submission,
            (GamePhase::Submission, GameEvent::GraceElapsed) => GamePhase::Voting,
            (GamePhase::Voting, GameEvent::ShowResults | GameEvent::VotingElapsed) => {
                GamePhase::Results
            }
            (from, GameEvent::Close(_)) if !from.is_closed() => GamePhase::Closed,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(sm: &mut GameStateMachine, event: GameEvent) -> GamePhase {
        let plan = sm.plan(event).unwrap();
        sm.apply(plan.id).unwrap()
    }

    #[test]
    fn initial_state_is_lobby() {
        let sm = GameStateMachine::new();
        assert_eq!(sm.phase(), GamePhase::Lobby);
        assert_eq!(sm.version, 0);
    }

    #[test]
    fn full_happy_path_through_game() {
        let mut sm = GameStateMachine::new();

        assert_eq!(apply(&mut sm, GameEvent::StartGame), GamePhase::Whiteboard);
        assert_eq!(
            apply(&mut sm, GameEvent::WhiteboardElapsed),
            GamePhase::Submission
        );
        assert_eq!(apply(&mut sm, GameEvent::GraceElapsed), GamePhase::Voting);
        assert_eq!(apply(&mut sm, GameEvent::ShowResults), GamePhase::Results);
        assert_eq!(
            apply(&mut sm, GameEvent::Close(CloseReason::Finished)),
            GamePhase::Closed
        );
        assert_eq!(sm.version, 5);
    }

    #[test]
    fn phases_only_move_forward() {
        let events = [
            GameEvent::StartGame,
            GameEvent::WhiteboardElapsed,
            GameEvent::GraceElapsed,
            GameEvent::ShowResults,
            GameEvent::Close(CloseReason::Finished),
        ];
        let all_events = [
            GameEvent::StartGame,
            GameEvent::WhiteboardElapsed,
            GameEvent::GraceElapsed,
            GameEvent::ShowResults,
            GameEvent::VotingElapsed,
            GameEvent::Close(CloseReason::HostLeft),
        ];

        let mut sm = GameStateMachine::new();
        for event in events {
            // Every event accepted from the current phase lands exactly one step ahead,
            // except Close which may jump straight to the end.
            for candidate in all_events {
                let mut probe = sm.clone();
                if let Ok(plan) = probe.plan(candidate) {
                    assert!(plan.to.ordinal() > plan.from.ordinal());
                    if !matches!(candidate, GameEvent::Close(_)) {
                        assert_eq!(plan.to.ordinal(), plan.from.ordinal() + 1);
                    }
                }
            }
            apply(&mut sm, event);
        }
    }

    #[test]
    fn close_is_reachable_from_every_open_phase() {
        let path = [
            GameEvent::StartGame,
            GameEvent::WhiteboardElapsed,
            GameEvent::GraceElapsed,
            GameEvent::ShowResults,
        ];
        for steps in 0..=path.len() {
            let mut sm = GameStateMachine::new();
            for event in &path[..steps] {
                apply(&mut sm, *event);
            }
            assert_eq!(
                apply(&mut sm, GameEvent::Close(CloseReason::HostLeft)),
                GamePhase::Closed
            );
        }
    }

    #[test]
    fn closed_is_terminal() {
        let mut sm = GameStateMachine::new();
        apply(&mut sm, GameEvent::Close(CloseReason::HostLeft));

        let err = sm.plan(GameEvent::Close(CloseReason::HostLeft)).unwrap_err();
        assert_eq!(
            err,
            PlanError::InvalidTransition(InvalidTransition {
                from: GamePhase::Closed,
                event: GameEvent::Close(CloseReason::HostLeft),
            })
        );
        assert!(sm.plan(GameEvent::StartGame).is_err());
    }

    #[test]
    fn start_twice_is_rejected() {
        let mut sm = GameStateMachine::new();
        apply(&mut sm, GameEvent::StartGame);

        let err = sm.plan(GameEvent::StartGame).unwrap_err();
        match err {
            PlanError::InvalidTransition(invalid) => {
                assert_eq!(invalid.from, GamePhase::Whiteboard);
                assert_eq!(invalid.event, GameEvent::StartGame);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn voting_ends_on_host_command_or_deadline() {
        for event in [GameEvent::ShowResults, GameEvent::VotingElapsed] {
            let mut sm = GameStateMachine::new();
            apply(&mut sm, GameEvent::StartGame);
            apply(&mut sm, GameEvent::WhiteboardElapsed);
            assert!(sm.plan(GameEvent::VotingElapsed).is_err());
            apply(&mut sm, GameEvent::GraceElapsed);
            assert_eq!(apply(&mut sm, event), GamePhase::Results);
        }
    }

    #[test]
    fn skipping_a_phase_is_rejected() {
        let mut sm = GameStateMachine::new();
        assert!(sm.plan(GameEvent::GraceElapsed).is_err());
        apply(&mut sm, GameEvent::StartGame);
        assert!(sm.plan(GameEvent::ShowResults).is_err());
    }

    #[test]
    fn second_plan_waits_for_pending() {
        let mut sm = GameStateMachine::new();
        let plan = sm.plan(GameEvent::StartGame).unwrap();
        assert_eq!(
            sm.plan(GameEvent::Close(CloseReason::HostLeft)).unwrap_err(),
            PlanError::AlreadyPending
        );
        assert_eq!(sm.pending.as_ref().map(|plan| plan.to), Some(GamePhase::Whiteboard));

        sm.apply(plan.id).unwrap();
        assert_eq!(sm.pending.as_ref().map(|plan| plan.to), None);
    }

    #[test]
    fn apply_with_wrong_id_keeps_plan() {
        let mut sm = GameStateMachine::new();
        let plan = sm.plan(GameEvent::StartGame).unwrap();
        let err = sm.apply(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, ApplyError::IdMismatch { .. }));
        assert_eq!(sm.pending_id(), Some(plan.id));
    }

    #[test]
    fn abort_clears_pending() {
        let mut sm = GameStateMachine::new();
        let plan = sm.plan(GameEvent::StartGame).unwrap();
        sm.abort(plan.id).unwrap();
        assert!(sm.pending.is_none());
        assert_eq!(sm.phase(), GamePhase::Lobby);
    }
}
