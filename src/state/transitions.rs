use std::{future::Future, time::Duration};

use time::OffsetDateTime;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::{
    dao::models::GameEntity,
    error::ServiceError,
    services::room_events::broadcast_phase_changed,
    state::{
        SharedState,
        game::LiveGame,
        state_machine::{GameEvent, GamePhase, Plan},
    },
};

/// Plan `event` on a locked game, run `work` with the post-transition entity, then apply.
///
/// The plan is aborted when `work` fails or exceeds `limit`, leaving the game untouched.
/// A plan left pending by a cancelled command is discarded before planning anew.
pub async fn run_transition<F, Fut, T>(
    game: &mut LiveGame,
    now: OffsetDateTime,
    limit: Duration,
    event: GameEvent,
    work: F,
) -> Result<(T, GamePhase), ServiceError>
where
    F: FnOnce(GameEntity) -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    if let Some(stale) = game.machine.pending_id() {
        warn!(code = %game.code, plan_id = %stale, "discarding transition left pending");
        game.machine.abort(stale)?;
    }

    let Plan {
        id: plan_id, to, ..
    } = game.machine.plan(event)?;
    let entity = game.entity_for(to, now);

    let outcome = match timeout(limit, work(entity)).await {
        Ok(result) => result,
        Err(_) => Err(ServiceError::Timeout),
    };

    match outcome {
        Ok(value) => {
            let next = game.machine.apply(plan_id)?;
            game.enter_phase(next, now);
            debug!(code = %game.code, ?event, phase = %next, "transition applied");
            Ok((value, next))
        }
        Err(err) => {
            if let Err(abort_err) = game.machine.abort(plan_id) {
                warn!(
                    code = %game.code,
                    event = ?event,
                    plan_id = %plan_id,
                    error = ?abort_err,
                    "failed to abort transition after work error"
                );
            }
            Err(err)
        }
    }
}

/// Execute a planned transition on a locked game, then broadcast the resulting phase change.
pub async fn run_transition_with_broadcast<F, Fut, T>(
    state: &SharedState,
    game: &mut LiveGame,
    event: GameEvent,
    work: F,
) -> Result<T, ServiceError>
where
    F: FnOnce(GameEntity) -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let limit = state.config().transition_timeout();
    let (res, _) = run_transition(game, state.now(), limit, event, work).await?;
    broadcast_phase_changed(state, game);
    Ok(res)
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;
    use uuid::Uuid;

    use super::*;
    use crate::state::game::{Player, Prompt};

    fn lobby() -> LiveGame {
        LiveGame::new(
            "ABCD1234".into(),
            Player {
                id: Uuid::new_v4(),
                username: "host".into(),
                name: "Host".into(),
            },
            4,
            Prompt {
                id: Uuid::new_v4(),
                text: "A dragon baking bread".into(),
            },
            datetime!(2025-01-01 00:00 UTC),
        )
    }

    #[tokio::test]
    async fn successful_work_applies_the_plan() {
        let mut game = lobby();
        let now = datetime!(2025-01-01 00:01 UTC);

        let (seen, next) = run_transition(
            &mut game,
            now,
            Duration::from_secs(1),
            GameEvent::StartGame,
            |entity| async move { Ok(entity.phase) },
        )
        .await
        .unwrap();

        assert_eq!(next, GamePhase::Whiteboard);
        assert_eq!(GamePhase::from(seen), GamePhase::Whiteboard);
        assert_eq!(game.phase(), GamePhase::Whiteboard);
        assert_eq!(game.phase_started_at, Some(now));
        assert!(game.machine.pending_id().is_none());
    }

    #[tokio::test]
    async fn failed_work_aborts_the_plan() {
        let mut game = lobby();
        let err = run_transition(
            &mut game,
            datetime!(2025-01-01 00:01 UTC),
            Duration::from_secs(1),
            GameEvent::StartGame,
            |_| async { Err::<(), _>(ServiceError::MissingData) },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ServiceError::MissingData));
        assert_eq!(game.phase(), GamePhase::Lobby);
        assert!(game.phase_started_at.is_none());
        assert!(game.machine.pending_id().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_work_times_out() {
        let mut game = lobby();
        let err = run_transition(
            &mut game,
            datetime!(2025-01-01 00:01 UTC),
            Duration::from_secs(5),
            GameEvent::StartGame,
            |_| async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ServiceError::Timeout));
        assert_eq!(game.phase(), GamePhase::Lobby);
    }

    #[tokio::test]
    async fn invalid_event_is_rejected_before_work_runs() {
        let mut game = lobby();
        let err = run_transition(
            &mut game,
            datetime!(2025-01-01 00:01 UTC),
            Duration::from_secs(1),
            GameEvent::GraceElapsed,
            |_| async { Err::<(), _>(ServiceError::Timeout) },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ServiceError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn stale_pending_plan_is_discarded() {
        let mut game = lobby();
        game.machine.plan(GameEvent::StartGame).unwrap();

        let (_, next) = run_transition(
            &mut game,
            datetime!(2025-01-01 00:01 UTC),
            Duration::from_secs(1),
            GameEvent::Close(crate::state::state_machine::CloseReason::HostLeft),
            |_| async { Ok(()) },
        )
        .await
        .unwrap();

        assert_eq!(next, GamePhase::Closed);
    }
}
