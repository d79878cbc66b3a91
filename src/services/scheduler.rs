//! Phase clock: a single scan loop over live games plus one-shot grace-window tasks.
//!
//! The scan owns every deadline. Grace-window tasks only open voting sooner than the next
//! scan would.

use tokio::{
    task::JoinHandle,
    time::{MissedTickBehavior, interval, sleep},
};
use tracing::{debug, error, info, warn};

use crate::{
    error::ServiceError,
    services::game_service::{DeadlineOutcome, advance_if_due, open_voting},
    state::{SharedState, state_machine::GamePhase},
};

/// Attempts made by a grace-window task before giving up on a game.
const VOTING_ATTEMPTS: usize = 3;

/// Scan every `scan_interval` until the task is dropped.
pub async fn run(state: SharedState) {
    let period = state.config().scan_interval();
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(period_ms = period.as_millis() as u64, "phase scheduler started");

    loop {
        ticker.tick().await;
        scan(&state).await;
    }
}

/// Check every live game once and return how many moved to their next phase.
///
/// A game held by a command is skipped until the next tick, so one slow game never delays
/// another. Games that vanish mid-scan are skipped; failures are logged and retried.
pub async fn scan(state: &SharedState) -> usize {
    let mut advanced = 0;
    for code in state.live_game_codes() {
        match advance_if_due(state, &code).await {
            Ok(DeadlineOutcome::Advanced(GamePhase::Submission)) => {
                advanced += 1;
                schedule_voting(state.clone(), code);
            }
            Ok(DeadlineOutcome::Advanced(phase)) => {
                advanced += 1;
                debug!(code = %code, %phase, "deadline applied");
            }
            Ok(DeadlineOutcome::Busy) => {
                debug!(code = %code, "game busy; checking again next scan");
            }
            Ok(DeadlineOutcome::NotDue) => {}
            Err(ServiceError::InvalidCode) => {
                debug!(code = %code, "game disappeared during scan");
            }
            Err(err) => {
                error!(code = %code, error = %err, "failed to apply deadline; retrying next scan");
            }
        }
    }
    advanced
}

/// Open voting for `code` once the grace window elapsed. No lock is held while waiting.
pub fn schedule_voting(state: SharedState, code: String) -> JoinHandle<()> {
    tokio::spawn(async move {
        sleep(state.config().grace_window()).await;

        for attempt in 1..=VOTING_ATTEMPTS {
            match open_voting(&state, &code).await {
                Ok(opened) => {
                    if !opened {
                        debug!(code = %code, "voting already decided");
                    }
                    return;
                }
                Err(ServiceError::InvalidCode) => {
                    debug!(code = %code, "game closed during grace window");
                    return;
                }
                Err(err) if attempt < VOTING_ATTEMPTS => {
                    warn!(code = %code, attempt, error = %err, "failed to open voting; retrying");
                    sleep(state.config().scan_interval()).await;
                }
                Err(err) => {
                    warn!(code = %code, error = %err, "leaving voting to the next scans");
                }
            }
        }
    })
}
