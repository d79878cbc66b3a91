//! Game orchestration: every command that reads or mutates a live game goes through here.
//!
//! Each command locks the target game for its whole read-modify-write sequence, so commands on
//! the same code never interleave while commands on different codes run independently.

use std::{sync::Arc, time::SystemTime};

use futures::{FutureExt, future::BoxFuture};
use rand::{Rng, seq::IndexedRandom};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        models::{DrawingEntity, GameEntity, MembershipEntity},
        repository::Repository,
    },
    dto::{
        common::{PlayerSummary, Role},
        validation::GAME_CODE_LEN,
    },
    error::ServiceError,
    services::room_events::{broadcast_player_list, send_rejoin_state},
    state::{
        GameHandle, SharedState,
        game::{LiveGame, Player, Prompt},
        ledger::Submission,
        rooms::ConnectionHandle,
        state_machine::{CloseReason, GameEvent, GamePhase},
        transitions::run_transition_with_broadcast,
    },
};

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Game a player currently belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveGame {
    /// Join code of the game.
    pub code: String,
    /// Role of the player in it.
    pub role: Role,
}

/// Open a new lobby hosted by `host_id` and return its code.
pub async fn create_game(state: &SharedState, host_id: Uuid) -> Result<String, ServiceError> {
    let repository = state.repository();
    let host: Player = repository
        .find_user(host_id)
        .await?
        .ok_or(ServiceError::UserNotFound)?
        .into();

    if state.active_game_of(host_id).is_some() {
        return Err(ServiceError::AlreadyInGame);
    }

    let prompts = repository.list_prompts().await?;
    let prompt: Prompt = prompts
        .choose(&mut rand::rng())
        .cloned()
        .ok_or(ServiceError::NoPromptsAvailable)?
        .into();

    let now = state.now();
    let capacity = state.config().default_capacity();

    // The new game is locked before it becomes visible so nobody can join it half-created.
    let (code, game) = loop {
        let candidate = generate_game_code();
        if repository
            .find_game_by_code(candidate.clone())
            .await?
            .is_some()
        {
            debug!(code = %candidate, "game code already stored; drawing another");
            continue;
        }

        let handle: GameHandle = Arc::new(Mutex::new(LiveGame::new(
            candidate.clone(),
            host.clone(),
            capacity,
            prompt.clone(),
            now,
        )));
        let game = handle.clone().lock_owned().await;
        if state.insert_game_if_vacant(&candidate, handle.clone()) {
            break (candidate, game);
        }
    };

    if !state.reserve_player(host_id, &code) {
        state.remove_game(&code);
        return Err(ServiceError::AlreadyInGame);
    }

    let membership = MembershipEntity {
        player_id: host_id,
        game_id: game.id,
        joined_at: SystemTime::from(now),
    };
    let persisted = match repository.insert_membership(membership).await {
        Ok(true) => repository
            .save_game(game.to_entity(now))
            .await
            .map_err(ServiceError::from),
        Ok(false) => Err(ServiceError::AlreadyInGame),
        Err(err) => Err(err.into()),
    };

    if let Err(err) = persisted {
        if !matches!(err, ServiceError::AlreadyInGame)
            && let Err(cleanup) = repository.delete_membership(host_id, game.id).await
        {
            warn!(code = %code, error = %cleanup, "failed to drop membership of aborted game");
        }
        state.release_player(host_id, &code);
        state.remove_game(&code);
        return Err(err);
    }

    info!(code = %code, host_id = %host_id, prompt = %game.prompt.text, "game created");
    Ok(code)
}

/// Add `player_id` to the lobby of `code`.
pub async fn join_game(
    state: &SharedState,
    player_id: Uuid,
    code: &str,
) -> Result<(), ServiceError> {
    let repository = state.repository();
    let player: Player = repository
        .find_user(player_id)
        .await?
        .ok_or(ServiceError::UserNotFound)?
        .into();

    let Some(handle) = state.game(code) else {
        // A code that only survives in storage belongs to a game that already ended.
        return match repository.find_game_by_code(code.to_owned()).await? {
            Some(_) => Err(ServiceError::GameNotInLobby),
            None => Err(ServiceError::InvalidCode),
        };
    };
    let mut game = handle.lock().await;
    // Creation may have been rolled back while we waited on the lock.
    if !state
        .game(code)
        .is_some_and(|live| Arc::ptr_eq(&live, &handle))
    {
        return Err(ServiceError::InvalidCode);
    }

    if game.is_member(player_id) || state.active_game_of(player_id).is_some() {
        return Err(ServiceError::AlreadyInGame);
    }
    if game.phase() != GamePhase::Lobby {
        return Err(ServiceError::GameNotInLobby);
    }
    if game.is_full() {
        return Err(ServiceError::GameFull);
    }

    if !state.reserve_player(player_id, code) {
        return Err(ServiceError::AlreadyInGame);
    }

    let membership = MembershipEntity {
        player_id,
        game_id: game.id,
        joined_at: SystemTime::from(state.now()),
    };
    match repository.insert_membership(membership).await {
        Ok(true) => {}
        Ok(false) => {
            state.release_player(player_id, code);
            return Err(ServiceError::AlreadyInGame);
        }
        Err(err) => {
            state.release_player(player_id, code);
            return Err(err.into());
        }
    }

    game.players.insert(player_id, player);
    info!(code, player_id = %player_id, players = game.players.len(), "player joined");
    broadcast_player_list(state, &game);
    Ok(())
}

/// Game the player currently belongs to, if any.
pub async fn check_active_game(state: &SharedState, player_id: Uuid) -> Option<ActiveGame> {
    let code = state.active_game_of(player_id)?;
    let handle = state.game(&code)?;
    let game = handle.lock().await;
    if game.phase().is_closed() || !game.is_member(player_id) {
        return None;
    }

    Some(ActiveGame {
        code,
        role: Role::of(game.host_id, player_id),
    })
}

/// Roster of `code`, visible to its members only.
pub async fn list_players(
    state: &SharedState,
    username: &str,
    code: &str,
) -> Result<Vec<PlayerSummary>, ServiceError> {
    let handle = live_game(state, code)?;
    let user = state
        .repository()
        .find_user_by_username(username.to_owned())
        .await?
        .ok_or(ServiceError::UserNotFound)?;

    let game = handle.lock().await;
    ensure_open(&game)?;
    if !game.is_member(user.id) {
        return Err(ServiceError::NotAMember);
    }

    Ok(game.players.values().map(PlayerSummary::from).collect())
}

/// Remove `username` from `code`. The host leaving closes the game for everyone.
pub async fn leave_game(
    state: &SharedState,
    username: &str,
    code: &str,
) -> Result<(), ServiceError> {
    let handle = live_game(state, code)?;
    let repository = state.repository();
    let user = repository
        .find_user_by_username(username.to_owned())
        .await?
        .ok_or(ServiceError::UserNotFound)?;

    let mut game = handle.lock().await;
    ensure_open(&game)?;
    if !game.is_member(user.id) {
        return Err(ServiceError::NotAMember);
    }

    if game.is_host(user.id) {
        return close_game(state, &mut game, CloseReason::HostLeft).await;
    }

    repository.delete_membership(user.id, game.id).await?;
    game.players.shift_remove(&user.id);
    state.release_player(user.id, code);
    state.rooms().remove_player(code, user.id);

    info!(code, player_id = %user.id, players = game.players.len(), "player left");
    broadcast_player_list(state, &game);
    Ok(())
}

/// Host-only: leave the lobby and start the drawing clock.
pub async fn start_game(
    state: &SharedState,
    host_id: Uuid,
    code: &str,
) -> Result<(), ServiceError> {
    let handle = live_game(state, code)?;
    let mut game = handle.lock().await;
    ensure_open(&game)?;
    ensure_host(&game, host_id)?;
    ensure_phase(&game, GamePhase::Lobby)?;

    let repository = state.repository();
    run_transition_with_broadcast(state, &mut game, GameEvent::StartGame, save_game(repository))
        .await?;

    info!(code, players = game.players.len(), "game started");
    Ok(())
}

/// Store one drawing for a member while drawings are accepted. Returns the drawing id.
pub async fn submit_drawing(
    state: &SharedState,
    player_id: Option<Uuid>,
    code: &str,
    image_data: Option<String>,
) -> Result<Uuid, ServiceError> {
    let (Some(player_id), Some(image_data)) = (
        player_id,
        image_data.filter(|data| !data.trim().is_empty()),
    ) else {
        return Err(ServiceError::MissingData);
    };

    let repository = state.repository();
    if repository.find_user(player_id).await?.is_none() {
        return Err(ServiceError::InvalidUser);
    }

    let handle = live_game(state, code)?;
    let game = handle.lock().await;
    ensure_open(&game)?;
    if !game.is_member(player_id) {
        return Err(ServiceError::NotAMember);
    }
    if !game.phase().accepts_drawings() {
        return Err(ServiceError::WrongPhase(game.phase()));
    }

    let now = SystemTime::from(state.now());
    let drawing_id = Uuid::new_v4();
    state.ledger().record(
        game.id,
        player_id,
        Submission {
            drawing_id,
            submitted_at: now,
        },
    )?;

    let drawing = DrawingEntity {
        id: drawing_id,
        game_id: game.id,
        player_id,
        image_data,
        submitted_at: now,
    };
    match repository.insert_drawing(drawing).await {
        Ok(true) => {
            debug!(code, player_id = %player_id, drawing_id = %drawing_id, "drawing stored");
            Ok(drawing_id)
        }
        Ok(false) => Err(ServiceError::DuplicateSubmission),
        Err(err) => {
            state.ledger().forget(game.id, player_id);
            Err(err.into())
        }
    }
}

/// Drawings stored for `code`, oldest first. Works for ended games as well.
pub async fn list_drawings(
    state: &SharedState,
    code: &str,
) -> Result<Vec<DrawingEntity>, ServiceError> {
    let repository = state.repository();
    let game = repository
        .find_game_by_code(code.to_owned())
        .await?
        .ok_or(ServiceError::InvalidCode)?;
    Ok(repository.list_drawings(game.id).await?)
}

/// Attach a socket to a game the player belongs to and resync that socket only.
pub async fn rejoin_game(
    state: &SharedState,
    player_id: Uuid,
    code: &str,
    connection: &ConnectionHandle,
) -> Result<(), ServiceError> {
    let handle = live_game(state, code)?;
    let game = handle.lock().await;
    ensure_open(&game)?;
    if !game.is_member(player_id) {
        return Err(ServiceError::NotAMember);
    }

    state.rooms().join(code, player_id, connection.clone());
    send_rejoin_state(state, connection, &game, Role::of(game.host_id, player_id));
    debug!(code, player_id = %player_id, connection_id = %connection.id, "connection rejoined");
    Ok(())
}

/// Detach a socket from a room. Membership is untouched.
pub fn leave_room(state: &SharedState, code: &str, connection: &ConnectionHandle) -> bool {
    state.rooms().leave(code, connection.id)
}

/// Host-only: move from voting to the results screen.
pub async fn show_results(
    state: &SharedState,
    host_id: Uuid,
    code: &str,
) -> Result<(), ServiceError> {
    let handle = live_game(state, code)?;
    let mut game = handle.lock().await;
    ensure_open(&game)?;
    ensure_host(&game, host_id)?;
    ensure_phase(&game, GamePhase::Voting)?;

    let repository = state.repository();
    run_transition_with_broadcast(state, &mut game, GameEvent::ShowResults, save_game(repository))
        .await?;
    info!(code, "results shown");
    Ok(())
}

/// Host-only: close the game once the results were shown.
pub async fn end_game(state: &SharedState, host_id: Uuid, code: &str) -> Result<(), ServiceError> {
    let handle = live_game(state, code)?;
    let mut game = handle.lock().await;
    ensure_open(&game)?;
    ensure_host(&game, host_id)?;
    ensure_phase(&game, GamePhase::Results)?;

    close_game(state, &mut game, CloseReason::Finished).await
}

/// What a deadline check did to a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineOutcome {
    /// A command holds the game; it is checked again on the next scan.
    Busy,
    /// The current phase has no deadline or it has not passed yet.
    NotDue,
    /// The deadline passed and the game entered this phase.
    Advanced(GamePhase),
}

/// Apply the deadline of the current phase if it has passed. Never waits for the game lock.
///
/// Whiteboard moves to Submission, Submission opens voting, Voting shows the results and
/// Results closes the game.
pub async fn advance_if_due(
    state: &SharedState,
    code: &str,
) -> Result<DeadlineOutcome, ServiceError> {
    let handle = live_game(state, code)?;
    let Ok(mut game) = handle.try_lock() else {
        return Ok(DeadlineOutcome::Busy);
    };
    ensure_open(&game)?;
    if !game.phase().is_timed() || game.remaining_seconds(state.config(), state.now()) > 0 {
        return Ok(DeadlineOutcome::NotDue);
    }

    let repository = state.repository();
    match game.phase() {
        GamePhase::Whiteboard => {
            run_transition_with_broadcast(
                state,
                &mut game,
                GameEvent::WhiteboardElapsed,
                save_game(repository),
            )
            .await?;
            info!(code, "whiteboard closed; collecting drawings");
        }
        GamePhase::Submission => {
            run_transition_with_broadcast(
                state,
                &mut game,
                GameEvent::GraceElapsed,
                save_game(repository),
            )
            .await?;
            info!(
                code,
                drawings = state.ledger().submissions(game.id).len(),
                "voting opened"
            );
        }
        GamePhase::Voting => {
            run_transition_with_broadcast(
                state,
                &mut game,
                GameEvent::VotingElapsed,
                save_game(repository),
            )
            .await?;
            info!(code, "voting window elapsed; showing results");
        }
        GamePhase::Results => close_game(state, &mut game, CloseReason::Finished).await?,
        phase @ (GamePhase::Lobby | GamePhase::Closed) => {
            return Err(ServiceError::WrongPhase(phase));
        }
    }
    Ok(DeadlineOutcome::Advanced(game.phase()))
}

/// End of the grace window. No-op unless the game is still in Submission.
pub async fn open_voting(state: &SharedState, code: &str) -> Result<bool, ServiceError> {
    let handle = live_game(state, code)?;
    let mut game = handle.lock().await;
    if game.phase() != GamePhase::Submission {
        debug!(code, phase = %game.phase(), "grace window elapsed after the game moved on");
        return Ok(false);
    }

    let repository = state.repository();
    run_transition_with_broadcast(state, &mut game, GameEvent::GraceElapsed, save_game(repository))
        .await?;
    info!(
        code,
        drawings = state.ledger().submissions(game.id).len(),
        "voting opened"
    );
    Ok(true)
}

/// Tear a locked game down: persist Closed, drop memberships, notify and forget it.
async fn close_game(
    state: &SharedState,
    game: &mut LiveGame,
    reason: CloseReason,
) -> Result<(), ServiceError> {
    let repository = state.repository();
    let game_id = game.id;
    run_transition_with_broadcast(state, game, GameEvent::Close(reason), move |entity| {
        async move {
            repository.save_game(entity).await?;
            repository.delete_memberships_for_game(game_id).await?;
            Ok::<_, ServiceError>(())
        }
    })
    .await?;

    for player_id in game.players.keys() {
        state.release_player(*player_id, &game.code);
    }
    state.rooms().close_room(&game.code);
    state.ledger().clear_game(game.id);
    state.remove_game(&game.code);

    info!(code = %game.code, ?reason, "game closed");
    Ok(())
}

fn save_game(
    repository: Arc<dyn Repository>,
) -> impl FnOnce(GameEntity) -> BoxFuture<'static, Result<(), ServiceError>> {
    move |entity| {
        async move {
            repository.save_game(entity).await?;
            Ok::<_, ServiceError>(())
        }
        .boxed()
    }
}

fn live_game(state: &SharedState, code: &str) -> Result<GameHandle, ServiceError> {
    state.game(code).ok_or(ServiceError::InvalidCode)
}

/// A closed game may still be reachable through a handle cloned before its removal.
fn ensure_open(game: &LiveGame) -> Result<(), ServiceError> {
    if game.phase().is_closed() {
        return Err(ServiceError::InvalidCode);
    }
    Ok(())
}

fn ensure_host(game: &LiveGame, player_id: Uuid) -> Result<(), ServiceError> {
    if !game.is_host(player_id) {
        return Err(ServiceError::NotHost);
    }
    Ok(())
}

fn ensure_phase(game: &LiveGame, expected: GamePhase) -> Result<(), ServiceError> {
    if game.phase() != expected {
        return Err(ServiceError::WrongPhase(game.phase()));
    }
    Ok(())
}

fn generate_game_code() -> String {
    let mut rng = rand::rng();
    (0..GAME_CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}
