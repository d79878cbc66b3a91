//! End-to-end game scenarios driven through the orchestrator, the scheduler and room events.

use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

use doodle_party_back::{
    config::AppConfig,
    dao::{
        models::{PhaseEntity, PromptEntity, UserEntity},
        repository::{InMemoryRepository, Repository},
    },
    dto::{
        common::Role,
        phase::VisibleGamePhase,
        ws::{ClientMessage, HostCommandPayload, RejoinGamePayload, ServerMessage},
    },
    error::{ErrorKind, ServiceError},
    services::{game_service, scheduler, websocket_service},
    state::{
        AppState, SharedState,
        clock::{Clock, ManualClock},
        rooms::ConnectionHandle,
        state_machine::GamePhase,
    },
};
use time::OffsetDateTime;
use tokio::{sync::mpsc::UnboundedReceiver, time::Instant};
use uuid::Uuid;

/// Wall clock that follows tokio's (possibly paused) timer.
struct PausedClock {
    wall_start: OffsetDateTime,
    started: Instant,
}

impl PausedClock {
    fn new() -> Self {
        Self {
            wall_start: OffsetDateTime::now_utc(),
            started: Instant::now(),
        }
    }
}

impl Clock for PausedClock {
    fn now(&self) -> OffsetDateTime {
        self.wall_start + self.started.elapsed()
    }
}

struct Fixture {
    state: SharedState,
    repository: InMemoryRepository,
}

impl Fixture {
    async fn new() -> Self {
        Self::with_clock(Arc::new(PausedClock::new())).await
    }

    async fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let repository = InMemoryRepository::new();
        repository
            .insert_prompt(PromptEntity {
                id: Uuid::new_v4(),
                content: "A lighthouse made of pancakes".into(),
            })
            .await
            .unwrap();
        let state = AppState::new(
            AppConfig::default(),
            Arc::new(repository.clone()),
            clock,
        );
        Self { state, repository }
    }

    async fn user(&self, username: &str) -> Uuid {
        let id = Uuid::new_v4();
        assert!(
            self.repository
                .insert_user(UserEntity {
                    id,
                    username: username.into(),
                    name: username.to_uppercase(),
                    created_at: SystemTime::now(),
                })
                .await
                .unwrap()
        );
        id
    }

    /// Connect `player` to the room of `code` and drop the resync messages.
    async fn connect(
        &self,
        player: Uuid,
        code: &str,
    ) -> (ConnectionHandle, UnboundedReceiver<ServerMessage>) {
        let (connection, mut rx) = ConnectionHandle::new();
        game_service::rejoin_game(&self.state, player, code, &connection)
            .await
            .unwrap();
        while rx.try_recv().is_ok() {}
        (connection, rx)
    }
}

async fn next_event(rx: &mut UnboundedReceiver<ServerMessage>, within: Duration) -> ServerMessage {
    tokio::time::timeout(within, rx.recv())
        .await
        .expect("event arrives in time")
        .expect("connection still open")
}

#[tokio::test(start_paused = true)]
async fn timed_phases_advance_without_client_action() {
    let fx = Fixture::new().await;
    let host = fx.user("h1").await;
    let guest = fx.user("p2").await;

    let code = game_service::create_game(&fx.state, host).await.unwrap();
    let (_host_conn, mut host_rx) = fx.connect(host, &code).await;

    game_service::join_game(&fx.state, guest, &code)
        .await
        .unwrap();
    match host_rx.try_recv().unwrap() {
        ServerMessage::PlayerList(event) => {
            let ids: Vec<_> = event.players.iter().map(|p| p.id).collect();
            assert_eq!(ids, [host, guest]);
        }
        other => panic!("expected player_list, got {other:?}"),
    }
    let (_guest_conn, mut guest_rx) = fx.connect(guest, &code).await;

    let _scheduler = tokio::spawn(scheduler::run(fx.state.clone()));

    game_service::start_game(&fx.state, host, &code)
        .await
        .unwrap();
    let started = Instant::now();
    for rx in [&mut host_rx, &mut guest_rx] {
        match rx.try_recv().unwrap() {
            ServerMessage::GameState(event) => {
                assert_eq!(event.phase, VisibleGamePhase::Whiteboard);
                assert_eq!(event.duration_seconds, 10);
                assert_eq!(event.remaining_seconds, 10);
                assert_eq!(event.prompt, "A lighthouse made of pancakes");
            }
            other => panic!("expected game_state, got {other:?}"),
        }
    }

    match next_event(&mut guest_rx, Duration::from_secs(15)).await {
        ServerMessage::GameSubmit(event) => {
            assert_eq!(event.code, code);
            assert_eq!(event.phase, VisibleGamePhase::Submission);
        }
        other => panic!("expected game_submit, got {other:?}"),
    }
    let submitted_after = started.elapsed();
    assert!(submitted_after >= Duration::from_secs(10));
    assert!(submitted_after <= Duration::from_secs(12));

    // Late drawings are still accepted during the grace window.
    game_service::submit_drawing(
        &fx.state,
        Some(guest),
        &code,
        Some("data:image/png;base64,AAAA".into()),
    )
    .await
    .unwrap();

    match next_event(&mut guest_rx, Duration::from_secs(15)).await {
        ServerMessage::GameVote(event) => {
            assert_eq!(event.phase, VisibleGamePhase::Voting);
        }
        other => panic!("expected game_vote, got {other:?}"),
    }
    assert!(started.elapsed() >= submitted_after + Duration::from_secs(10));
    assert!(matches!(
        host_rx.try_recv(),
        Ok(ServerMessage::GameSubmit(_))
    ));
    assert!(matches!(host_rx.try_recv(), Ok(ServerMessage::GameVote(_))));

    let handle = fx.state.game(&code).unwrap();
    assert_eq!(handle.lock().await.phase(), GamePhase::Voting);
}

#[tokio::test(start_paused = true)]
async fn remaining_time_only_counts_down() {
    let fx = Fixture::new().await;
    let host = fx.user("h1").await;
    let code = game_service::create_game(&fx.state, host).await.unwrap();
    game_service::start_game(&fx.state, host, &code)
        .await
        .unwrap();

    let mut previous = u64::MAX;
    for _ in 0..12 {
        let (connection, mut rx) = ConnectionHandle::new();
        game_service::rejoin_game(&fx.state, host, &code, &connection)
            .await
            .unwrap();
        let ServerMessage::GameState(event) = rx.try_recv().unwrap() else {
            panic!("expected game_state");
        };
        assert_eq!(event.role, Some(Role::Host));
        assert!(event.remaining_seconds <= previous);
        assert!(event.remaining_seconds <= 10);
        previous = event.remaining_seconds;
        tokio::time::advance(Duration::from_millis(1_000)).await;
    }
    assert_eq!(previous, 0);
}

#[tokio::test(start_paused = true)]
async fn host_leaving_closes_the_game() {
    let fx = Fixture::new().await;
    let host = fx.user("h1").await;
    let guest = fx.user("p2").await;
    let code = game_service::create_game(&fx.state, host).await.unwrap();
    game_service::join_game(&fx.state, guest, &code)
        .await
        .unwrap();
    let (guest_conn, mut guest_rx) = fx.connect(guest, &code).await;

    game_service::leave_game(&fx.state, "h1", &code)
        .await
        .unwrap();
    match guest_rx.try_recv().unwrap() {
        ServerMessage::GameClosed(event) => assert_eq!(event.code, code),
        other => panic!("expected game_closed, got {other:?}"),
    }
    assert!(
        fx.repository
            .find_membership_by_player(guest)
            .await
            .unwrap()
            .is_none()
    );
    assert!(game_service::check_active_game(&fx.state, guest).await.is_none());

    websocket_service::dispatch(
        &fx.state,
        &guest_conn,
        ClientMessage::RejoinGame(RejoinGamePayload {
            player_id: guest,
            code: code.clone(),
        }),
    )
    .await;
    match guest_rx.try_recv().unwrap() {
        ServerMessage::RejoinFailed(event) => assert_eq!(event.code, code),
        other => panic!("expected rejoin_failed, got {other:?}"),
    }

    // Both players are free again.
    game_service::create_game(&fx.state, guest).await.unwrap();
    game_service::create_game(&fx.state, host).await.unwrap();
}

/// Host leaves once `elapsed` has passed since the start; nothing may follow `game_closed`.
async fn host_leaves_mid_round(elapsed: Duration, expected: GamePhase) {
    let fx = Fixture::new().await;
    let host = fx.user("h1").await;
    let guest = fx.user("p2").await;
    let code = game_service::create_game(&fx.state, host).await.unwrap();
    game_service::join_game(&fx.state, guest, &code)
        .await
        .unwrap();
    let (_guest_conn, mut guest_rx) = fx.connect(guest, &code).await;
    let _scheduler = tokio::spawn(scheduler::run(fx.state.clone()));

    game_service::start_game(&fx.state, host, &code)
        .await
        .unwrap();
    tokio::time::sleep(elapsed).await;
    let handle = fx.state.game(&code).unwrap();
    assert_eq!(handle.lock().await.phase(), expected);
    while guest_rx.try_recv().is_ok() {}

    game_service::leave_game(&fx.state, "h1", &code)
        .await
        .unwrap();
    match guest_rx.try_recv().unwrap() {
        ServerMessage::GameClosed(event) => assert_eq!(event.code, code),
        other => panic!("expected game_closed, got {other:?}"),
    }

    // Run past every deadline the round still had, grace-window task included.
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert!(guest_rx.try_recv().is_err());
    assert!(fx.state.game(&code).is_none());
    assert!(game_service::check_active_game(&fx.state, guest).await.is_none());
    let stored = fx.repository.find_game_by_code(code).await.unwrap();
    assert_eq!(stored.map(|game| game.phase), Some(PhaseEntity::Closed));
}

#[tokio::test(start_paused = true)]
async fn host_leaving_during_the_whiteboard_ends_the_round() {
    host_leaves_mid_round(Duration::from_secs(3), GamePhase::Whiteboard).await;
}

#[tokio::test(start_paused = true)]
async fn host_leaving_during_submission_cancels_the_vote() {
    host_leaves_mid_round(Duration::from_secs(13), GamePhase::Submission).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn guest_leaving_while_the_clock_scans() {
    let clock = Arc::new(ManualClock::default());
    let fx = Fixture::with_clock(clock.clone()).await;
    let host = fx.user("h1").await;
    let guest = fx.user("p2").await;
    let code = game_service::create_game(&fx.state, host).await.unwrap();
    game_service::join_game(&fx.state, guest, &code)
        .await
        .unwrap();
    game_service::start_game(&fx.state, host, &code)
        .await
        .unwrap();
    let (_host_conn, mut host_rx) = fx.connect(host, &code).await;
    clock.advance(Duration::from_secs(10));

    let scan_task = tokio::spawn({
        let state = fx.state.clone();
        async move { scheduler::scan(&state).await }
    });
    let leave_task = tokio::spawn({
        let state = fx.state.clone();
        let code = code.clone();
        async move { game_service::leave_game(&state, "p2", &code).await }
    });
    let scanned = scan_task.await.unwrap();
    leave_task.await.unwrap().unwrap();
    if scanned == 0 {
        // The leave held the game while the scan passed by.
        assert_eq!(scheduler::scan(&fx.state).await, 1);
    }

    let handle = fx.state.game(&code).unwrap();
    {
        let game = handle.lock().await;
        assert_eq!(game.phase(), GamePhase::Submission);
        assert_eq!(game.players.keys().copied().collect::<Vec<_>>(), [host]);
    }
    assert!(game_service::check_active_game(&fx.state, guest).await.is_none());
    assert!(
        fx.repository
            .find_membership_by_player(guest)
            .await
            .unwrap()
            .is_none()
    );

    let mut events = Vec::new();
    while let Ok(event) = host_rx.try_recv() {
        events.push(event);
    }
    assert!(events.iter().any(
        |event| matches!(event, ServerMessage::PlayerList(list) if list.players.len() == 1)
    ));
    assert!(
        events
            .iter()
            .any(|event| matches!(event, ServerMessage::GameSubmit(_)))
    );
}

#[tokio::test(start_paused = true)]
async fn non_host_start_is_forbidden_over_the_event_channel() {
    let fx = Fixture::new().await;
    let host = fx.user("h1").await;
    let guest = fx.user("p2").await;
    let code = game_service::create_game(&fx.state, host).await.unwrap();
    game_service::join_game(&fx.state, guest, &code)
        .await
        .unwrap();
    let (guest_conn, mut guest_rx) = fx.connect(guest, &code).await;

    websocket_service::dispatch(
        &fx.state,
        &guest_conn,
        ClientMessage::StartGame(HostCommandPayload {
            host_id: guest,
            code: code.clone(),
        }),
    )
    .await;

    match guest_rx.try_recv().unwrap() {
        ServerMessage::CommandFailed(event) => {
            assert_eq!(event.command, "start_game");
            assert_eq!(event.error, "forbidden");
        }
        other => panic!("expected command_failed, got {other:?}"),
    }
    let handle = fx.state.game(&code).unwrap();
    assert_eq!(handle.lock().await.phase(), GamePhase::Lobby);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_create_and_join_yield_one_membership() {
    let fx = Fixture::new().await;
    let player = fx.user("racer").await;
    let mut codes = Vec::new();
    for index in 0..4 {
        let host = fx.user(&format!("host{index}")).await;
        codes.push(game_service::create_game(&fx.state, host).await.unwrap());
    }

    let mut tasks = Vec::new();
    for code in codes.clone() {
        let state = fx.state.clone();
        tasks.push(tokio::spawn(async move {
            game_service::join_game(&state, player, &code).await.is_ok()
        }));
    }
    let state = fx.state.clone();
    tasks.push(tokio::spawn(async move {
        game_service::create_game(&state, player).await.is_ok()
    }));

    let mut successes = 0;
    for task in tasks {
        if task.await.unwrap() {
            successes += 1;
        }
    }
    assert_eq!(successes, 1);

    let active = game_service::check_active_game(&fx.state, player)
        .await
        .expect("player belongs to exactly one game");
    let membership = fx
        .repository
        .find_membership_by_player(player)
        .await
        .unwrap()
        .expect("membership stored");
    let game = fx.state.game(&active.code).unwrap();
    assert_eq!(game.lock().await.id, membership.game_id);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_duplicate_submissions_have_one_winner() {
    let fx = Fixture::new().await;
    let host = fx.user("h1").await;
    let code = game_service::create_game(&fx.state, host).await.unwrap();
    game_service::start_game(&fx.state, host, &code)
        .await
        .unwrap();

    let tasks: Vec<_> = (0..2)
        .map(|_| {
            let state = fx.state.clone();
            let code = code.clone();
            tokio::spawn(async move {
                game_service::submit_drawing(
                    &state,
                    Some(host),
                    &code,
                    Some("data:image/png;base64,AAAA".into()),
                )
                .await
            })
        })
        .collect();

    let mut ok = 0;
    let mut duplicates = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => ok += 1,
            Err(err) => {
                assert!(matches!(err, ServiceError::DuplicateSubmission));
                assert_eq!(err.kind(), ErrorKind::Conflict);
                duplicates += 1;
            }
        }
    }
    assert_eq!((ok, duplicates), (1, 1));
    assert_eq!(
        game_service::list_drawings(&fx.state, &code)
            .await
            .unwrap()
            .len(),
        1
    );
}
