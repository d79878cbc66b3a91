use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, post},
};
use uuid::Uuid;

use crate::{
    dto::game::{
        AckResponse, ActiveGameResponse, CreateGameRequest, CreateGameResponse, DrawingSummary,
        DrawingsResponse, JoinGameRequest, ListPlayersQuery, PlayersResponse,
        SubmitDrawingRequest,
    },
    error::AppError,
    services::game_service,
    state::SharedState,
};

/// Routes driving the game lifecycle over request/response calls.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games", post(create_game))
        .route("/games/{code}/join", post(join_game))
        .route("/games/{code}/players", get(list_players))
        .route("/games/{code}/players/{username}", delete(leave_game))
        .route(
            "/games/{code}/drawings",
            post(submit_drawing).get(list_drawings),
        )
        .route("/players/{id}/active-game", get(check_active_game))
}

/// Open a new lobby hosted by the caller.
#[utoipa::path(
    post,
    path = "/games",
    tag = "game",
    request_body = CreateGameRequest,
    responses(
        (status = 200, description = "Game created", body = CreateGameResponse),
        (status = 404, description = "Unknown host or no prompt available"),
        (status = 409, description = "Host already belongs to a game")
    )
)]
pub async fn create_game(
    State(state): State<SharedState>,
    Json(payload): Json<CreateGameRequest>,
) -> Result<Json<CreateGameResponse>, AppError> {
    let code = game_service::create_game(&state, payload.host_id).await?;
    Ok(Json(CreateGameResponse {
        success: true,
        message: "Game created".into(),
        code,
    }))
}

/// Join a lobby by code.
#[utoipa::path(
    post,
    path = "/games/{code}/join",
    tag = "game",
    params(("code" = String, Path, description = "Game code")),
    request_body = JoinGameRequest,
    responses(
        (status = 200, description = "Joined the lobby", body = AckResponse),
        (status = 404, description = "Unknown user or game"),
        (status = 409, description = "Already in a game, game full or already started")
    )
)]
pub async fn join_game(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Json(payload): Json<JoinGameRequest>,
) -> Result<Json<AckResponse>, AppError> {
    game_service::join_game(&state, payload.player_id, &code).await?;
    Ok(Json(AckResponse::ok("Joined game")))
}

/// Whether the player belongs to a live game, and in which role.
#[utoipa::path(
    get,
    path = "/players/{id}/active-game",
    tag = "game",
    params(("id" = Uuid, Path, description = "Player identifier")),
    responses((status = 200, description = "Active game lookup", body = ActiveGameResponse))
)]
pub async fn check_active_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Json<ActiveGameResponse> {
    let response = match game_service::check_active_game(&state, id).await {
        Some(active) => ActiveGameResponse {
            success: true,
            message: "Player is in a game".into(),
            in_game: true,
            code: Some(active.code),
            role: Some(active.role),
        },
        None => ActiveGameResponse {
            success: true,
            message: "Player is not in a game".into(),
            in_game: false,
            code: None,
            role: None,
        },
    };
    Json(response)
}

/// Roster of a game, for its members only.
#[utoipa::path(
    get,
    path = "/games/{code}/players",
    tag = "game",
    params(("code" = String, Path, description = "Game code"), ListPlayersQuery),
    responses(
        (status = 200, description = "Current roster", body = PlayersResponse),
        (status = 403, description = "Caller is not a member")
    )
)]
pub async fn list_players(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Query(query): Query<ListPlayersQuery>,
) -> Result<Json<PlayersResponse>, AppError> {
    let players = game_service::list_players(&state, &query.username, &code).await?;
    Ok(Json(PlayersResponse {
        success: true,
        message: format!("{} player(s)", players.len()),
        players,
    }))
}

/// Leave a game. When the host leaves, the game is closed for everyone.
#[utoipa::path(
    delete,
    path = "/games/{code}/players/{username}",
    tag = "game",
    params(
        ("code" = String, Path, description = "Game code"),
        ("username" = String, Path, description = "Leaving player")
    ),
    responses((status = 200, description = "Player left", body = AckResponse))
)]
pub async fn leave_game(
    State(state): State<SharedState>,
    Path((code, username)): Path<(String, String)>,
) -> Result<Json<AckResponse>, AppError> {
    game_service::leave_game(&state, &username, &code).await?;
    Ok(Json(AckResponse::ok("Left game")))
}

/// Submit a drawing while drawings are accepted.
#[utoipa::path(
    post,
    path = "/games/{code}/drawings",
    tag = "game",
    params(("code" = String, Path, description = "Game code")),
    request_body = SubmitDrawingRequest,
    responses(
        (status = 200, description = "Drawing stored", body = AckResponse),
        (status = 400, description = "Missing data or unknown user"),
        (status = 409, description = "Drawing already submitted or wrong phase")
    )
)]
pub async fn submit_drawing(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Json(payload): Json<SubmitDrawingRequest>,
) -> Result<Json<AckResponse>, AppError> {
    game_service::submit_drawing(&state, payload.player_id, &code, payload.image_data).await?;
    Ok(Json(AckResponse::ok("Drawing submitted")))
}

/// Drawings submitted in a game, for the voting and results screens.
#[utoipa::path(
    get,
    path = "/games/{code}/drawings",
    tag = "game",
    params(("code" = String, Path, description = "Game code")),
    responses((status = 200, description = "Submitted drawings", body = DrawingsResponse))
)]
pub async fn list_drawings(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<DrawingsResponse>, AppError> {
    let drawings: Vec<DrawingSummary> = game_service::list_drawings(&state, &code)
        .await?
        .into_iter()
        .map(DrawingSummary::from)
        .collect();
    Ok(Json(DrawingsResponse {
        success: true,
        message: format!("{} drawing(s)", drawings.len()),
        drawings,
    }))
}
