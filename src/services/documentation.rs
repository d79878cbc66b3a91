use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Doodle Party Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::user::register_user,
        crate::routes::user::create_prompt,
        crate::routes::game::create_game,
        crate::routes::game::join_game,
        crate::routes::game::check_active_game,
        crate::routes::game::list_players,
        crate::routes::game::leave_game,
        crate::routes::game::submit_drawing,
        crate::routes::game::list_drawings,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::common::Role,
            crate::dto::common::PlayerSummary,
            crate::dto::phase::VisibleGamePhase,
            crate::dto::ws::RejoinGamePayload,
            crate::dto::ws::HostCommandPayload,
            crate::dto::ws::LeaveRoomPayload,
            crate::dto::ws::PlayerListEvent,
            crate::dto::ws::GameStateEvent,
            crate::dto::ws::PhaseEvent,
            crate::dto::ws::GameClosedEvent,
            crate::dto::ws::RejoinFailedEvent,
            crate::dto::ws::CommandFailedEvent,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "users", description = "Player registration and prompt pool"),
        (name = "game", description = "Game lifecycle commands"),
        (name = "events", description = "WebSocket event channel"),
    )
)]
/// OpenAPI document for the REST and WebSocket surface.
pub struct ApiDoc;
