use axum::Router;

use crate::state::SharedState;

/// OpenAPI document and Swagger UI.
pub mod docs;
/// Game lifecycle routes.
pub mod game;
/// Health check route.
pub mod health;
/// Registration and prompt routes.
pub mod user;
/// WebSocket event channel.
pub mod websocket;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(user::router())
        .merge(websocket::router())
        .merge(game::router());

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}
