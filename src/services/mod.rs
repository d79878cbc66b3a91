/// OpenAPI documentation generation.
pub mod documentation;
/// Game orchestration: lifecycle commands over live games.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Room event construction and fan-out.
pub mod room_events;
/// Background phase clock.
pub mod scheduler;
/// Player registration and prompt pool.
pub mod user_service;
/// WebSocket connection and message handling service.
pub mod websocket_service;
