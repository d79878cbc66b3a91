//! Library crate for doodle-party-back, exposing modules for binaries and integration tests.

/// Runtime configuration.
pub mod config;
/// Persistence models and repositories.
pub mod dao;
/// Request, response and event payloads.
pub mod dto;
/// Service and HTTP error types.
pub mod error;
/// HTTP and WebSocket routes.
pub mod routes;
/// Game orchestration and background tasks.
pub mod services;
/// Shared in-memory state.
pub mod state;
