use std::time::SystemTime;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Types shared by several payloads.
pub mod common;
/// Game lifecycle payloads.
pub mod game;
/// Health check payloads.
pub mod health;
/// Client-facing phase names.
pub mod phase;
/// Registration and prompt payloads.
pub mod user;
/// Validation helpers for inbound payloads.
pub mod validation;
/// WebSocket message types.
pub mod ws;

fn format_system_time(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
