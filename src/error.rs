use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{
    dao::storage::StorageError,
    state::{
        AbortError, ApplyError, PlanError, ledger::DuplicateSubmission,
        state_machine::GamePhase,
    },
};

/// Coarse failure classes shared by REST responses and WebSocket error events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// User, game or prompt absent.
    NotFound,
    /// Already in a game, duplicate submission, username taken.
    Conflict,
    /// Non-host attempting a host-only action.
    Forbidden,
    /// Action attempted in the wrong phase.
    InvalidState,
    /// Missing or malformed command fields.
    Validation,
    /// Storage failed or an operation timed out.
    Unavailable,
}

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No user with that id or username.
    #[error("user not found")]
    UserNotFound,
    /// Submitting player id does not match a known user.
    #[error("invalid user")]
    InvalidUser,
    /// No live game with that code.
    #[error("invalid game code")]
    InvalidCode,
    /// Player already belongs to a live game.
    #[error("player is already in a game")]
    AlreadyInGame,
    /// Prompt pool is empty.
    #[error("no prompts available")]
    NoPromptsAvailable,
    /// Joining is only possible in the lobby.
    #[error("game is not in the lobby")]
    GameNotInLobby,
    /// Lobby reached its capacity.
    #[error("game is full")]
    GameFull,
    /// Player does not belong to this game.
    #[error("player is not a member of this game")]
    NotAMember,
    /// Required payload field is missing.
    #[error("missing data")]
    MissingData,
    /// Player already submitted a drawing in this game.
    #[error("drawing already submitted")]
    DuplicateSubmission,
    /// Host-only command sent by another player.
    #[error("only the host can do this")]
    NotHost,
    /// Username is registered already.
    #[error("username already taken")]
    UsernameTaken,
    /// Command not allowed in the current phase.
    #[error("not allowed while the game is in {0}")]
    WrongPhase(GamePhase),
    /// State machine rejected or lost a transition.
    #[error("invalid state: {0}")]
    InvalidTransition(String),
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Operation exceeded its timeout limit.
    #[error("operation timed out")]
    Timeout,
}

impl ServiceError {
    /// Coarse category used for HTTP status mapping.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::UserNotFound
            | ServiceError::InvalidCode
            | ServiceError::NoPromptsAvailable => ErrorKind::NotFound,
            ServiceError::AlreadyInGame
            | ServiceError::DuplicateSubmission
            | ServiceError::UsernameTaken
            | ServiceError::GameFull => ErrorKind::Conflict,
            ServiceError::NotHost | ServiceError::NotAMember => ErrorKind::Forbidden,
            ServiceError::GameNotInLobby
            | ServiceError::WrongPhase(_)
            | ServiceError::InvalidTransition(_) => ErrorKind::InvalidState,
            ServiceError::MissingData | ServiceError::InvalidUser => ErrorKind::Validation,
            ServiceError::Unavailable(_) | ServiceError::Timeout => ErrorKind::Unavailable,
        }
    }

    /// Stable machine-readable code sent to clients.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::UserNotFound => "user_not_found",
            ServiceError::InvalidUser => "invalid_user",
            ServiceError::InvalidCode => "invalid_code",
            ServiceError::AlreadyInGame => "already_in_game",
            ServiceError::NoPromptsAvailable => "no_prompts_available",
            ServiceError::GameNotInLobby => "game_not_in_lobby",
            ServiceError::GameFull => "game_full",
            ServiceError::NotAMember => "not_a_member",
            ServiceError::MissingData => "missing_data",
            ServiceError::DuplicateSubmission => "duplicate_submission",
            ServiceError::NotHost => "forbidden",
            ServiceError::UsernameTaken => "username_taken",
            ServiceError::WrongPhase(_) => "wrong_phase",
            ServiceError::InvalidTransition(_) => "invalid_state",
            ServiceError::Unavailable(_) => "unavailable",
            ServiceError::Timeout => "timeout",
        }
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<DuplicateSubmission> for ServiceError {
    fn from(_: DuplicateSubmission) -> Self {
        ServiceError::DuplicateSubmission
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError {
            kind: ErrorKind::Validation,
            code: "validation_failed",
            message: format!("validation failed: {err}"),
        }
    }
}

/// Application-level error converted to an HTTP response.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct AppError {
    kind: ErrorKind,
    code: &'static str,
    message: String,
}

impl AppError {
    /// Coarse category of the error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// HTTP status returned for this error.
    pub fn status(&self) -> StatusCode {
        match self.kind {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict | ErrorKind::InvalidState => StatusCode::CONFLICT,
            ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        Self {
            kind: err.kind(),
            code: err.code(),
            message: err.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    error: &'static str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let payload = Json(ErrorBody {
            success: false,
            message: self.message,
            error: self.code,
        });

        (status, payload).into_response()
    }
}

impl From<PlanError> for ServiceError {
    fn from(err: PlanError) -> Self {
        match err {
            PlanError::AlreadyPending => {
                ServiceError::InvalidTransition("state transition already pending".into())
            }
            PlanError::InvalidTransition(invalid) => {
                ServiceError::InvalidTransition(invalid.to_string())
            }
        }
    }
}

impl From<ApplyError> for ServiceError {
    fn from(err: ApplyError) -> Self {
        match err {
            ApplyError::NoPending => {
                ServiceError::InvalidTransition("no transition is pending".into())
            }
            ApplyError::IdMismatch { .. } => {
                ServiceError::InvalidTransition("pending transition does not match".into())
            }
            ApplyError::PhaseMismatch { expected, actual } => {
                ServiceError::InvalidTransition(format!(
                    "state changed during transition (expected {expected}, got {actual})"
                ))
            }
            ApplyError::VersionMismatch { expected, actual } => {
                ServiceError::InvalidTransition(format!(
                    "state version mismatch during transition (expected {expected}, got {actual})"
                ))
            }
        }
    }
}

impl From<AbortError> for ServiceError {
    fn from(err: AbortError) -> Self {
        match err {
            AbortError::NoPending => {
                ServiceError::InvalidTransition("no pending transition".into())
            }
            AbortError::IdMismatch { .. } => {
                ServiceError::InvalidTransition("transition plan does not match".into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_host_maps_to_forbidden() {
        let err = AppError::from(ServiceError::NotHost);
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn taxonomy_maps_to_http_status() {
        let cases = [
            (ServiceError::UserNotFound, StatusCode::NOT_FOUND),
            (ServiceError::AlreadyInGame, StatusCode::CONFLICT),
            (ServiceError::DuplicateSubmission, StatusCode::CONFLICT),
            (ServiceError::GameNotInLobby, StatusCode::CONFLICT),
            (ServiceError::MissingData, StatusCode::BAD_REQUEST),
            (ServiceError::Timeout, StatusCode::SERVICE_UNAVAILABLE),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status(), status);
        }
    }

    #[test]
    fn plan_errors_become_invalid_state() {
        let err = ServiceError::from(PlanError::AlreadyPending);
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(err.code(), "invalid_state");
    }
}
