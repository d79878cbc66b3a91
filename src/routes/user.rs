use axum::{Json, Router, extract::State, routing::post};
use validator::Validate;

use crate::{
    dto::user::{
        CreatePromptRequest, CreatePromptResponse, RegisterUserRequest, RegisterUserResponse,
    },
    error::AppError,
    services::user_service,
    state::SharedState,
};

/// Account and prompt management routes.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/users", post(register_user))
        .route("/prompts", post(create_prompt))
}

/// Register a player under a unique username.
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    request_body = RegisterUserRequest,
    responses(
        (status = 200, description = "User registered", body = RegisterUserResponse),
        (status = 400, description = "Blank username or name"),
        (status = 409, description = "Username already taken")
    )
)]
pub async fn register_user(
    State(state): State<SharedState>,
    Json(payload): Json<RegisterUserRequest>,
) -> Result<Json<RegisterUserResponse>, AppError> {
    payload.validate()?;
    let user = user_service::register_user(&state, payload.username, payload.name).await?;
    Ok(Json(RegisterUserResponse {
        success: true,
        message: "User registered".into(),
        user: user.into(),
    }))
}

/// Add a prompt to the pool new games draw from.
#[utoipa::path(
    post,
    path = "/prompts",
    tag = "users",
    request_body = CreatePromptRequest,
    responses((status = 200, description = "Prompt added", body = CreatePromptResponse))
)]
pub async fn create_prompt(
    State(state): State<SharedState>,
    Json(payload): Json<CreatePromptRequest>,
) -> Result<Json<CreatePromptResponse>, AppError> {
    payload.validate()?;
    let prompt = user_service::add_prompt(&state, payload.content).await?;
    Ok(Json(CreatePromptResponse {
        success: true,
        message: "Prompt added".into(),
        prompt: prompt.into(),
    }))
}
