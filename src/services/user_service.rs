use std::time::SystemTime;

use tracing::info;
use uuid::Uuid;

use crate::{
    dao::models::{PromptEntity, UserEntity},
    error::ServiceError,
    state::SharedState,
};

/// Register a player. Usernames are unique; nothing else is checked.
pub async fn register_user(
    state: &SharedState,
    username: String,
    name: String,
) -> Result<UserEntity, ServiceError> {
    let username = username.trim().to_owned();
    let name = name.trim().to_owned();
    if username.is_empty() || name.is_empty() {
        return Err(ServiceError::MissingData);
    }

    let user = UserEntity {
        id: Uuid::new_v4(),
        username,
        name,
        created_at: SystemTime::from(state.now()),
    };
    if !state.repository().insert_user(user.clone()).await? {
        return Err(ServiceError::UsernameTaken);
    }

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(user)
}

/// Add a prompt to the pool drawn from at game creation.
pub async fn add_prompt(
    state: &SharedState,
    content: String,
) -> Result<PromptEntity, ServiceError> {
    let content = content.trim().to_owned();
    if content.is_empty() {
        return Err(ServiceError::MissingData);
    }

    let prompt = PromptEntity {
        id: Uuid::new_v4(),
        content,
    };
    state.repository().insert_prompt(prompt.clone()).await?;
    Ok(prompt)
}

/// Insert the configured prompts when the repository has none. Returns how many were added.
pub async fn seed_prompts(state: &SharedState) -> Result<usize, ServiceError> {
    let repository = state.repository();
    if !repository.list_prompts().await?.is_empty() {
        return Ok(0);
    }

    let prompts = state.config().seed_prompts().to_vec();
    let count = prompts.len();
    for content in prompts {
        repository
            .insert_prompt(PromptEntity {
                id: Uuid::new_v4(),
                content,
            })
            .await?;
    }

    info!(count, "seeded prompts");
    Ok(count)
}
