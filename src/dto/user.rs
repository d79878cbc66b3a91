use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dao::models::{PromptEntity, UserEntity},
    dto::{format_system_time, validation::validate_not_blank},
};

/// Registration payload. Identity is not verified; the username only has to be unique.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterUserRequest {
    /// Unique handle, must not be blank.
    pub username: String,
    /// Display name, must not be blank.
    pub name: String,
}

impl Validate for RegisterUserRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(e) = validate_not_blank(&self.username) {
            errors.add("username", e);
        }
        if let Err(e) = validate_not_blank(&self.name) {
            errors.add("name", e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Public projection of a registered user.
pub struct UserSummary {
    /// User id.
    pub id: Uuid,
    /// Unique handle.
    pub username: String,
    /// Display name.
    pub name: String,
    /// RFC 3339 registration time.
    pub created_at: String,
}

impl From<UserEntity> for UserSummary {
    fn from(user: UserEntity) -> Self {
        Self {
            id: user.id,
            username: user.username,
            name: user.name,
            created_at: format_system_time(user.created_at),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Returned once a user is registered.
pub struct RegisterUserResponse {
    /// Always `true` on success.
    pub success: bool,
    /// Human readable outcome.
    pub message: String,
    /// The registered user.
    pub user: UserSummary,
}

#[derive(Debug, Deserialize, ToSchema)]
/// Payload adding a prompt to the pool.
pub struct CreatePromptRequest {
    /// Prompt text, must not be blank.
    pub content: String,
}

impl Validate for CreatePromptRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(e) = validate_not_blank(&self.content) {
            errors.add("content", e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Public projection of a prompt.
pub struct PromptSummary {
    /// Prompt id.
    pub id: Uuid,
    /// Prompt text.
    pub content: String,
}

impl From<PromptEntity> for PromptSummary {
    fn from(prompt: PromptEntity) -> Self {
        Self {
            id: prompt.id,
            content: prompt.content,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Returned once a prompt is stored.
pub struct CreatePromptResponse {
    /// Always `true` on success.
    pub success: bool,
    /// Human readable outcome.
    pub message: String,
    /// The stored prompt.
    pub prompt: PromptSummary,
}
