/// In-process repository backed by concurrent maps.
pub mod memory;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::models::{DrawingEntity, GameEntity, MembershipEntity, PromptEntity, UserEntity};
use crate::dao::storage::StorageResult;

pub use self::memory::InMemoryRepository;

/// Abstraction over the persistence layer for users, prompts, games, memberships and drawings.
///
/// Insert methods that guard a uniqueness rule return `Ok(false)` when the rule would be
/// violated instead of failing, so callers can map the outcome to a domain error.
pub trait Repository: Send + Sync {
    /// Store a new user; `false` when the username is already taken.
    fn insert_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<bool>>;
    /// Look a user up by id.
    fn find_user(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<UserEntity>>>;
    /// Look a user up by its unique username.
    fn find_user_by_username(
        &self,
        username: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>>;
    /// Add a prompt to the pool.
    fn insert_prompt(&self, prompt: PromptEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Every prompt in the pool.
    fn list_prompts(&self) -> BoxFuture<'static, StorageResult<Vec<PromptEntity>>>;
    /// Look a prompt up by id.
    fn find_prompt(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<PromptEntity>>>;
    /// Insert or replace a game, keyed by its id and indexed by its code.
    fn save_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Look a game up by its join code.
    fn find_game_by_code(
        &self,
        code: String,
    ) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    /// Store a membership; `false` when the player already belongs to a game.
    fn insert_membership(
        &self,
        membership: MembershipEntity,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    /// Drop one membership; `false` when there was none.
    fn delete_membership(
        &self,
        player_id: Uuid,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    /// Remove every membership of a game, returning how many were dropped.
    fn delete_memberships_for_game(&self, game_id: Uuid)
    -> BoxFuture<'static, StorageResult<usize>>;
    /// Membership of a player, if any.
    fn find_membership_by_player(
        &self,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<MembershipEntity>>>;
    /// Store a drawing; `false` when the player already submitted one for that game.
    fn insert_drawing(&self, drawing: DrawingEntity) -> BoxFuture<'static, StorageResult<bool>>;
    /// Drawings of a game in submission order.
    fn list_drawings(&self, game_id: Uuid)
    -> BoxFuture<'static, StorageResult<Vec<DrawingEntity>>>;
    /// Cheap round trip proving the backend answers.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
