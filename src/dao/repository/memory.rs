use std::{
    io,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use dashmap::{DashMap, mapref::entry::Entry};
use futures::{FutureExt, future::BoxFuture};
use uuid::Uuid;

use super::Repository;
use crate::dao::{
    models::{DrawingEntity, GameEntity, MembershipEntity, PromptEntity, UserEntity},
    storage::{StorageError, StorageResult},
};

/// Process-local repository backed by concurrent maps.
///
/// Secondary indexes (username, game code, membership by player) are kept next to the
/// primary tables instead of back-references between entities. Cloning is cheap and
/// every clone observes the same tables.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    tables: Arc<Tables>,
}

#[derive(Default)]
struct Tables {
    users: DashMap<Uuid, UserEntity>,
    usernames: DashMap<String, Uuid>,
    prompts: DashMap<Uuid, PromptEntity>,
    games: DashMap<Uuid, GameEntity>,
    game_codes: DashMap<String, Uuid>,
    memberships: DashMap<Uuid, MembershipEntity>,
    drawings: DashMap<(Uuid, Uuid), DrawingEntity>,
    offline: AtomicBool,
}

impl Tables {
    fn ensure_online(&self) -> StorageResult<()> {
        if self.offline.load(Ordering::Acquire) {
            return Err(StorageError::unavailable(
                "in-memory store",
                "switched offline",
                io::Error::new(io::ErrorKind::NotConnected, "store switched offline"),
            ));
        }
        Ok(())
    }
}

impl InMemoryRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: every call fails with [`StorageError::Unavailable`] while set.
    pub fn set_offline(&self, offline: bool) {
        self.tables.offline.store(offline, Ordering::Release);
    }

    fn with_tables<T, F>(&self, op: F) -> BoxFuture<'static, StorageResult<T>>
    where
        T: Send + 'static,
        F: FnOnce(&Tables) -> T + Send + 'static,
    {
        let tables = self.tables.clone();
        async move {
            tables.ensure_online()?;
            Ok(op(&tables))
        }
        .boxed()
    }
}

impl Repository for InMemoryRepository {
    fn insert_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<bool>> {
        self.with_tables(move |tables| match tables.usernames.entry(user.username.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(user.id);
                tables.users.insert(user.id, user);
                true
            }
        })
    }

    fn find_user(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        self.with_tables(move |tables| tables.users.get(&id).map(|user| user.clone()))
    }

    fn find_user_by_username(
        &self,
        username: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        self.with_tables(move |tables| {
            let id = tables.usernames.get(&username).map(|id| *id)?;
            tables.users.get(&id).map(|user| user.clone())
        })
    }

    fn insert_prompt(&self, prompt: PromptEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.with_tables(move |tables| {
            tables.prompts.insert(prompt.id, prompt);
        })
    }

    fn list_prompts(&self) -> BoxFuture<'static, StorageResult<Vec<PromptEntity>>> {
        self.with_tables(|tables| {
            tables
                .prompts
                .iter()
                .map(|entry| entry.value().clone())
                .collect()
        })
    }

    fn find_prompt(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<PromptEntity>>> {
        self.with_tables(move |tables| tables.prompts.get(&id).map(|prompt| prompt.clone()))
    }

    fn save_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.with_tables(move |tables| {
            tables.game_codes.insert(game.code.clone(), game.id);
            tables.games.insert(game.id, game);
        })
    }

    fn find_game_by_code(
        &self,
        code: String,
    ) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        self.with_tables(move |tables| {
            let id = tables.game_codes.get(&code).map(|id| *id)?;
            tables.games.get(&id).map(|game| game.clone())
        })
    }

    fn insert_membership(
        &self,
        membership: MembershipEntity,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        self.with_tables(
            move |tables| match tables.memberships.entry(membership.player_id) {
                Entry::Occupied(_) => false,
                Entry::Vacant(slot) => {
                    slot.insert(membership);
                    true
                }
            },
        )
    }

    fn delete_membership(
        &self,
        player_id: Uuid,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        self.with_tables(move |tables| {
            tables
                .memberships
                .remove_if(&player_id, |_, membership| membership.game_id == game_id)
                .is_some()
        })
    }

    fn delete_memberships_for_game(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<usize>> {
        self.with_tables(move |tables| {
            let before = tables.memberships.len();
            tables
                .memberships
                .retain(|_, membership| membership.game_id != game_id);
            before.saturating_sub(tables.memberships.len())
        })
    }

    fn find_membership_by_player(
        &self,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<MembershipEntity>>> {
        self.with_tables(move |tables| {
            tables
                .memberships
                .get(&player_id)
                .map(|membership| membership.clone())
        })
    }

    fn insert_drawing(&self, drawing: DrawingEntity) -> BoxFuture<'static, StorageResult<bool>> {
        self.with_tables(move |tables| {
            match tables.drawings.entry((drawing.game_id, drawing.player_id)) {
                Entry::Occupied(_) => false,
                Entry::Vacant(slot) => {
                    slot.insert(drawing);
                    true
                }
            }
        })
    }

    fn list_drawings(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<DrawingEntity>>> {
        self.with_tables(move |tables| {
            let mut drawings = tables
                .drawings
                .iter()
                .filter(|entry| entry.key().0 == game_id)
                .map(|entry| entry.value().clone())
                .collect::<Vec<_>>();
            drawings.sort_by_key(|drawing| drawing.submitted_at);
            drawings
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.with_tables(|_| ())
    }
}
