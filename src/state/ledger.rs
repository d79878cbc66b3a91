use std::time::SystemTime;

use dashmap::{DashMap, mapref::entry::Entry};
use thiserror::Error;
use uuid::Uuid;

/// Bookkeeping for one accepted drawing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Id of the stored drawing.
    pub drawing_id: Uuid,
    /// Time the drawing was accepted.
    pub submitted_at: SystemTime,
}

/// A drawing was already recorded for this player in this game.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("player {player_id} already submitted a drawing in game {game_id}")]
pub struct DuplicateSubmission {
    /// Game the submission targeted.
    pub game_id: Uuid,
    /// Player who already submitted.
    pub player_id: Uuid,
}

/// At-most-once submission tracking per (game, player).
///
/// The ledger never drives phase changes; it only answers whether a player already submitted.
#[derive(Debug, Default)]
pub struct SubmissionLedger {
    entries: DashMap<(Uuid, Uuid), Submission>,
}

impl SubmissionLedger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the (game, player) slot. Concurrent calls for the same pair see exactly one winner.
    pub fn record(
        &self,
        game_id: Uuid,
        player_id: Uuid,
        submission: Submission,
    ) -> Result<(), DuplicateSubmission> {
        match self.entries.entry((game_id, player_id)) {
            Entry::Occupied(_) => Err(DuplicateSubmission { game_id, player_id }),
            Entry::Vacant(slot) => {
                slot.insert(submission);
                Ok(())
            }
        }
    }

    /// Whether `player_id` already submitted in `game_id`.
    pub fn has_submitted(&self, game_id: Uuid, player_id: Uuid) -> bool {
        self.entries.contains_key(&(game_id, player_id))
    }

    /// Release a claim whose drawing could not be persisted.
    pub fn forget(&self, game_id: Uuid, player_id: Uuid) -> Option<Submission> {
        self.entries
            .remove(&(game_id, player_id))
            .map(|(_, submission)| submission)
    }

    /// Players who submitted in `game_id`, oldest first.
    pub fn submissions(&self, game_id: Uuid) -> Vec<(Uuid, Submission)> {
        let mut submissions: Vec<_> = self
            .entries
            .iter()
            .filter(|entry| entry.key().0 == game_id)
            .map(|entry| (entry.key().1, entry.value().clone()))
            .collect();
        submissions.sort_by_key(|(_, submission)| submission.submitted_at);
        submissions
    }

    /// Drop every entry of a closed game.
    pub fn clear_game(&self, game_id: Uuid) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(game, _), _| *game != game_id);
        before.saturating_sub(self.entries.len())
    }
}
