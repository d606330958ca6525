//! Per-player records and the local mirror that holds them.

use indexmap::IndexMap;

use crate::protocol::{PlayerId, PlayerSnapshot};

/// The client's view of one participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerState {
    pub nickname: String,
    pub is_connected: bool,
    pub has_clicked: bool,
    /// Round of the snapshot that last refreshed this record.
    pub game_round: u32,
}

impl PlayerState {
    /// Build a record from a snapshot entry seen in `game_round`.
    pub fn from_snapshot(player: &PlayerSnapshot, game_round: u32) -> Self {
        Self {
            nickname: player.nickname.clone(),
            is_connected: player.is_connected,
            has_clicked: player.has_clicked,
            game_round,
        }
    }
}

/// Locally cached player state, keyed by player id.
///
/// Holds an entry only for players that were connected in the last snapshot
/// that mentioned them. Only the reconciler produces new mirrors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalMirror {
    players: IndexMap<PlayerId, PlayerState>,
}

impl LocalMirror {
    /// Create an empty mirror.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a player by id.
    pub fn get(&self, player_id: &str) -> Option<&PlayerState> {
        self.players.get(player_id)
    }

    /// Returns `true` if the player is in the mirror.
    pub fn contains(&self, player_id: &str) -> bool {
        self.players.contains_key(player_id)
    }

    /// Number of players in the mirror.
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Returns `true` if no player is present.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Iterate over entries in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&PlayerId, &PlayerState)> {
        self.players.iter()
    }

    pub(crate) fn upsert(&mut self, player_id: PlayerId, state: PlayerState) {
        self.players.insert(player_id, state);
    }

    pub(crate) fn remove(&mut self, player_id: &str) -> Option<PlayerState> {
        self.players.shift_remove(player_id)
    }
}
