//! Snapshot-to-mirror reconciliation.
//!
//! [`reconcile`] compares an authoritative [`Snapshot`] with the previous
//! [`LocalMirror`] and returns the next mirror together with the per-player
//! diff events. It performs no I/O and never mutates its inputs.
//!
//! | In mirror | Snapshot says | Result                                   |
//! |-----------|---------------|------------------------------------------|
//! | no        | connected     | insert, `joined`                         |
//! | yes       | connected     | replace, `clicked` on a false→true edge  |
//! | yes       | disconnected  | remove, `left` (last known nickname)     |
//! | no        | disconnected  | nothing                                  |
//!
//! Players the snapshot does not mention are kept as they are.

use crate::event::SemanticEvent;
use crate::player::{LocalMirror, PlayerState};
use crate::protocol::Snapshot;

/// Output of [`reconcile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub mirror: LocalMirror,
    /// Diff events in snapshot order.
    pub events: Vec<SemanticEvent>,
    /// The authority's player count, copied verbatim.
    pub total_players: u32,
}

/// Apply `snapshot` to `mirror`.
pub fn reconcile(mirror: &LocalMirror, snapshot: &Snapshot) -> Reconciliation {
    let mut next = mirror.clone();
    let mut events = Vec::new();

    for (player_id, player) in &snapshot.players {
        match (mirror.get(player_id), player.is_connected) {
            (None, true) => {
                events.push(SemanticEvent::Joined {
                    player_id: player_id.clone(),
                    nickname: player.nickname.clone(),
                });
                next.upsert(
                    player_id.clone(),
                    PlayerState::from_snapshot(player, snapshot.game_round),
                );
            }
            (Some(known), true) => {
                if !known.has_clicked && player.has_clicked {
                    events.push(SemanticEvent::Clicked {
                        player_id: player_id.clone(),
                        nickname: player.nickname.clone(),
                    });
                }
                next.upsert(
                    player_id.clone(),
                    PlayerState::from_snapshot(player, snapshot.game_round),
                );
            }
            (Some(known), false) => {
                events.push(SemanticEvent::Left {
                    player_id: player_id.clone(),
                    nickname: known.nickname.clone(),
                });
                next.remove(player_id);
            }
            (None, false) => {}
        }
    }

    Reconciliation {
        mirror: next,
        events,
        total_players: snapshot.total_players,
    }
}
