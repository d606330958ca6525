//! Events produced for the rendering layer.
//!
//! [`SemanticEvent`] is what the session core derives from snapshots.
//! [`ClientEvent`] is what [`BuzzerClient`](crate::client::BuzzerClient)
//! delivers on its event channel: the semantic events plus connection-level
//! notifications.

use serde::Serialize;

use crate::lifecycle::LifecyclePhase;
use crate::protocol::PlayerId;

/// Why a session emitted `session-closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CloseReason {
    /// The post-game cleanup delay elapsed.
    CleanupElapsed,
    /// The local user left before the cleanup delay elapsed.
    ManualExit,
}

/// A meaningful change derived from successive snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SemanticEvent {
    /// A player connected for the first time (or again after leaving).
    Joined {
        player_id: PlayerId,
        nickname: String,
    },
    /// A known player disconnected. `nickname` is the last one we saw.
    Left {
        player_id: PlayerId,
        nickname: String,
    },
    /// A player pressed the buzzer.
    Clicked {
        player_id: PlayerId,
        nickname: String,
    },
    /// The game moved from the lobby into play.
    GameStarted,
    /// The host reset the buzzer; `round` is the new round number.
    RoundReset { round: u32 },
    /// The game is over; cleanup is pending.
    GameEnded,
    /// The session is finished and should be torn down.
    SessionClosed { reason: CloseReason },
}

/// Where a renderer is expected to show an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderSurface {
    /// Lobby list of who is present.
    PresenceList,
    /// In-game running commentary.
    NewsFeed,
    /// Switch from the lobby to the buzzer area.
    GameArea,
    /// End-of-game alert.
    EndAlert,
    /// Leave the game page.
    Exit,
}

impl SemanticEvent {
    /// Returns `true` for per-player diff events (`joined`, `left`, `clicked`).
    pub fn is_player_diff(&self) -> bool {
        matches!(
            self,
            Self::Joined { .. } | Self::Left { .. } | Self::Clicked { .. }
        )
    }

    /// Surface this event belongs on, given the phase it was emitted in.
    ///
    /// Departures are shown in the presence list while the lobby is open and
    /// in the news feed once the game is running.
    ///
    /// ```
    /// use buzzer_client::{LifecyclePhase, RenderSurface, SemanticEvent};
    ///
    /// let left = SemanticEvent::Left { player_id: "p1".into(), nickname: "Al".into() };
    /// assert_eq!(left.surface(LifecyclePhase::Idle), RenderSurface::PresenceList);
    /// assert_eq!(left.surface(LifecyclePhase::Active), RenderSurface::NewsFeed);
    /// ```
    pub fn surface(&self, phase: LifecyclePhase) -> RenderSurface {
        match self {
            Self::Joined { .. } => RenderSurface::PresenceList,
            Self::Left { .. } if phase == LifecyclePhase::Idle => RenderSurface::PresenceList,
            Self::Left { .. } | Self::Clicked { .. } | Self::RoundReset { .. } => {
                RenderSurface::NewsFeed
            }
            Self::GameStarted => RenderSurface::GameArea,
            Self::GameEnded => RenderSurface::EndAlert,
            Self::SessionClosed { .. } => RenderSurface::Exit,
        }
    }
}

/// Events delivered by the async client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Synthetic event emitted when the client loop starts.
    Connected,
    /// The host's game room is provisioned; share `room_code` with players.
    RoomReady { room_code: String },
    /// A game event, tagged with the phase the session was in afterwards.
    Game {
        event: SemanticEvent,
        phase: LifecyclePhase,
    },
    /// An inbound message could not be decoded; the session is unchanged.
    SnapshotRejected { reason: String },
    /// Always the last event on the channel.
    Disconnected { reason: Option<String> },
}
