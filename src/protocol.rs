//! Wire types exchanged with the game authority over the pub/sub channels.
//!
//! Every message on the wire is a named envelope:
//!
//! ```text
//! {"name": "game-state", "data": {"isGameOn": true, "isGameOver": false, ...}}
//! ```
//!
//! Inbound messages arrive on the room channel (`<room>:primary`); outbound
//! intents are published on the per-client channel
//! (`<room>:player-ch-<clientId>`). See [`ChannelNames`].
//!
//! Older servers send the player map as `globalPlayersState` and the click
//! flag inverted as `notClicked`. Both spellings are accepted on input;
//! output always uses `players` / `hasClicked`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{BuzzerError, Result};

// ── Type aliases ────────────────────────────────────────────────────

/// Opaque client identifier assigned by the realtime provider.
pub type PlayerId = String;

// ── Message names ───────────────────────────────────────────────────

/// Name of the inbound message carrying a [`Snapshot`].
pub const GAME_STATE: &str = "game-state";

/// Name of the inbound message announcing that a host's game room is ready.
pub const THREAD_READY: &str = "thread-ready";

// ── Snapshot ────────────────────────────────────────────────────────

/// One player's entry inside a [`Snapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawPlayerSnapshot")]
pub struct PlayerSnapshot {
    pub nickname: String,
    pub is_connected: bool,
    pub has_clicked: bool,
}

impl PlayerSnapshot {
    /// Create a player entry.
    pub fn new(nickname: impl Into<String>, is_connected: bool, has_clicked: bool) -> Self {
        Self {
            nickname: nickname.into(),
            is_connected,
            has_clicked,
        }
    }
}

/// Accepts both `hasClicked` and the legacy inverted `notClicked`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPlayerSnapshot {
    nickname: String,
    is_connected: bool,
    has_clicked: Option<bool>,
    not_clicked: Option<bool>,
}

impl TryFrom<RawPlayerSnapshot> for PlayerSnapshot {
    type Error = String;

    fn try_from(raw: RawPlayerSnapshot) -> std::result::Result<Self, Self::Error> {
        let has_clicked = match (raw.has_clicked, raw.not_clicked) {
            (Some(has_clicked), _) => has_clicked,
            (None, Some(not_clicked)) => !not_clicked,
            (None, None) => return Err("missing field `hasClicked`".to_string()),
        };
        Ok(Self {
            nickname: raw.nickname,
            is_connected: raw.is_connected,
            has_clicked,
        })
    }
}

/// Authoritative broadcast of the full game and player state.
///
/// All fields are required; a snapshot missing any of them is rejected with
/// [`BuzzerError::MalformedSnapshot`] rather than defaulted.
///
/// # Example
///
/// ```
/// use buzzer_client::protocol::Snapshot;
///
/// let snapshot = Snapshot::from_json(
///     r#"{"isGameOn":false,"isGameOver":false,"gameRound":1,"totalPlayers":1,
///         "players":{"p1":{"nickname":"Al","isConnected":true,"hasClicked":false}}}"#,
/// ).unwrap();
/// assert_eq!(snapshot.total_players, 1);
/// assert!(Snapshot::from_json(r#"{"isGameOn":true}"#).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub is_game_on: bool,
    pub is_game_over: bool,
    pub game_round: u32,
    pub total_players: u32,
    /// Players in the order the authority listed them.
    #[serde(alias = "globalPlayersState")]
    pub players: IndexMap<PlayerId, PlayerSnapshot>,
}

impl Snapshot {
    /// Parse a snapshot from its JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`BuzzerError::MalformedSnapshot`] if a field is missing or
    /// has the wrong type.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(malformed)
    }

    /// Parse a snapshot from an already-decoded JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`BuzzerError::MalformedSnapshot`] if a field is missing or
    /// has the wrong type.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(malformed)
    }
}

fn malformed(err: serde_json::Error) -> BuzzerError {
    BuzzerError::MalformedSnapshot(err.to_string())
}

// ── Envelope ────────────────────────────────────────────────────────

/// A named message as carried by the pub/sub provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub name: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Messages received from the game authority on the room channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// A full game-state snapshot.
    GameState(Snapshot),
    /// The host's game room has been provisioned.
    ThreadReady,
    /// Any other message name; ignored by the client.
    Unknown { name: String },
}

impl ServerMessage {
    /// Decode an inbound envelope.
    ///
    /// # Errors
    ///
    /// Returns [`BuzzerError::Serialization`] if the text is not an envelope and
    /// [`BuzzerError::MalformedSnapshot`] if a `game-state` payload is invalid.
    pub fn parse(text: &str) -> Result<Self> {
        let envelope: Envelope = serde_json::from_str(text)?;
        Ok(match envelope.name.as_str() {
            GAME_STATE => Self::GameState(Snapshot::from_value(envelope.data)?),
            THREAD_READY => Self::ThreadReady,
            _ => Self::Unknown {
                name: envelope.name,
            },
        })
    }
}

// ── Outbound intents ────────────────────────────────────────────────

/// Fire-and-forget requests published to the game authority.
///
/// Serializes to the same envelope shape as inbound messages:
///
/// ```
/// use buzzer_client::protocol::ClientIntent;
///
/// let json = serde_json::to_string(&ClientIntent::start_game()).unwrap();
/// assert_eq!(json, r#"{"name":"start-game","data":{"startGame":true}}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "name",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ClientIntent {
    /// Host asks the authority to start the game.
    StartGame { start_game: bool },
    /// Host asks the authority to end the game.
    EndGame { end_game: bool },
    /// A player pressed the buzzer.
    PlayerClicked { clicked_player_id: PlayerId },
    /// Host asks the authority to reset the buzzer for a new round.
    ResetBuzzer { game_round: bool },
}

impl ClientIntent {
    /// `start-game` with `startGame: true`.
    pub fn start_game() -> Self {
        Self::StartGame { start_game: true }
    }

    /// `end-game` with `endGame: true`.
    pub fn end_game() -> Self {
        Self::EndGame { end_game: true }
    }

    /// `player-clicked` carrying the id of the player who buzzed.
    pub fn player_clicked(player_id: impl Into<PlayerId>) -> Self {
        Self::PlayerClicked {
            clicked_player_id: player_id.into(),
        }
    }

    /// `reset-buzzer` with `gameRound: true`.
    pub fn reset_buzzer() -> Self {
        Self::ResetBuzzer { game_round: true }
    }
}

// ── Channels ────────────────────────────────────────────────────────

/// Channel names a session uses, derived from the room code and client id.
///
/// ```
/// use buzzer_client::protocol::ChannelNames;
///
/// let channels = ChannelNames::new("ROOM42", "client-7");
/// assert_eq!(channels.game_room, "ROOM42:primary");
/// assert_eq!(channels.publish, "ROOM42:player-ch-client-7");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelNames {
    /// Room channel carrying `game-state` snapshots.
    pub game_room: String,
    /// Per-client channel for outbound intents.
    pub publish: String,
}

impl ChannelNames {
    /// Derive both channel names for `client_id` in `room_code`.
    pub fn new(room_code: &str, client_id: &str) -> Self {
        Self {
            game_room: format!("{room_code}:primary"),
            publish: format!("{room_code}:player-ch-{client_id}"),
        }
    }
}
