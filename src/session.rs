//! Per-session snapshot ingestion.
//!
//! [`BuzzerSession`] owns the local mirror and the lifecycle controller for
//! one client session. Every inbound snapshot goes through
//! [`BuzzerSession::ingest`], which runs the lifecycle step and the
//! reconciler and returns the ordered events for the renderer. The session
//! never renders, publishes, or sleeps; the cleanup delay is handed back to
//! the caller through [`IngestOutcome::cleanup_after`].
//!
//! # Example
//!
//! ```
//! use buzzer_client::{BuzzerSession, SemanticEvent, SessionConfig};
//!
//! let mut session = BuzzerSession::new(SessionConfig::new("client-1", "ROOM42", "Al"));
//! let outcome = session
//!     .ingest_json(
//!         r#"{"isGameOn":false,"isGameOver":false,"gameRound":1,"totalPlayers":1,
//!             "players":{"p1":{"nickname":"Al","isConnected":true,"hasClicked":false}}}"#,
//!     )
//!     .unwrap();
//! assert_eq!(
//!     outcome.events,
//!     vec![SemanticEvent::Joined { player_id: "p1".into(), nickname: "Al".into() }]
//! );
//! ```

use std::time::Duration;

use tracing::{debug, warn};

use crate::error::Result;
use crate::event::SemanticEvent;
use crate::lifecycle::{LifecycleController, LifecyclePhase};
use crate::player::LocalMirror;
use crate::protocol::{ChannelNames, PlayerId, Snapshot};
use crate::reconcile::reconcile;

/// Default delay between `game-ended` and `session-closed`.
const DEFAULT_CLEANUP_DELAY: Duration = Duration::from_secs(3);

/// Default capacity of the bounded event channel.
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Default timeout for the graceful shutdown.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Round number the authority starts a game at.
const DEFAULT_INITIAL_ROUND: u32 = 1;

// ── Configuration ───────────────────────────────────────────────────

/// Identity and tuning for one client session.
///
/// The identity fields come from the embedding application (stored settings,
/// URL parameters) and are treated as constants for the session's lifetime.
///
/// ```
/// use buzzer_client::SessionConfig;
/// use std::time::Duration;
///
/// let config = SessionConfig::new("client-1", "ROOM42", "Al")
///     .with_host(true)
///     .with_cleanup_delay(Duration::from_millis(500));
/// assert!(config.is_host);
/// assert_eq!(config.channel_names().game_room, "ROOM42:primary");
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Client id assigned by the realtime provider.
    pub client_id: PlayerId,
    /// Code of the game room this session belongs to.
    pub room_code: String,
    /// Nickname the local player entered.
    pub nickname: String,
    /// Whether this client created the room.
    pub is_host: bool,
    /// Delay between `game-ended` and `session-closed`.
    ///
    /// Defaults to **3 seconds**.
    pub cleanup_delay: Duration,
    /// Round baseline before the first snapshot. Defaults to **1**.
    pub initial_round: u32,
    /// Capacity of the bounded event channel used by the async client.
    ///
    /// Defaults to **256**. Values below 1 are clamped to 1.
    pub event_channel_capacity: usize,
    /// How long the async client waits for its loop to exit on shutdown.
    ///
    /// Defaults to **1 second**.
    pub shutdown_timeout: Duration,
}

impl SessionConfig {
    /// Create a configuration with the given identity and default tuning.
    pub fn new(
        client_id: impl Into<PlayerId>,
        room_code: impl Into<String>,
        nickname: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            room_code: room_code.into(),
            nickname: nickname.into(),
            is_host: false,
            cleanup_delay: DEFAULT_CLEANUP_DELAY,
            initial_round: DEFAULT_INITIAL_ROUND,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    /// Mark this client as the room host.
    #[must_use]
    pub fn with_host(mut self, is_host: bool) -> Self {
        self.is_host = is_host;
        self
    }

    /// Set the delay between `game-ended` and `session-closed`.
    #[must_use]
    pub fn with_cleanup_delay(mut self, delay: Duration) -> Self {
        self.cleanup_delay = delay;
        self
    }

    /// Set the round baseline used before the first snapshot.
    #[must_use]
    pub fn with_initial_round(mut self, round: u32) -> Self {
        self.initial_round = round;
        self
    }

    /// Set the capacity of the bounded event channel. Values below 1 are
    /// clamped to 1.
    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    /// Set how long the async client waits for its loop to exit on shutdown.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Channels this session subscribes to and publishes on.
    pub fn channel_names(&self) -> ChannelNames {
        ChannelNames::new(&self.room_code, &self.client_id)
    }
}

// ── Session ─────────────────────────────────────────────────────────

/// Result of ingesting one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOutcome {
    /// Lifecycle events first, then visible player diff events.
    pub events: Vec<SemanticEvent>,
    /// Phase after the snapshot was applied.
    pub phase: LifecyclePhase,
    /// Set when the caller must fire
    /// [`cleanup_elapsed`](BuzzerSession::cleanup_elapsed) after this delay.
    pub cleanup_after: Option<Duration>,
}

/// Local mirror and lifecycle for one client session.
#[derive(Debug, Clone)]
pub struct BuzzerSession {
    config: SessionConfig,
    mirror: LocalMirror,
    lifecycle: LifecycleController,
    total_players: u32,
}

impl BuzzerSession {
    /// Create an idle session with an empty mirror.
    pub fn new(config: SessionConfig) -> Self {
        let lifecycle = LifecycleController::new(config.initial_round);
        Self {
            config,
            mirror: LocalMirror::new(),
            lifecycle,
            total_players: 0,
        }
    }

    /// Apply one authoritative snapshot.
    ///
    /// Clicks observed while the lobby is still open update the mirror but
    /// are not reported; joins and departures are always reported.
    pub fn ingest(&mut self, snapshot: &Snapshot) -> IngestOutcome {
        let step = self.lifecycle.step(snapshot);
        let phase = self.lifecycle.phase();
        let mut events = step.events;

        if step.reconcile {
            let result = reconcile(&self.mirror, snapshot);
            self.mirror = result.mirror;
            self.total_players = result.total_players;
            events.extend(
                result
                    .events
                    .into_iter()
                    .filter(|event| phase == LifecyclePhase::Active || !is_click(event)),
            );
        }

        debug!(
            ?phase,
            round = snapshot.game_round,
            players = self.mirror.len(),
            player_events = events.iter().filter(|e| e.is_player_diff()).count(),
            events = events.len(),
            "snapshot ingested"
        );

        IngestOutcome {
            events,
            phase,
            cleanup_after: step.schedule_cleanup.then_some(self.config.cleanup_delay),
        }
    }

    /// Parse and apply a snapshot given as JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`BuzzerError::MalformedSnapshot`](crate::BuzzerError::MalformedSnapshot)
    /// without touching the session if the text is not a complete snapshot.
    pub fn ingest_json(&mut self, text: &str) -> Result<IngestOutcome> {
        let snapshot = Snapshot::from_json(text).inspect_err(|err| {
            warn!(error = %err, "dropping snapshot");
        })?;
        Ok(self.ingest(&snapshot))
    }

    /// Parse and apply a snapshot given as a decoded JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`BuzzerError::MalformedSnapshot`](crate::BuzzerError::MalformedSnapshot)
    /// without touching the session if the value is not a complete snapshot.
    pub fn ingest_value(&mut self, value: serde_json::Value) -> Result<IngestOutcome> {
        let snapshot = Snapshot::from_value(value).inspect_err(|err| {
            warn!(error = %err, "dropping snapshot");
        })?;
        Ok(self.ingest(&snapshot))
    }

    /// The cleanup delay requested by [`ingest`](Self::ingest) has elapsed.
    pub fn cleanup_elapsed(&mut self) -> Option<SemanticEvent> {
        self.lifecycle.cleanup_elapsed()
    }

    /// The local user is leaving; closes the session and suppresses any
    /// pending cleanup.
    pub fn exit(&mut self) -> Option<SemanticEvent> {
        self.lifecycle.exit()
    }

    /// The configuration this session was created with.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Players currently believed present.
    pub fn mirror(&self) -> &LocalMirror {
        &self.mirror
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> LifecyclePhase {
        self.lifecycle.phase()
    }

    /// Last round the session has recorded.
    pub fn last_round(&self) -> u32 {
        self.lifecycle.last_round()
    }

    /// Player count reported by the authority in the last applied snapshot.
    pub fn total_players(&self) -> u32 {
        self.total_players
    }

    /// Returns `true` once `session-closed` has been emitted.
    pub fn is_closed(&self) -> bool {
        self.lifecycle.phase() == LifecyclePhase::Closed
    }
}

fn is_click(event: &SemanticEvent) -> bool {
    matches!(event, SemanticEvent::Clicked { .. })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::protocol::PlayerSnapshot;

    fn session() -> BuzzerSession {
        BuzzerSession::new(SessionConfig::new("me", "ROOM", "Me"))
    }

    fn snapshot(is_game_on: bool, has_clicked: bool) -> Snapshot {
        Snapshot {
            is_game_on,
            is_game_over: false,
            game_round: 1,
            total_players: 1,
            players: [("p1".to_string(), PlayerSnapshot::new("Al", true, has_clicked))]
                .into_iter()
                .collect(),
        }
    }

    #[test]
    fn config_defaults() {
        let config = SessionConfig::new("me", "ROOM", "Me");
        assert_eq!(config.cleanup_delay, Duration::from_secs(3));
        assert_eq!(config.initial_round, 1);
        assert_eq!(config.event_channel_capacity, 256);
        assert!(!config.is_host);
        assert_eq!(
            SessionConfig::new("me", "ROOM", "Me")
                .with_event_channel_capacity(0)
                .event_channel_capacity,
            1
        );
    }

    #[test]
    fn lobby_click_is_not_reported_but_recorded() {
        let mut session = session();
        session.ingest(&snapshot(false, false));

        let outcome = session.ingest(&snapshot(false, true));
        assert!(outcome.events.is_empty());
        assert!(session.mirror().get("p1").unwrap().has_clicked);

        // The baseline already holds the click, so starting does not replay it.
        let outcome = session.ingest(&snapshot(true, true));
        assert_eq!(outcome.events, vec![SemanticEvent::GameStarted]);
    }

    #[test]
    fn malformed_json_leaves_session_untouched() {
        let mut session = session();
        session.ingest(&snapshot(false, false));
        let before = session.mirror().clone();

        let err = session
            .ingest_json(r#"{"isGameOn":true,"isGameOver":false,"gameRound":1}"#)
            .unwrap_err();
        assert!(matches!(err, crate::BuzzerError::MalformedSnapshot(_)));
        assert_eq!(session.mirror(), &before);
        assert_eq!(session.phase(), LifecyclePhase::Idle);
    }

    #[test]
    fn cleanup_delay_comes_from_config() {
        let mut session = BuzzerSession::new(
            SessionConfig::new("me", "ROOM", "Me").with_cleanup_delay(Duration::from_millis(10)),
        );
        session.ingest(&snapshot(true, false));
        let mut over = snapshot(false, false);
        over.is_game_over = true;
        let outcome = session.ingest(&over);
        assert_eq!(outcome.cleanup_after, Some(Duration::from_millis(10)));
        assert_eq!(outcome.phase, LifecyclePhase::Ending);
    }
}
