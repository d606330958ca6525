#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing,
    dead_code
)]
//! Shared test utilities for buzzer client integration tests.
//!
//! Provides a scripted [`MockTransport`] and builders for snapshots and
//! `game-state` envelopes.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use buzzer_client::protocol::{PlayerSnapshot, Snapshot};
use buzzer_client::{BuzzerError, Transport};

// ── MockTransport ───────────────────────────────────────────────────

/// A scripted transport for integration testing.
///
/// Scripted inbound envelopes are consumed in order by `recv()`.
/// All messages published by the client are recorded in `sent`.
pub struct MockTransport {
    incoming: VecDeque<Option<Result<String, BuzzerError>>>,
    pub sent: Arc<StdMutex<Vec<String>>>,
    pub closed: Arc<AtomicBool>,
}

impl MockTransport {
    /// Create a mock transport with the given scripted inbound messages.
    ///
    /// Returns the transport plus shared handles for inspecting published
    /// messages and whether close was called.
    pub fn new(
        incoming: Vec<Option<Result<String, BuzzerError>>>,
    ) -> (Self, Arc<StdMutex<Vec<String>>>, Arc<AtomicBool>) {
        let sent = Arc::new(StdMutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let transport = Self {
            incoming: VecDeque::from(incoming),
            sent: Arc::clone(&sent),
            closed: Arc::clone(&closed),
        };
        (transport, sent, closed)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, message: String) -> Result<(), BuzzerError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, BuzzerError>> {
        if let Some(item) = self.incoming.pop_front() {
            item
        } else {
            // No more scripted messages: hang forever so the loop stays
            // alive until shutdown, exit, or the cleanup timer.
            std::future::pending().await
        }
    }

    async fn close(&mut self) -> Result<(), BuzzerError> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }
}

// ── Snapshot builders ───────────────────────────────────────────────

/// A connected player who has not clicked.
pub fn present(nickname: &str) -> PlayerSnapshot {
    PlayerSnapshot::new(nickname, true, false)
}

/// A connected player who has clicked.
pub fn clicked(nickname: &str) -> PlayerSnapshot {
    PlayerSnapshot::new(nickname, true, true)
}

/// A disconnected player.
pub fn gone(nickname: &str) -> PlayerSnapshot {
    PlayerSnapshot::new(nickname, false, false)
}

/// Build a snapshot; `total_players` defaults to the number of entries.
pub fn snapshot(
    is_game_on: bool,
    is_game_over: bool,
    game_round: u32,
    players: &[(&str, PlayerSnapshot)],
) -> Snapshot {
    Snapshot {
        is_game_on,
        is_game_over,
        game_round,
        total_players: players.len() as u32,
        players: players
            .iter()
            .map(|(id, player)| (id.to_string(), player.clone()))
            .collect(),
    }
}

/// Wrap a snapshot in a `game-state` envelope.
pub fn game_state_json(snapshot: &Snapshot) -> String {
    serde_json::json!({ "name": "game-state", "data": snapshot }).to_string()
}

/// Returns the JSON string for a `thread-ready` envelope.
pub fn thread_ready_json() -> String {
    serde_json::json!({ "name": "thread-ready" }).to_string()
}
