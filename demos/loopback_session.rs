//! # Loopback Session Demo
//!
//! Drives a [`BuzzerClient`] through a whole game using an in-process
//! loopback [`Transport`] that plays the role of the game authority.
//!
//! ## Running
//!
//! ```sh
//! cargo run --example loopback_session
//! ```

use std::time::Duration;

use async_trait::async_trait;
use buzzer_client::{
    BuzzerClient, BuzzerError, ClientEvent, ClientIntent, SemanticEvent, SessionConfig, Transport,
};
use serde_json::json;
use tokio::sync::mpsc;

// ─────────────────────────────────────────────────────────────────────
// Step 1: A channel-based loopback transport
// ─────────────────────────────────────────────────────────────────────

/// Client half: handed to `BuzzerClient::start`.
pub struct LoopbackTransport {
    /// Intents the client publishes go here.
    tx: mpsc::UnboundedSender<String>,
    /// Snapshots the authority broadcasts arrive here.
    rx: mpsc::UnboundedReceiver<String>,
}

/// Authority half: read intents, broadcast snapshots.
pub struct LoopbackAuthority {
    pub rx: mpsc::UnboundedReceiver<String>,
    pub tx: mpsc::UnboundedSender<String>,
}

fn loopback_pair() -> (LoopbackTransport, LoopbackAuthority) {
    let (client_tx, authority_rx) = mpsc::unbounded_channel();
    let (authority_tx, client_rx) = mpsc::unbounded_channel();
    (
        LoopbackTransport {
            tx: client_tx,
            rx: client_rx,
        },
        LoopbackAuthority {
            rx: authority_rx,
            tx: authority_tx,
        },
    )
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn send(&mut self, message: String) -> Result<(), BuzzerError> {
        // The authority half dropping its receiver is the only failure.
        self.tx
            .send(message)
            .map_err(|_| BuzzerError::TransportClosed)
    }

    /// Cancel-safe because `mpsc::UnboundedReceiver::recv` is.
    async fn recv(&mut self) -> Option<Result<String, BuzzerError>> {
        self.rx.recv().await.map(Ok)
    }

    async fn close(&mut self) -> Result<(), BuzzerError> {
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────
// Step 2: A tiny authority
// ─────────────────────────────────────────────────────────────────────

fn game_state(is_game_on: bool, is_game_over: bool, round: u32, al_clicked: bool) -> String {
    json!({
        "name": "game-state",
        "data": {
            "isGameOn": is_game_on,
            "isGameOver": is_game_over,
            "gameRound": round,
            "totalPlayers": 2,
            "players": {
                "host": {"nickname": "Host", "isConnected": true, "hasClicked": false},
                "al": {"nickname": "Al", "isConnected": true, "hasClicked": al_clicked}
            }
        }
    })
    .to_string()
}

async fn run_authority(
    mut authority: LoopbackAuthority,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut round = 1;
    authority.tx.send(json!({"name": "thread-ready"}).to_string())?;
    authority.tx.send(game_state(false, false, round, false))?;

    while let Some(text) = authority.rx.recv().await {
        let intent: ClientIntent = serde_json::from_str(&text)?;
        tracing::info!("authority received {intent:?}");
        let reply = match intent {
            ClientIntent::StartGame { .. } => game_state(true, false, round, false),
            ClientIntent::PlayerClicked { .. } => game_state(true, false, round, true),
            ClientIntent::ResetBuzzer { .. } => {
                round += 1;
                game_state(true, false, round, false)
            }
            ClientIntent::EndGame { .. } => game_state(false, true, round, false),
        };
        authority.tx.send(reply)?;
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────
// Step 3: Play a game
// ─────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let (transport, authority) = loopback_pair();
    let authority_task = tokio::spawn(async move {
        if let Err(e) = run_authority(authority).await {
            tracing::error!("authority failed: {e}");
        }
    });

    // The local player is "al"; the host role is only used for RoomReady.
    let config = SessionConfig::new("al", "DEMO1", "Al")
        .with_host(true)
        .with_cleanup_delay(Duration::from_millis(500));
    let (mut client, mut events) = BuzzerClient::start(transport, config);

    while let Some(event) = events.recv().await {
        match event {
            ClientEvent::RoomReady { room_code } => {
                tracing::info!("share this room code: {room_code}");
                client.start_game()?;
            }
            ClientEvent::Game { event, phase } => {
                tracing::info!("[{:?}] {event:?}", event.surface(phase));
                match event {
                    SemanticEvent::GameStarted => client.click_buzzer()?,
                    SemanticEvent::Clicked { .. } => client.reset_buzzer()?,
                    SemanticEvent::RoundReset { .. } => client.end_game()?,
                    _ => {}
                }
            }
            ClientEvent::Disconnected { reason } => {
                tracing::info!("disconnected: {}", reason.as_deref().unwrap_or("clean"));
                break;
            }
            other => tracing::info!("{other:?}"),
        }
    }

    client.shutdown().await;
    authority_task.abort();
    Ok(())
}
