//! # Buzzer Client
//!
//! Client core for the realtime multiplayer buzzer game.
//!
//! Every participant receives authoritative `game-state` snapshots over a
//! pub/sub channel. This crate keeps a local mirror of the players, derives
//! presence and buzzer events from successive snapshots, and drives the game
//! lifecycle (lobby, game, end, cleanup) from them.
//!
//! ## Features
//!
//! - **Pure core**: [`BuzzerSession::ingest`] is synchronous and never blocks
//! - **Transport-agnostic**: implement the [`Transport`] trait for any pub/sub backend
//! - **Event-driven**: [`BuzzerClient`] delivers typed [`ClientEvent`]s via a channel
//!   (requires the default `tokio-runtime` feature)
//!
//! ## Quick Start
//!
//! ```
//! use buzzer_client::{BuzzerSession, LifecyclePhase, SemanticEvent, SessionConfig};
//!
//! let mut session = BuzzerSession::new(SessionConfig::new("client-1", "ROOM42", "Al"));
//! let outcome = session
//!     .ingest_json(
//!         r#"{"isGameOn":true,"isGameOver":false,"gameRound":1,"totalPlayers":0,"players":{}}"#,
//!     )
//!     .unwrap();
//! assert_eq!(outcome.events, vec![SemanticEvent::GameStarted]);
//! assert_eq!(session.phase(), LifecyclePhase::Active);
//! ```

pub mod error;
pub mod event;
pub mod lifecycle;
pub mod player;
pub mod protocol;
pub mod reconcile;
pub mod session;
pub mod transport;

#[cfg(feature = "tokio-runtime")]
pub mod client;

// Re-export primary types for ergonomic imports.
pub use error::BuzzerError;
pub use event::{ClientEvent, CloseReason, RenderSurface, SemanticEvent};
pub use lifecycle::{LifecycleController, LifecyclePhase};
pub use player::{LocalMirror, PlayerState};
pub use protocol::{ClientIntent, ServerMessage, Snapshot};
pub use reconcile::reconcile;
pub use session::{BuzzerSession, IngestOutcome, SessionConfig};
pub use transport::Transport;

#[cfg(feature = "tokio-runtime")]
pub use client::BuzzerClient;
