//! Game lifecycle state machine.
//!
//! # State Diagram
//!
//! ```text
//! ┌──────┐  isGameOn   ┌────────┐  isGameOver  ┌────────┐  cleanup   ┌────────┐
//! │ Idle │────────────▶│ Active │─────────────▶│ Ending │───────────▶│ Closed │
//! └──────┘             └───┬────┘              └────────┘  or exit   └────────┘
//!                          │ ▲
//!                          └─┘ gameRound > last round (round-reset)
//! ```
//!
//! Only a snapshot with `isGameOver` set and `isGameOn` cleared ends the
//! game; one carrying both flags is not reconciled and ends nothing. Manual
//! exit moves any phase straight to `Closed`. `Ending` and `Closed` ignore
//! every further snapshot.

use tracing::{debug, info};

use crate::error::{BuzzerError, Result};
use crate::event::{CloseReason, SemanticEvent};
use crate::protocol::Snapshot;

/// Coarse phase of the game session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecyclePhase {
    /// Lobby: presence only, no buzzer.
    #[default]
    Idle,
    /// The buzzer game is running.
    Active,
    /// The game is over and cleanup is pending.
    Ending,
    /// `session-closed` has been emitted.
    Closed,
}

impl LifecyclePhase {
    /// Returns `true` once the phase no longer reacts to snapshots.
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Ending | Self::Closed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cleanup {
    Unscheduled,
    Pending,
    Done,
}

/// Result of feeding one snapshot to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleStep {
    pub events: Vec<SemanticEvent>,
    /// Whether the snapshot's player map should be reconciled.
    pub reconcile: bool,
    /// Whether the caller must start the cleanup timer.
    pub schedule_cleanup: bool,
}

impl LifecycleStep {
    fn ignored() -> Self {
        Self {
            events: Vec::new(),
            reconcile: false,
            schedule_cleanup: false,
        }
    }
}

/// Drives [`LifecyclePhase`] from snapshot flags.
#[derive(Debug, Clone)]
pub struct LifecycleController {
    phase: LifecyclePhase,
    last_round: u32,
    cleanup: Cleanup,
}

impl LifecycleController {
    /// Start in `Idle` with `initial_round` as the round baseline.
    pub fn new(initial_round: u32) -> Self {
        Self {
            phase: LifecyclePhase::Idle,
            last_round: initial_round,
            cleanup: Cleanup::Unscheduled,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    /// Highest round recorded so far.
    pub fn last_round(&self) -> u32 {
        self.last_round
    }

    /// The client's local belief that a game is running.
    pub fn is_game_on(&self) -> bool {
        self.phase == LifecyclePhase::Active
    }

    /// Advance the state machine with one snapshot.
    pub fn step(&mut self, snapshot: &Snapshot) -> LifecycleStep {
        if self.phase.is_finished() {
            report(BuzzerError::DuplicateTransition {
                phase: self.phase,
                trigger: "snapshot after game end",
            });
            return LifecycleStep::ignored();
        }

        let mut events = Vec::new();

        if snapshot.is_game_on && self.phase == LifecyclePhase::Idle {
            info!(round = snapshot.game_round, "game started");
            self.phase = LifecyclePhase::Active;
            events.push(SemanticEvent::GameStarted);
        }

        if snapshot.is_game_over {
            let mut schedule_cleanup = false;
            if snapshot.is_game_on {
                report(BuzzerError::DuplicateTransition {
                    phase: self.phase,
                    trigger: "game over while game still on",
                });
            } else if self.is_game_on() {
                info!("game ended");
                self.phase = LifecyclePhase::Ending;
                events.push(SemanticEvent::GameEnded);
                match self.schedule_cleanup() {
                    Ok(()) => schedule_cleanup = true,
                    Err(err) => report(err),
                }
            } else {
                report(BuzzerError::DuplicateTransition {
                    phase: self.phase,
                    trigger: "game over before game start",
                });
            }
            return LifecycleStep {
                events,
                reconcile: false,
                schedule_cleanup,
            };
        }

        if snapshot.game_round > self.last_round {
            if self.is_game_on() {
                info!(round = snapshot.game_round, "buzzer reset");
                events.push(SemanticEvent::RoundReset {
                    round: snapshot.game_round,
                });
            } else {
                debug!(
                    from = self.last_round,
                    to = snapshot.game_round,
                    "round advanced in lobby"
                );
            }
            self.last_round = snapshot.game_round;
        }

        LifecycleStep {
            events,
            reconcile: true,
            schedule_cleanup: false,
        }
    }

    /// The cleanup timer fired. Emits `session-closed` unless the session
    /// was already closed.
    pub fn cleanup_elapsed(&mut self) -> Option<SemanticEvent> {
        if self.cleanup != Cleanup::Pending {
            debug!(phase = ?self.phase, "cleanup timer result suppressed");
            return None;
        }
        self.close(CloseReason::CleanupElapsed)
    }

    /// The local user left. Emits `session-closed` unless it already was.
    pub fn exit(&mut self) -> Option<SemanticEvent> {
        self.close(CloseReason::ManualExit)
    }

    fn schedule_cleanup(&mut self) -> Result<()> {
        if self.cleanup != Cleanup::Unscheduled {
            return Err(BuzzerError::TimerConflict);
        }
        self.cleanup = Cleanup::Pending;
        Ok(())
    }

    fn close(&mut self, reason: CloseReason) -> Option<SemanticEvent> {
        if self.phase == LifecyclePhase::Closed {
            debug!(?reason, "session already closed");
            return None;
        }
        info!(?reason, from = ?self.phase, "session closed");
        self.phase = LifecyclePhase::Closed;
        self.cleanup = Cleanup::Done;
        Some(SemanticEvent::SessionClosed { reason })
    }
}

/// Log a non-fatal lifecycle diagnostic.
fn report(err: BuzzerError) {
    debug!(error = %err, "lifecycle no-op");
}
