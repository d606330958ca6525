//! Async client driving a [`BuzzerSession`] from a [`Transport`].
//!
//! [`BuzzerClient`] is a thin handle that talks to a background loop task via
//! an unbounded MPSC channel. The loop owns the session: it feeds every
//! inbound `game-state` envelope to [`BuzzerSession::ingest`], runs the
//! post-game cleanup timer, and publishes outbound intents. Events are
//! emitted on a bounded channel returned from [`BuzzerClient::start`].
//!
//! # Example
//!
//! ```rust,ignore
//! let transport = attach_channels_somehow(&config.channel_names()).await;
//! let (client, mut events) = BuzzerClient::start(transport, config);
//!
//! client.click_buzzer()?;
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         ClientEvent::Game { event, phase } => render(event.surface(phase), &event),
//!         ClientEvent::Disconnected { .. } => break,
//!         _ => {}
//!     }
//! }
//! ```

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::time::Sleep;
use tracing::{debug, error, info, warn};

use crate::error::{BuzzerError, Result};
use crate::event::{ClientEvent, SemanticEvent};
use crate::lifecycle::LifecyclePhase;
use crate::protocol::{ChannelNames, ClientIntent, PlayerId, ServerMessage};
use crate::session::{BuzzerSession, IngestOutcome, SessionConfig};
use crate::transport::Transport;

// ── Shared state ────────────────────────────────────────────────────

/// State mirrored from the loop so the handle can answer queries.
struct ClientState {
    connected: AtomicBool,
    closed: AtomicBool,
    total_players: AtomicU32,
    phase: Mutex<LifecyclePhase>,
}

impl ClientState {
    fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            closed: AtomicBool::new(false),
            total_players: AtomicU32::new(0),
            phase: Mutex::new(LifecyclePhase::Idle),
        }
    }
}

/// Messages from the handle to the loop.
#[derive(Debug)]
enum Command {
    Publish(ClientIntent),
    Exit,
}

// ── Client handle ───────────────────────────────────────────────────

/// Async handle for one buzzer game session.
///
/// Intent methods queue a message for the loop and return immediately; there
/// is no acknowledgement or retry.
pub struct BuzzerClient {
    cmd_tx: mpsc::UnboundedSender<Command>,
    state: Arc<ClientState>,
    task: Option<tokio::task::JoinHandle<()>>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    shutdown_timeout: Duration,
    client_id: PlayerId,
    channels: ChannelNames,
}

impl BuzzerClient {
    /// Spawn the client loop and return a handle plus event receiver.
    ///
    /// The receiver yields a synthetic [`ClientEvent::Connected`] first and
    /// [`ClientEvent::Disconnected`] last.
    #[must_use = "the event receiver must be used to receive events"]
    pub fn start(
        transport: impl Transport,
        config: SessionConfig,
    ) -> (Self, mpsc::Receiver<ClientEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<Command>();
        // Clamp capacity to at least 1 (tokio panics on 0).
        let capacity = config.event_channel_capacity.max(1);
        let (event_tx, event_rx) = mpsc::channel::<ClientEvent>(capacity);
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let state = Arc::new(ClientState::new());
        let client_id = config.client_id.clone();
        let channels = config.channel_names();
        let shutdown_timeout = config.shutdown_timeout;

        let task = tokio::spawn(transport_loop(
            transport,
            BuzzerSession::new(config),
            cmd_rx,
            event_tx,
            Arc::clone(&state),
            shutdown_rx,
        ));

        let client = Self {
            cmd_tx,
            state,
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
            shutdown_timeout,
            client_id,
            channels,
        };

        (client, event_rx)
    }

    // ── Intents ─────────────────────────────────────────────────────

    /// Ask the authority to start the game (host only).
    ///
    /// # Errors
    ///
    /// Returns [`BuzzerError::NotConnected`] if the loop has stopped and
    /// [`BuzzerError::SessionClosed`] if the session is over.
    pub fn start_game(&self) -> Result<()> {
        self.send(Command::Publish(ClientIntent::start_game()))
    }

    /// Ask the authority to end the game (host only).
    ///
    /// # Errors
    ///
    /// Returns [`BuzzerError::NotConnected`] if the loop has stopped and
    /// [`BuzzerError::SessionClosed`] if the session is over.
    pub fn end_game(&self) -> Result<()> {
        self.send(Command::Publish(ClientIntent::end_game()))
    }

    /// Press the buzzer as the local player.
    ///
    /// # Errors
    ///
    /// Returns [`BuzzerError::NotConnected`] if the loop has stopped and
    /// [`BuzzerError::SessionClosed`] if the session is over.
    pub fn click_buzzer(&self) -> Result<()> {
        self.send(Command::Publish(ClientIntent::player_clicked(
            self.client_id.clone(),
        )))
    }

    /// Ask the authority to reset the buzzer for a new round (host only).
    ///
    /// # Errors
    ///
    /// Returns [`BuzzerError::NotConnected`] if the loop has stopped and
    /// [`BuzzerError::SessionClosed`] if the session is over.
    pub fn reset_buzzer(&self) -> Result<()> {
        self.send(Command::Publish(ClientIntent::reset_buzzer()))
    }

    /// Leave the session now. Emits `session-closed` (unless already
    /// emitted), cancels any pending cleanup, and closes the transport.
    ///
    /// # Errors
    ///
    /// Returns [`BuzzerError::NotConnected`] if the loop has stopped and
    /// [`BuzzerError::SessionClosed`] if the session is over.
    pub fn exit(&self) -> Result<()> {
        self.send(Command::Exit)
    }

    /// Shut down the client, closing the transport and stopping the loop.
    pub async fn shutdown(&mut self) {
        debug!("BuzzerClient: shutdown requested");

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        // Abort the loop if it does not exit in time so it cannot run detached.
        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    warn!("client loop terminated with join error: {join_err}");
                }
                Err(_) => {
                    warn!("client loop did not exit within timeout; aborting task");
                    task.abort();
                    if let Err(join_err) = task.await {
                        debug!("client loop aborted: {join_err}");
                    }
                }
            }
        }

        self.state.connected.store(false, Ordering::Release);
    }

    // ── State accessors ─────────────────────────────────────────────

    /// Returns `true` while the client loop is running.
    pub fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::Acquire)
    }

    /// Returns `true` once `session-closed` has been emitted.
    pub fn is_session_closed(&self) -> bool {
        self.state.closed.load(Ordering::Acquire)
    }

    /// Player count reported by the authority.
    pub fn total_players(&self) -> u32 {
        self.state.total_players.load(Ordering::Acquire)
    }

    /// Lifecycle phase after the last applied snapshot.
    pub async fn current_phase(&self) -> LifecyclePhase {
        *self.state.phase.lock().await
    }

    /// Channels derived from the session config.
    pub fn channel_names(&self) -> &ChannelNames {
        &self.channels
    }

    fn send(&self, cmd: Command) -> Result<()> {
        if self.state.closed.load(Ordering::Acquire) {
            return Err(BuzzerError::SessionClosed);
        }
        if !self.state.connected.load(Ordering::Acquire) {
            return Err(BuzzerError::NotConnected);
        }
        self.cmd_tx.send(cmd).map_err(|_| BuzzerError::NotConnected)
    }
}

impl std::fmt::Debug for BuzzerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuzzerClient")
            .field("client_id", &self.client_id)
            .field("connected", &self.is_connected())
            .field("session_closed", &self.is_session_closed())
            .field("has_task", &self.task.is_some())
            .finish()
    }
}

impl Drop for BuzzerClient {
    fn drop(&mut self) {
        // No executor is available here to drive a graceful close.
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ── Cleanup timer ───────────────────────────────────────────────────

/// The single post-game cleanup delay of a session.
struct CleanupTimer {
    sleep: Option<Pin<Box<Sleep>>>,
}

impl CleanupTimer {
    fn new() -> Self {
        Self { sleep: None }
    }

    fn is_armed(&self) -> bool {
        self.sleep.is_some()
    }

    fn arm(&mut self, delay: Duration) -> Result<()> {
        if self.is_armed() {
            return Err(BuzzerError::TimerConflict);
        }
        self.sleep = Some(Box::pin(tokio::time::sleep(delay)));
        Ok(())
    }

    fn cancel(&mut self) {
        self.sleep = None;
    }

    /// Resolves when the armed delay elapses; pending forever when idle.
    async fn elapsed(&mut self) {
        match self.sleep.as_mut() {
            Some(sleep) => sleep.as_mut().await,
            None => std::future::pending().await,
        }
        self.sleep = None;
    }
}

// ── Client loop ─────────────────────────────────────────────────────

/// Background loop multiplexing intents, snapshots, and the cleanup timer.
///
/// Exits when:
/// - The session closes (cleanup elapsed or manual exit)
/// - The command channel closes or shutdown is requested
/// - The transport returns `None` or an error
async fn transport_loop(
    mut transport: impl Transport,
    mut session: BuzzerSession,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
    event_tx: mpsc::Sender<ClientEvent>,
    state: Arc<ClientState>,
    mut shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) {
    debug!(room = %session.config().room_code, "client loop started");
    emit_event(&event_tx, ClientEvent::Connected).await;

    let mut cleanup = CleanupTimer::new();

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(Command::Publish(intent)) => {
                        match serde_json::to_string(&intent) {
                            Ok(json) => {
                                debug!(?intent, "publishing intent");
                                if let Err(e) = transport.send(json).await {
                                    error!("transport send error: {e}");
                                    emit_disconnected(
                                        &event_tx,
                                        &state,
                                        Some(format!("transport send error: {e}")),
                                    ).await;
                                    break;
                                }
                            }
                            Err(e) => {
                                error!("failed to serialize intent: {e}");
                            }
                        }
                    }
                    Some(Command::Exit) => {
                        cleanup.cancel();
                        if let Some(event) = session.exit() {
                            emit_session_event(&event_tx, &state, event, session.phase()).await;
                        }
                        let _ = transport.close().await;
                        emit_disconnected(&event_tx, &state, Some("session closed".into())).await;
                        break;
                    }
                    None => {
                        debug!("command channel closed, shutting down client loop");
                        let _ = transport.close().await;
                        emit_disconnected(&event_tx, &state, Some("client shut down".into())).await;
                        break;
                    }
                }
            }

            _ = &mut shutdown_rx => {
                debug!("shutdown signal received");
                let _ = transport.close().await;
                emit_disconnected(&event_tx, &state, Some("client shut down".into())).await;
                break;
            }

            () = cleanup.elapsed(), if cleanup.is_armed() => {
                if let Some(event) = session.cleanup_elapsed() {
                    emit_session_event(&event_tx, &state, event, session.phase()).await;
                }
                let _ = transport.close().await;
                emit_disconnected(&event_tx, &state, Some("session closed".into())).await;
                break;
            }

            incoming = transport.recv() => {
                match incoming {
                    Some(Ok(text)) => match ServerMessage::parse(&text) {
                        Ok(ServerMessage::GameState(snapshot)) => {
                            let outcome = session.ingest(&snapshot);
                            dispatch(&event_tx, &state, &session, &mut cleanup, outcome).await;
                        }
                        Ok(ServerMessage::ThreadReady) => {
                            if session.config().is_host {
                                info!(room = %session.config().room_code, "game room ready");
                                emit_event(&event_tx, ClientEvent::RoomReady {
                                    room_code: session.config().room_code.clone(),
                                }).await;
                            }
                        }
                        Ok(ServerMessage::Unknown { name }) => {
                            debug!(%name, "ignoring message");
                        }
                        Err(e) => {
                            warn!(raw = %text, "dropping inbound message: {e}");
                            emit_event(&event_tx, ClientEvent::SnapshotRejected {
                                reason: e.to_string(),
                            }).await;
                        }
                    },
                    Some(Err(e)) => {
                        error!("transport receive error: {e}");
                        emit_disconnected(
                            &event_tx,
                            &state,
                            Some(format!("transport receive error: {e}")),
                        ).await;
                        break;
                    }
                    None => {
                        debug!("transport closed by provider");
                        emit_disconnected(&event_tx, &state, None).await;
                        break;
                    }
                }
            }
        }
    }

    debug!("client loop exited");
}

/// Publish an ingest outcome: update shared state, forward events, and arm
/// the cleanup timer if requested.
async fn dispatch(
    event_tx: &mpsc::Sender<ClientEvent>,
    state: &ClientState,
    session: &BuzzerSession,
    cleanup: &mut CleanupTimer,
    outcome: IngestOutcome,
) {
    state
        .total_players
        .store(session.total_players(), Ordering::Release);
    *state.phase.lock().await = outcome.phase;

    for event in outcome.events {
        emit_event(
            event_tx,
            ClientEvent::Game {
                event,
                phase: outcome.phase,
            },
        )
        .await;
    }

    if let Some(delay) = outcome.cleanup_after {
        match cleanup.arm(delay) {
            Ok(()) => debug!(?delay, "cleanup scheduled"),
            Err(e) => debug!("cleanup not rescheduled: {e}"),
        }
    }
}

/// Forward a `session-closed` event and record the closed phase.
async fn emit_session_event(
    event_tx: &mpsc::Sender<ClientEvent>,
    state: &ClientState,
    event: SemanticEvent,
    phase: LifecyclePhase,
) {
    state.closed.store(true, Ordering::Release);
    *state.phase.lock().await = phase;
    // Must not be dropped: the renderer tears the page down on it.
    if event_tx
        .send(ClientEvent::Game { event, phase })
        .await
        .is_err()
    {
        debug!("event channel closed, receiver dropped");
    }
}

/// Emit an event. If the channel is full, log a warning and drop the event to
/// avoid blocking the loop.
async fn emit_event(event_tx: &mpsc::Sender<ClientEvent>, event: ClientEvent) {
    match event_tx.try_send(event) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(dropped)) => {
            warn!("event channel full, dropping event: {dropped:?}");
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            debug!("event channel closed, receiver dropped");
        }
    }
}

/// Emit the final [`Disconnected`](ClientEvent::Disconnected) event.
///
/// Uses `send().await` because it is always the last event on the channel
/// and must never be silently dropped.
async fn emit_disconnected(
    event_tx: &mpsc::Sender<ClientEvent>,
    state: &ClientState,
    reason: Option<String>,
) {
    state.connected.store(false, Ordering::Release);
    if event_tx
        .send(ClientEvent::Disconnected { reason })
        .await
        .is_err()
    {
        debug!("event channel closed, receiver dropped");
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    struct MockTransport {
        incoming: VecDeque<Option<std::result::Result<String, BuzzerError>>>,
        sent: Arc<StdMutex<Vec<String>>>,
        closed: Arc<AtomicBool>,
    }

    impl MockTransport {
        fn new(
            incoming: Vec<Option<std::result::Result<String, BuzzerError>>>,
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
        async fn send(&mut self, message: String) -> std::result::Result<(), BuzzerError> {
            self.sent.lock().unwrap().push(message);
            Ok(())
        }

        async fn recv(&mut self) -> Option<std::result::Result<String, BuzzerError>> {
            if let Some(item) = self.incoming.pop_front() {
                item
            } else {
                // Scripted messages exhausted: stay alive until shutdown.
                std::future::pending().await
            }
        }

        async fn close(&mut self) -> std::result::Result<(), BuzzerError> {
            self.closed.store(true, Ordering::Relaxed);
            Ok(())
        }
    }

    fn config() -> SessionConfig {
        SessionConfig::new("me", "ROOM", "Me")
    }

    #[tokio::test]
    async fn click_buzzer_publishes_own_client_id() {
        let (transport, sent, _closed) = MockTransport::new(vec![]);
        let (mut client, mut events) = BuzzerClient::start(transport, config());

        assert_eq!(events.recv().await.unwrap(), ClientEvent::Connected);
        client.click_buzzer().unwrap();
        while sent.lock().unwrap().is_empty() {
            tokio::task::yield_now().await;
        }
        client.shutdown().await;

        let messages = sent.lock().unwrap();
        let intent: ClientIntent = serde_json::from_str(&messages[0]).unwrap();
        assert_eq!(intent, ClientIntent::player_clicked("me"));
    }

    #[tokio::test]
    async fn transport_close_emits_disconnected() {
        let (transport, _sent, _closed) = MockTransport::new(vec![None]);
        let (client, mut events) = BuzzerClient::start(transport, config());

        assert_eq!(events.recv().await.unwrap(), ClientEvent::Connected);
        assert_eq!(
            events.recv().await.unwrap(),
            ClientEvent::Disconnected { reason: None }
        );
        assert!(events.recv().await.is_none());
        assert!(!client.is_connected());
        assert!(matches!(
            client.start_game(),
            Err(BuzzerError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn shutdown_closes_transport() {
        let (transport, _sent, closed) = MockTransport::new(vec![]);
        let (mut client, mut events) = BuzzerClient::start(transport, config());
        assert_eq!(events.recv().await.unwrap(), ClientEvent::Connected);

        client.shutdown().await;
        assert!(closed.load(Ordering::Relaxed));
        assert!(!client.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn cleanup_timer_is_single_shot() {
        let mut timer = CleanupTimer::new();
        timer.arm(Duration::from_secs(3)).unwrap();
        assert!(matches!(
            timer.arm(Duration::from_secs(3)),
            Err(BuzzerError::TimerConflict)
        ));

        timer.elapsed().await;
        assert!(!timer.is_armed());
    }

    #[test]
    fn idle_timer_stays_pending() {
        let mut timer = CleanupTimer::new();
        let mut elapsed = tokio_test::task::spawn(timer.elapsed());
        tokio_test::assert_pending!(elapsed.poll());
        tokio_test::assert_pending!(elapsed.poll());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_fires() {
        let mut timer = CleanupTimer::new();
        timer.arm(Duration::from_secs(3)).unwrap();
        timer.cancel();
        assert!(!timer.is_armed());

        let fired = tokio::time::timeout(Duration::from_secs(10), timer.elapsed()).await;
        assert!(fired.is_err());
    }
}
