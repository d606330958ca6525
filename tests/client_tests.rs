#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
//! Integration-style tests for [`BuzzerClient`].
//!
//! Uses the scripted `MockTransport` from `tests/common` to feed envelopes
//! and verify event delivery, intent publishing, and the cleanup timer.

mod common;

use std::time::Duration;

use buzzer_client::protocol::ClientIntent;
use buzzer_client::{
    BuzzerClient, BuzzerError, ClientEvent, CloseReason, LifecyclePhase, SemanticEvent,
    SessionConfig,
};
use tokio::sync::mpsc::Receiver;

use common::{
    clicked, game_state_json, gone, present, snapshot, thread_ready_json, MockTransport,
};

// ════════════════════════════════════════════════════════════════════
// Helpers
// ════════════════════════════════════════════════════════════════════

#[allow(clippy::type_complexity)]
fn start_client(
    config: SessionConfig,
    incoming: Vec<Option<Result<String, BuzzerError>>>,
) -> (
    BuzzerClient,
    Receiver<ClientEvent>,
    std::sync::Arc<std::sync::Mutex<Vec<String>>>,
    std::sync::Arc<std::sync::atomic::AtomicBool>,
) {
    let (transport, sent, closed) = MockTransport::new(incoming);
    let (client, events) = BuzzerClient::start(transport, config);
    (client, events, sent, closed)
}

fn config() -> SessionConfig {
    SessionConfig::new("me", "ROOM42", "Me")
}

fn scripted(snapshots: &[buzzer_client::Snapshot]) -> Vec<Option<Result<String, BuzzerError>>> {
    snapshots
        .iter()
        .map(|snap| Some(Ok(game_state_json(snap))))
        .collect()
}

/// Receive the next game event, skipping nothing.
async fn next_game_event(events: &mut Receiver<ClientEvent>) -> (SemanticEvent, LifecyclePhase) {
    match events.recv().await.expect("event") {
        ClientEvent::Game { event, phase } => (event, phase),
        other => panic!("expected Game event, got {other:?}"),
    }
}

async fn expect_connected(events: &mut Receiver<ClientEvent>) {
    let ev = events.recv().await.expect("expected Connected event");
    assert_eq!(ev, ClientEvent::Connected);
}

// ════════════════════════════════════════════════════════════════════
// Snapshot flow
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn full_game_ends_with_session_closed_after_delay() {
    let (client, mut events, _sent, closed) = start_client(
        config(),
        scripted(&[
            snapshot(false, false, 1, &[("p1", present("Al"))]),
            snapshot(true, false, 1, &[("p1", clicked("Al"))]),
            snapshot(true, false, 2, &[("p1", gone("Al"))]),
            snapshot(false, true, 2, &[]),
        ]),
    );
    let started = tokio::time::Instant::now();

    expect_connected(&mut events).await;
    let expected = [
        (
            SemanticEvent::Joined {
                player_id: "p1".into(),
                nickname: "Al".into(),
            },
            LifecyclePhase::Idle,
        ),
        (SemanticEvent::GameStarted, LifecyclePhase::Active),
        (
            SemanticEvent::Clicked {
                player_id: "p1".into(),
                nickname: "Al".into(),
            },
            LifecyclePhase::Active,
        ),
        (SemanticEvent::RoundReset { round: 2 }, LifecyclePhase::Active),
        (
            SemanticEvent::Left {
                player_id: "p1".into(),
                nickname: "Al".into(),
            },
            LifecyclePhase::Active,
        ),
        (SemanticEvent::GameEnded, LifecyclePhase::Ending),
    ];
    for want in expected {
        assert_eq!(next_game_event(&mut events).await, want);
    }

    let (event, phase) = next_game_event(&mut events).await;
    assert_eq!(
        event,
        SemanticEvent::SessionClosed {
            reason: CloseReason::CleanupElapsed
        }
    );
    assert_eq!(phase, LifecyclePhase::Closed);
    assert!(started.elapsed() >= Duration::from_secs(3));

    assert_eq!(
        events.recv().await.unwrap(),
        ClientEvent::Disconnected {
            reason: Some("session closed".into())
        }
    );
    assert!(events.recv().await.is_none());
    assert!(closed.load(std::sync::atomic::Ordering::Relaxed));
    assert!(client.is_session_closed());
    assert!(matches!(client.click_buzzer(), Err(BuzzerError::SessionClosed)));
}

#[tokio::test(start_paused = true)]
async fn repeated_game_over_schedules_one_cleanup() {
    let (_client, mut events, _sent, _closed) = start_client(
        config(),
        scripted(&[
            snapshot(true, false, 1, &[]),
            snapshot(false, true, 1, &[]),
            snapshot(false, true, 1, &[]),
            snapshot(false, true, 1, &[]),
        ]),
    );

    expect_connected(&mut events).await;
    assert_eq!(next_game_event(&mut events).await.0, SemanticEvent::GameStarted);
    assert_eq!(next_game_event(&mut events).await.0, SemanticEvent::GameEnded);
    assert!(matches!(
        next_game_event(&mut events).await.0,
        SemanticEvent::SessionClosed { .. }
    ));
    assert!(matches!(
        events.recv().await.unwrap(),
        ClientEvent::Disconnected { .. }
    ));
    assert!(events.recv().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn exit_before_cleanup_suppresses_timer() {
    let (client, mut events, _sent, closed) = start_client(
        config(),
        scripted(&[snapshot(true, false, 1, &[]), snapshot(false, true, 1, &[])]),
    );
    let started = tokio::time::Instant::now();

    expect_connected(&mut events).await;
    assert_eq!(next_game_event(&mut events).await.0, SemanticEvent::GameStarted);
    assert_eq!(next_game_event(&mut events).await.0, SemanticEvent::GameEnded);

    client.exit().unwrap();
    assert_eq!(
        next_game_event(&mut events).await.0,
        SemanticEvent::SessionClosed {
            reason: CloseReason::ManualExit
        }
    );
    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(matches!(
        events.recv().await.unwrap(),
        ClientEvent::Disconnected { .. }
    ));
    assert!(events.recv().await.is_none());
    assert!(closed.load(std::sync::atomic::Ordering::Relaxed));
}

#[tokio::test]
async fn malformed_snapshot_is_reported_and_skipped() {
    let (client, mut events, _sent, _closed) = start_client(
        config(),
        vec![
            Some(Ok(r#"{"name":"game-state","data":{"isGameOn":true}}"#.to_string())),
            Some(Ok(game_state_json(&snapshot(
                false,
                false,
                1,
                &[("p1", present("Al")), ("p2", present("Bo"))],
            )))),
        ],
    );

    expect_connected(&mut events).await;
    let ev = events.recv().await.unwrap();
    assert!(
        matches!(ev, ClientEvent::SnapshotRejected { .. }),
        "expected SnapshotRejected, got {ev:?}"
    );
    assert!(matches!(
        next_game_event(&mut events).await.0,
        SemanticEvent::Joined { .. }
    ));
    assert!(matches!(
        next_game_event(&mut events).await.0,
        SemanticEvent::Joined { .. }
    ));
    assert_eq!(client.current_phase().await, LifecyclePhase::Idle);
    assert_eq!(client.total_players(), 2);
}

#[tokio::test]
async fn thread_ready_is_forwarded_to_hosts_only() {
    let (mut host, mut host_events, _, _) =
        start_client(config().with_host(true), vec![Some(Ok(thread_ready_json()))]);
    expect_connected(&mut host_events).await;
    assert_eq!(
        host_events.recv().await.unwrap(),
        ClientEvent::RoomReady {
            room_code: "ROOM42".into()
        }
    );
    host.shutdown().await;

    let (mut player, mut player_events, _, _) = start_client(
        config(),
        vec![Some(Ok(thread_ready_json())), None],
    );
    expect_connected(&mut player_events).await;
    assert_eq!(
        player_events.recv().await.unwrap(),
        ClientEvent::Disconnected { reason: None }
    );
    player.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Intents
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn intents_are_published_in_order() {
    let (mut client, mut events, sent, _closed) = start_client(config(), vec![]);
    expect_connected(&mut events).await;

    client.start_game().unwrap();
    client.click_buzzer().unwrap();
    client.reset_buzzer().unwrap();
    client.end_game().unwrap();

    while sent.lock().unwrap().len() < 4 {
        tokio::task::yield_now().await;
    }
    client.shutdown().await;

    let published: Vec<ClientIntent> = sent
        .lock()
        .unwrap()
        .iter()
        .map(|text| serde_json::from_str(text).unwrap())
        .collect();
    assert_eq!(
        published,
        vec![
            ClientIntent::start_game(),
            ClientIntent::player_clicked("me"),
            ClientIntent::reset_buzzer(),
            ClientIntent::end_game(),
        ]
    );
}

#[tokio::test]
async fn intents_do_not_touch_the_session() {
    let (mut client, mut events, sent, _closed) = start_client(config(), vec![]);
    expect_connected(&mut events).await;

    client.start_game().unwrap();
    while sent.lock().unwrap().is_empty() {
        tokio::task::yield_now().await;
    }
    assert_eq!(client.current_phase().await, LifecyclePhase::Idle);
    assert!(events.try_recv().is_err());
    client.shutdown().await;
}

#[tokio::test]
async fn transport_error_disconnects() {
    let (client, mut events, _sent, _closed) = start_client(
        config(),
        vec![Some(Err(BuzzerError::TransportReceive("reset by peer".into())))],
    );
    expect_connected(&mut events).await;
    let ev = events.recv().await.unwrap();
    if let ClientEvent::Disconnected { reason } = ev {
        assert!(reason.unwrap().contains("reset by peer"));
    } else {
        panic!("expected Disconnected, got {ev:?}");
    }
    assert!(!client.is_connected());
}

#[tokio::test]
async fn channel_names_follow_config() {
    let (mut client, _events, _sent, _closed) = start_client(config(), vec![]);
    assert_eq!(client.channel_names().game_room, "ROOM42:primary");
    assert_eq!(client.channel_names().publish, "ROOM42:player-ch-me");
    client.shutdown().await;
}
