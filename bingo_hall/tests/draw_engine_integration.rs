//! Integration tests for the draw engine and session broadcasts, run with
//! a millisecond draw interval so full games finish quickly.

use chrono::{Duration, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use uuid::Uuid;

use bingo_hall::db::{MemoryStore, RoundStore};
use bingo_hall::game::card::BallNumber;
use bingo_hall::game::constants::{NUMBER_POOL_SIZE, SESSION_EVENT_BUFFER};
use bingo_hall::round::{NewRound, RoundEvent, RoundId, RoundManager, RoundTiming};
use bingo_hall::wallet::WalletManager;
use bingo_hall::{RoundPhase, RoundSchedule};

const RECV_TIMEOUT: StdDuration = StdDuration::from_secs(30);

fn setup() -> (Arc<MemoryStore>, Arc<RoundManager>) {
    let store = Arc::new(MemoryStore::new());
    let wallets = Arc::new(WalletManager::new(store.clone()));
    let timing = RoundTiming {
        draw_interval: StdDuration::from_millis(5),
        setup_window: Duration::seconds(120),
    };
    let manager = Arc::new(RoundManager::new(store.clone(), wallets, timing));
    (store, manager)
}

async fn seed_drawing_round(store: &MemoryStore) -> RoundId {
    let now = Utc::now();
    store
        .insert_round(&NewRound {
            title: "Live".to_string(),
            schedule: RoundSchedule {
                registration_opens_at: now - Duration::hours(2),
                registration_closes_at: now - Duration::hours(1),
                plays_at: now - Duration::seconds(1),
            },
            ticket_price: 0,
            prize_amount: 1_000,
        })
        .await
        .unwrap()
}

async fn recv(rx: &mut mpsc::Receiver<RoundEvent>) -> RoundEvent {
    timeout(RECV_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for round event")
        .expect("event channel closed early")
}

/// Drain the event stream until the terminal event, checking that each
/// broadcast extends the previous sequence by exactly its own number.
async fn collect_full_game(
    rx: &mut mpsc::Receiver<RoundEvent>,
    mut seen: Vec<BallNumber>,
) -> (Vec<BallNumber>, Option<i64>) {
    loop {
        match recv(rx).await {
            RoundEvent::NumberDrawn { number, drawn } => {
                assert_eq!(drawn.len(), seen.len() + 1, "draws must arrive in order");
                assert_eq!(drawn[..seen.len()], seen[..], "history must be append-only");
                assert_eq!(*drawn.last().unwrap(), number);
                assert!(!seen.contains(&number), "duplicate draw {number}");
                seen = drawn;
            }
            RoundEvent::RoundEnded { winner_user_id, .. } => {
                return (seen, winner_user_id);
            }
        }
    }
}

#[tokio::test]
async fn draw_loop_exhausts_the_pool_without_repeats() {
    let (store, manager) = setup();
    let round_id = seed_drawing_round(&store).await;
    manager.load_active_rounds().await.unwrap();
    let handle = manager.round_handle(round_id).await.unwrap();

    let (tx, mut rx) = mpsc::channel(SESSION_EVENT_BUFFER);
    let snapshot = handle.join(Uuid::new_v4(), tx).await.unwrap();
    assert!(snapshot.is_drawing);
    assert!(snapshot.drawn.is_empty());

    let (drawn, winner) = collect_full_game(&mut rx, snapshot.drawn).await;
    assert_eq!(drawn.len(), NUMBER_POOL_SIZE);
    let distinct: HashSet<&BallNumber> = drawn.iter().collect();
    assert_eq!(distinct.len(), NUMBER_POOL_SIZE);
    assert_eq!(winner, None);

    // The persisted sequence matches what subscribers saw, and the round
    // completed without a winner.
    assert_eq!(store.drawn_numbers(round_id).await.unwrap(), drawn);
    let round = store.round(round_id).await.unwrap().unwrap();
    assert!(!round.is_active);
    assert_eq!(round.winner_user_id, None);

    let end = handle.snapshot().await.unwrap();
    assert_eq!(end.phase, RoundPhase::Completed);
    assert!(!end.is_drawing);
    assert_eq!(end.drawn, drawn);
}

#[tokio::test]
async fn late_joiners_get_a_prefix_consistent_snapshot() {
    let (store, manager) = setup();
    let round_id = seed_drawing_round(&store).await;
    manager.load_active_rounds().await.unwrap();
    let handle = manager.round_handle(round_id).await.unwrap();

    let (early_tx, mut early_rx) = mpsc::channel(SESSION_EVENT_BUFFER);
    handle.join(Uuid::new_v4(), early_tx).await.unwrap();

    // Let some draws happen before the second session connects.
    tokio::time::sleep(StdDuration::from_millis(60)).await;

    let (late_tx, mut late_rx) = mpsc::channel(SESSION_EVENT_BUFFER);
    let late_snapshot = handle.join(Uuid::new_v4(), late_tx).await.unwrap();

    // The late joiner's first event extends its snapshot by one number.
    match recv(&mut late_rx).await {
        RoundEvent::NumberDrawn { drawn, .. } => {
            assert_eq!(drawn.len(), late_snapshot.drawn.len() + 1);
            assert_eq!(drawn[..late_snapshot.drawn.len()], late_snapshot.drawn[..]);
        }
        other => panic!("expected a draw event, got {other:?}"),
    }

    // The early session's full view agrees with the snapshot prefix.
    let (drawn, _) = collect_full_game(&mut early_rx, Vec::new()).await;
    assert_eq!(drawn[..late_snapshot.drawn.len()], late_snapshot.drawn[..]);
}

#[tokio::test]
async fn resumed_round_continues_the_sequence() {
    let (store, manager) = setup();
    let round_id = seed_drawing_round(&store).await;

    // 97 numbers were drawn before the restart.
    for (position, value) in (1..=97u8).enumerate() {
        store
            .append_drawn(round_id, BallNumber::new(value).unwrap(), position)
            .await
            .unwrap();
    }

    manager.load_active_rounds().await.unwrap();
    assert_eq!(manager.live_round_count().await, 1);
    // A second load must not spawn a second draw loop for the round.
    manager.load_active_rounds().await.unwrap();
    assert_eq!(manager.live_round_count().await, 1);

    let handle = manager.round_handle(round_id).await.unwrap();
    let (tx, mut rx) = mpsc::channel(SESSION_EVENT_BUFFER);
    let snapshot = handle.join(Uuid::new_v4(), tx).await.unwrap();
    assert_eq!(snapshot.drawn.len(), 97);

    let (drawn, winner) = collect_full_game(&mut rx, snapshot.drawn).await;
    assert_eq!(drawn.len(), NUMBER_POOL_SIZE);
    assert_eq!(winner, None);

    // Only the two missing numbers were drawn after the resume.
    let distinct: HashSet<&BallNumber> = drawn.iter().collect();
    assert_eq!(distinct.len(), NUMBER_POOL_SIZE);
    let tail: Vec<u8> = drawn[97..].iter().map(|n| n.get()).collect();
    for value in &tail {
        assert!(*value == 98 || *value == 99, "unexpected resumed draw {value}");
    }
}
