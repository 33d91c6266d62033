//! Integration tests for the win-verification engine.
//!
//! Rounds are seeded directly through the store (schedule already past
//! play time, drawn sequence pre-filled) and then resumed through the
//! manager, so claims are evaluated against a known draw state. The draw
//! interval is set to an hour so the tick never interferes mid-test.

use chrono::{Duration, Utc};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use bingo_hall::claim::{ClaimError, ClaimStatus};
use bingo_hall::db::{MemoryStore, RoundStore};
use bingo_hall::game::card::BallNumber;
use bingo_hall::game::constants::FREE_CELL_INDEX;
use bingo_hall::round::{CardId, NewRound, RoundId, RoundManager, RoundTiming, UserId};
use bingo_hall::wallet::{TxStatus, TxType, WalletManager};
use bingo_hall::{CardCells, RoundSchedule};

const PRIZE: i64 = 5_000;

fn setup() -> (Arc<MemoryStore>, Arc<RoundManager>) {
    let store = Arc::new(MemoryStore::new());
    let wallets = Arc::new(WalletManager::new(store.clone()));
    let timing = RoundTiming {
        draw_interval: StdDuration::from_secs(3_600),
        setup_window: Duration::seconds(120),
    };
    let manager = Arc::new(RoundManager::new(store.clone(), wallets, timing));
    (store, manager)
}

fn ball(value: u8) -> BallNumber {
    BallNumber::new(value).unwrap()
}

/// Card whose first row holds `row` and whose remaining cells are filled
/// from `filler_start` upwards.
fn card_cells(row: [u8; 5], filler_start: u8) -> CardCells {
    let mut filler = filler_start..;
    let raw: Vec<String> = (0..25)
        .map(|index| {
            if index == FREE_CELL_INDEX {
                "FREE".to_string()
            } else if index < 5 {
                format!("{:02}", row[index])
            } else {
                format!("{:02}", filler.next().unwrap())
            }
        })
        .collect();
    CardCells::normalized(&raw).unwrap()
}

/// Insert a round already in its drawing phase with the given numbers
/// drawn. Returns its id; the caller resumes it via the manager.
async fn seed_drawing_round(store: &MemoryStore, drawn: &[u8]) -> RoundId {
    let now = Utc::now();
    let round_id = store
        .insert_round(&NewRound {
            title: "Seeded".to_string(),
            schedule: RoundSchedule {
                registration_opens_at: now - Duration::hours(3),
                registration_closes_at: now - Duration::hours(2),
                plays_at: now - Duration::minutes(1),
            },
            ticket_price: 100,
            prize_amount: PRIZE,
        })
        .await
        .unwrap();
    for (position, value) in drawn.iter().enumerate() {
        store
            .append_drawn(round_id, ball(*value), position)
            .await
            .unwrap();
    }
    round_id
}

async fn seed_card(
    store: &MemoryStore,
    round_id: RoundId,
    user_id: UserId,
    cells: &CardCells,
) -> CardId {
    let card_id = store.create_card(round_id, user_id).await.unwrap();
    store.finalize_card(card_id, cells).await.unwrap();
    card_id
}

#[tokio::test]
async fn winning_row_is_accepted_and_recorded_once() {
    let (store, manager) = setup();
    let round_id = seed_drawing_round(&store, &[1, 2, 3, 4, 5]).await;
    let card_id = seed_card(&store, round_id, 11, &card_cells([1, 2, 3, 4, 5], 40)).await;
    manager.load_active_rounds().await.unwrap();

    let receipt = manager.submit_claim(round_id, 11).await.unwrap();
    assert_eq!(receipt.award, PRIZE);
    assert_eq!(receipt.card_id, card_id);
    assert_eq!(receipt.status, ClaimStatus::Pending);

    // Card, round, and payout ledger were all updated atomically.
    let card = store.card_for_user(round_id, 11).await.unwrap().unwrap();
    assert!(card.is_winner);
    assert_eq!(card.claim_status, Some(ClaimStatus::Pending));
    assert_eq!(card.win_amount, PRIZE);

    let round = store.round(round_id).await.unwrap().unwrap();
    assert_eq!(round.winner_user_id, Some(11));
    assert!(!round.is_active);

    let wins: Vec<_> = store
        .transactions()
        .await
        .into_iter()
        .filter(|tx| tx.tx_type == TxType::Win && tx.status == TxStatus::Pending)
        .collect();
    assert_eq!(wins.len(), 1);
    assert_eq!(wins[0].amount, PRIZE);
    assert_eq!(wins[0].user_id, 11);

    // A repeat claim from the winner is a conflict, not a second payout.
    let err = manager.submit_claim(round_id, 11).await.unwrap_err();
    assert!(matches!(err, ClaimError::RoundAlreadyWon));
}

#[tokio::test]
async fn four_of_five_is_rejected_and_logged() {
    let (store, manager) = setup();
    let round_id = seed_drawing_round(&store, &[1, 2, 3, 4]).await;
    seed_card(&store, round_id, 11, &card_cells([1, 2, 3, 4, 5], 40)).await;
    manager.load_active_rounds().await.unwrap();

    let err = manager.submit_claim(round_id, 11).await.unwrap_err();
    assert!(matches!(err, ClaimError::NotAWinningCard));

    // The rejection left a durable record and no winner.
    let rejections: Vec<_> = store
        .transactions()
        .await
        .into_iter()
        .filter(|tx| tx.tx_type == TxType::Win && tx.status == TxStatus::Rejected)
        .collect();
    assert_eq!(rejections.len(), 1);
    assert_eq!(rejections[0].amount, 0);

    let round = store.round(round_id).await.unwrap().unwrap();
    assert_eq!(round.winner_user_id, None);
    assert!(round.is_active);

    // Rejection does not consume the card: its claim state is untouched,
    // so the user may claim again once more numbers are drawn.
    let card = store.card_for_user(round_id, 11).await.unwrap().unwrap();
    assert!(!card.is_winner);
    assert_eq!(card.claim_status, None);
}

#[tokio::test]
async fn claim_preconditions_are_checked() {
    let (store, manager) = setup();

    // Unknown round.
    manager.load_active_rounds().await.unwrap();
    let err = manager.submit_claim(404, 1).await.unwrap_err();
    assert!(matches!(err, ClaimError::RoundNotFound));

    // Round exists but has no card for the claimant.
    let round_id = seed_drawing_round(&store, &[1, 2, 3, 4, 5]).await;
    manager.load_active_rounds().await.unwrap();
    let err = manager.submit_claim(round_id, 1).await.unwrap_err();
    assert!(matches!(err, ClaimError::NoCardFound));

    // A card that was never finalized has nothing to match.
    store.create_card(round_id, 2).await.unwrap();
    let err = manager.submit_claim(round_id, 2).await.unwrap_err();
    assert!(matches!(err, ClaimError::NotAWinningCard));
}

#[tokio::test]
async fn claims_outside_the_drawing_phase_are_state_errors() {
    let (store, manager) = setup();
    let now = Utc::now();
    let round_id = store
        .insert_round(&NewRound {
            title: "Lobby".to_string(),
            schedule: RoundSchedule {
                registration_opens_at: now - Duration::hours(1),
                registration_closes_at: now - Duration::seconds(10),
                plays_at: now + Duration::minutes(10),
            },
            ticket_price: 100,
            prize_amount: PRIZE,
        })
        .await
        .unwrap();
    seed_card(&store, round_id, 11, &card_cells([1, 2, 3, 4, 5], 40)).await;
    manager.load_active_rounds().await.unwrap();

    let err = manager.submit_claim(round_id, 11).await.unwrap_err();
    assert!(matches!(err, ClaimError::RoundNotDrawing));
}

#[tokio::test]
async fn exactly_one_winner_under_concurrent_claims() {
    let (store, manager) = setup();
    let round_id = seed_drawing_round(&store, &[1, 2, 3, 4, 5]).await;

    // Three structurally winning cards, three losing ones.
    let eligible: Vec<UserId> = vec![21, 22, 23];
    let ineligible: Vec<UserId> = vec![31, 32, 33];
    for (offset, user_id) in eligible.iter().enumerate() {
        let cells = card_cells([1, 2, 3, 4, 5], 40 + offset as u8 * 20);
        seed_card(&store, round_id, *user_id, &cells).await;
    }
    for user_id in &ineligible {
        seed_card(&store, round_id, *user_id, &card_cells([90, 91, 92, 93, 94], 10)).await;
    }
    manager.load_active_rounds().await.unwrap();

    let mut handles = Vec::new();
    for user_id in eligible.iter().chain(&ineligible) {
        let manager = manager.clone();
        let user_id = *user_id;
        handles.push(tokio::spawn(async move {
            (user_id, manager.submit_claim(round_id, user_id).await)
        }));
    }

    let mut accepted = Vec::new();
    for handle in handles {
        let (user_id, result) = handle.await.unwrap();
        match result {
            Ok(receipt) => {
                assert_eq!(receipt.award, PRIZE);
                accepted.push(user_id);
            }
            Err(ClaimError::RoundAlreadyWon) | Err(ClaimError::NotAWinningCard) => {}
            Err(other) => panic!("unexpected claim error: {other}"),
        }
    }

    // Exactly one acceptance, and it is one of the eligible cards.
    assert_eq!(accepted.len(), 1);
    assert!(eligible.contains(&accepted[0]));

    let round = store.round(round_id).await.unwrap().unwrap();
    assert_eq!(round.winner_user_id, Some(accepted[0]));

    let wins: Vec<_> = store
        .transactions()
        .await
        .into_iter()
        .filter(|tx| tx.tx_type == TxType::Win && tx.status == TxStatus::Pending)
        .collect();
    assert_eq!(wins.len(), 1);

    // An ineligible card can never be the recorded winner.
    assert!(!ineligible.contains(&accepted[0]));
}
