//! Repository trait definitions and the PostgreSQL implementation.
//!
//! The traits exist for testability and dependency injection: the engine
//! takes `Arc<dyn RoundStore>` / `Arc<dyn WalletStore>`, production wires
//! in [`PgStore`], and tests wire in [`super::MemoryStore`].
//!
//! Expected tables (names follow the legacy schema): `gamerounds`,
//! `userbingocards` (unique on `(user_id, round_id)`, cells stored as a
//! JSON text column), `drawnnumbers` (one row per draw, keyed by round and
//! position), `wallets`, and `transactions` (unique `idempotency_key`).

use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use thiserror::Error;

use crate::claim::models::ClaimStatus;
use crate::game::card::{BallNumber, CardCells};
use crate::game::phase::RoundSchedule;
use crate::round::models::{Card, CardId, Money, NewRound, Round, RoundId, RoundSummary, UserId};
use crate::wallet::models::{NewTransaction, Wallet};

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A conditional write found the row already in its target state
    /// (duplicate card, card already finalized, ...).
    #[error("conflicting write: {0}")]
    Conflict(&'static str),

    /// A stored value failed to decode (corrupt cells JSON, unknown
    /// status text, out-of-range ball number).
    #[error("corrupt stored data: {0}")]
    Corrupt(String),
}

/// Outcome of a conditional wallet debit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebitOutcome {
    Completed { new_balance: Money },
    InsufficientFunds { available: Money },
    NoWallet,
    DuplicateKey,
}

/// Round, card, and drawn-number persistence.
#[async_trait]
pub trait RoundStore: Send + Sync {
    async fn insert_round(&self, round: &NewRound) -> Result<RoundId, StoreError>;

    async fn round(&self, round_id: RoundId) -> Result<Option<Round>, StoreError>;

    /// All rounds that have not completed, oldest first. Used to respawn
    /// actors on startup.
    async fn active_rounds(&self) -> Result<Vec<Round>, StoreError>;

    /// Active rounds with their participant counts, newest first.
    async fn round_summaries(&self) -> Result<Vec<RoundSummary>, StoreError>;

    /// Create the empty card a registration pays for. Fails with
    /// [`StoreError::Conflict`] if the user already holds a card for the
    /// round.
    async fn create_card(&self, round_id: RoundId, user_id: UserId) -> Result<CardId, StoreError>;

    async fn card_for_user(
        &self,
        round_id: RoundId,
        user_id: UserId,
    ) -> Result<Option<Card>, StoreError>;

    /// Populate a card's cells exactly once. Fails with
    /// [`StoreError::Conflict`] if the card was already finalized.
    async fn finalize_card(&self, card_id: CardId, cells: &CardCells) -> Result<(), StoreError>;

    async fn append_drawn(
        &self,
        round_id: RoundId,
        number: BallNumber,
        position: usize,
    ) -> Result<(), StoreError>;

    async fn drawn_numbers(&self, round_id: RoundId) -> Result<Vec<BallNumber>, StoreError>;

    /// Record a confirmed win: the round-level winner, the card-level
    /// winner flags, and the pending `win` transaction, all in one atomic
    /// write gated on the round not having a winner yet. Returns `false`
    /// without changing anything if some other claim got there first.
    async fn record_win(
        &self,
        round_id: RoundId,
        user_id: UserId,
        card_id: CardId,
        amount: Money,
    ) -> Result<bool, StoreError>;

    /// Mark a round completed without a winner (pool exhaustion).
    async fn complete_round(&self, round_id: RoundId) -> Result<(), StoreError>;

    /// User ids holding a card for the round, in registration order.
    async fn participants(&self, round_id: RoundId) -> Result<Vec<UserId>, StoreError>;
}

/// Wallet and transaction-ledger persistence.
#[async_trait]
pub trait WalletStore: Send + Sync {
    async fn wallet(&self, user_id: UserId) -> Result<Option<Wallet>, StoreError>;

    /// Create or overwrite a wallet balance (seeding, admin adjustment).
    async fn upsert_wallet(&self, user_id: UserId, balance: Money) -> Result<(), StoreError>;

    /// Conditionally debit a wallet and record the ledger row in the same
    /// atomic write. The debit only happens if the wallet exists, covers
    /// the amount, and the idempotency key is unused.
    async fn try_debit(
        &self,
        user_id: UserId,
        amount: Money,
        tx: &NewTransaction,
    ) -> Result<DebitOutcome, StoreError>;

    /// Credit a wallet and record the ledger row. Returns the new balance,
    /// or `None` if the wallet does not exist.
    async fn credit(
        &self,
        user_id: UserId,
        amount: Money,
        tx: &NewTransaction,
    ) -> Result<Option<Money>, StoreError>;

    /// Record a ledger row with no balance change (rejected claims).
    async fn insert_transaction(&self, tx: &NewTransaction) -> Result<(), StoreError>;
}

/// Everything the round engine needs from storage.
pub trait GameStore: RoundStore + WalletStore {}
impl<T: RoundStore + WalletStore + ?Sized> GameStore for T {}

/// PostgreSQL implementation of both stores.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn round_from_row(row: &PgRow) -> Result<Round, StoreError> {
    Ok(Round {
        id: row.get("round_id"),
        title: row.get("title"),
        schedule: RoundSchedule {
            registration_opens_at: row.get("registration_opens_at"),
            registration_closes_at: row.get("registration_closes_at"),
            plays_at: row.get("plays_at"),
        },
        ticket_price: row.get("ticket_price"),
        prize_amount: row.get("prize_amount"),
        is_active: row.get("is_active"),
        winner_user_id: row.get("winner_user_id"),
        created_at: row.get("created_at"),
    })
}

fn card_from_row(row: &PgRow) -> Result<Card, StoreError> {
    let cells: Option<String> = row.get("cells");
    let cells = cells
        .map(|json| {
            serde_json::from_str::<CardCells>(&json)
                .map_err(|e| StoreError::Corrupt(format!("card cells: {e}")))
        })
        .transpose()?;
    let claim_status: Option<String> = row.get("claim_status");
    let claim_status = claim_status
        .map(|status| status.parse::<ClaimStatus>().map_err(StoreError::Corrupt))
        .transpose()?;
    Ok(Card {
        id: row.get("card_id"),
        user_id: row.get("user_id"),
        round_id: row.get("round_id"),
        cells,
        is_winner: row.get("is_winner"),
        claim_status,
        win_amount: row.get("win_amount"),
        created_at: row.get("created_at"),
    })
}

const ROUND_COLUMNS: &str = "round_id, title, registration_opens_at, registration_closes_at, \
                             plays_at, ticket_price, prize_amount, is_active, winner_user_id, \
                             created_at";

#[async_trait]
impl RoundStore for PgStore {
    async fn insert_round(&self, round: &NewRound) -> Result<RoundId, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO gamerounds
                (title, registration_opens_at, registration_closes_at, plays_at,
                 ticket_price, prize_amount, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE)
            RETURNING round_id
            "#,
        )
        .bind(&round.title)
        .bind(round.schedule.registration_opens_at)
        .bind(round.schedule.registration_closes_at)
        .bind(round.schedule.plays_at)
        .bind(round.ticket_price)
        .bind(round.prize_amount)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("round_id"))
    }

    async fn round(&self, round_id: RoundId) -> Result<Option<Round>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ROUND_COLUMNS} FROM gamerounds WHERE round_id = $1"
        ))
        .bind(round_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(round_from_row).transpose()
    }

    async fn active_rounds(&self) -> Result<Vec<Round>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {ROUND_COLUMNS} FROM gamerounds WHERE is_active = TRUE ORDER BY round_id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(round_from_row).collect()
    }

    async fn round_summaries(&self) -> Result<Vec<RoundSummary>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT gr.round_id, gr.title, gr.registration_opens_at,
                   gr.registration_closes_at, gr.plays_at, gr.ticket_price,
                   gr.prize_amount, gr.is_active, gr.created_at,
                   COUNT(c.card_id) AS participant_count
            FROM gamerounds gr
            LEFT JOIN userbingocards c ON gr.round_id = c.round_id
            WHERE gr.is_active = TRUE
            GROUP BY gr.round_id
            ORDER BY gr.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| RoundSummary {
                id: row.get("round_id"),
                title: row.get("title"),
                schedule: RoundSchedule {
                    registration_opens_at: row.get("registration_opens_at"),
                    registration_closes_at: row.get("registration_closes_at"),
                    plays_at: row.get("plays_at"),
                },
                ticket_price: row.get("ticket_price"),
                prize_amount: row.get("prize_amount"),
                is_active: row.get("is_active"),
                participant_count: row.get("participant_count"),
                created_at: row.get("created_at"),
            })
            .collect())
    }

    async fn create_card(&self, round_id: RoundId, user_id: UserId) -> Result<CardId, StoreError> {
        let result = sqlx::query(
            "INSERT INTO userbingocards (user_id, round_id) VALUES ($1, $2) RETURNING card_id",
        )
        .bind(user_id)
        .bind(round_id)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(row.get("card_id")),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StoreError::Conflict("card already exists for this round"))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn card_for_user(
        &self,
        round_id: RoundId,
        user_id: UserId,
    ) -> Result<Option<Card>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT card_id, user_id, round_id, cells, is_winner, claim_status,
                   win_amount, created_at
            FROM userbingocards
            WHERE round_id = $1 AND user_id = $2
            "#,
        )
        .bind(round_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(card_from_row).transpose()
    }

    async fn finalize_card(&self, card_id: CardId, cells: &CardCells) -> Result<(), StoreError> {
        let json = serde_json::to_string(cells)
            .map_err(|e| StoreError::Corrupt(format!("card cells: {e}")))?;

        let updated = sqlx::query(
            "UPDATE userbingocards SET cells = $2 WHERE card_id = $1 AND cells IS NULL",
        )
        .bind(card_id)
        .bind(json)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(StoreError::Conflict("card already finalized"));
        }
        Ok(())
    }

    async fn append_drawn(
        &self,
        round_id: RoundId,
        number: BallNumber,
        position: usize,
    ) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO drawnnumbers (round_id, position, number) VALUES ($1, $2, $3)")
            .bind(round_id)
            .bind(position as i32)
            .bind(i16::from(number.get()))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn drawn_numbers(&self, round_id: RoundId) -> Result<Vec<BallNumber>, StoreError> {
        let rows = sqlx::query(
            "SELECT number FROM drawnnumbers WHERE round_id = $1 ORDER BY position ASC",
        )
        .bind(round_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let value: i16 = row.get("number");
                BallNumber::new(value as u8)
                    .map_err(|e| StoreError::Corrupt(format!("drawn number: {e}")))
            })
            .collect()
    }

    async fn record_win(
        &self,
        round_id: RoundId,
        user_id: UserId,
        card_id: CardId,
        amount: Money,
    ) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        // The conditional round-level write is the single gate; the
        // card-level flags and the payout row commit with it or not at all.
        let claimed = sqlx::query(
            r#"
            UPDATE gamerounds
            SET winner_user_id = $2, is_active = FALSE
            WHERE round_id = $1 AND winner_user_id IS NULL AND is_active = TRUE
            "#,
        )
        .bind(round_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if claimed == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            r#"
            UPDATE userbingocards
            SET is_winner = TRUE, claim_status = 'pending', win_amount = $2
            WHERE card_id = $1
            "#,
        )
        .bind(card_id)
        .bind(amount)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO transactions
                (user_id, round_id, transaction_type, amount, status, idempotency_key)
            VALUES ($1, $2, 'win', $3, 'pending', $4)
            "#,
        )
        .bind(user_id)
        .bind(round_id)
        .bind(amount)
        .bind(format!("win_{round_id}_{card_id}"))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn complete_round(&self, round_id: RoundId) -> Result<(), StoreError> {
        sqlx::query("UPDATE gamerounds SET is_active = FALSE WHERE round_id = $1")
            .bind(round_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn participants(&self, round_id: RoundId) -> Result<Vec<UserId>, StoreError> {
        let rows = sqlx::query(
            "SELECT user_id FROM userbingocards WHERE round_id = $1 ORDER BY card_id ASC",
        )
        .bind(round_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|row| row.get("user_id")).collect())
    }
}

#[async_trait]
impl WalletStore for PgStore {
    async fn wallet(&self, user_id: UserId) -> Result<Option<Wallet>, StoreError> {
        let row = sqlx::query("SELECT user_id, balance, updated_at FROM wallets WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| Wallet {
            user_id: row.get("user_id"),
            balance: row.get("balance"),
            updated_at: row.get("updated_at"),
        }))
    }

    async fn upsert_wallet(&self, user_id: UserId, balance: Money) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO wallets (user_id, balance, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (user_id) DO UPDATE SET balance = $2, updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(balance)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn try_debit(
        &self,
        user_id: UserId,
        amount: Money,
        tx: &NewTransaction,
    ) -> Result<DebitOutcome, StoreError> {
        let mut db_tx = self.pool.begin().await?;

        let duplicate =
            sqlx::query("SELECT transaction_id FROM transactions WHERE idempotency_key = $1")
                .bind(&tx.idempotency_key)
                .fetch_optional(&mut *db_tx)
                .await?;
        if duplicate.is_some() {
            db_tx.rollback().await?;
            return Ok(DebitOutcome::DuplicateKey);
        }

        let debited = sqlx::query(
            r#"
            UPDATE wallets
            SET balance = balance - $2, updated_at = NOW()
            WHERE user_id = $1 AND balance >= $2
            RETURNING balance
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .fetch_optional(&mut *db_tx)
        .await?;

        let new_balance = match debited {
            Some(row) => row.get("balance"),
            None => {
                let existing = sqlx::query("SELECT balance FROM wallets WHERE user_id = $1")
                    .bind(user_id)
                    .fetch_optional(&mut *db_tx)
                    .await?;
                db_tx.rollback().await?;
                return Ok(match existing {
                    Some(row) => DebitOutcome::InsufficientFunds {
                        available: row.get("balance"),
                    },
                    None => DebitOutcome::NoWallet,
                });
            }
        };

        insert_transaction_row(&mut db_tx, tx).await?;
        db_tx.commit().await?;
        Ok(DebitOutcome::Completed { new_balance })
    }

    async fn credit(
        &self,
        user_id: UserId,
        amount: Money,
        tx: &NewTransaction,
    ) -> Result<Option<Money>, StoreError> {
        let mut db_tx = self.pool.begin().await?;

        let credited = sqlx::query(
            r#"
            UPDATE wallets
            SET balance = balance + $2, updated_at = NOW()
            WHERE user_id = $1
            RETURNING balance
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .fetch_optional(&mut *db_tx)
        .await?;

        let Some(row) = credited else {
            db_tx.rollback().await?;
            return Ok(None);
        };
        let new_balance = row.get("balance");

        insert_transaction_row(&mut db_tx, tx).await?;
        db_tx.commit().await?;
        Ok(Some(new_balance))
    }

    async fn insert_transaction(&self, tx: &NewTransaction) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO transactions
                (user_id, round_id, transaction_type, amount, status, idempotency_key)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(tx.user_id)
        .bind(tx.round_id)
        .bind(tx.tx_type.to_string())
        .bind(tx.amount)
        .bind(tx.status.to_string())
        .bind(&tx.idempotency_key)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

async fn insert_transaction_row(
    db_tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    tx: &NewTransaction,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO transactions
            (user_id, round_id, transaction_type, amount, status, idempotency_key)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(tx.user_id)
    .bind(tx.round_id)
    .bind(tx.tx_type.to_string())
    .bind(tx.amount)
    .bind(tx.status.to_string())
    .bind(&tx.idempotency_key)
    .execute(&mut **db_tx)
    .await?;
    Ok(())
}
