//! # Bingo Hall
//!
//! A real-time bingo round engine built around per-round actor tasks.
//!
//! The library runs timed bingo rounds end-to-end: users register during a
//! round's registration window, fill in a 25-cell card during the lobby
//! window, and then watch numbers get drawn live until someone's card
//! completes a line and their claim is verified.
//!
//! ## Architecture
//!
//! Every live round is owned by a single [`round::RoundActor`] task. The
//! actor's inbox is the serialization point for everything that mutates
//! round state:
//!
//! - the draw tick appends one number at a fixed cadence while the round is
//!   in its drawing phase,
//! - claim submissions run their full check-then-record sequence without
//!   interleaving, so at most one claim per round can ever be accepted,
//! - session join/leave and broadcasts go through the actor's
//!   [`round::SessionRegistry`].
//!
//! Round lifecycle (`Registration` → `LobbyWait` → `Drawing` → `Completed`)
//! is never stored as a mutable field; it is derived from the round's
//! timestamps on every query ([`game::RoundPhase::derive`]), so all
//! observers agree on the current phase without a timer owning it.
//!
//! ## Core Modules
//!
//! - [`game`]: card cells, generation/validation, winning lines, phase
//!   derivation
//! - [`round`]: round actor, draw engine, session registry, round manager
//! - [`claim`]: win-verification protocol types and errors
//! - [`wallet`]: balances and the ticket/win transaction ledger
//! - [`db`]: storage traits with PostgreSQL and in-memory implementations

/// Card geometry, generation, winning lines, and phase derivation.
pub mod game;
pub use game::{
    card::{BallNumber, CardCells, Cell, generate_random_card, winning_line},
    constants,
    phase::{RoundPhase, RoundSchedule},
};

/// Round actors, the draw engine, and the round manager.
pub mod round;
pub use round::{RoundActor, RoundError, RoundHandle, RoundManager, RoundTiming};

/// Win-claim verification types.
pub mod claim;
pub use claim::{ClaimError, ClaimReceipt, ClaimStatus};

/// Wallet balances and the transaction ledger.
pub mod wallet;
pub use wallet::WalletManager;

/// Storage traits and backends.
pub mod db;
