//! Core game logic: cards, winning lines, and the time-derived round phase.
//!
//! Everything in this module is pure. Card generation takes the RNG as an
//! argument, winning-line evaluation is a function of cells and drawn
//! numbers, and phase derivation is a function of timestamps. Side effects
//! live in [`crate::round`] and [`crate::db`].

pub mod card;
pub mod constants;
pub mod phase;

pub use card::{BallNumber, CardCells, CardError, Cell, generate_random_card, winning_line};
pub use phase::{RoundPhase, RoundSchedule, ScheduleError};
