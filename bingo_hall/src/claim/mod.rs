//! Win-claim verification types.
//!
//! The claim protocol itself runs inside each round's actor (the actor
//! inbox is the per-round serialization point), with the pattern check
//! delegated to [`crate::game::card::winning_line`]. This module carries
//! the protocol's data types and error taxonomy.

pub mod errors;
pub mod models;

pub use errors::ClaimError;
pub use models::{ClaimReceipt, ClaimStatus};
