//! Rounds: models, the per-round actor (draw engine + claim arbitration),
//! the session registry, and the manager that owns every live round.

pub mod actor;
pub mod config;
pub mod errors;
pub mod manager;
pub mod messages;
pub mod models;
pub mod registry;

pub use actor::{RoundActor, RoundHandle};
pub use config::RoundTiming;
pub use errors::RoundError;
pub use manager::RoundManager;
pub use messages::{RoundEvent, RoundMessage, RoundSnapshot};
pub use models::{Card, CardId, Money, NewRound, Round, RoundId, RoundStatus, RoundSummary, UserId};
pub use registry::{SessionId, SessionRegistry};
