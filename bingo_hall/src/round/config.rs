//! Round timing configuration.

use std::time::Duration;

use crate::game::constants::{DEFAULT_CARD_SETUP_SECS, DEFAULT_DRAW_INTERVAL_SECS};

/// Timing knobs shared by every round an instance runs.
///
/// Tests shrink `draw_interval` to run whole games in milliseconds; the
/// defaults match the production cadence.
#[derive(Debug, Clone)]
pub struct RoundTiming {
    /// Pause between draws while a round is in its drawing phase.
    pub draw_interval: Duration,
    /// Length of the card-setup timer that starts at registration close.
    pub setup_window: chrono::Duration,
}

impl Default for RoundTiming {
    fn default() -> Self {
        Self {
            draw_interval: Duration::from_secs(DEFAULT_DRAW_INTERVAL_SECS),
            setup_window: chrono::Duration::seconds(DEFAULT_CARD_SETUP_SECS),
        }
    }
}
