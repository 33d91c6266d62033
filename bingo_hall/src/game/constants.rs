//! Fixed game geometry and timing defaults.

/// Size of the drawable number pool (numbers 01 through 99).
pub const NUMBER_POOL_SIZE: usize = 99;

/// Total cells on a card (5x5 grid).
pub const CARD_CELLS: usize = 25;

/// Cells per row/column.
pub const CARD_SIDE: usize = 5;

/// Index of the fixed FREE cell (center of the grid).
pub const FREE_CELL_INDEX: usize = 12;

/// Default seconds between draws while a round is in its drawing phase.
pub const DEFAULT_DRAW_INTERVAL_SECS: u64 = 3;

/// Default length of the card-setup timer that starts when registration
/// closes. The setup deadline never extends past the round's play time.
pub const DEFAULT_CARD_SETUP_SECS: i64 = 120;

/// Buffered events per subscribed session. Large enough to hold a full
/// game (99 draws plus the terminal event) for a session that never reads.
pub const SESSION_EVENT_BUFFER: usize = 128;
