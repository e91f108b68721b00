//! State shared between Embassy tasks
//!
//! The control task is the only writer of both; the display task only reads.

use hotplate_core::config::MAX_HISTORY_CAPACITY;
use hotplate_core::history::SharedHistory;
use hotplate_core::shared::SharedState;
use static_cell::StaticCell;

/// Reserved history storage; the configured capacity may be smaller
pub const HISTORY_STORAGE: usize = MAX_HISTORY_CAPACITY;

pub type History = SharedHistory<HISTORY_STORAGE>;

/// Latest control-cycle snapshot
pub static SHARED_STATE: SharedState = SharedState::new();

/// Trend history (initialised once the configuration is known)
pub static HISTORY: StaticCell<History> = StaticCell::new();
