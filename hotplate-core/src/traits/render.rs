//! Trend display trait

use crate::history::HistorySample;
use crate::shared::SharedSnapshot;

/// Draws the live state and the temperature trend
///
/// Implementations own all pixel-level output. They receive plain numbers
/// and fault data; the core assumes nothing about canvas size or colours.
pub trait TrendRenderer {
    /// Error raised by the panel
    type Error;

    /// Render one frame
    ///
    /// `history` is ordered oldest to newest.
    fn render(
        &mut self,
        snapshot: &SharedSnapshot,
        history: &[HistorySample],
    ) -> Result<(), Self::Error>;
}
