//! Display refresh cycle
//!
//! Reads the shared state and the history, then hands both to a
//! [`TrendRenderer`]. Read-only with respect to everything the control task
//! owns.

use crate::history::SharedHistory;
use crate::shared::SharedState;
use crate::traits::TrendRenderer;

pub struct DisplayLoop<'a, R, const N: usize> {
    renderer: R,
    state: &'a SharedState,
    history: &'a SharedHistory<N>,
    last_rendered: Option<u32>,
}

impl<'a, R: TrendRenderer, const N: usize> DisplayLoop<'a, R, N> {
    pub fn new(renderer: R, state: &'a SharedState, history: &'a SharedHistory<N>) -> Self {
        Self {
            renderer,
            state,
            history,
            last_rendered: None,
        }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Draw a frame if the control task has published since the last one
    ///
    /// Returns whether a frame was drawn. The first call always draws, so
    /// the panel shows something before the first control cycle.
    pub fn refresh(&mut self) -> Result<bool, R::Error> {
        let snapshot = self.state.read();
        if self.last_rendered == Some(snapshot.sequence) {
            return Ok(false);
        }

        let history = self.history.snapshot();
        self.renderer.render(&snapshot, &history)?;
        self.last_rendered = Some(snapshot.sequence);
        Ok(true)
    }
}
