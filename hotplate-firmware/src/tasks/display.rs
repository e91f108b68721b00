//! Display task
//!
//! Redraws the trend view whenever the control task has published a new
//! snapshot. Never touches the SSR or the sensors.

use defmt::*;
use embassy_rp::gpio::Output;
use embassy_rp::peripherals::SPI0;
use embassy_rp::spi::{Blocking, Spi};
use embassy_time::{Duration, Ticker};
use embedded_hal_bus::spi::{ExclusiveDevice, NoDelay};

use hotplate_core::config::TimingConfig;
use hotplate_core::display::DisplayLoop;
use hotplate_drivers::display::{Ili9341, TrendLayout, TrendView};

use crate::channels::{History, SHARED_STATE};

/// ILI9341 alone on SPI0
pub type Panel = Ili9341<
    ExclusiveDevice<Spi<'static, SPI0, Blocking>, Output<'static>, NoDelay>,
    Output<'static>,
    Output<'static>,
>;

/// Display task
#[embassy_executor::task]
pub async fn display_task(
    panel: Panel,
    timing: TimingConfig,
    slots: usize,
    history: &'static History,
) {
    info!("Display task started ({} ms refresh)", timing.display_period_ms);

    let view = TrendView::new(panel, TrendLayout::with_slots(slots));
    let mut display = DisplayLoop::new(view, &SHARED_STATE, history);
    let mut ticker = Ticker::every(Duration::from_millis(u64::from(timing.display_period_ms)));

    loop {
        match display.refresh() {
            Ok(true) => trace!("Frame drawn"),
            Ok(false) => {}
            Err(e) => warn!("Display error: {}", Debug2Format(&e)),
        }
        ticker.next().await;
    }
}
