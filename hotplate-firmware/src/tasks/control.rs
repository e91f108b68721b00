//! Control task
//!
//! Runs one [`ControlLoop`] cycle per control period: sample the sensors,
//! decide, switch the SSR, publish the snapshot and feed the history. Logs
//! every SSR transition and every change in the active fault set.

use defmt::*;
use embassy_embedded_hal::shared_bus::blocking::spi::SpiDeviceWithConfig;
use embassy_rp::gpio::Output;
use embassy_rp::peripherals::SPI1;
use embassy_rp::spi::{Blocking, Spi};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_time::{Delay, Duration, Instant, Ticker};

use core::cell::RefCell;

use hotplate_core::config::HotplateConfig;
use hotplate_core::control::{ControlLoop, CycleReport, OffReason, Transition};
use hotplate_core::sensor::{FaultSet, Measurement, Port};
use hotplate_core::traits::SensorPort;
use hotplate_drivers::actuator::SsrOutput;
use hotplate_drivers::sensor::{Max31855, Max31865};

use crate::channels::{History, HISTORY_STORAGE, SHARED_STATE};

/// SPI1, shared by both converters
pub type SensorBus = Mutex<CriticalSectionRawMutex, RefCell<Spi<'static, SPI1, Blocking>>>;

/// One converter's view of the sensor bus, with its own SPI mode
pub type SensorSpi =
    SpiDeviceWithConfig<'static, CriticalSectionRawMutex, Spi<'static, SPI1, Blocking>, Output<'static>>;

pub type Ssr = SsrOutput<Output<'static>>;

/// A fitted temperature channel
pub enum SensorChannel {
    Rtd(Port<Max31865<SensorSpi, Delay>>),
    Thermocouple(Port<Max31855<SensorSpi>>),
}

impl SensorPort for SensorChannel {
    fn sample(&mut self, now_ms: u64) -> Measurement {
        match self {
            SensorChannel::Rtd(port) => port.sample(now_ms),
            SensorChannel::Thermocouple(port) => port.sample(now_ms),
        }
    }
}

/// Control task
///
/// `primary` drives the SSR; `secondary`, when fitted, is only monitored.
#[embassy_executor::task]
pub async fn control_task(
    primary: SensorChannel,
    secondary: Option<SensorChannel>,
    ssr: Ssr,
    config: HotplateConfig,
    history: &'static History,
) {
    info!(
        "Control task started (setpoint {}°C, period {} ms)",
        config.control.setpoint_c, config.timing.control_period_ms
    );

    let control = ControlLoop::new(
        primary,
        ssr,
        config.control,
        &SHARED_STATE,
        history,
        config.timing.history_period_ms,
    );
    let period = Duration::from_millis(u64::from(config.timing.control_period_ms));

    match secondary {
        Some(secondary) => run(control.with_secondary(secondary), period).await,
        None => run(control, period).await,
    }
}

async fn run<S: SensorPort>(
    mut control: ControlLoop<'static, SensorChannel, Ssr, HISTORY_STORAGE, S>,
    period: Duration,
) -> ! {
    let mut ticker = Ticker::every(period);
    let mut last_faults = FaultSet::EMPTY;

    loop {
        let now_ms = Instant::now().as_millis();

        // The SSR pin cannot fail, so neither can the cycle
        let report = match control.step(now_ms) {
            Ok(report) => report,
            Err(e) => match e {},
        };

        log_transition(&report);

        let faults = report.snapshot.faults;
        if faults != last_faults {
            if faults.is_empty() {
                info!("Sensor faults cleared");
            } else {
                warn!("Sensor fault: {}", Display2Format(&faults));
            }
            last_faults = faults;
        }

        trace!(
            "T={}°C ssr={} burst={} ms",
            report.snapshot.temperature_c(),
            report.snapshot.actuator.energized,
            report.snapshot.actuator.on_duration_ms
        );

        ticker.next().await;
    }
}

fn log_transition(report: &CycleReport) {
    let snapshot = &report.snapshot;
    match report.command.transition {
        Some(Transition::On) => info!(
            "SSR on at {}°C, burst {} ms",
            snapshot.temperature_c(),
            snapshot.actuator.on_duration_ms
        ),
        Some(Transition::Off(OffReason::OnTimeElapsed)) => info!(
            "SSR off at {}°C, next burst {} ms",
            snapshot.temperature_c(),
            snapshot.actuator.on_duration_ms
        ),
        Some(Transition::Off(OffReason::SensorFault)) => {
            warn!("SSR forced off: {}", Display2Format(&snapshot.faults))
        }
        None => {}
    }
}
