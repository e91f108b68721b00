//! Hotplate - SSR temperature controller firmware
//!
//! Keeps a liquid at a setpoint by switching a solid-state relay in
//! bounded bursts, reading a MAX31865 RTD (and optionally a MAX31855
//! thermocouple), and plots the trend on an ILI9341 panel.
//!
//! The control task runs on an interrupt-driven executor above the
//! thread-mode one, so a slow frame on the display never delays an SSR
//! switch-off.
//!
//! Pin assignments:
//! - SSR: GPIO15
//! - Sensor bus (SPI1): SCK GPIO10, MOSI GPIO11, MISO GPIO12,
//!   RTD CS GPIO13, thermocouple CS GPIO9
//! - Display (SPI0): SCK GPIO18, MOSI GPIO19, CS GPIO17, DC GPIO20,
//!   RESET GPIO21

#![no_std]
#![no_main]

use core::cell::RefCell;

use defmt::*;
use embassy_embedded_hal::shared_bus::blocking::spi::SpiDeviceWithConfig;
use embassy_executor::{InterruptExecutor, Spawner};
use embassy_rp::gpio::{Level, Output};
use embassy_rp::interrupt;
use embassy_rp::interrupt::{InterruptExt, Priority};
use embassy_rp::spi::{self, Phase, Polarity, Spi};
use embassy_sync::blocking_mutex::Mutex;
use embassy_time::{Delay, Timer};
use embedded_hal_bus::spi::ExclusiveDevice;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use hotplate_core::config::parse_config;
use hotplate_core::history::{HistoryBuffer, SharedHistory};
use hotplate_core::sensor::Port;
use hotplate_drivers::actuator::SsrOutput;
use hotplate_drivers::display::Ili9341;
use hotplate_drivers::sensor::{Max31855, Max31865};

use crate::tasks::{SensorBus, SensorChannel};

mod channels;
mod tasks;

/// Embedded configuration (compiled into firmware)
/// Edit hotplate.toml and rebuild to customize
const EMBEDDED_CONFIG: &str = include_str!("../hotplate.toml");

/// Both converters accept up to 5 MHz
const SENSOR_SPI_HZ: u32 = 1_000_000;

const DISPLAY_SPI_HZ: u32 = 40_000_000;

static SENSOR_BUS: StaticCell<SensorBus> = StaticCell::new();

/// Runs the control task, preempting the display task
static EXECUTOR_CONTROL: InterruptExecutor = InterruptExecutor::new();

#[interrupt]
unsafe fn SWI_IRQ_1() {
    EXECUTOR_CONTROL.on_interrupt()
}

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Default::default());

    // SSR low before anything else can go wrong
    let ssr = SsrOutput::new_active_high(Output::new(p.PIN_15, Level::Low))
        .unwrap_or_else(|e| match e {});
    info!("Hotplate firmware starting, SSR off");

    let config = match parse_config(EMBEDDED_CONFIG) {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid embedded configuration: {}", e);
            error!("Control loop not started, SSR held off");
            park().await
        }
    };
    info!("Configuration loaded: {}", config);

    let history = match HistoryBuffer::new(config.history.capacity) {
        Ok(buffer) => channels::HISTORY.init(SharedHistory::new(buffer)),
        Err(e) => {
            error!("History capacity rejected: {}", e);
            park().await
        }
    };

    // Sensor bus: MAX31865 needs SPI mode 1, MAX31855 mode 0
    let bus = Spi::new_blocking(p.SPI1, p.PIN_10, p.PIN_11, p.PIN_12, spi::Config::default());
    let bus: &'static SensorBus = SENSOR_BUS.init(Mutex::new(RefCell::new(bus)));

    let mut rtd_config = spi::Config::default();
    rtd_config.frequency = SENSOR_SPI_HZ;
    rtd_config.phase = Phase::CaptureOnSecondTransition;
    rtd_config.polarity = Polarity::IdleLow;

    let mut tc_config = spi::Config::default();
    tc_config.frequency = SENSOR_SPI_HZ;
    tc_config.phase = Phase::CaptureOnFirstTransition;
    tc_config.polarity = Polarity::IdleLow;

    let rtd_spi = SpiDeviceWithConfig::new(bus, Output::new(p.PIN_13, Level::High), rtd_config);
    let tc_spi = SpiDeviceWithConfig::new(bus, Output::new(p.PIN_9, Level::High), tc_config);

    let rtd = if config.sensor.rtd {
        let mut rtd = Max31865::from_config(rtd_spi, Delay, &config.sensor);
        if let Err(e) = rtd.init() {
            // Keep going: every sample will report the fault
            warn!("MAX31865 init failed: {}", e);
        }
        Some(SensorChannel::Rtd(Port::new(rtd)))
    } else {
        None
    };
    let thermocouple = config
        .sensor
        .thermocouple
        .then(|| SensorChannel::Thermocouple(Port::new(Max31855::new(tc_spi))));

    // The RTD drives control when fitted; a second channel is monitor-only
    let (primary, secondary) = match (rtd, thermocouple) {
        (Some(rtd), thermocouple) => (rtd, thermocouple),
        (None, Some(thermocouple)) => (thermocouple, None),
        (None, None) => {
            error!("No sensor channel enabled, SSR held off");
            park().await
        }
    };
    info!(
        "Sensors: rtd={} thermocouple={}",
        config.sensor.rtd, config.sensor.thermocouple
    );

    // Display on SPI0
    let mut display_config = spi::Config::default();
    display_config.frequency = DISPLAY_SPI_HZ;
    let display_bus = Spi::new_blocking_txonly(p.SPI0, p.PIN_18, p.PIN_19, display_config);
    let display_spi = ExclusiveDevice::new_no_delay(display_bus, Output::new(p.PIN_17, Level::High))
        .unwrap_or_else(|e| match e {});
    let mut panel = Ili9341::new(
        display_spi,
        Output::new(p.PIN_20, Level::Low),
        Output::new(p.PIN_21, Level::High),
    );
    if let Err(e) = panel.init(&mut Delay) {
        warn!("Display init failed: {}", Debug2Format(&e));
    }
    info!("Display initialized");

    interrupt::SWI_IRQ_1.set_priority(Priority::P2);
    let control_spawner = EXECUTOR_CONTROL.start(interrupt::SWI_IRQ_1);
    unwrap!(control_spawner.spawn(tasks::control_task(
        primary, secondary, ssr, config, history
    )));
    unwrap!(spawner.spawn(tasks::display_task(
        panel,
        config.timing,
        config.history.capacity,
        history
    )));

    info!("All tasks spawned, firmware running");

    loop {
        Timer::after_secs(60).await;
        trace!("Main loop heartbeat");
    }
}

/// Idle forever without starting control
async fn park() -> ! {
    loop {
        Timer::after_secs(60).await;
    }
}
