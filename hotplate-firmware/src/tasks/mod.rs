//! Embassy async tasks
//!
//! Each task runs independently and communicates via the shared state in
//! [`crate::channels`].

pub mod control;
pub mod display;

pub use control::{control_task, SensorBus, SensorChannel, Ssr};
pub use display::{display_task, Panel};
