//! Host-side driver for a LoRa 2.4GHz concentrator board whose radios sit
//! behind a USB-serial MCU.

pub mod error;
pub mod frame;
pub mod hal;
pub mod mcu;
pub mod port;
pub mod proto;
pub mod toa;
pub mod types;

#[cfg(test)]
mod mock;

pub use error::{HalError, ProtocolError, Result};
pub use hal::{Concentrator, DeviceInfo, Lifecycle, RadioStatus, StatusKind, version_info};
pub use mcu::{Mcu, Timing};
pub use port::{Connect, SerialConnector};
pub use toa::{Airtime, time_on_air};
pub use types::*;
