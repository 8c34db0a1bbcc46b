//! An asynchronous, `no_std` driver for the capacitive touch controllers found
//! on ESP32 display boards.
//!
//! Supported families:
//!
//! * Hynitron CST226(SE) and CST328 (mutual capacitance, up to 5 fingers)
//! * Hynitron CST816S/T/D and CST716 (self capacitance, 1 finger plus gestures)
//! * Zinitix ZTW622
//! * Goodix GT911
//!
//! A [`TouchDriver`] owns a [`RegisterBus`] (usually an [`I2cBus`] around an
//! `embedded-hal-async` I2C peripheral), a delay provider, and optionally the
//! reset and interrupt lines as [`ControlPin`]s. It resets and identifies the
//! chip in [`TouchDriver::init`] and then turns each report into a list of
//! [`TouchPoint`]s in display coordinates.
//!
//! # Usage
//!
//! ```no_run
//! # async fn demo<I2C, D>(i2c: I2C, delay: D)
//! # where
//! #     I2C: embedded_hal_async::i2c::I2c,
//! #     D: embedded_hal_async::delay::DelayNs,
//! # {
//! use touch_ic_async::{ChipFamily, Resolution, TouchDriver};
//!
//! let mut touch = TouchDriver::new_i2c(i2c, delay, ChipFamily::Cst226);
//! let info = touch.init().await.unwrap();
//! log::info!("Touch controller: {info:?}");
//! touch.set_display_resolution(Resolution::new(222, 480));
//!
//! loop {
//!     for point in touch.get_touch_points(5).await.unwrap() {
//!         log::info!("Touch: {point:?}");
//!     }
//! }
//! # }
//! ```
//!
//! Reports that fail validation (bad sentinel byte, more fingers than the chip
//! tracks, short reads) are dropped and logged at debug level; the call still
//! succeeds with no points.

#![cfg_attr(not(test), no_std)]

pub mod bus;
mod driver;
pub mod error;
mod handshake;
pub mod pins;
pub mod profile;
pub mod report;
pub mod scale;

#[cfg(test)]
mod mock;

pub use bus::{I2cBus, Register, RegisterBus};
pub use driver::{DeviceInfo, DriverState, TouchDriver};
pub use error::{Error, InitError};
pub use pins::{ControlPin, Level, NoPin, PinMode};
pub use profile::{ChipFamily, DeviceProfile, Resolution};
pub use report::{decode, Frame, FrameError, Gesture, Points, TouchPoint, TouchState};
pub use scale::{AxisScale, Scaling, Transform};
