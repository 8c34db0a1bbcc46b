//! An asynchronous, `no_std` driver for the TCA9554 I2C I/O expander.
//!
//! Several touch-display boards route the touch controller's reset line (and
//! sometimes the display's) through a TCA9554 instead of a native GPIO. This
//! crate provides `IoExpander` for whole-port access and `ExpanderPin` for a
//! single line, so a pin can be handed to a driver that only cares about one
//! signal.
//!
//! # Usage
//!
//! ```no_run
//! # async fn demo<I2C: embedded_hal_async::i2c::I2c>(i2c: I2C) {
//! use tca9554_async::{Direction, ExpanderPin, TCA9554_DEFAULT_ADDRESS};
//!
//! let mut touch_reset = ExpanderPin::new(i2c, TCA9554_DEFAULT_ADDRESS, 1).unwrap();
//! touch_reset.set_direction(Direction::Output).await.unwrap();
//! touch_reset.set_low().await.unwrap();
//! touch_reset.set_high().await.unwrap();
//! # }
//! ```
//!
//! Every pin operation is a read-modify-write of one register. When the
//! expander shares its bus with other devices, wrap the bus with
//! `embedded-bus-async` and give each pin its own handle.

#![cfg_attr(not(test), no_std)]

use core::fmt;
use embedded_hal_async::i2c::{I2c, SevenBitAddress};

/// Address with A2..A0 tied low.
pub const TCA9554_DEFAULT_ADDRESS: u8 = 0x20;

// --- Register Addresses ---
const INPUT_PORT_REG: u8 = 0x00;
const OUTPUT_PORT_REG: u8 = 0x01;
const POLARITY_INVERSION_REG: u8 = 0x02;
const CONFIG_REG: u8 = 0x03;

const PIN_COUNT: u8 = 8;

/// Direction of an expander line. The configuration register uses 1 for input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// High impedance input.
    Input,
    /// Push-pull output driven from the output port register.
    Output,
}

/// Errors reported by the expander driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error<E> {
    /// The I2C transaction failed.
    I2c(E),
    /// The pin number is not in `0..8`.
    InvalidPin(u8),
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::I2c(e) => write!(f, "I2C error: {e:?}"),
            Error::InvalidPin(pin) => write!(f, "Invalid expander pin {pin}"),
        }
    }
}

/// Whole-port access to a TCA9554.
pub struct IoExpander<I2cType> {
    i2c: I2cType,
    address: u8,
}

impl<I2cType> IoExpander<I2cType>
where
    I2cType: I2c<SevenBitAddress>,
{
    /// Creates a new `IoExpander` at the given address.
    pub fn new(i2c: I2cType, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Reads the logic levels of all eight lines (after polarity inversion).
    pub async fn read_inputs(&mut self) -> Result<u8, Error<I2cType::Error>> {
        self.read_register(INPUT_PORT_REG).await
    }

    /// Reads back the output port register.
    pub async fn read_outputs(&mut self) -> Result<u8, Error<I2cType::Error>> {
        self.read_register(OUTPUT_PORT_REG).await
    }

    /// Writes the output port register. Only lines configured as outputs are driven.
    pub async fn write_outputs(&mut self, value: u8) -> Result<(), Error<I2cType::Error>> {
        self.write_register(OUTPUT_PORT_REG, value).await
    }

    /// Writes the configuration register; a set bit makes the line an input.
    pub async fn write_config(&mut self, inputs_mask: u8) -> Result<(), Error<I2cType::Error>> {
        self.write_register(CONFIG_REG, inputs_mask).await
    }

    /// Inverts the reported level of the masked input lines.
    pub async fn set_polarity_inversion(&mut self, mask: u8) -> Result<(), Error<I2cType::Error>> {
        self.write_register(POLARITY_INVERSION_REG, mask).await
    }

    /// Sets the direction of one line.
    pub async fn set_direction(
        &mut self,
        pin: u8,
        direction: Direction,
    ) -> Result<(), Error<I2cType::Error>> {
        let mask = pin_mask(pin)?;
        let config = self.read_register(CONFIG_REG).await?;
        let config = match direction {
            Direction::Input => config | mask,
            Direction::Output => config & !mask,
        };
        self.write_register(CONFIG_REG, config).await
    }

    /// Drives one output line high or low.
    pub async fn set_output(&mut self, pin: u8, high: bool) -> Result<(), Error<I2cType::Error>> {
        let mask = pin_mask(pin)?;
        let output = self.read_register(OUTPUT_PORT_REG).await?;
        let output = if high { output | mask } else { output & !mask };
        self.write_register(OUTPUT_PORT_REG, output).await
    }

    /// Returns `true` if the line reads high.
    pub async fn is_high(&mut self, pin: u8) -> Result<bool, Error<I2cType::Error>> {
        let mask = pin_mask(pin)?;
        Ok(self.read_inputs().await? & mask != 0)
    }

    /// Releases the underlying bus.
    pub fn release(self) -> I2cType {
        self.i2c
    }

    async fn read_register(&mut self, register: u8) -> Result<u8, Error<I2cType::Error>> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(self.address, &[register], &mut buf)
            .await
            .map_err(|e| {
                log::warn!("TCA9554 read of register {register:#04x} failed: {e:?}");
                Error::I2c(e)
            })?;
        Ok(buf[0])
    }

    async fn write_register(&mut self, register: u8, value: u8) -> Result<(), Error<I2cType::Error>> {
        self.i2c
            .write(self.address, &[register, value])
            .await
            .map_err(|e| {
                log::warn!("TCA9554 write of register {register:#04x} failed: {e:?}");
                Error::I2c(e)
            })
    }
}

fn pin_mask<E>(pin: u8) -> Result<u8, Error<E>> {
    if pin < PIN_COUNT {
        Ok(1 << pin)
    } else {
        Err(Error::InvalidPin(pin))
    }
}

/// A single expander line, owning its own bus handle.
pub struct ExpanderPin<I2cType> {
    expander: IoExpander<I2cType>,
    pin: u8,
}

impl<I2cType> ExpanderPin<I2cType>
where
    I2cType: I2c<SevenBitAddress>,
{
    /// Creates a handle for line `pin` of the expander at `address`.
    pub fn new(i2c: I2cType, address: u8, pin: u8) -> Result<Self, Error<I2cType::Error>> {
        pin_mask::<I2cType::Error>(pin)?;
        Ok(Self {
            expander: IoExpander::new(i2c, address),
            pin,
        })
    }

    /// The line number within the port.
    pub fn pin(&self) -> u8 {
        self.pin
    }

    /// Sets the direction of this line.
    pub async fn set_direction(&mut self, direction: Direction) -> Result<(), Error<I2cType::Error>> {
        self.expander.set_direction(self.pin, direction).await
    }

    /// Drives the line high.
    pub async fn set_high(&mut self) -> Result<(), Error<I2cType::Error>> {
        self.expander.set_output(self.pin, true).await
    }

    /// Drives the line low.
    pub async fn set_low(&mut self) -> Result<(), Error<I2cType::Error>> {
        self.expander.set_output(self.pin, false).await
    }

    /// Returns `true` if the line reads high.
    pub async fn is_high(&mut self) -> Result<bool, Error<I2cType::Error>> {
        self.expander.is_high(self.pin).await
    }
}
