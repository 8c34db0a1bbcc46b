//! Control lines (reset, interrupt) as an injected capability.
//!
//! Reset lines are wired to native GPIOs on some boards and to an I/O expander
//! on others, and the GT911 needs its interrupt line switched between output
//! and input during reset. [`ControlPin`] covers all of these with three
//! operations. Adapters are provided for `embedded-hal` pins and for TCA9554
//! expander lines.

use core::convert::Infallible;
use core::fmt::Debug;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal_async::i2c::{I2c, SevenBitAddress};
use tca9554_async::{Direction, ExpanderPin};

/// Electrical mode of a control line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    /// High impedance input.
    Input,
    /// Push-pull output.
    Output,
    /// Open-drain output.
    OpenDrain,
}

/// Logic level of a control line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Logic low.
    Low,
    /// Logic high.
    High,
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

/// A control line the driver can reconfigure, drive and sample.
#[allow(async_fn_in_trait)]
pub trait ControlPin {
    /// Error raised by the line.
    type Error: Debug;

    /// Switches the line to `mode`.
    async fn set_mode(&mut self, mode: PinMode) -> Result<(), Self::Error>;

    /// Drives the line to `level`.
    async fn set_level(&mut self, level: Level) -> Result<(), Self::Error>;

    /// Samples the line.
    async fn level(&mut self) -> Result<Level, Self::Error>;
}

/// Placeholder for a line that is not wired.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPin;

impl ControlPin for NoPin {
    type Error = Infallible;

    async fn set_mode(&mut self, _mode: PinMode) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn set_level(&mut self, _level: Level) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn level(&mut self) -> Result<Level, Self::Error> {
        Ok(Level::High)
    }
}

/// Error of the `embedded-hal` pin adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineError<E> {
    /// The underlying pin failed.
    Pin(E),
    /// The adapter cannot put the line into this mode.
    UnsupportedMode(PinMode),
}

/// An output-only `embedded-hal` pin, e.g. a dedicated reset GPIO.
///
/// Sampling returns the last driven level.
pub struct OutputLine<P> {
    pin: P,
    level: Level,
}

impl<P: OutputPin> OutputLine<P> {
    /// Wraps an output pin that is currently driven to `level`.
    pub fn new(pin: P, level: Level) -> Self {
        Self { pin, level }
    }
}

impl<P: OutputPin> ControlPin for OutputLine<P> {
    type Error = LineError<P::Error>;

    async fn set_mode(&mut self, mode: PinMode) -> Result<(), Self::Error> {
        match mode {
            PinMode::Output | PinMode::OpenDrain => Ok(()),
            PinMode::Input => Err(LineError::UnsupportedMode(mode)),
        }
    }

    async fn set_level(&mut self, level: Level) -> Result<(), Self::Error> {
        let result = match level {
            Level::Low => self.pin.set_low(),
            Level::High => self.pin.set_high(),
        };
        result.map_err(LineError::Pin)?;
        self.level = level;
        Ok(())
    }

    async fn level(&mut self) -> Result<Level, Self::Error> {
        Ok(self.level)
    }
}

/// An input-only `embedded-hal` pin, e.g. the touch interrupt line.
pub struct InputLine<P> {
    pin: P,
}

impl<P: InputPin> InputLine<P> {
    /// Wraps an input pin.
    pub fn new(pin: P) -> Self {
        Self { pin }
    }
}

impl<P: InputPin> ControlPin for InputLine<P> {
    type Error = LineError<P::Error>;

    async fn set_mode(&mut self, mode: PinMode) -> Result<(), Self::Error> {
        match mode {
            PinMode::Input => Ok(()),
            PinMode::Output | PinMode::OpenDrain => Err(LineError::UnsupportedMode(mode)),
        }
    }

    async fn set_level(&mut self, _level: Level) -> Result<(), Self::Error> {
        Err(LineError::UnsupportedMode(PinMode::Output))
    }

    async fn level(&mut self) -> Result<Level, Self::Error> {
        self.pin.is_high().map(Level::from).map_err(LineError::Pin)
    }
}

/// A bidirectional pin that can be read while it is driven, such as an
/// open-drain GPIO with its input buffer enabled.
///
/// Mode changes are tracked so that writes in input mode are refused.
pub struct FlexLine<P> {
    pin: P,
    mode: PinMode,
}

impl<P: InputPin + OutputPin> FlexLine<P> {
    /// Wraps a bidirectional pin, starting in input mode.
    pub fn new(pin: P) -> Self {
        Self {
            pin,
            mode: PinMode::Input,
        }
    }
}

impl<P: InputPin + OutputPin> ControlPin for FlexLine<P> {
    type Error = LineError<<P as embedded_hal::digital::ErrorType>::Error>;

    async fn set_mode(&mut self, mode: PinMode) -> Result<(), Self::Error> {
        if mode == PinMode::Input {
            // Release the line so that the device can pull it.
            self.pin.set_high().map_err(LineError::Pin)?;
        }
        self.mode = mode;
        Ok(())
    }

    async fn set_level(&mut self, level: Level) -> Result<(), Self::Error> {
        if self.mode == PinMode::Input {
            return Err(LineError::UnsupportedMode(PinMode::Output));
        }
        let result = match level {
            Level::Low => self.pin.set_low(),
            Level::High => self.pin.set_high(),
        };
        result.map_err(LineError::Pin)
    }

    async fn level(&mut self) -> Result<Level, Self::Error> {
        self.pin.is_high().map(Level::from).map_err(LineError::Pin)
    }
}

/// Expander lines are push-pull; open-drain is emulated as a plain output.
impl<I2cType> ControlPin for ExpanderPin<I2cType>
where
    I2cType: I2c<SevenBitAddress>,
{
    type Error = tca9554_async::Error<I2cType::Error>;

    async fn set_mode(&mut self, mode: PinMode) -> Result<(), Self::Error> {
        let direction = match mode {
            PinMode::Input => Direction::Input,
            PinMode::Output | PinMode::OpenDrain => Direction::Output,
        };
        self.set_direction(direction).await
    }

    async fn set_level(&mut self, level: Level) -> Result<(), Self::Error> {
        match level {
            Level::Low => self.set_low().await,
            Level::High => self.set_high().await,
        }
    }

    async fn level(&mut self) -> Result<Level, Self::Error> {
        self.is_high().await.map(Level::from)
    }
}
