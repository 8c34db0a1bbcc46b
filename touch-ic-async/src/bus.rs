//! Register-level access to a touch controller.
//!
//! The controllers disagree on register width and byte order: the CST8xx parts
//! use 8-bit registers, the CST3xx and GT911 parts 16-bit big-endian ones and
//! the Zinitix parts 16-bit little-endian ones. [`Register`] captures that, and
//! [`RegisterBus`] is the transport the driver talks to.

use core::fmt::Debug;
use embedded_hal_async::i2c::{I2c, Operation, SevenBitAddress};

/// A register address together with its on-wire encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    /// 8-bit register address.
    U8(u8),
    /// 16-bit register address, high byte first.
    U16Be(u16),
    /// 16-bit register address, low byte first.
    U16Le(u16),
}

impl Register {
    /// Encodes the register address into `buf`, returning the used prefix.
    pub fn encode(self, buf: &mut [u8; 2]) -> &[u8] {
        match self {
            Register::U8(reg) => {
                buf[0] = reg;
                &buf[..1]
            }
            Register::U16Be(reg) => {
                *buf = reg.to_be_bytes();
                &buf[..]
            }
            Register::U16Le(reg) => {
                *buf = reg.to_le_bytes();
                &buf[..]
            }
        }
    }
}

/// Register-oriented bus transport.
///
/// Reads report how many bytes were actually delivered. A transport built on
/// `embedded-hal` always fills the whole buffer, but bridges (USB-I2C adapters,
/// firmware mailboxes) may come back short, and the driver must notice.
#[allow(async_fn_in_trait)]
pub trait RegisterBus {
    /// Transport error type.
    type Error: Debug;

    /// Writes `data` to `register` in a single transaction.
    async fn write_register(
        &mut self,
        address: u8,
        register: Register,
        data: &[u8],
    ) -> Result<(), Self::Error>;

    /// Reads up to `buf.len()` bytes starting at `register`.
    async fn read_register(
        &mut self,
        address: u8,
        register: Register,
        buf: &mut [u8],
    ) -> Result<usize, Self::Error>;

    /// Writes `bytes` and reads `buf.len()` bytes without releasing the bus in between.
    async fn write_read(
        &mut self,
        address: u8,
        bytes: &[u8],
        buf: &mut [u8],
    ) -> Result<usize, Self::Error>;
}

/// [`RegisterBus`] over any `embedded-hal-async` I2C implementation.
pub struct I2cBus<I2cType> {
    i2c: I2cType,
}

impl<I2cType> I2cBus<I2cType> {
    /// Wraps an I2C peripheral (or a shared-bus device handle).
    pub fn new(i2c: I2cType) -> Self {
        Self { i2c }
    }

    /// Returns a reference to the wrapped peripheral.
    pub fn inner(&self) -> &I2cType {
        &self.i2c
    }

    /// Returns a mutable reference to the wrapped peripheral.
    pub fn inner_mut(&mut self) -> &mut I2cType {
        &mut self.i2c
    }

    /// Releases the wrapped peripheral.
    pub fn release(self) -> I2cType {
        self.i2c
    }
}

impl<I2cType> RegisterBus for I2cBus<I2cType>
where
    I2cType: I2c<SevenBitAddress>,
{
    type Error = I2cType::Error;

    async fn write_register(
        &mut self,
        address: u8,
        register: Register,
        data: &[u8],
    ) -> Result<(), Self::Error> {
        let mut reg_buf = [0u8; 2];
        let reg = register.encode(&mut reg_buf);
        if data.is_empty() {
            return self.i2c.write(address, reg).await;
        }
        // Adjacent writes in one transaction go out back to back, without a restart.
        self.i2c
            .transaction(address, &mut [Operation::Write(reg), Operation::Write(data)])
            .await
    }

    async fn read_register(
        &mut self,
        address: u8,
        register: Register,
        buf: &mut [u8],
    ) -> Result<usize, Self::Error> {
        let mut reg_buf = [0u8; 2];
        let reg = register.encode(&mut reg_buf);
        self.write_read(address, reg, buf).await
    }

    async fn write_read(
        &mut self,
        address: u8,
        bytes: &[u8],
        buf: &mut [u8],
    ) -> Result<usize, Self::Error> {
        self.i2c.write_read(address, bytes, buf).await?;
        Ok(buf.len())
    }
}
