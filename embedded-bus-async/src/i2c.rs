//! A shared I2C bus built on an `RwLock`.
//!
//! Touch controllers on the supported boards rarely sit alone on their bus: the
//! reset line is often wired through an I/O expander that answers on the same
//! SDA/SCL pair. [`RwLockI2cDevice`] hands out cheap per-driver handles to one
//! bus; every transaction holds the write lock until it completes, so the
//! register pointer write and the following read of one driver are never
//! interleaved with another driver's traffic.

use alloc::rc::Rc;
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, rwlock::RwLock};
use embedded_hal_async::i2c::{self, I2c, Operation, SevenBitAddress};

/// The lock-protected bus that [`RwLockI2cDevice`] handles point to.
pub type SharedI2cBus<I2cType> = Rc<RwLock<CriticalSectionRawMutex, I2cType>>;

/// Wraps a bus so that it can be shared between several device handles.
pub fn share<I2cType>(bus: I2cType) -> SharedI2cBus<I2cType> {
    Rc::new(RwLock::new(bus))
}

/// `RwLock`-based shared bus [`I2c`] implementation.
///
/// Each handle may be passed to a different driver. Cloning a handle yields
/// another handle to the same bus.
pub struct RwLockI2cDevice<I2cType> {
    bus: SharedI2cBus<I2cType>,
}

impl<I2cType> RwLockI2cDevice<I2cType> {
    /// Create a new [`RwLockI2cDevice`] on an already shared bus.
    pub fn new(bus: SharedI2cBus<I2cType>) -> Self {
        Self { bus }
    }

    /// Returns the bus this handle is attached to.
    pub fn bus(&self) -> &SharedI2cBus<I2cType> {
        &self.bus
    }
}

impl<I2cType> Clone for RwLockI2cDevice<I2cType> {
    fn clone(&self) -> Self {
        Self {
            bus: Rc::clone(&self.bus),
        }
    }
}

impl<I2cType> i2c::ErrorType for RwLockI2cDevice<I2cType>
where
    I2cType: i2c::ErrorType,
{
    type Error = I2cType::Error;
}

impl<I2cType> I2c<SevenBitAddress> for RwLockI2cDevice<I2cType>
where
    I2cType: I2c<SevenBitAddress>,
{
    async fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut bus = self.bus.write().await;
        let result = bus.transaction(address, operations).await;

        if let Err(err) = &result {
            log::warn!("Error communicating with I2C device {address:#04x}: {err:?}");
        }

        result
    }
}
