//! Test doubles for the bus, the control lines and the delay provider.

use crate::pins::{ControlPin, Level, PinMode};
use core::cell::{Cell, RefCell};
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{self, ErrorKind, ErrorType, I2c, Operation};
use std::collections::BTreeMap;
use std::rc::Rc;
use std::vec::Vec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeError;

impl i2c::Error for FakeError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::NoAcknowledge(i2c::NoAcknowledgeSource::Address)
    }
}

/// One I2C transaction as seen on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    /// Address and all written bytes.
    Write(u8, Vec<u8>),
    /// Address, register bytes written before the read, and read length.
    Read(u8, Vec<u8>, usize),
}

#[derive(Default)]
struct Chip {
    responses: BTreeMap<Vec<u8>, Vec<u8>>,
    log: Vec<BusEvent>,
    absent: bool,
}

/// A register-addressed I2C device. Reads are answered from a table keyed by
/// the bytes written just before them; unknown registers NACK.
///
/// Clones share the same device, so a test can keep a handle after moving
/// one into the driver.
#[derive(Clone, Default)]
pub struct FakeI2c {
    chip: Rc<RefCell<Chip>>,
}

impl FakeI2c {
    /// A device that NACKs everything.
    pub fn absent() -> Self {
        let fake = Self::default();
        fake.chip.borrow_mut().absent = true;
        fake
    }

    pub fn respond(self, register: &[u8], data: &[u8]) -> Self {
        self.set_response(register, data);
        self
    }

    pub fn set_response(&self, register: &[u8], data: &[u8]) {
        self.chip
            .borrow_mut()
            .responses
            .insert(register.to_vec(), data.to_vec());
    }

    pub fn log(&self) -> Vec<BusEvent> {
        self.chip.borrow().log.clone()
    }

    pub fn clear_log(&self) {
        self.chip.borrow_mut().log.clear();
    }

    /// Written payloads only, in order.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.log()
            .into_iter()
            .filter_map(|event| match event {
                BusEvent::Write(_, bytes) => Some(bytes),
                BusEvent::Read(..) => None,
            })
            .collect()
    }
}

impl ErrorType for FakeI2c {
    type Error = FakeError;
}

impl I2c for FakeI2c {
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut chip = self.chip.borrow_mut();
        if chip.absent {
            return Err(FakeError);
        }

        let mut pending: Vec<u8> = Vec::new();
        for op in operations.iter_mut() {
            match op {
                Operation::Write(bytes) => pending.extend_from_slice(bytes),
                Operation::Read(buf) => {
                    let data = chip.responses.get(&pending).ok_or(FakeError)?.clone();
                    buf.fill(0);
                    let n = data.len().min(buf.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    chip.log
                        .push(BusEvent::Read(address, core::mem::take(&mut pending), buf.len()));
                }
            }
        }
        if !pending.is_empty() {
            chip.log.push(BusEvent::Write(address, pending));
        }
        Ok(())
    }
}

/// Pin and delay activity, in the order it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Mode(&'static str, PinMode),
    Drive(&'static str, Level),
    DelayMs(u32),
}

pub type Trace = Rc<RefCell<Vec<Step>>>;

pub fn trace() -> Trace {
    Rc::new(RefCell::new(Vec::new()))
}

/// A control line that records what the driver does with it. Sampling
/// returns whatever the test put on `input`.
pub struct FakePin {
    name: &'static str,
    trace: Trace,
    pub input: Rc<Cell<Level>>,
}

impl FakePin {
    pub fn new(name: &'static str, trace: &Trace) -> Self {
        Self {
            name,
            trace: Rc::clone(trace),
            input: Rc::new(Cell::new(Level::High)),
        }
    }
}

impl ControlPin for FakePin {
    type Error = core::convert::Infallible;

    async fn set_mode(&mut self, mode: PinMode) -> Result<(), Self::Error> {
        self.trace.borrow_mut().push(Step::Mode(self.name, mode));
        Ok(())
    }

    async fn set_level(&mut self, level: Level) -> Result<(), Self::Error> {
        self.trace.borrow_mut().push(Step::Drive(self.name, level));
        Ok(())
    }

    async fn level(&mut self) -> Result<Level, Self::Error> {
        Ok(self.input.get())
    }
}

/// Records millisecond delays instead of waiting.
pub struct FakeDelay {
    trace: Trace,
}

impl FakeDelay {
    pub fn new(trace: &Trace) -> Self {
        Self {
            trace: Rc::clone(trace),
        }
    }
}

impl DelayNs for FakeDelay {
    async fn delay_ns(&mut self, _ns: u32) {}

    async fn delay_ms(&mut self, ms: u32) {
        self.trace.borrow_mut().push(Step::DelayMs(ms));
    }
}
