//! Driver errors.

use core::fmt;

/// Why an identification handshake failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    /// The chip did not answer, or did not answer in time.
    BusUnavailable,
    /// The chip answered with an id or check code of another part.
    IdentificationMismatch,
    /// The chip reports erased firmware.
    FirmwareMissing,
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitError::BusUnavailable => write!(f, "touch controller not responding"),
            InitError::IdentificationMismatch => write!(f, "unexpected touch controller id"),
            InitError::FirmwareMissing => write!(f, "touch controller firmware missing"),
        }
    }
}

/// Errors returned by [`TouchDriver`](crate::TouchDriver).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error<E> {
    /// A bus transfer failed.
    Bus(E),
    /// A reset or interrupt line could not be configured, driven or read.
    Pin,
    /// Initialization failed.
    Init(InitError),
    /// The driver has not been initialized successfully.
    NotInitialized,
}

impl<E> From<InitError> for Error<E> {
    fn from(err: InitError) -> Self {
        Error::Init(err)
    }
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Bus(e) => write!(f, "bus error: {e:?}"),
            Error::Pin => write!(f, "control pin error"),
            Error::Init(e) => write!(f, "initialization failed: {e}"),
            Error::NotInitialized => write!(f, "touch controller not initialized"),
        }
    }
}

/// A control line failure, already logged. Converts into [`Error::Pin`].
pub(crate) struct PinFault;

impl<E> From<PinFault> for Error<E> {
    fn from(_: PinFault) -> Self {
        Error::Pin
    }
}

/// Logs a control line failure.
pub(crate) fn pin_fault<P: fmt::Debug>(err: P) -> PinFault {
    log::warn!("Touch control pin failed: {err:?}");
    PinFault
}
