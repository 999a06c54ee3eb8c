//! Custom error types for the library.
//!
//! `FpgaError` is the single error type returned by every fallible operation in
//! this crate. It separates two families of failures that callers usually want
//! to handle differently:
//!
//! - **Rejections**: the request was refused before any byte reached the board
//!   (`ReadOnlySignal`, `ValueNotAllowed`, `UnknownSignal`, ...). Retrying the
//!   same request can never succeed. See [`FpgaError::is_rejected_without_io`].
//! - **Transport failures**: the register interface itself failed (`Serial`,
//!   `Io`, `NotConnected`, `WriteFailed`, `ShortRead`).
//!
//! By using `#[from]`, `FpgaError` can be created from the underlying error
//! types, so the `?` operator works across serial, I/O and configuration code.

use crate::signal::SignalKind;
use thiserror::Error;

/// Convenience alias for results using the library error type.
pub type FpgaResult<T> = std::result::Result<T, FpgaError>;

/// Errors raised by signals, register interfaces and configuration.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FpgaError {
    #[error("{kind} {id} is an input signal and cannot be written")]
    ReadOnlySignal { kind: SignalKind, id: u32 },

    #[error("value {value} is not allowed for {kind} {id}")]
    ValueNotAllowed { kind: SignalKind, id: u32, value: i64 },

    #[error("{kind} {id} is not part of the configured inventory ({count} configured)")]
    UnknownSignal { kind: SignalKind, id: u32, count: u32 },

    #[error("{kind} channel {id} is out of range (board provides {capacity})")]
    ChannelOutOfRange { kind: SignalKind, id: u32, capacity: u32 },

    #[error("requested {requested} {kind} signals but the board provides at most {capacity}")]
    TooManySignals {
        kind: SignalKind,
        requested: u32,
        capacity: u32,
    },

    #[error("{kind} signals are not supported on the {board} board")]
    UnsupportedOnBoard { kind: SignalKind, board: &'static str },

    #[error("unknown board identifier {0}")]
    UnknownBoard(u32),

    #[error("firmware version mismatch: expected {expected}, board reports {found}")]
    FirmwareVersionMismatch { expected: u32, found: u32 },

    #[error("invalid laser sequence '{0}': expected 16 characters of '0' or '1'")]
    InvalidSequence(String),

    #[error("invalid laser mode {0}")]
    InvalidLaserMode(u32),

    #[error("register interface is not connected")]
    NotConnected,

    #[error("write of {value} to register {address} was rejected by the register interface")]
    WriteFailed { address: u32, value: u32 },

    #[error("short read from register {address}: got {received} of 4 bytes")]
    ShortRead { address: u32, received: usize },

    #[error("no MicroFPGA board answered on any available serial port")]
    NoDeviceFound,

    #[error("Serial port error: {0}")]
    Serial(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("Configuration validation error: {0}")]
    Configuration(String),
}

impl FpgaError {
    /// True when the request was refused before touching the register
    /// interface, as opposed to a failure reported by the link or the board.
    pub fn is_rejected_without_io(&self) -> bool {
        matches!(
            self,
            FpgaError::ReadOnlySignal { .. }
                | FpgaError::ValueNotAllowed { .. }
                | FpgaError::UnknownSignal { .. }
                | FpgaError::ChannelOutOfRange { .. }
                | FpgaError::InvalidSequence(_)
        )
    }
}

#[cfg(feature = "instrument_serial")]
impl From<serialport::Error> for FpgaError {
    fn from(value: serialport::Error) -> Self {
        FpgaError::Serial(value.to_string())
    }
}

impl From<figment::Error> for FpgaError {
    fn from(value: figment::Error) -> Self {
        FpgaError::Config(Box::new(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_rejections_are_flagged() {
        let err = FpgaError::ValueNotAllowed {
            kind: SignalKind::Servo,
            id: 1,
            value: -1,
        };
        assert!(err.is_rejected_without_io());
        assert_eq!(err.to_string(), "value -1 is not allowed for servo 1");

        let err = FpgaError::ReadOnlySignal {
            kind: SignalKind::AnalogInput,
            id: 0,
        };
        assert!(err.is_rejected_without_io());
    }

    #[test]
    fn transport_failures_are_not_rejections() {
        assert!(!FpgaError::NotConnected.is_rejected_without_io());
        assert!(!FpgaError::WriteFailed {
            address: 29,
            value: 35412
        }
        .is_rejected_without_io());
        let io = std::io::Error::from(std::io::ErrorKind::TimedOut);
        assert!(!FpgaError::from(io).is_rejected_without_io());
    }
}
