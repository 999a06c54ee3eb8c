//! Register interface: the link through which every signal is read or written.
//!
//! The board exposes a flat file of 32-bit registers. [`RegisterInterface`] is
//! the only abstraction the rest of the crate depends on, so signals and the
//! controller work the same against real hardware ([`serial`]) or the
//! in-memory board used by tests and the CLI's `--mock` mode ([`mock`]).

use crate::error::FpgaResult;

pub mod mock;
pub mod protocol;
pub mod serial;

pub use mock::MockRegisterInterface;
pub use serial::SerialRegisterInterface;

/// Read/write access to the board's registers.
///
/// Implementations perform exactly one transfer per call; there is no retry
/// or buffering at this layer.
pub trait RegisterInterface {
    /// Read the 32-bit word at `address`.
    fn read(&mut self, address: u32) -> FpgaResult<u32>;

    /// Write `value` to `address`.
    fn write(&mut self, address: u32, value: u32) -> FpgaResult<()>;

    /// Release the underlying link. Further transfers fail with
    /// [`crate::FpgaError::NotConnected`].
    fn disconnect(&mut self) -> FpgaResult<()>;

    fn is_connected(&self) -> bool;

    /// Human readable description of the link, for logs.
    fn describe(&self) -> String;
}

impl<R: RegisterInterface + ?Sized> RegisterInterface for Box<R> {
    fn read(&mut self, address: u32) -> FpgaResult<u32> {
        (**self).read(address)
    }

    fn write(&mut self, address: u32, value: u32) -> FpgaResult<()> {
        (**self).write(address, value)
    }

    fn disconnect(&mut self) -> FpgaResult<()> {
        (**self).disconnect()
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
