//! In-memory register interface for testing
//!
//! `MockRegisterInterface` emulates the register file of a freshly powered-up
//! board without any hardware. It provides:
//! - Identity registers preset for the chosen [`BoardVariant`]
//! - A call log of every read and write, for test verification
//! - One-shot failure injection
//!
//! Clones share the same state, so a test can hand one clone to a controller
//! and keep another to inspect what reached the "hardware".

use crate::board::{BoardVariant, ADDR_ID, ADDR_VERSION, EXPECTED_FIRMWARE_VERSION};
use crate::error::{FpgaError, FpgaResult};
use crate::regint::RegisterInterface;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// A register transfer recorded by [`MockRegisterInterface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterCall {
    /// Register read
    Read { address: u32 },
    /// Register write
    Write { address: u32, value: u32 },
}

#[derive(Debug, Default)]
struct MockState {
    registers: HashMap<u32, u32>,
    call_log: Vec<RegisterCall>,
    should_fail_next: bool,
    connected: bool,
}

/// In-memory board.
///
/// # Example
///
/// ```
/// use microfpga::board::BoardVariant;
/// use microfpga::regint::{MockRegisterInterface, RegisterInterface};
///
/// let mut regint = MockRegisterInterface::new(BoardVariant::Cu);
/// regint.write(24, 1).unwrap();
/// assert_eq!(regint.read(24).unwrap(), 1);
/// assert_eq!(regint.call_log().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct MockRegisterInterface {
    variant: BoardVariant,
    state: Arc<Mutex<MockState>>,
}

impl MockRegisterInterface {
    /// Create a connected mock board of the given variant, running the
    /// expected firmware version.
    pub fn new(variant: BoardVariant) -> Self {
        Self::with_firmware_version(variant, EXPECTED_FIRMWARE_VERSION)
    }

    /// Create a mock board reporting an arbitrary firmware version.
    pub fn with_firmware_version(variant: BoardVariant, version: u32) -> Self {
        let mut registers = HashMap::new();
        registers.insert(ADDR_VERSION, version);
        registers.insert(ADDR_ID, variant.id_register_value());

        Self {
            variant,
            state: Arc::new(Mutex::new(MockState {
                registers,
                connected: true,
                ..Default::default()
            })),
        }
    }

    /// Variant reported in the id register.
    pub fn variant(&self) -> BoardVariant {
        self.variant
    }

    /// Set a register directly, bypassing the call log. Simulates the board
    /// changing an input on its own.
    pub fn poke(&self, address: u32, value: u32) {
        self.state.lock().registers.insert(address, value);
    }

    /// Current register content, bypassing the call log.
    pub fn peek(&self, address: u32) -> u32 {
        self.state
            .lock()
            .registers
            .get(&address)
            .copied()
            .unwrap_or(0)
    }

    /// Make the next transfer fail.
    pub fn trigger_failure(&self) {
        self.state.lock().should_fail_next = true;
    }

    /// Get a copy of the call log for verification
    pub fn call_log(&self) -> Vec<RegisterCall> {
        self.state.lock().call_log.clone()
    }

    /// Forget all recorded calls.
    pub fn clear_call_log(&self) {
        self.state.lock().call_log.clear();
    }
}

impl RegisterInterface for MockRegisterInterface {
    fn read(&mut self, address: u32) -> FpgaResult<u32> {
        let mut state = self.state.lock();
        state.call_log.push(RegisterCall::Read { address });

        if !state.connected {
            return Err(FpgaError::NotConnected);
        }
        if std::mem::take(&mut state.should_fail_next) {
            return Err(FpgaError::ShortRead {
                address,
                received: 0,
            });
        }

        let value = state.registers.get(&address).copied().unwrap_or(0);
        debug!(address, value, "mock read");
        Ok(value)
    }

    fn write(&mut self, address: u32, value: u32) -> FpgaResult<()> {
        let mut state = self.state.lock();
        state.call_log.push(RegisterCall::Write { address, value });

        if !state.connected {
            return Err(FpgaError::NotConnected);
        }
        if std::mem::take(&mut state.should_fail_next) {
            return Err(FpgaError::WriteFailed { address, value });
        }

        state.registers.insert(address, value);
        debug!(address, value, "mock write");
        Ok(())
    }

    fn disconnect(&mut self) -> FpgaResult<()> {
        self.state.lock().connected = false;
        debug!("mock {} board disconnected", self.variant);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    fn describe(&self) -> String {
        format!("MockRegisterInterface ({})", self.variant)
    }
}
