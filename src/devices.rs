//! Typed signal collections.
//!
//! A laser trigger is driven by three registers (mode, pulse duration and
//! pulse sequence) that share one laser index. [`LaserTrigger`] groups them so
//! the controller can address "laser 2" instead of three separate signals.
//! TTL lines, servos, PWM channels and analog inputs map to a single register
//! each and are used as plain [`Signal`]s.

use crate::error::{FpgaError, FpgaResult};
use crate::regint::RegisterInterface;
use crate::signal::{Signal, SignalKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of bits in a laser pulse sequence.
pub const SEQUENCE_LENGTH: usize = 16;

/// Trigger mode of a laser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaserMode {
    /// Laser always off.
    Off = 0,
    /// Laser always on.
    On = 1,
    /// Pulse on the rising edge of the camera trigger.
    Rising = 2,
    /// Pulse on the falling edge of the camera trigger.
    Falling = 3,
    /// Follow the camera trigger.
    Camera = 4,
}

impl LaserMode {
    /// Register value of this mode.
    pub const fn value(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for LaserMode {
    type Error = FpgaError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(LaserMode::Off),
            1 => Ok(LaserMode::On),
            2 => Ok(LaserMode::Rising),
            3 => Ok(LaserMode::Falling),
            4 => Ok(LaserMode::Camera),
            other => Err(FpgaError::InvalidLaserMode(other)),
        }
    }
}

impl fmt::Display for LaserMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LaserMode::Off => "off",
            LaserMode::On => "on",
            LaserMode::Rising => "rising",
            LaserMode::Falling => "falling",
            LaserMode::Camera => "camera",
        };
        f.write_str(name)
    }
}

/// Parse a pulse sequence written as 16 binary digits, most significant
/// first, e.g. `"1010101010101010"`.
pub fn format_sequence(sequence: &str) -> FpgaResult<u32> {
    if sequence.len() != SEQUENCE_LENGTH || !sequence.bytes().all(|b| b == b'0' || b == b'1') {
        return Err(FpgaError::InvalidSequence(sequence.to_string()));
    }
    u32::from_str_radix(sequence, 2).map_err(|_| FpgaError::InvalidSequence(sequence.to_string()))
}

/// Snapshot of the three registers of one laser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaserState {
    /// Raw mode register
    pub mode: u32,
    /// Pulse duration in microseconds
    pub duration: u32,
    /// 16-bit pulse sequence
    pub sequence: u32,
}

impl fmt::Display for LaserState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}", self.mode, self.duration, self.sequence)
    }
}

/// The mode, duration and sequence signals of one laser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaserTrigger {
    mode: Signal,
    duration: Signal,
    sequence: Signal,
}

impl LaserTrigger {
    /// Laser trigger `id`, made of the three laser signals with that index.
    pub fn new(id: u32) -> FpgaResult<Self> {
        Ok(Self {
            mode: Signal::new(SignalKind::LaserMode, id)?,
            duration: Signal::new(SignalKind::LaserDuration, id)?,
            sequence: Signal::new(SignalKind::LaserSequence, id)?,
        })
    }

    /// Channel index shared by the three signals.
    pub fn id(&self) -> u32 {
        self.mode.id()
    }

    /// Signal holding the trigger mode.
    pub fn mode_signal(&self) -> &Signal {
        &self.mode
    }

    /// Signal holding the pulse duration.
    pub fn duration_signal(&self) -> &Signal {
        &self.duration
    }

    /// Signal holding the pulse sequence.
    pub fn sequence_signal(&self) -> &Signal {
        &self.sequence
    }

    /// Read the trigger mode.
    pub fn mode<R: RegisterInterface + ?Sized>(&self, regint: &mut R) -> FpgaResult<u32> {
        self.mode.get_state(regint)
    }

    /// Write the trigger mode.
    pub fn set_mode<R: RegisterInterface + ?Sized>(
        &self,
        regint: &mut R,
        mode: i64,
    ) -> FpgaResult<()> {
        self.mode.set_state(regint, mode)
    }

    /// Read the pulse duration.
    pub fn duration<R: RegisterInterface + ?Sized>(&self, regint: &mut R) -> FpgaResult<u32> {
        self.duration.get_state(regint)
    }

    /// Pulse duration in microseconds.
    pub fn set_duration<R: RegisterInterface + ?Sized>(
        &self,
        regint: &mut R,
        duration: i64,
    ) -> FpgaResult<()> {
        self.duration.set_state(regint, duration)
    }

    /// Read the pulse sequence.
    pub fn sequence<R: RegisterInterface + ?Sized>(&self, regint: &mut R) -> FpgaResult<u32> {
        self.sequence.get_state(regint)
    }

    /// Write the pulse sequence.
    pub fn set_sequence<R: RegisterInterface + ?Sized>(
        &self,
        regint: &mut R,
        sequence: i64,
    ) -> FpgaResult<()> {
        self.sequence.set_state(regint, sequence)
    }

    /// Write mode, duration and sequence, in that order.
    ///
    /// Stops at the first failure; registers written before it keep their
    /// new value.
    pub fn set_state<R: RegisterInterface + ?Sized>(
        &self,
        regint: &mut R,
        mode: i64,
        duration: i64,
        sequence: i64,
    ) -> FpgaResult<()> {
        self.set_mode(regint, mode)?;
        self.set_duration(regint, duration)?;
        self.set_sequence(regint, sequence)
    }

    /// Read all three parameters.
    pub fn state<R: RegisterInterface + ?Sized>(&self, regint: &mut R) -> FpgaResult<LaserState> {
        Ok(LaserState {
            mode: self.mode(regint)?,
            duration: self.duration(regint)?,
            sequence: self.sequence(regint)?,
        })
    }
}
