//! Board variants and identity registers.

use crate::error::{FpgaError, FpgaResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Register holding the firmware version.
pub const ADDR_VERSION: u32 = 100;

/// Register holding the board identifier.
pub const ADDR_ID: u32 = 101;

/// Firmware version this library speaks to.
pub const EXPECTED_FIRMWARE_VERSION: u32 = 2;

/// FPGA board the MicroFPGA firmware runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardVariant {
    /// Alchitry Au
    Au,
    /// Alchitry Au+
    AuPlus,
    /// Alchitry Cu
    Cu,
}

impl BoardVariant {
    /// Map the value of the id register to a variant.
    pub fn from_id(id: u32) -> FpgaResult<Self> {
        match id {
            79 => Ok(BoardVariant::Au),
            80 => Ok(BoardVariant::AuPlus),
            29 => Ok(BoardVariant::Cu),
            other => Err(FpgaError::UnknownBoard(other)),
        }
    }

    /// Value the firmware reports in the id register.
    pub const fn id_register_value(self) -> u32 {
        match self {
            BoardVariant::Au => 79,
            BoardVariant::AuPlus => 80,
            BoardVariant::Cu => 29,
        }
    }

    /// Name as printed on the board: "Au", "Au+" or "Cu".
    pub const fn name(self) -> &'static str {
        match self {
            BoardVariant::Au => "Au",
            BoardVariant::AuPlus => "Au+",
            BoardVariant::Cu => "Cu",
        }
    }

    /// The Cu has no ADC.
    pub const fn supports_analog_input(self) -> bool {
        !matches!(self, BoardVariant::Cu)
    }
}

impl fmt::Display for BoardVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
