//! Configuration using Figment
//!
//! Configuration is loaded from:
//! 1. a TOML file (`config/microfpga.toml` by default)
//! 2. environment variables prefixed with `MICROFPGA_`, nested keys separated
//!    by a double underscore (e.g. `MICROFPGA_CONNECTION__PORT=/dev/ttyACM0`)
//!
//! Every section has defaults, so an empty or missing file yields a usable
//! configuration.
//!
//! # Example
//! ```no_run
//! use microfpga::config::MicroFpgaConfig;
//!
//! let config = MicroFpgaConfig::load()?;
//! config.validate()?;
//! println!("Connecting to {}", config.connection.port);
//! # Ok::<(), microfpga::FpgaError>(())
//! ```

use crate::error::{FpgaError, FpgaResult};
use crate::regint::serial::DEFAULT_BAUD_RATE;
use crate::signal::SignalKind;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/microfpga.toml";

/// Port value requesting a scan of all serial ports.
pub const AUTO_PORT: &str = "auto";

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MicroFpgaConfig {
    /// Application settings
    pub application: ApplicationConfig,
    /// Serial link settings
    pub connection: ConnectionConfig,
    /// Signal inventory requested from the board
    pub signals: SignalCounts,
}

/// Application-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Serial link configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Serial port path, or `"auto"` to scan for the board
    pub port: String,
    /// UART speed in baud
    pub baud_rate: u32,
    /// Read timeout for one register answer, in milliseconds
    pub timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            port: AUTO_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout_ms: 1000,
        }
    }
}

impl ConnectionConfig {
    /// Read timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// True when the port should be discovered by scanning.
    pub fn is_auto(&self) -> bool {
        self.port.eq_ignore_ascii_case(AUTO_PORT)
    }
}

/// Number of signals of each kind to create. Channel indexing starts at 0:
/// with `ttls = 2` the board exposes TTL 0 and TTL 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SignalCounts {
    /// Laser triggers (each one a mode, duration and sequence signal)
    pub lasers: u32,
    /// TTL outputs
    pub ttls: u32,
    /// Servo outputs
    pub servos: u32,
    /// PWM outputs
    pub pwms: u32,
    /// Only Au boards have analog inputs.
    pub analog_inputs: u32,
}

impl SignalCounts {
    /// Counts in the order lasers, TTLs, servos, PWMs, analog inputs.
    pub fn new(lasers: u32, ttls: u32, servos: u32, pwms: u32, analog_inputs: u32) -> Self {
        Self {
            lasers,
            ttls,
            servos,
            pwms,
            analog_inputs,
        }
    }

    /// Requested count for a kind. The three laser kinds share `lasers`.
    pub fn count(&self, kind: SignalKind) -> u32 {
        match kind {
            SignalKind::LaserMode | SignalKind::LaserDuration | SignalKind::LaserSequence => {
                self.lasers
            }
            SignalKind::Ttl => self.ttls,
            SignalKind::Servo => self.servos,
            SignalKind::Pwm => self.pwms,
            SignalKind::AnalogInput => self.analog_inputs,
        }
    }

    /// Check every count against the firmware's capacity.
    pub fn validate(&self) -> FpgaResult<()> {
        for kind in SignalKind::ALL {
            let requested = self.count(kind);
            if requested > kind.capacity() {
                return Err(FpgaError::TooManySignals {
                    kind,
                    requested,
                    capacity: kind.capacity(),
                });
            }
        }
        Ok(())
    }
}

impl MicroFpgaConfig {
    /// Load configuration from the default file and environment variables
    pub fn load() -> FpgaResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path
    pub fn load_from<P: AsRef<Path>>(path: P) -> FpgaResult<Self> {
        let config: MicroFpgaConfig =
            Figment::from(Serialized::defaults(MicroFpgaConfig::default()))
                .merge(Toml::file(path.as_ref()))
                .merge(Env::prefixed("MICROFPGA_").split("__"))
                .extract()?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> FpgaResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.to_lowercase().as_str()) {
            return Err(FpgaError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        if self.connection.port.trim().is_empty() {
            return Err(FpgaError::Configuration(
                "connection.port must name a serial port or be \"auto\"".to_string(),
            ));
        }

        if self.connection.baud_rate == 0 {
            return Err(FpgaError::Configuration(
                "connection.baud_rate must be positive".to_string(),
            ));
        }

        if self.connection.timeout_ms == 0 {
            return Err(FpgaError::Configuration(
                "connection.timeout_ms must be positive".to_string(),
            ));
        }

        self.signals.validate()
    }

    /// Render as TOML, e.g. to seed a configuration file.
    pub fn to_toml(&self) -> FpgaResult<String> {
        toml::to_string_pretty(self).map_err(|e| FpgaError::Configuration(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = MicroFpgaConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.connection.is_auto());
        assert_eq!(config.connection.baud_rate, 57_600);
        assert_eq!(config.connection.timeout(), Duration::from_secs(1));
    }

    #[test]
    fn invalid_log_level() {
        let mut config = MicroFpgaConfig::default();
        config.application.log_level = "loud".to_string();
        assert!(matches!(
            config.validate(),
            Err(FpgaError::Configuration(_))
        ));
    }

    #[test]
    fn empty_port_is_rejected() {
        let mut config = MicroFpgaConfig::default();
        config.connection.port = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn counts_beyond_capacity_are_rejected() {
        let mut config = MicroFpgaConfig::default();
        config.signals = SignalCounts::new(3, 5, 3, 1, 2);
        assert!(matches!(
            config.validate(),
            Err(FpgaError::TooManySignals {
                kind: SignalKind::Ttl,
                requested: 5,
                capacity: 4
            })
        ));
    }

    #[test]
    fn lasers_share_one_count() {
        let counts = SignalCounts::new(3, 2, 3, 1, 2);
        assert_eq!(counts.count(SignalKind::LaserMode), 3);
        assert_eq!(counts.count(SignalKind::LaserSequence), 3);
        assert_eq!(counts.count(SignalKind::AnalogInput), 2);
    }

    #[test]
    fn toml_rendering_contains_every_section() {
        let rendered = MicroFpgaConfig::default().to_toml().unwrap();
        assert!(rendered.contains("[application]"));
        assert!(rendered.contains("[connection]"));
        assert!(rendered.contains("[signals]"));
    }
}
