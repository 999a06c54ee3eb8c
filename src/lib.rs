//! # MicroFPGA host library
//!
//! Host-side control of a MicroFPGA board: laser triggers, TTL outputs,
//! servos, PWM channels and (on Au boards) analog inputs, all exposed by the
//! firmware as a flat file of 32-bit registers behind a serial link.
//!
//! ## Crate Structure
//!
//! - **`signal`**: [`Signal`] and [`SignalKind`], the validate-then-delegate
//!   accessor for one register-backed channel.
//! - **`devices`**: typed collections of signals, such as [`LaserTrigger`].
//! - **`controller`**: [`MicroFpgaController`], the facade that owns the
//!   register interface and the signal inventory for a session.
//! - **`regint`**: the [`RegisterInterface`] trait, its wire protocol, the
//!   serial implementation and an in-memory mock.
//! - **`board`**: board variants (Au, Au+, Cu) and identity registers.
//! - **`config`**: TOML/environment configuration loaded with `figment`.
//! - **`logging`**: `tracing` subscriber setup.
//! - **`error`**: the crate-wide [`FpgaError`].

pub mod board;
pub mod config;
pub mod controller;
pub mod devices;
pub mod error;
pub mod logging;
pub mod regint;
pub mod signal;

pub use board::BoardVariant;
pub use config::{MicroFpgaConfig, SignalCounts};
pub use controller::MicroFpgaController;
pub use devices::{format_sequence, LaserMode, LaserState, LaserTrigger};
pub use error::{FpgaError, FpgaResult};
pub use regint::RegisterInterface;
pub use signal::{Direction, Signal, SignalKind};
