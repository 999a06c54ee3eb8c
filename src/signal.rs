//! Addressable I/O signals of a MicroFPGA board.
//!
//! Every channel on the board (one laser trigger parameter, one TTL line, one
//! servo, ...) is a [`Signal`]: a [`SignalKind`] plus a channel index. The kind
//! fixes everything that differs between channels:
//!
//! - the base address of the kind's first register,
//! - how many channels of that kind the firmware provides,
//! - the direction (inputs can only be read),
//! - which candidate values a write may carry.
//!
//! A signal's register address is always `base_address + id`; callers never
//! compute it themselves.
//!
//! Signals do not own a link to the board. The register interface is passed
//! to [`Signal::get_state`] and [`Signal::set_state`] on every call, so one
//! interface can serve the whole inventory without shared ownership.
//!
//! # Example
//!
//! ```
//! use microfpga::regint::mock::MockRegisterInterface;
//! use microfpga::board::BoardVariant;
//! use microfpga::signal::{Signal, SignalKind};
//!
//! let mut regint = MockRegisterInterface::new(BoardVariant::Au);
//! let servo = Signal::new(SignalKind::Servo, 1).unwrap();
//!
//! servo.set_state(&mut regint, 35412).unwrap();
//! assert_eq!(servo.get_state(&mut regint).unwrap(), 35412);
//! assert!(servo.set_state(&mut regint, -1).is_err());
//! ```

use crate::error::{FpgaError, FpgaResult};
use crate::regint::RegisterInterface;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use tracing::{trace, warn};

/// Direction of a signal, fixed for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Driven by the board, read by the host.
    Input,
    /// Driven by the host.
    Output,
}

/// The kinds of signal exposed by the MicroFPGA firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    /// Trigger mode of a laser (see [`crate::devices::LaserMode`]).
    LaserMode,
    /// Pulse duration of a laser, in microseconds.
    LaserDuration,
    /// 16-bit pulse sequence of a laser.
    LaserSequence,
    /// Digital TTL output.
    Ttl,
    /// Servo position.
    Servo,
    /// PWM duty cycle.
    Pwm,
    /// Analog input (Au boards only).
    AnalogInput,
}

impl SignalKind {
    /// Every kind, in register-map order.
    pub const ALL: [SignalKind; 7] = [
        SignalKind::LaserMode,
        SignalKind::LaserDuration,
        SignalKind::LaserSequence,
        SignalKind::Ttl,
        SignalKind::Servo,
        SignalKind::Pwm,
        SignalKind::AnalogInput,
    ];

    /// Address of the first register of this kind.
    pub const fn base_address(self) -> u32 {
        match self {
            SignalKind::LaserMode => 0,
            SignalKind::LaserDuration => 8,
            SignalKind::LaserSequence => 16,
            SignalKind::Ttl => 24,
            SignalKind::Servo => 28,
            SignalKind::Pwm => 35,
            SignalKind::AnalogInput => 40,
        }
    }

    /// Number of channels of this kind provided by the firmware.
    pub const fn capacity(self) -> u32 {
        match self {
            SignalKind::LaserMode | SignalKind::LaserDuration | SignalKind::LaserSequence => 8,
            SignalKind::Ttl => 4,
            SignalKind::Servo => 7,
            SignalKind::Pwm => 5,
            SignalKind::AnalogInput => 8,
        }
    }

    /// Only analog inputs are read-only.
    pub const fn direction(self) -> Direction {
        match self {
            SignalKind::AnalogInput => Direction::Input,
            _ => Direction::Output,
        }
    }

    /// Range of register values this kind can hold.
    pub const fn value_range(self) -> RangeInclusive<i64> {
        match self {
            SignalKind::LaserMode => 0..=4,
            SignalKind::LaserDuration
            | SignalKind::LaserSequence
            | SignalKind::Servo
            | SignalKind::AnalogInput => 0..=65535,
            SignalKind::Ttl => 0..=1,
            SignalKind::Pwm => 0..=255,
        }
    }

    /// Legality predicate for candidate write values.
    pub fn is_value_allowed(self, value: i64) -> bool {
        self.value_range().contains(&value)
    }

    /// Short name, also used on the command line.
    pub const fn name(self) -> &'static str {
        match self {
            SignalKind::LaserMode => "laser mode",
            SignalKind::LaserDuration => "laser duration",
            SignalKind::LaserSequence => "laser sequence",
            SignalKind::Ttl => "ttl",
            SignalKind::Servo => "servo",
            SignalKind::Pwm => "pwm",
            SignalKind::AnalogInput => "analog input",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One addressable channel on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signal {
    kind: SignalKind,
    id: u32,
}

impl Signal {
    /// Create the signal for channel `id` of `kind`.
    ///
    /// Fails with [`FpgaError::ChannelOutOfRange`] when `id` is not below the
    /// kind's capacity, which keeps every signal inside its kind's address
    /// block.
    pub fn new(kind: SignalKind, id: u32) -> FpgaResult<Self> {
        if id >= kind.capacity() {
            return Err(FpgaError::ChannelOutOfRange {
                kind,
                id,
                capacity: kind.capacity(),
            });
        }
        Ok(Self { kind, id })
    }

    /// Kind of this signal.
    pub fn kind(&self) -> SignalKind {
        self.kind
    }

    /// Direction of the signal kind.
    pub fn direction(&self) -> Direction {
        self.kind.direction()
    }

    /// Channel index within the kind.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// First register of the kind.
    pub fn base_address(&self) -> u32 {
        self.kind.base_address()
    }

    /// Register address of this signal.
    pub fn address(&self) -> u32 {
        self.base_address() + self.id
    }

    /// Whether `value` is legal for this signal kind.
    pub fn is_value_allowed(&self, value: i64) -> bool {
        self.kind.is_value_allowed(value)
    }

    /// Read the current register value.
    ///
    /// Always goes to the register interface, for inputs and outputs alike.
    pub fn get_state<R>(&self, regint: &mut R) -> FpgaResult<u32>
    where
        R: RegisterInterface + ?Sized,
    {
        let value = regint.read(self.address())?;
        trace!(kind = %self.kind, id = self.id, value, "read signal");
        Ok(value)
    }

    /// Write `value` to the signal's register.
    ///
    /// Input signals and values rejected by the kind's legality predicate fail
    /// without any call to the register interface. Otherwise a single write is
    /// issued and its outcome returned.
    pub fn set_state<R>(&self, regint: &mut R, value: i64) -> FpgaResult<()>
    where
        R: RegisterInterface + ?Sized,
    {
        if self.direction() == Direction::Input {
            warn!(kind = %self.kind, id = self.id, value, "rejected write to input signal");
            return Err(FpgaError::ReadOnlySignal {
                kind: self.kind,
                id: self.id,
            });
        }

        // Legal ranges all fit in a register word.
        let word = match u32::try_from(value) {
            Ok(word) if self.is_value_allowed(value) => word,
            _ => {
                warn!(kind = %self.kind, id = self.id, value, "rejected illegal value");
                return Err(FpgaError::ValueNotAllowed {
                    kind: self.kind,
                    id: self.id,
                    value,
                });
            }
        };

        regint.write(self.address(), word)?;
        trace!(kind = %self.kind, id = self.id, value = word, "wrote signal");
        Ok(())
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::BoardVariant;
    use crate::regint::mock::{MockRegisterInterface, RegisterCall};
    use std::collections::HashSet;
    use tracing_test::traced_test;

    fn regint() -> MockRegisterInterface {
        let regint = MockRegisterInterface::new(BoardVariant::Au);
        regint.clear_call_log();
        regint
    }

    #[test]
    fn servo_write_goes_to_base_plus_id() {
        let mut regint = regint();
        let servo = Signal::new(SignalKind::Servo, 1).unwrap();

        assert_eq!(servo.direction(), Direction::Output);
        assert_eq!(servo.id(), 1);
        assert_eq!(servo.address(), 29);

        servo.set_state(&mut regint, 35412).unwrap();
        assert_eq!(
            regint.call_log(),
            vec![RegisterCall::Write {
                address: 29,
                value: 35412
            }]
        );
    }

    #[test]
    fn negative_value_never_reaches_register_interface() {
        let mut regint = regint();
        let servo = Signal::new(SignalKind::Servo, 1).unwrap();

        let err = servo.set_state(&mut regint, -1).unwrap_err();
        assert!(matches!(err, FpgaError::ValueNotAllowed { value: -1, .. }));
        assert!(regint.call_log().is_empty());
    }

    #[test]
    fn write_failure_is_reported() {
        let mut regint = regint();
        let servo = Signal::new(SignalKind::Servo, 1).unwrap();

        regint.trigger_failure();
        let err = servo.set_state(&mut regint, 100).unwrap_err();
        assert!(!err.is_rejected_without_io());
    }

    #[test]
    fn input_signal_rejects_every_write() {
        let mut regint = regint();
        let ai = Signal::new(SignalKind::AnalogInput, 0).unwrap();

        assert_eq!(ai.direction(), Direction::Input);
        for value in [0, 1, 65535] {
            let err = ai.set_state(&mut regint, value).unwrap_err();
            assert!(matches!(err, FpgaError::ReadOnlySignal { .. }));
        }
        assert!(regint.call_log().is_empty());
    }

    #[test]
    #[traced_test]
    fn rejected_write_is_logged() {
        let mut regint = regint();
        let ttl = Signal::new(SignalKind::Ttl, 0).unwrap();
        assert!(ttl.set_state(&mut regint, 2).is_err());
        assert!(logs_contain("rejected illegal value"));
    }

    #[test]
    fn read_always_calls_through_regardless_of_direction() {
        let mut regint = regint();
        regint.poke(42, 1234);

        let ai = Signal::new(SignalKind::AnalogInput, 2).unwrap();
        assert_eq!(ai.get_state(&mut regint).unwrap(), 1234);

        let pwm = Signal::new(SignalKind::Pwm, 0).unwrap();
        pwm.get_state(&mut regint).unwrap();

        assert_eq!(
            regint.call_log(),
            vec![
                RegisterCall::Read { address: 42 },
                RegisterCall::Read { address: 35 },
            ]
        );
    }

    #[test]
    fn legality_predicates_match_register_widths() {
        assert!(SignalKind::Ttl.is_value_allowed(1));
        assert!(!SignalKind::Ttl.is_value_allowed(2));
        assert!(SignalKind::Pwm.is_value_allowed(255));
        assert!(!SignalKind::Pwm.is_value_allowed(256));
        assert!(SignalKind::LaserMode.is_value_allowed(4));
        assert!(!SignalKind::LaserMode.is_value_allowed(5));
        assert!(SignalKind::Servo.is_value_allowed(65535));
        assert!(!SignalKind::Servo.is_value_allowed(65536));
        assert!(!SignalKind::LaserDuration.is_value_allowed(-1));
    }

    #[test]
    fn channel_beyond_capacity_is_rejected() {
        let err = Signal::new(SignalKind::Ttl, 4).unwrap_err();
        assert!(matches!(
            err,
            FpgaError::ChannelOutOfRange {
                capacity: 4,
                id: 4,
                ..
            }
        ));
        assert!(Signal::new(SignalKind::Ttl, 3).is_ok());
    }

    #[test]
    fn addresses_are_unique_across_the_register_map() {
        let mut seen = HashSet::new();
        for kind in SignalKind::ALL {
            for id in 0..kind.capacity() {
                let signal = Signal::new(kind, id).unwrap();
                assert!(seen.insert(signal.address()), "collision at {signal}");
            }
        }
        assert!(!seen.contains(&crate::board::ADDR_VERSION));
        assert!(!seen.contains(&crate::board::ADDR_ID));
    }
}
