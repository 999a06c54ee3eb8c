//! Controller facade over one MicroFPGA board.
//!
//! [`MicroFpgaController`] owns the register interface for the session and the
//! signal inventory built from the requested [`SignalCounts`]. Every getter and
//! setter resolves a channel index against that inventory and then delegates
//! to the corresponding [`Signal`] or [`LaserTrigger`].
//!
//! # Example
//!
//! ```
//! use microfpga::board::BoardVariant;
//! use microfpga::config::SignalCounts;
//! use microfpga::controller::MicroFpgaController;
//! use microfpga::regint::MockRegisterInterface;
//!
//! let regint = MockRegisterInterface::new(BoardVariant::Au);
//! let mut controller = MicroFpgaController::new(regint, SignalCounts::new(3, 2, 3, 1, 2))?;
//! assert_eq!(controller.id(), "Au");
//!
//! controller.set_servo_state(1, 35412)?;
//! assert_eq!(controller.servo_state(1)?, 35412);
//! controller.disconnect()?;
//! # Ok::<(), microfpga::FpgaError>(())
//! ```

use crate::board::{BoardVariant, ADDR_ID, ADDR_VERSION, EXPECTED_FIRMWARE_VERSION};
use crate::config::SignalCounts;
use crate::devices::{LaserState, LaserTrigger};
use crate::error::{FpgaError, FpgaResult};
use crate::regint::RegisterInterface;
use crate::signal::{Signal, SignalKind};
use tracing::{debug, info, instrument};

/// Facade over one connected board.
pub struct MicroFpgaController<R: RegisterInterface> {
    regint: R,
    variant: BoardVariant,
    firmware_version: u32,
    lasers: Vec<LaserTrigger>,
    ttls: Vec<Signal>,
    servos: Vec<Signal>,
    pwms: Vec<Signal>,
    analog_inputs: Vec<Signal>,
}

fn build_signals(kind: SignalKind, count: u32) -> FpgaResult<Vec<Signal>> {
    (0..count).map(|id| Signal::new(kind, id)).collect()
}

fn lookup<T>(signals: &[T], kind: SignalKind, id: u32) -> FpgaResult<&T> {
    usize::try_from(id)
        .ok()
        .and_then(|index| signals.get(index))
        .ok_or(FpgaError::UnknownSignal {
            kind,
            id,
            count: u32::try_from(signals.len()).unwrap_or(u32::MAX),
        })
}

impl<R: RegisterInterface> MicroFpgaController<R> {
    /// Identify the board behind `regint` and build the signal inventory.
    ///
    /// Fails when a count exceeds the firmware's capacity, the firmware
    /// version is not the expected one, the board id is unknown, or analog
    /// inputs are requested from a board without them.
    #[instrument(skip(regint), fields(link = %regint.describe()))]
    pub fn new(mut regint: R, counts: SignalCounts) -> FpgaResult<Self> {
        counts.validate()?;

        let firmware_version = regint.read(ADDR_VERSION)?;
        if firmware_version != EXPECTED_FIRMWARE_VERSION {
            return Err(FpgaError::FirmwareVersionMismatch {
                expected: EXPECTED_FIRMWARE_VERSION,
                found: firmware_version,
            });
        }

        let variant = BoardVariant::from_id(regint.read(ADDR_ID)?)?;
        if counts.analog_inputs > 0 && !variant.supports_analog_input() {
            return Err(FpgaError::UnsupportedOnBoard {
                kind: SignalKind::AnalogInput,
                board: variant.name(),
            });
        }

        let lasers = (0..counts.lasers)
            .map(LaserTrigger::new)
            .collect::<FpgaResult<Vec<_>>>()?;

        let controller = Self {
            variant,
            firmware_version,
            lasers,
            ttls: build_signals(SignalKind::Ttl, counts.ttls)?,
            servos: build_signals(SignalKind::Servo, counts.servos)?,
            pwms: build_signals(SignalKind::Pwm, counts.pwms)?,
            analog_inputs: build_signals(SignalKind::AnalogInput, counts.analog_inputs)?,
            regint,
        };

        info!(
            "Connected to MicroFPGA {} (firmware v{}) via {}",
            variant,
            firmware_version,
            controller.regint.describe()
        );
        debug!(?counts, "signal inventory created");
        Ok(controller)
    }

    /// Board variant name: `"Au"`, `"Au+"` or `"Cu"`.
    pub fn id(&self) -> &'static str {
        self.variant.name()
    }

    /// Board variant identified at connection.
    pub fn variant(&self) -> BoardVariant {
        self.variant
    }

    /// Firmware version read at connection.
    pub fn firmware_version(&self) -> u32 {
        self.firmware_version
    }

    /// Whether the register interface still has an open link.
    pub fn is_connected(&self) -> bool {
        self.regint.is_connected()
    }

    /// The register interface used by this controller.
    pub fn register_interface(&self) -> &R {
        &self.regint
    }

    /// Inventory sizes, one count per kind.
    pub fn counts(&self) -> SignalCounts {
        SignalCounts::new(
            self.number_of_lasers(),
            self.number_of_ttls(),
            self.number_of_servos(),
            self.number_of_pwms(),
            self.number_of_analog_inputs(),
        )
    }

    /// Number of laser triggers.
    pub fn number_of_lasers(&self) -> u32 {
        len_u32(&self.lasers)
    }

    /// Number of TTL outputs.
    pub fn number_of_ttls(&self) -> u32 {
        len_u32(&self.ttls)
    }

    /// Number of servo outputs.
    pub fn number_of_servos(&self) -> u32 {
        len_u32(&self.servos)
    }

    /// Number of PWM outputs.
    pub fn number_of_pwms(&self) -> u32 {
        len_u32(&self.pwms)
    }

    /// Number of analog inputs.
    pub fn number_of_analog_inputs(&self) -> u32 {
        len_u32(&self.analog_inputs)
    }

    /// Resolve any single-register signal by kind and index.
    pub fn signal(&self, kind: SignalKind, id: u32) -> FpgaResult<Signal> {
        let signal = match kind {
            SignalKind::LaserMode => *self.laser(id)?.mode_signal(),
            SignalKind::LaserDuration => *self.laser(id)?.duration_signal(),
            SignalKind::LaserSequence => *self.laser(id)?.sequence_signal(),
            SignalKind::Ttl => *lookup(&self.ttls, kind, id)?,
            SignalKind::Servo => *lookup(&self.servos, kind, id)?,
            SignalKind::Pwm => *lookup(&self.pwms, kind, id)?,
            SignalKind::AnalogInput => *lookup(&self.analog_inputs, kind, id)?,
        };
        Ok(signal)
    }

    /// Read any signal by kind and index.
    pub fn state(&mut self, kind: SignalKind, id: u32) -> FpgaResult<u32> {
        let signal = self.signal(kind, id)?;
        signal.get_state(&mut self.regint)
    }

    /// Write any signal by kind and index.
    pub fn set_state(&mut self, kind: SignalKind, id: u32, value: i64) -> FpgaResult<()> {
        let signal = self.signal(kind, id)?;
        signal.set_state(&mut self.regint, value)
    }

    fn laser(&self, id: u32) -> FpgaResult<LaserTrigger> {
        lookup(&self.lasers, SignalKind::LaserMode, id).copied()
    }

    /// Current mode of laser `id`.
    pub fn laser_mode_state(&mut self, id: u32) -> FpgaResult<u32> {
        self.laser(id)?.mode(&mut self.regint)
    }

    /// Set the mode of laser `id` (0 to 4, see [`crate::devices::LaserMode`]).
    pub fn set_laser_mode_state(&mut self, id: u32, mode: i64) -> FpgaResult<()> {
        self.laser(id)?.set_mode(&mut self.regint, mode)
    }

    /// Pulse duration of laser `id` in microseconds.
    pub fn laser_duration_state(&mut self, id: u32) -> FpgaResult<u32> {
        self.laser(id)?.duration(&mut self.regint)
    }

    /// Set the pulse duration of laser `id` in microseconds.
    pub fn set_laser_duration_state(&mut self, id: u32, duration: i64) -> FpgaResult<()> {
        self.laser(id)?.set_duration(&mut self.regint, duration)
    }

    /// Pulse sequence of laser `id` as a 16-bit word.
    pub fn laser_sequence_state(&mut self, id: u32) -> FpgaResult<u32> {
        self.laser(id)?.sequence(&mut self.regint)
    }

    /// Set the pulse sequence of laser `id`; see [`crate::devices::format_sequence`].
    pub fn set_laser_sequence_state(&mut self, id: u32, sequence: i64) -> FpgaResult<()> {
        self.laser(id)?.set_sequence(&mut self.regint, sequence)
    }

    /// Write mode, duration and sequence of a laser in one call.
    pub fn set_laser_state(
        &mut self,
        id: u32,
        mode: i64,
        duration: i64,
        sequence: i64,
    ) -> FpgaResult<()> {
        self.laser(id)?
            .set_state(&mut self.regint, mode, duration, sequence)
    }

    /// Mode, duration and sequence of laser `id`.
    pub fn laser_state(&mut self, id: u32) -> FpgaResult<LaserState> {
        self.laser(id)?.state(&mut self.regint)
    }

    /// Level of TTL output `id`.
    pub fn ttl_state(&mut self, id: u32) -> FpgaResult<u32> {
        self.state(SignalKind::Ttl, id)
    }

    /// Drive TTL output `id` low (0) or high (1).
    pub fn set_ttl_state(&mut self, id: u32, value: i64) -> FpgaResult<()> {
        self.set_state(SignalKind::Ttl, id, value)
    }

    /// Position of servo `id`.
    pub fn servo_state(&mut self, id: u32) -> FpgaResult<u32> {
        self.state(SignalKind::Servo, id)
    }

    /// Move servo `id` to `position` (0 to 65535).
    pub fn set_servo_state(&mut self, id: u32, position: i64) -> FpgaResult<()> {
        self.set_state(SignalKind::Servo, id, position)
    }

    /// Duty cycle of PWM output `id`.
    pub fn pwm_state(&mut self, id: u32) -> FpgaResult<u32> {
        self.state(SignalKind::Pwm, id)
    }

    /// Set the duty cycle of PWM output `id` (0 to 255).
    pub fn set_pwm_state(&mut self, id: u32, value: i64) -> FpgaResult<()> {
        self.set_state(SignalKind::Pwm, id, value)
    }

    /// Latest conversion of analog input `id`.
    pub fn analog_input_state(&mut self, id: u32) -> FpgaResult<u32> {
        self.state(SignalKind::AnalogInput, id)
    }

    /// Close the register interface. The signal inventory is dropped with
    /// the controller.
    pub fn disconnect(mut self) -> FpgaResult<()> {
        self.regint.disconnect()?;
        info!("Disconnected from MicroFPGA {}", self.variant);
        Ok(())
    }
}

fn len_u32<T>(items: &[T]) -> u32 {
    // Inventories are bounded by kind capacities.
    u32::try_from(items.len()).unwrap_or(u32::MAX)
}

#[cfg(feature = "instrument_serial")]
impl MicroFpgaController<crate::regint::SerialRegisterInterface<Box<dyn serialport::SerialPort>>> {
    /// Open the serial link described by `connection` (scanning all ports
    /// when it is `"auto"`) and identify the board.
    pub fn connect(
        connection: &crate::config::ConnectionConfig,
        counts: SignalCounts,
    ) -> FpgaResult<Self> {
        use crate::regint::SerialRegisterInterface;

        let regint = if connection.is_auto() {
            SerialRegisterInterface::discover(connection.baud_rate, connection.timeout())?
        } else {
            SerialRegisterInterface::open(
                &connection.port,
                connection.baud_rate,
                connection.timeout(),
            )?
        };
        Self::new(regint, counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regint::mock::{MockRegisterInterface, RegisterCall};

    fn counts() -> SignalCounts {
        SignalCounts::new(3, 2, 3, 1, 2)
    }

    fn controller(
        variant: BoardVariant,
    ) -> (
        MicroFpgaController<MockRegisterInterface>,
        MockRegisterInterface,
    ) {
        let regint = MockRegisterInterface::new(variant);
        let observer = regint.clone();
        let controller = MicroFpgaController::new(regint, counts()).unwrap();
        observer.clear_call_log();
        (controller, observer)
    }

    #[test]
    fn identifies_the_board_on_creation() {
        let regint = MockRegisterInterface::new(BoardVariant::Au);
        let observer = regint.clone();
        let controller = MicroFpgaController::new(regint, counts()).unwrap();

        assert_eq!(controller.id(), "Au");
        assert_eq!(controller.firmware_version(), EXPECTED_FIRMWARE_VERSION);
        assert_eq!(controller.counts(), counts());
        assert_eq!(
            observer.call_log(),
            vec![
                RegisterCall::Read {
                    address: ADDR_VERSION
                },
                RegisterCall::Read { address: ADDR_ID },
            ]
        );
    }

    #[test]
    fn wrong_firmware_version_is_refused() {
        let regint = MockRegisterInterface::with_firmware_version(BoardVariant::Au, 1);
        let result = MicroFpgaController::new(regint, counts());
        assert!(matches!(
            result,
            Err(FpgaError::FirmwareVersionMismatch { found: 1, .. })
        ));
    }

    #[test]
    fn analog_inputs_require_an_au_board() {
        let regint = MockRegisterInterface::new(BoardVariant::Cu);
        let result = MicroFpgaController::new(regint, counts());
        assert!(matches!(
            result,
            Err(FpgaError::UnsupportedOnBoard {
                kind: SignalKind::AnalogInput,
                board: "Cu"
            })
        ));

        let regint = MockRegisterInterface::new(BoardVariant::Cu);
        let controller =
            MicroFpgaController::new(regint, SignalCounts::new(3, 2, 3, 1, 0)).unwrap();
        assert_eq!(controller.id(), "Cu");
    }

    #[test]
    fn too_many_signals_fail_before_any_io() {
        let regint = MockRegisterInterface::new(BoardVariant::Au);
        let observer = regint.clone();
        let result = MicroFpgaController::new(regint, SignalCounts::new(9, 0, 0, 0, 0));
        assert!(matches!(result, Err(FpgaError::TooManySignals { .. })));
        assert!(observer.call_log().is_empty());
    }

    #[test]
    fn unknown_index_never_reaches_hardware() {
        let (mut controller, observer) = controller(BoardVariant::Au);

        let err = controller.set_ttl_state(2, 1).unwrap_err();
        assert!(matches!(
            err,
            FpgaError::UnknownSignal {
                kind: SignalKind::Ttl,
                id: 2,
                count: 2
            }
        ));
        assert!(controller.laser_state(3).is_err());
        assert!(controller.pwm_state(1).is_err());
        assert!(observer.call_log().is_empty());
    }

    #[test]
    fn getters_and_setters_hit_the_expected_registers() {
        let (mut controller, observer) = controller(BoardVariant::Au);

        controller.set_ttl_state(1, 1).unwrap();
        controller.set_servo_state(2, 1000).unwrap();
        controller.set_pwm_state(0, 200).unwrap();
        controller.set_laser_duration_state(1, 2000).unwrap();

        assert_eq!(controller.ttl_state(1).unwrap(), 1);
        assert_eq!(controller.servo_state(2).unwrap(), 1000);
        assert_eq!(controller.pwm_state(0).unwrap(), 200);
        assert_eq!(controller.laser_duration_state(1).unwrap(), 2000);

        assert_eq!(observer.peek(25), 1);
        assert_eq!(observer.peek(30), 1000);
        assert_eq!(observer.peek(35), 200);
        assert_eq!(observer.peek(9), 2000);
    }

    #[test]
    fn analog_inputs_are_read_only() {
        let (mut controller, observer) = controller(BoardVariant::Au);
        observer.poke(41, 512);

        assert_eq!(controller.analog_input_state(1).unwrap(), 512);
        let err = controller
            .set_state(SignalKind::AnalogInput, 1, 0)
            .unwrap_err();
        assert!(matches!(err, FpgaError::ReadOnlySignal { .. }));
        assert_eq!(observer.call_log(), vec![RegisterCall::Read { address: 41 }]);
    }

    #[test]
    fn disconnect_releases_the_register_interface() {
        let (controller, observer) = controller(BoardVariant::Au);
        assert!(controller.is_connected());
        controller.disconnect().unwrap();

        let mut regint = observer;
        assert!(!regint.is_connected());
        assert!(regint.read(0).is_err());
    }
}
