//! CLI Entry Point for microfpga
//!
//! Provides command-line access to a MicroFPGA board:
//! - Query the board identity
//! - Read or write any signal
//! - Configure a laser trigger
//! - Run the demonstration sequence
//!
//! # Usage
//!
//! ```bash
//! microfpga --port /dev/ttyUSB0 id
//! microfpga set servo 1 35412
//! microfpga laser 2 --mode rising --duration 2000 --sequence 1010101010101010
//! microfpga --mock au demo
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use microfpga::config::{MicroFpgaConfig, DEFAULT_CONFIG_PATH};
use microfpga::logging;
use microfpga::regint::MockRegisterInterface;
use microfpga::{
    format_sequence, BoardVariant, LaserMode, MicroFpgaController, RegisterInterface, SignalKind,
};
use std::path::PathBuf;
use tracing::warn;

#[derive(Parser)]
#[command(name = "microfpga")]
#[command(about = "Control a MicroFPGA board over its serial register interface", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Serial port, overrides the configuration ("auto" scans all ports)
    #[arg(long)]
    port: Option<String>,

    /// Use an in-memory board instead of hardware
    #[arg(long, value_enum)]
    mock: Option<BoardArg>,

    /// Log level, overrides the configuration
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective configuration as TOML
    Config,

    #[command(flatten)]
    Board(BoardCommand),
}

/// Commands that talk to a board.
#[derive(Subcommand)]
enum BoardCommand {
    /// Print the board variant and firmware version
    Id,

    /// Read one signal
    Get {
        #[arg(value_enum)]
        kind: KindArg,
        index: u32,
    },

    /// Write one signal
    Set {
        #[arg(value_enum)]
        kind: KindArg,
        index: u32,
        #[arg(allow_negative_numbers = true)]
        value: i64,
    },

    /// Configure a laser trigger and print its state
    Laser {
        index: u32,
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
        /// Pulse duration in microseconds
        #[arg(long)]
        duration: Option<i64>,
        /// 16 binary digits, e.g. 1010101010101010
        #[arg(long)]
        sequence: Option<String>,
    },

    /// Run the demonstration sequence (servo move, laser configuration)
    Demo,
}

#[derive(Clone, Copy, ValueEnum)]
enum BoardArg {
    Au,
    AuPlus,
    Cu,
}

impl From<BoardArg> for BoardVariant {
    fn from(value: BoardArg) -> Self {
        match value {
            BoardArg::Au => BoardVariant::Au,
            BoardArg::AuPlus => BoardVariant::AuPlus,
            BoardArg::Cu => BoardVariant::Cu,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    LaserMode,
    LaserDuration,
    LaserSequence,
    Ttl,
    Servo,
    Pwm,
    AnalogInput,
}

impl From<KindArg> for SignalKind {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::LaserMode => SignalKind::LaserMode,
            KindArg::LaserDuration => SignalKind::LaserDuration,
            KindArg::LaserSequence => SignalKind::LaserSequence,
            KindArg::Ttl => SignalKind::Ttl,
            KindArg::Servo => SignalKind::Servo,
            KindArg::Pwm => SignalKind::Pwm,
            KindArg::AnalogInput => SignalKind::AnalogInput,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Off,
    On,
    Rising,
    Falling,
    Camera,
}

impl From<ModeArg> for LaserMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Off => LaserMode::Off,
            ModeArg::On => LaserMode::On,
            ModeArg::Rising => LaserMode::Rising,
            ModeArg::Falling => LaserMode::Falling,
            ModeArg::Camera => LaserMode::Camera,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = MicroFpgaConfig::load_from(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    if let Some(port) = cli.port {
        config.connection.port = port;
    }
    if let Some(level) = cli.log_level {
        config.application.log_level = level;
    }
    config.validate()?;
    logging::init_from_config(&config)?;

    let command = match cli.command {
        Commands::Config => {
            print!("{}", config.to_toml()?);
            return Ok(());
        }
        Commands::Board(command) => command,
    };

    match cli.mock {
        Some(board) => {
            let regint = MockRegisterInterface::new(board.into());
            let controller = MicroFpgaController::new(regint, config.signals)?;
            run(controller, command)
        }
        None => connect_and_run(&config, command),
    }
}

#[cfg(feature = "instrument_serial")]
fn connect_and_run(config: &MicroFpgaConfig, command: BoardCommand) -> Result<()> {
    let controller = MicroFpgaController::connect(&config.connection, config.signals)
        .with_context(|| format!("Failed to connect via '{}'", config.connection.port))?;
    run(controller, command)
}

#[cfg(not(feature = "instrument_serial"))]
fn connect_and_run(_config: &MicroFpgaConfig, _command: BoardCommand) -> Result<()> {
    anyhow::bail!("Serial support not enabled. Rebuild with --features instrument_serial or use --mock")
}

fn run<R: RegisterInterface>(
    mut controller: MicroFpgaController<R>,
    command: BoardCommand,
) -> Result<()> {
    match command {
        BoardCommand::Id => {
            println!(
                "Connected to {} (firmware v{})",
                controller.id(),
                controller.firmware_version()
            );
        }
        BoardCommand::Get { kind, index } => {
            let kind = SignalKind::from(kind);
            let value = controller.state(kind, index)?;
            println!("{kind} {index}: {value}");
        }
        BoardCommand::Set { kind, index, value } => {
            let kind = SignalKind::from(kind);
            controller
                .set_state(kind, index, value)
                .with_context(|| format!("Failed to write {value} to {kind} {index}"))?;
            println!("{kind} {index}: {}", controller.state(kind, index)?);
        }
        BoardCommand::Laser {
            index,
            mode,
            duration,
            sequence,
        } => {
            if let Some(mode) = mode {
                controller.set_laser_mode_state(index, LaserMode::from(mode).value().into())?;
            }
            if let Some(duration) = duration {
                controller.set_laser_duration_state(index, duration)?;
            }
            if let Some(sequence) = sequence {
                controller.set_laser_sequence_state(index, format_sequence(&sequence)?.into())?;
            }
            println!("Laser {index} state: {}", controller.laser_state(index)?);
        }
        BoardCommand::Demo => demo(&mut controller)?,
    }

    controller.disconnect()?;
    Ok(())
}

/// Servo move, then laser configuration one parameter at a time and in bulk.
fn demo<R: RegisterInterface>(controller: &mut MicroFpgaController<R>) -> Result<()> {
    println!("Connected to {}", controller.id());

    let servo_id = 1;
    println!(
        "Current Servo {servo_id} position: {}",
        controller.servo_state(servo_id)?
    );
    if let Err(e) = controller.set_servo_state(servo_id, 35412) {
        warn!("Failed to write state to Servo {servo_id}: {e}");
    }
    println!(
        "Current Servo {servo_id} position: {}",
        controller.servo_state(servo_id)?
    );

    let laser_id = 2;
    if let Err(e) = controller.set_laser_mode_state(laser_id, LaserMode::Rising.value().into()) {
        warn!("Failed to write mode to Laser {laser_id}: {e}");
    }
    println!(
        "Current Laser {laser_id} mode: {}",
        controller.laser_mode_state(laser_id)?
    );

    controller.set_laser_duration_state(laser_id, 2000)?;
    println!(
        "Current Laser {laser_id} duration: {}",
        controller.laser_duration_state(laser_id)?
    );

    controller.set_laser_sequence_state(laser_id, format_sequence("1010101010101010")?.into())?;
    println!(
        "Current Laser {laser_id} sequence: {}",
        controller.laser_sequence_state(laser_id)?
    );

    controller.set_laser_state(
        laser_id,
        LaserMode::Camera.value().into(),
        30,
        format_sequence("1100110011001100")?.into(),
    )?;
    println!(
        "Current Laser {laser_id} state: {}",
        controller.laser_state(laser_id)?
    );

    Ok(())
}
