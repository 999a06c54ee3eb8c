//! Serial register interface for the MicroFPGA USB-serial link
//!
//! Implements [`RegisterInterface`] over any byte stream using the framing in
//! [`crate::regint::protocol`]. With the `instrument_serial` feature the
//! stream is a `serialport` port opened by [`SerialRegisterInterface::open`]
//! or found by [`SerialRegisterInterface::discover`].

use crate::error::{FpgaError, FpgaResult};
use crate::regint::protocol::{
    decode_read_answer, encode_read_request, encode_write_request, READ_ANSWER_LEN,
};
use crate::regint::RegisterInterface;
use std::io::{ErrorKind, Read, Write};
use tracing::{debug, trace};

#[cfg(feature = "instrument_serial")]
use {
    crate::board::{BoardVariant, ADDR_ID, ADDR_VERSION, EXPECTED_FIRMWARE_VERSION},
    serialport::SerialPort,
    std::time::Duration,
    tracing::info,
};

/// Baud rate of the MicroFPGA firmware's UART.
pub const DEFAULT_BAUD_RATE: u32 = 57_600;

/// Register interface over a byte stream.
pub struct SerialRegisterInterface<P> {
    /// Port name (e.g., "/dev/ttyUSB0", "COM3")
    port_name: String,

    /// `None` once disconnected
    port: Option<P>,

    /// Bytes of an abandoned answer that may still arrive
    stale: usize,
}

impl<P: Read + Write> SerialRegisterInterface<P> {
    /// Wrap an already opened stream.
    pub fn from_port(port_name: impl Into<String>, port: P) -> Self {
        Self {
            port_name: port_name.into(),
            port: Some(port),
            stale: 0,
        }
    }

    /// Name the port was opened with.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    fn port(&mut self) -> FpgaResult<&mut P> {
        self.port.as_mut().ok_or(FpgaError::NotConnected)
    }
}

/// Drop up to `count` late bytes of a previous answer so the next answer
/// starts on a word boundary. Gives up quietly when nothing arrives.
fn discard_stale<P: Read>(port: &mut P, count: usize) -> FpgaResult<()> {
    let mut scratch = [0u8; READ_ANSWER_LEN];
    let mut dropped = 0;
    while dropped < count {
        match port.read(&mut scratch[..count - dropped]) {
            Ok(0) => break,
            Ok(n) => dropped += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == ErrorKind::TimedOut => break,
            Err(e) => return Err(e.into()),
        }
    }
    if dropped > 0 {
        debug!(dropped, "discarded late answer bytes");
    }
    Ok(())
}

/// Fill `answer` from the port, treating EOF and timeouts as a short read.
fn read_answer<P: Read>(
    port: &mut P,
    address: u32,
    answer: &mut [u8; READ_ANSWER_LEN],
) -> FpgaResult<()> {
    let mut received = 0;
    while received < READ_ANSWER_LEN {
        match port.read(&mut answer[received..]) {
            Ok(0) => return Err(FpgaError::ShortRead { address, received }),
            Ok(n) => received += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == ErrorKind::TimedOut => {
                return Err(FpgaError::ShortRead { address, received })
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

impl<P: Read + Write> RegisterInterface for SerialRegisterInterface<P> {
    fn read(&mut self, address: u32) -> FpgaResult<u32> {
        let stale = std::mem::take(&mut self.stale);
        let port = self.port()?;
        if stale > 0 {
            discard_stale(port, stale)?;
        }
        port.write_all(&encode_read_request(address))?;
        port.flush()?;

        let mut answer = [0u8; READ_ANSWER_LEN];
        if let Err(e) = read_answer(port, address, &mut answer) {
            if let FpgaError::ShortRead { received, .. } = e {
                self.stale = READ_ANSWER_LEN - received;
            }
            return Err(e);
        }

        let value = decode_read_answer(answer);
        trace!(address, value, "register read");
        Ok(value)
    }

    fn write(&mut self, address: u32, value: u32) -> FpgaResult<()> {
        let port = self.port()?;
        port.write_all(&encode_write_request(address, value))?;
        port.flush()?;
        trace!(address, value, "register write");
        Ok(())
    }

    fn disconnect(&mut self) -> FpgaResult<()> {
        if self.port.take().is_some() {
            debug!("Serial port '{}' closed", self.port_name);
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }

    fn describe(&self) -> String {
        format!("SerialRegisterInterface({})", self.port_name)
    }
}

#[cfg(feature = "instrument_serial")]
impl SerialRegisterInterface<Box<dyn SerialPort>> {
    /// Open `port_name` with the firmware's 8N1 settings.
    ///
    /// `timeout` bounds every read of an answer word.
    pub fn open(port_name: &str, baud_rate: u32, timeout: Duration) -> FpgaResult<Self> {
        let port = serialport::new(port_name, baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(timeout)
            .open()?;

        info!("Serial port '{}' opened at {} baud", port_name, baud_rate);
        Ok(Self::from_port(port_name, port))
    }

    /// Probe every available serial port and return the first one answering
    /// with the expected firmware version and a known board id.
    pub fn discover(baud_rate: u32, timeout: Duration) -> FpgaResult<Self> {
        for candidate in serialport::available_ports()? {
            let name = candidate.port_name;
            let mut regint = match Self::open(&name, baud_rate, timeout) {
                Ok(regint) => regint,
                Err(e) => {
                    debug!("Skipping '{}': {}", name, e);
                    continue;
                }
            };

            match probe(&mut regint) {
                Ok(variant) => {
                    info!("Found MicroFPGA {} on '{}'", variant, name);
                    return Ok(regint);
                }
                Err(e) => {
                    debug!("'{}' is not a MicroFPGA: {}", name, e);
                    let _ = regint.disconnect();
                }
            }
        }
        Err(FpgaError::NoDeviceFound)
    }
}

#[cfg(feature = "instrument_serial")]
fn probe<R: RegisterInterface>(regint: &mut R) -> FpgaResult<BoardVariant> {
    let version = regint.read(ADDR_VERSION)?;
    if version != EXPECTED_FIRMWARE_VERSION {
        return Err(FpgaError::FirmwareVersionMismatch {
            expected: EXPECTED_FIRMWARE_VERSION,
            found: version,
        });
    }
    BoardVariant::from_id(regint.read(ADDR_ID)?)
}
