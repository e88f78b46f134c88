//! # Auxiliary actuator link
//!
//! The auxiliary actuator is driven by a Roboclaw motor controller on a point-to-point serial
//! link. As with the drive bus the hardware sits behind a trait, so the dispatcher can be tested
//! without a physical controller on the other end of the line.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// Standard
use std::io::{Read, Write};
use std::time::Duration;

// External
use serialport::{ClearBuffer, SerialPort};
use thiserror::Error;

// Internal
use comms_if::eqpt::roboclaw;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Timeout on serial reads and writes.
///
/// The Roboclaw acknowledges within a few milliseconds when healthy, so anything longer than this
/// means the link is down and the cycle should not be held up waiting for it.
const SERIAL_TIMEOUT_MS: u64 = 100;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A link to the auxiliary motor controller.
pub trait AuxLink {
    /// Command the auxiliary motor with a 7 bit duty byte (0 = full reverse, 64 = stop, 127 =
    /// full forward).
    fn set_duty(&mut self, duty: u8) -> Result<(), AuxLinkError>;

    /// Read the main battery voltage in volts.
    fn read_battery_v(&mut self) -> Result<f64, AuxLinkError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An [`AuxLink`] over a serial port speaking the Roboclaw packet serial protocol.
pub struct RoboclawLink {
    port: Box<dyn SerialPort>,
    address: u8,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors which can occur on the auxiliary link.
#[derive(Debug, Error)]
pub enum AuxLinkError {
    #[error("Serial port error: {0}")]
    PortError(#[from] serialport::Error),

    #[error("Serial I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Controller did not acknowledge the command (recieved {0:#04X})")]
    NotAcknowledged(u8),

    #[error("Reply failed its CRC check")]
    BadCrc,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RoboclawLink {
    /// Open the serial port at the given path and baud rate, talking to the controller at the
    /// given packet serial address.
    pub fn open(path: &str, baud: u32, address: u8) -> Result<Self, AuxLinkError> {
        let port = serialport::new(path, baud)
            .timeout(Duration::from_millis(SERIAL_TIMEOUT_MS))
            .open()?;

        Ok(Self { port, address })
    }
}

impl AuxLink for RoboclawLink {
    fn set_duty(&mut self, duty: u8) -> Result<(), AuxLinkError> {
        let frame = roboclaw::command_frame(self.address, roboclaw::CMD_M1_DRIVE_7BIT, &[duty]);

        self.port.clear(ClearBuffer::Input)?;
        self.port.write_all(&frame)?;

        // Write commands are acknowledged with a single magic byte
        let mut ack = [0u8; 1];
        self.port.read_exact(&mut ack)?;

        if ack[0] != roboclaw::ACK {
            return Err(AuxLinkError::NotAcknowledged(ack[0]));
        }

        Ok(())
    }

    fn read_battery_v(&mut self) -> Result<f64, AuxLinkError> {
        // Read commands carry no CRC of their own, the check covers the reply instead
        let request = [self.address, roboclaw::CMD_READ_MAIN_BATT];

        self.port.clear(ClearBuffer::Input)?;
        self.port.write_all(&request)?;

        // Reply is the voltage in tenths of a volt as a big endian u16, followed by a CRC over
        // the address, command, and data bytes.
        let mut reply = [0u8; 4];
        self.port.read_exact(&mut reply)?;

        let mut covered = vec![self.address, roboclaw::CMD_READ_MAIN_BATT];
        covered.extend_from_slice(&reply[..2]);

        let crc = u16::from_be_bytes([reply[2], reply[3]]);

        if roboclaw::crc16(&covered) != crc {
            return Err(AuxLinkError::BadCrc);
        }

        let tenths = u16::from_be_bytes([reply[0], reply[1]]);

        Ok(roboclaw::battery_from_tenths(tenths))
    }
}
