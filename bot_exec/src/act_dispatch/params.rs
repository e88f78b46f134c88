//! # Actuator dispatch parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use serde::Deserialize;
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Largest valid extended CAN arbitration ID (29 bit).
const MAX_EXTENDED_ARB_ID: u32 = 0x1FFF_FFFF;

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

#[derive(Deserialize, Default, Clone)]
pub struct Params {
    /// Name of the CAN channel the drive controllers sit on, e.g. "can0".
    pub can_channel: String,

    /// Bit rate of the drive bus.
    ///
    /// Recorded for reference only. The interface bit rate is set by the OS when the link is
    /// brought up, not by this software.
    pub can_bitrate: u32,

    /// Extended arbitration ID for set-duty commands to the left drive controller.
    pub arb_id_left: u32,

    /// Extended arbitration ID for set-duty commands to the right drive controller.
    pub arb_id_right: u32,

    /// Minimum time between consecutive drive frames to the same controller, in seconds.
    pub min_send_interval_s: f64,

    /// Path of the serial port the auxiliary controller is attached to.
    pub aux_port: String,

    /// Baud rate of the auxiliary serial link.
    pub aux_baud: u32,

    /// Packet serial address of the auxiliary controller.
    pub aux_address: u8,
}

#[derive(Debug, Error)]
pub enum ParamsError {
    #[error("Left and right drive controllers share arbitration ID {0:#010X}")]
    NonUniqueArbIds(u32),

    #[error("Arbitration ID {0:#010X} does not fit in a 29 bit extended ID")]
    ArbIdOutOfRange(u32),

    #[error("Minimum send interval must be finite and non-negative, got {0}")]
    InvalidSendInterval(f64),

    #[error("Auxiliary baud rate must be non-zero")]
    InvalidAuxBaud,
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl Params {
    /// Determines if the parameters are valid.
    pub fn are_valid(&self) -> Result<(), ParamsError> {
        if self.arb_id_left == self.arb_id_right {
            return Err(ParamsError::NonUniqueArbIds(self.arb_id_left));
        }

        for arb_id in [self.arb_id_left, self.arb_id_right] {
            if arb_id > MAX_EXTENDED_ARB_ID {
                return Err(ParamsError::ArbIdOutOfRange(arb_id));
            }
        }

        if !self.min_send_interval_s.is_finite() || self.min_send_interval_s < 0.0 {
            return Err(ParamsError::InvalidSendInterval(self.min_send_interval_s));
        }

        if self.aux_baud == 0 {
            return Err(ParamsError::InvalidAuxBaud);
        }

        Ok(())
    }
}
