//! # Drive bus abstraction
//!
//! The drive motors sit on a shared CAN bus. This module defines the trait the dispatcher writes
//! frames through, and its implementation over a Linux SocketCAN interface. Keeping the bus
//! behind a trait lets the dispatch logic run against a recording fake in tests.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use socketcan::{CanFrame, CanSocket, EmbeddedFrame, ExtendedId, Socket};
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A bus accepting `(arbitration ID, payload)` frames for the drive motor controllers.
pub trait DriveBus {
    /// Write a single extended frame to the bus.
    fn send_frame(&mut self, arb_id: u32, data: &[u8]) -> Result<(), DriveBusError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A [`DriveBus`] over a Linux SocketCAN interface.
pub struct SocketcanBus {
    socket: CanSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors which can occur when writing to the drive bus.
#[derive(Debug, Error)]
pub enum DriveBusError {
    #[error("CAN I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Cannot build a CAN frame for arbitration ID {arb_id:#010X} with {len} data bytes")]
    InvalidFrame { arb_id: u32, len: usize },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SocketcanBus {
    /// Open the given CAN channel, for example `"can0"`.
    pub fn open(channel: &str) -> Result<Self, DriveBusError> {
        let socket = CanSocket::open(channel)?;
        Ok(Self { socket })
    }
}

impl DriveBus for SocketcanBus {
    fn send_frame(&mut self, arb_id: u32, data: &[u8]) -> Result<(), DriveBusError> {
        let invalid_frame = DriveBusError::InvalidFrame {
            arb_id,
            len: data.len(),
        };

        // Extended IDs are 29 bit, and payloads 8 bytes at most
        let id = match ExtendedId::new(arb_id) {
            Some(id) => id,
            None => return Err(invalid_frame),
        };
        let frame = match CanFrame::new(id, data) {
            Some(f) => f,
            None => return Err(invalid_frame),
        };

        self.socket.write_frame(&frame)?;

        Ok(())
    }
}
