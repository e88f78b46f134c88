//! # VESC speed controller interface
//!
//! The drive motors are driven by VESC speed controllers sitting on a shared
//! CAN bus. A VESC command is an extended CAN frame whose arbitration ID is
//! the command number shifted left by eight bits, ORed with the target
//! controller's ID. Set-duty is command zero, so a controller with ID 0x01
//! listens for set-duty frames on arbitration ID 0x01.
//!
//! The set-duty payload is the demanded duty cycle scaled by
//! [`DUTY_SCALE`], written as a big-endian signed 32 bit integer.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use byteorder::{BigEndian, ByteOrder};

// -----------------------------------------------------------------------------------------------
// CONSTANTS
// -----------------------------------------------------------------------------------------------

/// Scale factor between a duty cycle fraction and its on-wire integer value.
pub const DUTY_SCALE: f64 = 100_000.0;

// -----------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Encode a set-duty payload for the given duty cycle.
///
/// The duty cycle is clamped into [-1, +1] before scaling.
pub fn duty_frame(duty_cycle: f64) -> [u8; 4] {
    let scaled = (duty_cycle.clamp(-1.0, 1.0) * DUTY_SCALE) as i32;

    let mut data = [0u8; 4];
    BigEndian::write_i32(&mut data, scaled);
    data
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_duty_frame_full_forward() {
        // 1.0 * 100000 = 0x000186A0
        assert_eq!(duty_frame(1.0), [0x00, 0x01, 0x86, 0xA0]);
    }

    #[test]
    fn test_duty_frame_full_reverse() {
        // -100000 as a big-endian i32
        assert_eq!(duty_frame(-1.0), [0xFF, 0xFE, 0x79, 0x60]);
    }

    #[test]
    fn test_duty_frame_zero() {
        assert_eq!(duty_frame(0.0), [0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_duty_frame_half() {
        // 0.5 * 100000 = 0x0000C350
        assert_eq!(duty_frame(0.5), [0x00, 0x00, 0xC3, 0x50]);
    }

    #[test]
    fn test_duty_frame_clamps() {
        assert_eq!(duty_frame(2.5), duty_frame(1.0));
        assert_eq!(duty_frame(-100.0), duty_frame(-1.0));
    }
}
