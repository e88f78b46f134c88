//! # Roboclaw motor controller interface
//!
//! The auxiliary actuator is driven by a Roboclaw controller over packet
//! serial. A command packet is `[address, command, payload..., crc]` where
//! the CRC is the 16 bit CCITT checksum (polynomial 0x1021, initial value
//! zero) over everything before it, sent big-endian. Write commands are
//! acknowledged with a single [`ACK`] byte. Read commands are sent without a
//! CRC, and the controller's reply carries a CRC computed over the address,
//! command and data bytes.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use byteorder::{BigEndian, ByteOrder};

// -----------------------------------------------------------------------------------------------
// CONSTANTS
// -----------------------------------------------------------------------------------------------

/// Default packet-serial address of a Roboclaw controller.
pub const DEFAULT_ADDRESS: u8 = 0x80;

/// Drive motor 1 with a 7 bit duty value (64 is stopped).
pub const CMD_M1_DRIVE_7BIT: u8 = 6;

/// Read the main battery voltage.
pub const CMD_READ_MAIN_BATT: u8 = 24;

/// Acknowledge byte returned by the controller after a write command.
pub const ACK: u8 = 0xFF;

// -----------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Encode a normalised velocity in [-1, +1] as a 7 bit drive duty value.
///
/// -1 maps to 0 (full reverse), 0 to 64 (stopped) and +1 to 127 (full
/// forward).
pub fn duty_byte(velocity: f64) -> u8 {
    (64.0 + 64.0 * velocity).round().clamp(0.0, 127.0) as u8
}

/// Compute the CCITT CRC-16 of the given bytes.
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;

    for byte in data {
        crc ^= (*byte as u16) << 8;

        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ 0x1021;
            } else {
                crc <<= 1;
            }
        }
    }

    crc
}

/// Build a complete write command packet including the trailing CRC.
pub fn command_frame(address: u8, command: u8, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.push(address);
    frame.push(command);
    frame.extend_from_slice(payload);

    let mut crc_bytes = [0u8; 2];
    BigEndian::write_u16(&mut crc_bytes, crc16(&frame));
    frame.extend_from_slice(&crc_bytes);

    frame
}

/// Convert a raw main battery reading (tenths of a volt) into volts.
pub fn battery_from_tenths(raw: u16) -> f64 {
    raw as f64 / 10.0
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_duty_byte() {
        assert_eq!(duty_byte(-1.0), 0);
        assert_eq!(duty_byte(-0.5), 32);
        assert_eq!(duty_byte(0.0), 64);
        assert_eq!(duty_byte(0.5), 96);
        // +1 would map to 128, which must clamp to the 7 bit maximum
        assert_eq!(duty_byte(1.0), 127);
    }

    #[test]
    fn test_duty_byte_clamps() {
        assert_eq!(duty_byte(-7.0), 0);
        assert_eq!(duty_byte(7.0), 127);
    }

    #[test]
    fn test_crc16_check_value() {
        // Standard CCITT/XMODEM check value
        assert_eq!(crc16(b"123456789"), 0x31C3);
        assert_eq!(crc16(&[]), 0x0000);
    }

    #[test]
    fn test_command_frame() {
        let frame = command_frame(DEFAULT_ADDRESS, CMD_M1_DRIVE_7BIT, &[96]);

        assert_eq!(frame.len(), 5);
        assert_eq!(frame[0], 0x80);
        assert_eq!(frame[1], 6);
        assert_eq!(frame[2], 96);

        let crc = crc16(&frame[..3]);
        assert_eq!(frame[3], (crc >> 8) as u8);
        assert_eq!(frame[4], (crc & 0xFF) as u8);
    }

    #[test]
    fn test_battery_from_tenths() {
        assert_eq!(battery_from_tenths(124), 12.4);
        assert_eq!(battery_from_tenths(0), 0.0);
    }
}
