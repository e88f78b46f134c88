//! # Operator packet module
//!
//! This module defines the packets exchanged between the operator console
//! (`op_exec`) and the robot (`bot_exec`), and the conversion of raw
//! controller samples into drive commands.
//!
//! All packets are JSON objects with a `"type"` discriminator. Control
//! packets carry their controller sample under the `"data"` key.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use serde_json::{self, Value};
use thiserror::Error;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A raw controller sample as sent by the operator console.
///
/// Stick values are expected in [-1, +1] and trigger values in [0, 1],
/// though no range is enforced here - out of range values are clamped when
/// the sample is converted into a [`Command`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControllerData {
    /// Left stick vertical axis, +1 is stick fully forward
    pub left_stick_y: f64,

    /// Right stick vertical axis, +1 is stick fully forward
    pub right_stick_y: f64,

    /// Left analogue trigger, 1 is fully pressed
    pub left_trigger: f64,

    /// Right analogue trigger, 1 is fully pressed
    pub right_trigger: f64,

    /// Whether the invert button is held
    pub invert_button: bool,
}

/// A drive command derived from a controller sample.
///
/// This is the session's working representation of the operator's intent.
/// All axis values are clamped into [-1, +1].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Command {
    /// Demanded forward velocity (normalised)
    pub forward: f64,

    /// Demanded rotational velocity (normalised, +ve anticlockwise)
    pub rotation: f64,

    /// Demanded auxiliary actuator velocity (normalised)
    pub auxiliary: f64,

    /// Whether the drive direction is inverted
    pub invert: bool,

    /// Whether the session is paused. Controller samples never set this,
    /// it is maintained by the session itself when pause packets arrive.
    pub pause: bool,
}

/// The reply sent to the operator for every request.
///
/// Echoes the command currently applied by the robot, along with the most
/// recent battery voltage reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpReply {
    /// Applied forward velocity (normalised)
    pub forward: f64,

    /// Applied rotational velocity (normalised)
    pub rotation: f64,

    /// Applied auxiliary actuator velocity (normalised)
    pub auxiliary: f64,

    /// Whether the drive direction is inverted
    pub invert: bool,

    /// Whether the session is paused
    pub pause: bool,

    /// Most recent main battery voltage in volts, zero if not yet read
    pub battery_v: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A packet sent by the operator console to the robot.
///
/// The serialised representation is adjacently tagged, for example a pause
/// packet is `{"type": "pause"}` and a control packet is
/// `{"type": "controller", "data": {...}}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum OpPacket {
    /// Keep-alive with no payload, proves the operator's process is up
    Heartbeat,

    /// A controller sample
    Controller(ControllerData),

    /// Toggle the paused state of the session
    Pause,
}

/// Possible packet parsing errors.
#[derive(Debug, Error)]
pub enum PacketParseError {
    #[error("Packet contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),

    #[error("Packet has an invalid type ({0})")]
    InvalidType(String),

    #[error("Packet is missing the required field \"{0}\"")]
    MissingField(&'static str),

    #[error("Packet field \"{0}\" has the wrong type")]
    WrongFieldType(&'static str),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl OpPacket {
    /// Parse a new packet from a JSON string.
    ///
    /// Numeric fields accept both JSON integers and floats, as consoles
    /// commonly send unpressed triggers as a plain `0`. Boolean fields only
    /// accept `true`/`false`.
    pub fn from_json(json_str: &str) -> Result<Self, PacketParseError> {
        // Parse the JSON string into a value
        let val: Value = match serde_json::from_str(json_str) {
            Ok(v) => v,
            Err(e) => return Err(PacketParseError::InvalidJson(e)),
        };

        // Get the type of the packet
        let packet_type = match val["type"].as_str() {
            Some(s) => s,
            None => return Err(PacketParseError::MissingField("type")),
        };

        match packet_type {
            "heartbeat" => Ok(OpPacket::Heartbeat),
            "pause" => Ok(OpPacket::Pause),
            "controller" => {
                let data = match val.get("data") {
                    Some(d) if d.is_object() => d,
                    _ => return Err(PacketParseError::MissingField("data")),
                };

                Ok(OpPacket::Controller(ControllerData {
                    left_stick_y: req_f64(data, "left_stick_y")?,
                    right_stick_y: req_f64(data, "right_stick_y")?,
                    left_trigger: req_f64(data, "left_trigger")?,
                    right_trigger: req_f64(data, "right_trigger")?,
                    invert_button: req_bool(data, "invert_button")?,
                }))
            }
            _ => Err(PacketParseError::InvalidType(packet_type.into())),
        }
    }

    /// Serialise the packet into a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<&ControllerData> for Command {
    fn from(data: &ControllerData) -> Self {
        Self {
            forward: data.left_stick_y.clamp(-1.0, 1.0),
            rotation: data.right_stick_y.clamp(-1.0, 1.0),
            auxiliary: (data.left_trigger - data.right_trigger).clamp(-1.0, 1.0),
            invert: data.invert_button,
            pause: false,
        }
    }
}

impl Command {
    /// The (forward, rotation) pair to feed into the drive kinematics.
    ///
    /// Inverted driving negates both axes.
    pub fn drive_inputs(&self) -> (f64, f64) {
        match self.invert {
            true => (-self.forward, -self.rotation),
            false => (self.forward, self.rotation),
        }
    }
}

impl OpReply {
    /// Build a reply echoing the given applied command.
    pub fn new(applied: &Command, battery_v: f64) -> Self {
        Self {
            forward: applied.forward,
            rotation: applied.rotation,
            auxiliary: applied.auxiliary,
            invert: applied.invert,
            pause: applied.pause,
            battery_v,
        }
    }

    /// Parse a reply from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self, PacketParseError> {
        serde_json::from_str(json_str).map_err(PacketParseError::InvalidJson)
    }

    /// Serialise the reply into a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Read a required numeric field out of a packet's data object.
fn req_f64(data: &Value, field: &'static str) -> Result<f64, PacketParseError> {
    match data.get(field) {
        None | Some(Value::Null) => Err(PacketParseError::MissingField(field)),
        Some(v) => v.as_f64().ok_or(PacketParseError::WrongFieldType(field)),
    }
}

/// Read a required boolean field out of a packet's data object.
fn req_bool(data: &Value, field: &'static str) -> Result<bool, PacketParseError> {
    match data.get(field) {
        None | Some(Value::Null) => Err(PacketParseError::MissingField(field)),
        Some(v) => v.as_bool().ok_or(PacketParseError::WrongFieldType(field)),
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_heartbeat() {
        let packet = OpPacket::from_json(r#"{"type": "heartbeat"}"#).unwrap();
        assert_eq!(packet, OpPacket::Heartbeat);
    }

    #[test]
    fn test_parse_pause() {
        let packet = OpPacket::from_json(r#"{"type": "pause"}"#).unwrap();
        assert_eq!(packet, OpPacket::Pause);
    }

    #[test]
    fn test_parse_controller() {
        let packet = OpPacket::from_json(
            r#"{
                "type": "controller",
                "data": {
                    "left_stick_y": 0.5,
                    "right_stick_y": -0.25,
                    "left_trigger": 1.0,
                    "right_trigger": 0.0,
                    "invert_button": true
                }
            }"#,
        )
        .unwrap();

        assert_eq!(
            packet,
            OpPacket::Controller(ControllerData {
                left_stick_y: 0.5,
                right_stick_y: -0.25,
                left_trigger: 1.0,
                right_trigger: 0.0,
                invert_button: true,
            })
        );
    }

    #[test]
    fn test_parse_integer_triggers() {
        // Consoles send unpressed triggers as plain integers, these must
        // parse as floats.
        let packet = OpPacket::from_json(
            r#"{
                "type": "controller",
                "data": {
                    "left_stick_y": 0,
                    "right_stick_y": 0,
                    "left_trigger": 1,
                    "right_trigger": 0,
                    "invert_button": false
                }
            }"#,
        )
        .unwrap();

        match packet {
            OpPacket::Controller(data) => {
                assert_eq!(data.left_trigger, 1.0);
                assert_eq!(data.right_trigger, 0.0);
            }
            _ => panic!("Expected a controller packet"),
        }
    }

    #[test]
    fn test_parse_invalid_json() {
        let result = OpPacket::from_json("this is not json");
        assert!(matches!(result, Err(PacketParseError::InvalidJson(_))));
    }

    #[test]
    fn test_parse_invalid_type() {
        let result = OpPacket::from_json(r#"{"type": "warp_drive"}"#);
        assert!(matches!(result, Err(PacketParseError::InvalidType(_))));

        // A missing or non-string type is a missing field
        let result = OpPacket::from_json(r#"{"data": {}}"#);
        assert!(matches!(
            result,
            Err(PacketParseError::MissingField("type"))
        ));
    }

    #[test]
    fn test_parse_missing_fields() {
        // No data object at all
        let result = OpPacket::from_json(r#"{"type": "controller"}"#);
        assert!(matches!(
            result,
            Err(PacketParseError::MissingField("data"))
        ));

        // Data present but a required field absent
        let result = OpPacket::from_json(
            r#"{
                "type": "controller",
                "data": {
                    "left_stick_y": 0.0,
                    "left_trigger": 0.0,
                    "right_trigger": 0.0,
                    "invert_button": false
                }
            }"#,
        );
        assert!(matches!(
            result,
            Err(PacketParseError::MissingField("right_stick_y"))
        ));
    }

    #[test]
    fn test_parse_wrong_field_types() {
        // Strings are not acceptable axis values
        let result = OpPacket::from_json(
            r#"{
                "type": "controller",
                "data": {
                    "left_stick_y": "fast",
                    "right_stick_y": 0.0,
                    "left_trigger": 0.0,
                    "right_trigger": 0.0,
                    "invert_button": false
                }
            }"#,
        );
        assert!(matches!(
            result,
            Err(PacketParseError::WrongFieldType("left_stick_y"))
        ));

        // Booleans must be canonical, 1 is not true
        let result = OpPacket::from_json(
            r#"{
                "type": "controller",
                "data": {
                    "left_stick_y": 0.0,
                    "right_stick_y": 0.0,
                    "left_trigger": 0.0,
                    "right_trigger": 0.0,
                    "invert_button": 1
                }
            }"#,
        );
        assert!(matches!(
            result,
            Err(PacketParseError::WrongFieldType("invert_button"))
        ));
    }

    #[test]
    fn test_packet_round_trip() {
        let packet = OpPacket::Controller(ControllerData {
            left_stick_y: -0.75,
            right_stick_y: 0.125,
            left_trigger: 0.0,
            right_trigger: 1.0,
            invert_button: false,
        });

        let json = packet.to_json().unwrap();
        assert_eq!(OpPacket::from_json(&json).unwrap(), packet);

        let json = OpPacket::Heartbeat.to_json().unwrap();
        assert_eq!(json, r#"{"type":"heartbeat"}"#);
        assert_eq!(OpPacket::from_json(&json).unwrap(), OpPacket::Heartbeat);
    }

    #[test]
    fn test_command_from_controller() {
        let command = Command::from(&ControllerData {
            left_stick_y: 0.5,
            right_stick_y: -0.5,
            left_trigger: 1.0,
            right_trigger: 0.25,
            invert_button: true,
        });

        assert_eq!(command.forward, 0.5);
        assert_eq!(command.rotation, -0.5);
        assert_eq!(command.auxiliary, 0.75);
        assert!(command.invert);
        assert!(!command.pause);

        // Out of range samples are clamped
        let command = Command::from(&ControllerData {
            left_stick_y: 2.0,
            right_stick_y: -3.0,
            left_trigger: 0.0,
            right_trigger: 5.0,
            invert_button: false,
        });

        assert_eq!(command.forward, 1.0);
        assert_eq!(command.rotation, -1.0);
        assert_eq!(command.auxiliary, -1.0);
    }

    #[test]
    fn test_inverted_drive_inputs() {
        let mut command = Command {
            forward: 0.5,
            rotation: -0.5,
            ..Default::default()
        };
        assert_eq!(command.drive_inputs(), (0.5, -0.5));

        command.invert = true;
        assert_eq!(command.drive_inputs(), (-0.5, 0.5));
    }

    #[test]
    fn test_reply_round_trip() {
        let reply = OpReply {
            forward: 0.25,
            rotation: -0.125,
            auxiliary: 0.5,
            invert: false,
            pause: true,
            battery_v: 12.4,
        };

        let json = reply.to_json().unwrap();
        assert_eq!(OpReply::from_json(&json).unwrap(), reply);
    }
}
