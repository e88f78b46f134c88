//! # Robot library.
//!
//! This library allows other crates in the workspace to access items defined inside the robot
//! crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Actuator dispatch module - encodes and rate-limits commands onto the motor controller buses
pub mod act_dispatch;

/// Global data store for the executable
pub mod data_store;

/// Drive control module - converts operator drive demands into individual wheel commands
pub mod drive_ctrl;

/// Operator server - recieves packets from the operator console and sends replies
pub mod op_server;

/// Parameters for the robot executable
pub mod params;

/// Dead-man's switch tracking operator liveness
pub mod watchdog;
