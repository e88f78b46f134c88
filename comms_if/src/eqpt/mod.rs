//! # Equipment Interface
//!
//! This module defines the command encodings for the motor controllers fitted to the robot.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod roboclaw;
pub mod vesc;
