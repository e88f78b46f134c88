//! # Robot Executable Parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Deserialize, Default)]
pub struct BotExecParams {
    /// Endpoint for the operator socket
    pub op_endpoint: String,

    /// Period of the control cycle in seconds
    pub cycle_period_s: f64,

    /// Time without an operator packet after which the robot is safed, in seconds
    pub watchdog_timeout_s: f64,

    /// Period between main battery voltage reads in seconds
    pub battery_poll_period_s: f64,
}
