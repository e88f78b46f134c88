//! Parameters structure for DriveCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for drive control.
#[derive(Debug, Deserialize)]
pub struct Params {
    /// Maximum rate of change of a wheel duty cycle demand.
    ///
    /// Units: normalised duty cycle per second, i.e. 1.0 takes one second to
    /// go from stopped to full throttle.
    pub ramp_rate: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self { ramp_rate: 1.0 }
    }
}
