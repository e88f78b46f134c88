//! # Drive control module
//!
//! Converts the operator's drive demands (forward and rotational velocity) into normalised duty
//! cycle targets for the left and right wheels. Processing is a fixed pipeline: arcade-drive
//! inverse kinematics followed by ramp limiting of the wheel targets.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod kinematics;
mod params;
mod ramp;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use kinematics::*;
pub use params::*;
pub use ramp::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during DriveCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum DriveCtrlError {
    #[error("Recieved a non-finite drive demand (forward: {0}, rotation: {1})")]
    NonFiniteDemand(f64, f64),

    #[error("Recieved a non-finite cycle elapsed time ({0})")]
    NonFiniteElapsed(f64),
}
