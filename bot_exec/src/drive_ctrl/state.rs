//! Implementations for the DriveCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use serde::Serialize;
use thiserror::Error;

// Internal
use super::{arcade_ik, DriveCtrlError, Params, RampLimiter};
use util::{
    archive::{ArchiveError, Archived, Archiver},
    module::State,
    params,
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Drive control module state
#[derive(Default)]
pub struct DriveCtrl {
    pub(crate) params: Params,

    pub(crate) report: StatusReport,
    arch_report: Archiver,

    pub(crate) ramp: RampLimiter,

    pub(crate) output: OutputData,
    arch_output: Archiver,
}

/// Input data to drive control.
#[derive(Clone, Copy, Default, Debug)]
pub struct InputData {
    /// Demanded forward velocity (normalised), +ve drives the robot forwards.
    pub forward: f64,

    /// Demanded rotational velocity (normalised), +ve turns the robot
    /// anticlockwise.
    pub rotation: f64,

    /// Wall-clock seconds elapsed since the previous cycle.
    pub elapsed_s: f64,
}

/// Output wheel demands that the actuator dispatcher must execute.
#[derive(Clone, Copy, Default, Serialize, Debug, PartialEq)]
pub struct OutputData {
    /// Left wheel duty cycle, in [-1, +1].
    pub left: f64,

    /// Right wheel duty cycle, in [-1, +1].
    pub right: f64,
}

/// Status report for DriveCtrl processing.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct StatusReport {
    /// Whether the ramp limiter held each wheel back from its kinematic
    /// target this cycle, in (left, right) order.
    pub ramp_limited: (bool, bool),
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which can occur during DriveCtrl initialisation.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("Failed to load DriveCtrl parameters: {0}")]
    ParamLoadError(params::LoadError),

    #[error("Invalid ramp rate ({0}), must be finite and positive")]
    InvalidRampRate(f64),

    #[error("Failed to initialise the DriveCtrl archives: {0}")]
    ArchiveInitError(ArchiveError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for DriveCtrl {
    type InitData = &'static str;
    type InitError = InitError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = DriveCtrlError;

    /// Initialise the DriveCtrl module.
    ///
    /// Expected init data is the path to the parameter file
    fn init(&mut self, init_data: Self::InitData, session: &Session) -> Result<(), InitError> {
        // Load the parameters
        self.params = params::load(init_data).map_err(InitError::ParamLoadError)?;

        if !self.params.ramp_rate.is_finite() || self.params.ramp_rate <= 0.0 {
            return Err(InitError::InvalidRampRate(self.params.ramp_rate));
        }

        // Start the ramp limiter at rest with the configured rate
        self.ramp = RampLimiter::new(self.params.ramp_rate);

        // Create the arch folder for drive_ctrl
        let mut arch_path = session.arch_root.clone();
        arch_path.push("drive_ctrl");
        std::fs::create_dir_all(arch_path).map_err(|e| {
            InitError::ArchiveInitError(ArchiveError::FileError(e))
        })?;

        // Initialise the archivers
        self.arch_report = Archiver::from_path(session, "drive_ctrl/status_report.csv")
            .map_err(InitError::ArchiveInitError)?;
        self.arch_output = Archiver::from_path(session, "drive_ctrl/output.csv")
            .map_err(InitError::ArchiveInitError)?;

        Ok(())
    }

    /// Perform cyclic processing of drive control.
    ///
    /// This must be called every cycle while the session is driving, even when the operator's
    /// demand has not changed, so the ramp limiter keeps stepping towards its target.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), DriveCtrlError> {
        // Clear the status report
        self.report = StatusReport::default();

        if !input_data.forward.is_finite() || !input_data.rotation.is_finite() {
            return Err(DriveCtrlError::NonFiniteDemand(
                input_data.forward,
                input_data.rotation,
            ));
        }
        if !input_data.elapsed_s.is_finite() || input_data.elapsed_s < 0.0 {
            return Err(DriveCtrlError::NonFiniteElapsed(input_data.elapsed_s));
        }

        // Kinematics, then ramp the wheel targets
        let target = arcade_ik(input_data.forward, input_data.rotation);

        // A wheel is ramp limited this cycle if its demanded step exceeds the rate budget
        let budget = self.params.ramp_rate * input_data.elapsed_s;
        let previous = self.ramp.previous();
        self.report.ramp_limited = (
            (target.0 - previous.0).abs() > budget,
            (target.1 - previous.1).abs() > budget,
        );

        let (left, right) = self.ramp.apply(target, input_data.elapsed_s);

        let output = OutputData { left, right };

        trace!(
            "DriveCtrl output: left {:.4}, right {:.4} (target {:.4}, {:.4})",
            left,
            right,
            target.0,
            target.1
        );

        // Update the output in self
        self.output = output;

        Ok((output, self.report))
    }

    /// Bring the module to its safe state: wheel demands at zero, with the ramp limiter at rest
    /// so any subsequent demand ramps up from zero.
    fn make_safe(&mut self) {
        self.ramp.reset();
        self.output = OutputData::default();
        self.report = StatusReport::default();
    }
}

impl Archived for DriveCtrl {
    fn write(&mut self) -> Result<(), ArchiveError> {
        // Write each one individually
        self.arch_report.serialise(self.report)?;
        self.arch_output.serialise(self.output)?;

        Ok(())
    }
}

impl DriveCtrl {
    /// Build a module with the given parameters, without archiving. Test use only.
    #[cfg(test)]
    pub(crate) fn with_params(params: Params) -> Self {
        let ramp = RampLimiter::new(params.ramp_rate);
        Self {
            params,
            ramp,
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_full_throttle_after_one_second() {
        let mut drive_ctrl = DriveCtrl::with_params(Params { ramp_rate: 1.0 });

        let (output, report) = drive_ctrl
            .proc(&InputData {
                forward: 1.0,
                rotation: 0.0,
                elapsed_s: 1.0,
            })
            .unwrap();

        // One second at the default ramp rate covers the full budget
        assert!((output.left - 1.0).abs() < 1e-12);
        assert!((output.right - 1.0).abs() < 1e-12);
        assert_eq!(report.ramp_limited, (false, false));
    }

    #[test]
    fn test_short_cycle_is_ramp_limited() {
        let mut drive_ctrl = DriveCtrl::with_params(Params { ramp_rate: 1.0 });

        let (output, report) = drive_ctrl
            .proc(&InputData {
                forward: 1.0,
                rotation: 0.0,
                elapsed_s: 0.02,
            })
            .unwrap();

        assert!((output.left - 0.02).abs() < 1e-12);
        assert!((output.right - 0.02).abs() < 1e-12);
        assert_eq!(report.ramp_limited, (true, true));
    }

    #[test]
    fn test_non_finite_demand_rejected() {
        let mut drive_ctrl = DriveCtrl::with_params(Params::default());

        let result = drive_ctrl.proc(&InputData {
            forward: f64::NAN,
            rotation: 0.0,
            elapsed_s: 0.02,
        });
        assert!(matches!(result, Err(DriveCtrlError::NonFiniteDemand(_, _))));

        let result = drive_ctrl.proc(&InputData {
            forward: 0.0,
            rotation: 0.0,
            elapsed_s: f64::INFINITY,
        });
        assert!(matches!(result, Err(DriveCtrlError::NonFiniteElapsed(_))));
    }

    #[test]
    fn test_make_safe_resets_ramp() {
        let mut drive_ctrl = DriveCtrl::with_params(Params { ramp_rate: 1.0 });

        drive_ctrl
            .proc(&InputData {
                forward: 1.0,
                rotation: 0.0,
                elapsed_s: 1.0,
            })
            .unwrap();
        assert_eq!(drive_ctrl.ramp.previous(), (1.0, 1.0));

        drive_ctrl.make_safe();
        assert_eq!(drive_ctrl.output, OutputData::default());

        // Motion after a safing ramps up from rest, not from the old demand
        let (output, _) = drive_ctrl
            .proc(&InputData {
                forward: 1.0,
                rotation: 0.0,
                elapsed_s: 0.02,
            })
            .unwrap();
        assert!((output.left - 0.02).abs() < 1e-12);
    }
}
