//! # Data Store

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// Standard
use std::time::Duration;

// External
use comms_if::op::{Command, OpReply};
use log::{info, warn};
use serde::Serialize;
use util::module::State;

// Internal
use crate::{drive_ctrl, watchdog::Watchdog};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// State of the operator session.
///
/// A session begins awaiting the operator's first packet, becomes active when one arrives, and
/// may be paused and resumed any number of times. Termination is one way - a terminated session
/// never accepts packets or drives actuators again, the executable must be restarted.
#[derive(Debug, Eq, PartialEq, Copy, Clone, Serialize)]
pub enum SessionState {
    AwaitingFirstPacket,
    Active,
    Paused,
    Terminated,
}

/// Gives the reason the session was terminated.
#[derive(Debug, Eq, PartialEq, Copy, Clone, Serialize)]
pub enum TerminationCause {
    /// The operator link itself failed
    TransportFailure,

    /// A reply could not be encoded
    EncodeFailure,
}

/// Verdict on the operator link's liveness for this cycle.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum LivenessVerdict {
    /// No packet has ever arrived, there is nothing to watch yet
    NotStarted,

    /// A packet arrived within the watchdog timeout
    Alive,

    /// The watchdog has just expired, safing actions must be taken this cycle
    JustExpired,

    /// The watchdog expired on an earlier cycle and the link is still silent
    Inert,
}

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// Global data store for the executable.
#[derive(Default)]
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u128,

    // Session
    session_state: SessionState,

    termination_cause: Option<TerminationCause>,

    /// Watchdog over the operator link. `None` until the first packet arrives.
    watchdog: Option<Watchdog>,

    watchdog_timeout: Duration,

    /// True once the current watchdog's expiry has been acted on
    expiry_flagged: bool,

    // Operator intent
    /// The command currently applied by the robot
    pub applied: Command,

    /// The auxiliary demand most recently put on the wire
    pub last_aux_sent: f64,

    /// Most recent main battery voltage reading, zero until the first read succeeds
    pub battery_v: f64,

    // DriveCtrl
    pub drive_ctrl: drive_ctrl::DriveCtrl,
    pub drive_ctrl_output: drive_ctrl::OutputData,
    pub drive_ctrl_status_rpt: drive_ctrl::StatusReport,

    // Monitoring counters
    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,
}

/// Summary of a terminated session, saved into the session directory on shutdown.
#[derive(Serialize)]
pub struct TerminationReport {
    pub cause: TerminationCause,
    pub num_cycles: u64,
    pub elapsed_s: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for SessionState {
    fn default() -> Self {
        SessionState::AwaitingFirstPacket
    }
}

impl DataStore {
    /// Create a new data store with the given watchdog timeout.
    pub fn new(watchdog_timeout: Duration) -> Self {
        Self {
            watchdog_timeout,
            ..Default::default()
        }
    }

    /// The current session state.
    pub fn session_state(&self) -> SessionState {
        self.session_state
    }

    /// The cause of termination, if the session has been terminated.
    pub fn termination_cause(&self) -> Option<TerminationCause> {
        self.termination_cause
    }

    /// Record that a packet arrived from the operator this cycle.
    ///
    /// The first packet of the session starts the watchdog and activates the session. If the
    /// watchdog had expired, a fresh one is constructed so stale state from before the outage
    /// cannot leak into the restored link.
    pub fn note_packet(&mut self) {
        if self.session_state == SessionState::Terminated {
            return;
        }

        match self.watchdog {
            Some(ref watchdog) if !self.expiry_flagged => watchdog.notify(),
            _ => {
                if self.expiry_flagged {
                    info!("Operator link restored");
                }
                self.watchdog = Some(Watchdog::new(self.watchdog_timeout));
                self.expiry_flagged = false;
            }
        }

        if self.session_state == SessionState::AwaitingFirstPacket {
            info!("First packet recieved, session is now active");
            self.session_state = SessionState::Active;
        }
    }

    /// Toggle the paused state of the session.
    pub fn toggle_pause(&mut self) {
        self.session_state = match self.session_state {
            SessionState::Active => {
                info!("Session paused");
                SessionState::Paused
            }
            SessionState::Paused => {
                info!("Session resumed");
                SessionState::Active
            }
            state => state,
        };
    }

    /// Terminate the session.
    ///
    /// Termination is one way, a second call cannot change the recorded cause.
    pub fn terminate(&mut self, cause: TerminationCause) {
        if self.session_state == SessionState::Terminated {
            return;
        }

        warn!("Session terminated, cause: {:?}", cause);

        self.session_state = SessionState::Terminated;
        self.termination_cause = Some(cause);
    }

    /// Judge the operator link's liveness for this cycle.
    ///
    /// Expiry is reported exactly once - the cycle on which it's first seen gets
    /// [`LivenessVerdict::JustExpired`] so safing actions run exactly once, after which the link
    /// is [`LivenessVerdict::Inert`] until a packet restores it.
    pub fn liveness(&mut self) -> LivenessVerdict {
        let watchdog = match self.watchdog {
            Some(ref w) => w,
            None => return LivenessVerdict::NotStarted,
        };

        if watchdog.is_alive() {
            LivenessVerdict::Alive
        } else if !self.expiry_flagged {
            self.expiry_flagged = true;
            LivenessVerdict::JustExpired
        } else {
            LivenessVerdict::Inert
        }
    }

    /// Time since the last packet, if the watchdog has been started.
    pub fn time_since_last_packet(&self) -> Option<Duration> {
        self.watchdog.as_ref().map(|w| w.time_since_last())
    }

    /// Build the reply echoing the currently applied command.
    pub fn reply(&self) -> OpReply {
        OpReply::new(&self.applied, self.battery_v)
    }

    /// Zero the applied demands and reset the drive controller.
    ///
    /// The pause flag survives, everything else returns to rest so that driving resumes from a
    /// standstill.
    pub fn make_safe(&mut self) {
        let pause = self.applied.pause;

        self.applied = Command {
            pause,
            ..Default::default()
        };
        self.last_aux_sent = 0.0;

        self.drive_ctrl.make_safe();
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_session_transitions() {
        let mut ds = DataStore::new(Duration::from_secs(1));

        assert_eq!(ds.session_state(), SessionState::AwaitingFirstPacket);

        // A pause packet before the first packet has no effect
        ds.toggle_pause();
        assert_eq!(ds.session_state(), SessionState::AwaitingFirstPacket);

        ds.note_packet();
        assert_eq!(ds.session_state(), SessionState::Active);

        ds.toggle_pause();
        assert_eq!(ds.session_state(), SessionState::Paused);

        ds.toggle_pause();
        assert_eq!(ds.session_state(), SessionState::Active);
    }

    #[test]
    fn test_termination_is_one_way() {
        let mut ds = DataStore::new(Duration::from_secs(1));

        ds.note_packet();
        ds.terminate(TerminationCause::TransportFailure);
        assert_eq!(ds.session_state(), SessionState::Terminated);

        // Nothing brings a terminated session back, and the original cause survives
        ds.note_packet();
        ds.toggle_pause();
        ds.terminate(TerminationCause::EncodeFailure);

        assert_eq!(ds.session_state(), SessionState::Terminated);
        assert_eq!(
            ds.termination_cause(),
            Some(TerminationCause::TransportFailure)
        );
    }

    #[test]
    fn test_liveness_verdicts() {
        let mut ds = DataStore::new(Duration::from_millis(50));

        assert_eq!(ds.liveness(), LivenessVerdict::NotStarted);

        ds.note_packet();
        assert_eq!(ds.liveness(), LivenessVerdict::Alive);

        sleep(Duration::from_millis(80));

        // Expiry is reported exactly once, then the link is inert
        assert_eq!(ds.liveness(), LivenessVerdict::JustExpired);
        assert_eq!(ds.liveness(), LivenessVerdict::Inert);

        // A new packet restores the link with a fresh watchdog
        ds.note_packet();
        assert_eq!(ds.liveness(), LivenessVerdict::Alive);
    }

    #[test]
    fn test_make_safe() {
        let mut ds = DataStore::new(Duration::from_secs(1));

        ds.applied = Command {
            forward: 0.5,
            rotation: -0.25,
            auxiliary: 1.0,
            invert: true,
            pause: true,
        };
        ds.last_aux_sent = 1.0;

        ds.make_safe();

        assert_eq!(ds.applied.forward, 0.0);
        assert_eq!(ds.applied.rotation, 0.0);
        assert_eq!(ds.applied.auxiliary, 0.0);
        assert!(!ds.applied.invert);
        assert!(ds.applied.pause);
        assert_eq!(ds.last_aux_sent, 0.0);
    }
}
