//! # Actuator dispatch module
//!
//! This module owns the robot's actuator buses and is the only place demands actually leave the
//! software. Wheel duty cycles are encoded as VESC set-duty frames on the CAN bus, and the
//! auxiliary actuator demand as a Roboclaw drive command on a serial link.
//!
//! Drive frames are rate limited: once a pair of frames has been sent no further frames go out
//! until the minimum send interval has elapsed, and calls in between simply return the demand
//! standing on the bus. The [`ActDispatch::full_stop`] path bypasses the rate limit, zeroing
//! every actuator immediately.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod aux_link;
mod drive_bus;
mod params;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use aux_link::{AuxLink, AuxLinkError, RoboclawLink};
pub use drive_bus::{DriveBus, DriveBusError, SocketcanBus};
pub use params::{Params, ParamsError};

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// Standard
use std::time::{Duration, Instant};

// External
use log::trace;
use thiserror::Error;

// Internal
use comms_if::eqpt::{roboclaw, vesc};

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// Actuator dispatch state.
///
/// Generic over the bus and link implementations so that tests can substitute recording fakes
/// for the real hardware.
pub struct ActDispatch<B: DriveBus, A: AuxLink> {
    params: Params,

    drive_bus: B,
    aux_link: A,

    throttle: BusThrottle,

    /// The wheel demand currently standing on the drive bus.
    standing: (f64, f64),
}

/// Rate limiter for the drive bus.
///
/// The drive controllers latch the last duty they were given, so frames only need to go out when
/// the demand is allowed to change. Tracking the last send time here keeps the bus quiet between
/// those points.
struct BusThrottle {
    min_interval: Duration,
    last_sent: Option<Instant>,
}

// ------------------------------------------------------------------------------------------------
// ENUMERATIONS
// ------------------------------------------------------------------------------------------------

/// Errors which can occur during actuator dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Invalid parameters: {0}")]
    ParamsInvalid(ParamsError),

    #[error("Drive bus write failed: {0}")]
    DriveBusError(#[from] DriveBusError),

    #[error("Auxiliary link failed: {0}")]
    AuxLinkError(#[from] AuxLinkError),

    #[error("Recieved a non-finite auxiliary demand ({0})")]
    NonFiniteDemand(f64),
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl BusThrottle {
    fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_sent: None,
        }
    }

    /// True if enough time has passed since the last send for another frame to go out.
    ///
    /// The first send is always allowed.
    fn window_open(&self, now: Instant) -> bool {
        match self.last_sent {
            Some(t) => now.duration_since(t) > self.min_interval,
            None => true,
        }
    }

    fn mark_sent(&mut self, now: Instant) {
        self.last_sent = Some(now);
    }
}

impl<B: DriveBus, A: AuxLink> ActDispatch<B, A> {
    /// Create a new dispatcher over the given bus and link.
    pub fn new(params: Params, drive_bus: B, aux_link: A) -> Result<Self, DispatchError> {
        // Check parameters are valid
        match params.are_valid() {
            Ok(_) => (),
            Err(e) => return Err(DispatchError::ParamsInvalid(e)),
        }

        let throttle = BusThrottle::new(Duration::from_secs_f64(params.min_send_interval_s));

        Ok(Self {
            params,
            drive_bus,
            aux_link,
            throttle,
            standing: (0.0, 0.0),
        })
    }

    /// Dispatch a wheel demand to the drive controllers.
    ///
    /// Returns the demand standing on the bus afterwards. If the rate limit window is closed the
    /// frames are withheld and the previously dispatched demand is returned unchanged.
    ///
    /// On a bus error the throttle is not advanced, so the demand is retried on the next call
    /// rather than being silently lost for a whole window.
    pub fn dispatch_drive(&mut self, wheels: (f64, f64)) -> Result<(f64, f64), DispatchError> {
        let now = Instant::now();

        if !self.throttle.window_open(now) {
            return Ok(self.standing);
        }

        self.drive_bus
            .send_frame(self.params.arb_id_left, &vesc::duty_frame(wheels.0))?;
        self.drive_bus
            .send_frame(self.params.arb_id_right, &vesc::duty_frame(wheels.1))?;

        self.throttle.mark_sent(now);
        self.standing = (wheels.0.clamp(-1.0, 1.0), wheels.1.clamp(-1.0, 1.0));

        trace!(
            "Drive demand dispatched: left = {}, right = {}",
            self.standing.0,
            self.standing.1
        );

        Ok(self.standing)
    }

    /// Dispatch an auxiliary actuator demand.
    ///
    /// A non-finite demand would encode as full reverse, so it is rejected here before it can
    /// reach the controller.
    pub fn dispatch_aux(&mut self, velocity: f64) -> Result<(), DispatchError> {
        if !velocity.is_finite() {
            return Err(DispatchError::NonFiniteDemand(velocity));
        }

        self.aux_link.set_duty(roboclaw::duty_byte(velocity))?;

        trace!("Auxiliary demand dispatched: {}", velocity);

        Ok(())
    }

    /// Zero every actuator immediately, bypassing the rate limit.
    ///
    /// All actuators are attempted even if an earlier one fails, and the first error is
    /// returned.
    pub fn full_stop(&mut self) -> Result<(), DispatchError> {
        let now = Instant::now();
        let zero = vesc::duty_frame(0.0);

        let mut result = Ok(());

        for arb_id in [self.params.arb_id_left, self.params.arb_id_right] {
            if let Err(e) = self.drive_bus.send_frame(arb_id, &zero) {
                if result.is_ok() {
                    result = Err(DispatchError::DriveBusError(e));
                }
            }
        }

        if let Err(e) = self
            .aux_link
            .set_duty(roboclaw::duty_byte(0.0))
        {
            if result.is_ok() {
                result = Err(DispatchError::AuxLinkError(e));
            }
        }

        self.throttle.mark_sent(now);
        self.standing = (0.0, 0.0);

        result
    }

    /// Read the main battery voltage from the auxiliary controller.
    pub fn read_battery_v(&mut self) -> Result<f64, DispatchError> {
        Ok(self.aux_link.read_battery_v()?)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::io;

    /// Recording fake for the drive bus.
    #[derive(Default)]
    struct MockBus {
        frames: Vec<(u32, Vec<u8>)>,
        fail_next: bool,
    }

    impl DriveBus for &mut MockBus {
        fn send_frame(&mut self, arb_id: u32, data: &[u8]) -> Result<(), DriveBusError> {
            if self.fail_next {
                self.fail_next = false;
                return Err(DriveBusError::IoError(io::Error::new(
                    io::ErrorKind::Other,
                    "mock bus failure",
                )));
            }
            self.frames.push((arb_id, data.to_vec()));
            Ok(())
        }
    }

    /// Recording fake for the auxiliary link.
    struct MockLink {
        duties: Vec<u8>,
        battery_tenths: u16,
    }

    impl Default for MockLink {
        fn default() -> Self {
            Self {
                duties: vec![],
                battery_tenths: 124,
            }
        }
    }

    impl AuxLink for &mut MockLink {
        fn set_duty(&mut self, duty: u8) -> Result<(), AuxLinkError> {
            self.duties.push(duty);
            Ok(())
        }

        fn read_battery_v(&mut self) -> Result<f64, AuxLinkError> {
            Ok(roboclaw::battery_from_tenths(self.battery_tenths))
        }
    }

    fn test_params(min_send_interval_s: f64) -> Params {
        Params {
            can_channel: "vcan0".into(),
            can_bitrate: 500_000,
            arb_id_left: 0x01,
            arb_id_right: 0x02,
            min_send_interval_s,
            aux_port: "/dev/null".into(),
            aux_baud: 38400,
            aux_address: roboclaw::DEFAULT_ADDRESS,
        }
    }

    #[test]
    fn test_dispatch_encodes_vesc_frames() {
        let mut bus = MockBus::default();
        let mut link = MockLink::default();

        {
            let mut dispatch =
                ActDispatch::new(test_params(0.0), &mut bus, &mut link).unwrap();

            let standing = dispatch.dispatch_drive((1.0, -0.5)).unwrap();
            assert_eq!(standing, (1.0, -0.5));
        }

        assert_eq!(bus.frames.len(), 2);
        assert_eq!(bus.frames[0], (0x01, vesc::duty_frame(1.0).to_vec()));
        assert_eq!(bus.frames[1], (0x02, vesc::duty_frame(-0.5).to_vec()));
    }

    #[test]
    fn test_throttle_holds_standing_demand() {
        let mut bus = MockBus::default();
        let mut link = MockLink::default();

        {
            // Window far longer than the test, so only the first send goes out
            let mut dispatch =
                ActDispatch::new(test_params(3600.0), &mut bus, &mut link).unwrap();

            assert_eq!(dispatch.dispatch_drive((0.5, 0.5)).unwrap(), (0.5, 0.5));

            // Second demand is withheld, the standing demand comes back instead
            assert_eq!(dispatch.dispatch_drive((-1.0, 1.0)).unwrap(), (0.5, 0.5));
        }

        assert_eq!(bus.frames.len(), 2);
    }

    #[test]
    fn test_zero_interval_sends_every_cycle() {
        let mut bus = MockBus::default();
        let mut link = MockLink::default();

        {
            let mut dispatch =
                ActDispatch::new(test_params(0.0), &mut bus, &mut link).unwrap();

            dispatch.dispatch_drive((0.1, 0.1)).unwrap();
            std::thread::sleep(Duration::from_millis(2));
            dispatch.dispatch_drive((0.2, 0.2)).unwrap();
        }

        assert_eq!(bus.frames.len(), 4);
    }

    #[test]
    fn test_full_stop_bypasses_throttle() {
        let mut bus = MockBus::default();
        let mut link = MockLink::default();

        {
            let mut dispatch =
                ActDispatch::new(test_params(3600.0), &mut bus, &mut link).unwrap();

            dispatch.dispatch_drive((1.0, 1.0)).unwrap();

            // Throttle window is closed but the stop must still go out
            dispatch.full_stop().unwrap();

            // Afterwards the standing demand is zero
            assert_eq!(dispatch.dispatch_drive((1.0, 1.0)).unwrap(), (0.0, 0.0));
        }

        assert_eq!(bus.frames.len(), 4);
        assert_eq!(bus.frames[2], (0x01, vesc::duty_frame(0.0).to_vec()));
        assert_eq!(bus.frames[3], (0x02, vesc::duty_frame(0.0).to_vec()));

        // The auxiliary actuator is stopped too
        assert_eq!(link.duties, vec![roboclaw::duty_byte(0.0)]);
    }

    #[test]
    fn test_failed_send_retried_within_window() {
        let mut bus = MockBus {
            fail_next: true,
            ..Default::default()
        };
        let mut link = MockLink::default();

        {
            let mut dispatch =
                ActDispatch::new(test_params(3600.0), &mut bus, &mut link).unwrap();

            // First dispatch hits the bus failure
            assert!(dispatch.dispatch_drive((0.5, 0.5)).is_err());

            // The throttle must not have advanced, so the retry goes straight out
            assert_eq!(dispatch.dispatch_drive((0.5, 0.5)).unwrap(), (0.5, 0.5));
        }

        assert_eq!(bus.frames.len(), 2);
    }

    #[test]
    fn test_aux_demands() {
        let mut bus = MockBus::default();
        let mut link = MockLink::default();

        {
            let mut dispatch =
                ActDispatch::new(test_params(0.0), &mut bus, &mut link).unwrap();

            dispatch.dispatch_aux(0.5).unwrap();
            dispatch.dispatch_aux(-1.0).unwrap();

            assert!(matches!(
                dispatch.dispatch_aux(f64::NAN),
                Err(DispatchError::NonFiniteDemand(_))
            ));
        }

        assert_eq!(link.duties, vec![96, 0]);
    }

    #[test]
    fn test_battery_read() {
        let mut bus = MockBus::default();
        let mut link = MockLink::default();

        let mut dispatch = ActDispatch::new(test_params(0.0), &mut bus, &mut link).unwrap();

        assert_eq!(dispatch.read_battery_v().unwrap(), 12.4);
    }

    #[test]
    fn test_invalid_params_rejected() {
        let mut params = test_params(5.0);
        params.arb_id_right = params.arb_id_left;

        let mut bus = MockBus::default();
        let mut link = MockLink::default();

        assert!(matches!(
            ActDispatch::new(params, &mut bus, &mut link),
            Err(DispatchError::ParamsInvalid(_))
        ));
    }
}
