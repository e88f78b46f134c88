//! Main robot-side executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise all modules and actuator buses
//!     - Main loop:
//!         - Battery voltage acquisition
//!         - Operator packet processing and session management
//!         - Operator link liveness monitoring
//!         - Drive control processing
//!         - Actuator dispatch
//!
//! The executable runs a single operator session. If that session terminates, for instance
//! because the operator link itself fails, the executable safes the robot and exits - it must be
//! restarted to accept a new session.

// ------------------------------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ------------------------------------------------------------------------------------------------

use bot_lib::{
    act_dispatch::{self, ActDispatch, RoboclawLink, SocketcanBus},
    data_store::{DataStore, LivenessVerdict, SessionState, TerminationCause, TerminationReport},
    drive_ctrl,
    op_server::{OpServer, OpServerError},
    params::BotExecParams,
};

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use comms_if::op::{Command, OpPacket};
use log::{error, info, warn};
use std::thread;
use std::time::{Duration, Instant};

// Internal
use util::{
    archive::Archived,
    host,
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
};

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("bot_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("URSA Robot Executable\n");
    info!(
        "Running on: {:#?}",
        host::get_uname().wrap_err("Failed to get host information")?
    );
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let bot_exec_params: BotExecParams =
        util::params::load("bot_exec.toml").wrap_err("Could not load bot_exec params")?;

    info!("Exec parameters loaded");

    let cycle_period = Duration::from_secs_f64(bot_exec_params.cycle_period_s);

    // ---- INITIALISE DATASTORE ----

    info!("Initialising modules...");

    let mut ds = DataStore::new(Duration::from_secs_f64(bot_exec_params.watchdog_timeout_s));

    // ---- INITIALISE MODULES ----

    ds.drive_ctrl
        .init("drive_ctrl.toml", &session)
        .wrap_err("Failed to initialise DriveCtrl")?;
    info!("DriveCtrl init complete");

    info!("Module initialisation complete\n");

    // ---- INITIALISE ACTUATORS ----

    info!("Initialising actuator buses");

    let act_dispatch_params: act_dispatch::Params =
        util::params::load("act_dispatch.toml").wrap_err("Could not load act_dispatch params")?;

    let drive_bus = SocketcanBus::open(&act_dispatch_params.can_channel).wrap_err(format!(
        "Failed to open CAN channel {:?}",
        act_dispatch_params.can_channel
    ))?;
    info!(
        "Drive bus open on {:?} ({} bit/s)",
        act_dispatch_params.can_channel, act_dispatch_params.can_bitrate
    );

    let aux_link = RoboclawLink::open(
        &act_dispatch_params.aux_port,
        act_dispatch_params.aux_baud,
        act_dispatch_params.aux_address,
    )
    .wrap_err(format!(
        "Failed to open auxiliary serial port {:?}",
        act_dispatch_params.aux_port
    ))?;
    info!(
        "Auxiliary link open on {:?}",
        act_dispatch_params.aux_port
    );

    let mut act_dispatch = ActDispatch::new(act_dispatch_params, drive_bus, aux_link)
        .wrap_err("Failed to initialise ActDispatch")?;

    info!("Actuator initialisation complete");

    // ---- INITIALISE NETWORK ----

    info!("Initialising network");

    let zmq_ctx = comms_if::net::zmq::Context::new();

    let mut op_server = {
        let s = OpServer::new(&zmq_ctx, &bot_exec_params)
            .wrap_err("Failed to initialise OpServer")?;
        info!("OpServer initialised");
        s
    };

    info!("Network initialisation complete");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let mut prev_cycle_instant = Instant::now();
    let mut last_battery_poll: Option<Instant> = None;

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // Wall clock time since the previous cycle started, which is what the ramp budget is
        // based on
        let cycle_elapsed_s = cycle_start_instant
            .duration_since(prev_cycle_instant)
            .as_secs_f64();
        prev_cycle_instant = cycle_start_instant;

        // ---- DATA INPUT ----

        // Poll the battery voltage on its own period. The poll time is marked even on failure so
        // a dead link isn't hammered every cycle.
        let battery_poll_due = match last_battery_poll {
            Some(t) => t.elapsed().as_secs_f64() >= bot_exec_params.battery_poll_period_s,
            None => true,
        };
        if battery_poll_due {
            match act_dispatch.read_battery_v() {
                Ok(v) => ds.battery_v = v,
                Err(e) => warn!("Could not read battery voltage: {}", e),
            }
            last_battery_poll = Some(Instant::now());
        }

        // ---- OPERATOR PACKET PROCESSING ----

        let reply = ds.reply();

        match op_server.recieve_latest(&reply) {
            Ok(Some(packet)) => {
                match packet {
                    // Heartbeats exist only to feed the watchdog
                    OpPacket::Heartbeat => ds.note_packet(),

                    OpPacket::Controller(data) => {
                        ds.note_packet();

                        // Controller samples only steer an active session, a paused one ignores
                        // them
                        if ds.session_state() == SessionState::Active {
                            let pause = ds.applied.pause;
                            ds.applied = Command::from(&data);
                            ds.applied.pause = pause;
                        }
                    }

                    // Pause packets leave the watchdog untouched
                    OpPacket::Pause => {
                        ds.toggle_pause();

                        match ds.session_state() {
                            SessionState::Paused => {
                                // Pausing stops the robot now, not at the next ramp step
                                if let Err(e) = act_dispatch.full_stop() {
                                    warn!("Full stop on pause failed: {}", e);
                                }
                                ds.make_safe();
                                ds.applied.pause = true;
                            }
                            SessionState::Active => ds.applied.pause = false,
                            _ => (),
                        }
                    }
                }
            }
            Ok(None) => (),
            Err(e) => {
                // The operator link itself has failed, which is not survivable. Safe the robot
                // and end the session.
                error!("OpServer error: {}", e);

                if let Err(e) = act_dispatch.full_stop() {
                    warn!("Full stop on termination failed: {}", e);
                }

                let cause = match e {
                    OpServerError::ReplyEncodeError(_) => TerminationCause::EncodeFailure,
                    _ => TerminationCause::TransportFailure,
                };
                ds.terminate(cause);

                break;
            }
        }

        // ---- LIVENESS MONITORING ----

        let liveness = ds.liveness();

        if liveness == LivenessVerdict::JustExpired {
            match ds.time_since_last_packet() {
                Some(d) => warn!(
                    "No operator packet for {:.02} s, safing the robot",
                    d.as_secs_f64()
                ),
                None => warn!("Operator link lost, safing the robot"),
            }

            if let Err(e) = act_dispatch.full_stop() {
                warn!("Full stop on watchdog expiry failed: {}", e);
            }
            ds.make_safe();
        }

        // ---- CONTROL ALGORITHM PROCESSING ----

        let drive_enabled =
            ds.session_state() == SessionState::Active && liveness == LivenessVerdict::Alive;

        if drive_enabled {
            let (forward, rotation) = ds.applied.drive_inputs();

            let drive_ctrl_input = drive_ctrl::InputData {
                forward,
                rotation,
                elapsed_s: cycle_elapsed_s,
            };

            match ds.drive_ctrl.proc(&drive_ctrl_input) {
                Ok((o, r)) => {
                    ds.drive_ctrl_output = o;
                    ds.drive_ctrl_status_rpt = r;
                }
                Err(e) => {
                    // DriveCtrl errors mean this cycle's demand was unusable, skip it and drive
                    // on the standing demand
                    warn!("Error during DriveCtrl processing: {}", e)
                }
            };

            // ---- ACTUATOR DISPATCH ----

            match act_dispatch
                .dispatch_drive((ds.drive_ctrl_output.left, ds.drive_ctrl_output.right))
            {
                Ok(_) => (),
                Err(e) => warn!("Could not dispatch drive demand: {}", e),
            }

            // The auxiliary controller latches its demand, so only changes need dispatching.
            // last_aux_sent is only updated on success, a failed send is retried next cycle.
            if ds.applied.auxiliary != ds.last_aux_sent {
                match act_dispatch.dispatch_aux(ds.applied.auxiliary) {
                    Ok(_) => ds.last_aux_sent = ds.applied.auxiliary,
                    Err(e) => warn!("Could not dispatch auxiliary demand: {}", e),
                }
            }

            // ---- WRITE ARCHIVES ----

            if let Err(e) = ds.drive_ctrl.write() {
                warn!("Could not write DriveCtrl archives: {}", e);
            }
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match cycle_period.checked_sub(cycle_dur) {
            Some(d) => {
                ds.num_consec_cycle_overruns = 0;
                thread::sleep(d);
            }
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - cycle_period.as_secs_f64()
                );
                ds.num_consec_cycle_overruns += 1;
            }
        }

        // Increment cycle counter
        ds.num_cycles += 1;
    }

    // ---- SHUTDOWN ----

    info!("End of execution");

    match ds.termination_cause() {
        Some(cause) => {
            session.save(
                "termination_report.json",
                TerminationReport {
                    cause,
                    num_cycles: ds.num_cycles as u64,
                    elapsed_s: util::session::get_elapsed_seconds(),
                },
            );
            session.exit();

            Err(eyre!("Operator session terminated: {:?}", cause))
        }
        None => {
            session.exit();
            Ok(())
        }
    }
}
