//! Operator console executable.
//!
//! A command-line client for driving the robot. Two modes are available:
//!
//! - Interactive (the default): a REPL in which each line becomes one packet to the robot. The
//!   console keeps a sticky controller state, so `drive 0.5 0` followed by `trig 1 0` sends a
//!   sample with both the stick and trigger values set.
//! - Streaming (`--dummy`): sends a neutral controller packet at a fixed rate until
//!   interrupted. Useful for exercising the robot's watchdog and control loop without a
//!   controller attached.
//!
//! Every packet is answered by the robot with an echo of the applied command and the battery
//! voltage, which the console prints.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// Standard
use std::str::FromStr;
use std::thread;
use std::time::Duration;

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use comms_if::{
    net::{zmq, MonitoredSocket, SocketOptions},
    op::{ControllerData, OpPacket, OpReply},
};
use rustyline::{error::ReadlineError, DefaultEditor};
use structopt::clap::AppSettings;
use structopt::StructOpt;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

const PROMPT: &str = "URSA $ ";

const HISTORY_PATH: &str = ".op_exec_history";

// ------------------------------------------------------------------------------------------------
// ENUMERATIONS
// ------------------------------------------------------------------------------------------------

/// Command line options for the console itself.
#[derive(StructOpt)]
#[structopt(name = "op_exec", about = "Operator console for the URSA rover")]
struct Opt {
    /// Endpoint of the robot's operator socket
    #[structopt(short, long, default_value = "tcp://localhost:5030")]
    endpoint: String,

    /// Stream neutral controller packets instead of running the REPL
    #[structopt(long)]
    dummy: bool,

    /// Packet rate in streaming mode, in hertz
    #[structopt(long, default_value = "10.0")]
    rate: f64,
}

/// A single line of the REPL.
#[derive(StructOpt)]
#[structopt(name = "", setting = AppSettings::NoBinaryName)]
enum ReplCommand {
    /// Set the drive demand (normalised forward and rotation values)
    Drive { forward: f64, rotation: f64 },

    /// Set the trigger values (normalised, auxiliary demand is left minus right)
    Trig { left: f64, right: f64 },

    /// Turn inverted driving on or off
    Invert { state: OnOff },

    /// Toggle the session's paused state
    Pause,

    /// Send a bare heartbeat
    Hb,

    /// Report whether the link to the robot is up
    Link,

    /// Zero the drive and trigger demands
    Stop,

    /// Exit the console
    Quit,
}

enum OnOff {
    On,
    Off,
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    let opt = Opt::from_args();

    println!("URSA Operator Console");
    println!("Connecting to {}...", opt.endpoint);

    // Create the socket. REQ with correlate/relaxed set, so a robot restart doesn't wedge the
    // console in a half-finished request.
    let zmq_ctx = zmq::Context::new();

    let socket_options = SocketOptions {
        block_on_first_connect: true,
        connect_timeout: 1000,
        recv_timeout: 1000,
        send_timeout: 100,
        req_correlate: true,
        req_relaxed: true,
        ..Default::default()
    };

    let socket = MonitoredSocket::new(&zmq_ctx, zmq::REQ, socket_options, &opt.endpoint)
        .wrap_err("Could not connect to the robot")?;

    println!("Connected\n");

    match opt.dummy {
        true => run_dummy(&socket, opt.rate),
        false => run_repl(&socket),
    }
}

/// Run the interactive REPL until the operator quits.
fn run_repl(socket: &MonitoredSocket) -> Result<(), Report> {
    let mut rl = DefaultEditor::new().wrap_err("Could not create the line editor")?;
    if rl.load_history(HISTORY_PATH).is_err() {
        println!("No history detected");
    }

    println!("Type \"help\" for the command list\n");

    // Sticky controller state, each command modifies it and sends the whole sample
    let mut controller = neutral_controller();

    loop {
        let line = match rl.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                println!("Unhandled error: {:?}", e);
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let _ = rl.add_history_entry(line.as_str());

        let command = match ReplCommand::from_iter_safe(line.split_whitespace()) {
            Ok(c) => c,
            Err(e) => {
                println!("{}", e.message);
                continue;
            }
        };

        let packet = match command {
            ReplCommand::Drive { forward, rotation } => {
                controller.left_stick_y = forward;
                controller.right_stick_y = rotation;
                OpPacket::Controller(controller)
            }
            ReplCommand::Trig { left, right } => {
                controller.left_trigger = left;
                controller.right_trigger = right;
                OpPacket::Controller(controller)
            }
            ReplCommand::Invert { state } => {
                controller.invert_button = matches!(state, OnOff::On);
                OpPacket::Controller(controller)
            }
            ReplCommand::Stop => {
                // Zero the demands but keep the invert preference
                let invert_button = controller.invert_button;
                controller = neutral_controller();
                controller.invert_button = invert_button;
                OpPacket::Controller(controller)
            }
            ReplCommand::Pause => OpPacket::Pause,
            ReplCommand::Hb => OpPacket::Heartbeat,
            ReplCommand::Link => {
                // Connection state as seen by the socket monitor, no packet needed
                match socket.connected() {
                    true => println!("Link to the robot is up"),
                    false => println!("Link to the robot is down"),
                }
                continue;
            }
            ReplCommand::Quit => break,
        };

        transact(socket, &packet);
    }

    rl.save_history(HISTORY_PATH).ok();

    println!("Exiting...");

    Ok(())
}

/// Stream neutral controller packets at the given rate until interrupted.
fn run_dummy(socket: &MonitoredSocket, rate: f64) -> Result<(), Report> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err(eyre!("Rate must be positive, got {}", rate));
    }

    let period = Duration::from_secs_f64(1.0 / rate);

    println!(
        "Streaming neutral controller packets at {} Hz, ctrl-c to stop\n",
        rate
    );

    let packet = OpPacket::Controller(neutral_controller());

    loop {
        transact(socket, &packet);
        thread::sleep(period);
    }
}

/// Send a packet and print whatever comes back.
///
/// Transport hiccups are printed rather than returned, the console stays up through robot
/// restarts.
fn transact(socket: &MonitoredSocket, packet: &OpPacket) {
    let json = match packet.to_json() {
        Ok(j) => j,
        Err(e) => {
            println!("Could not encode the packet: {}", e);
            return;
        }
    };

    if let Err(e) = socket.send(&json, 0) {
        println!("Could not send the packet: {}", e);
        return;
    }

    match socket.recv_string(0) {
        Ok(Ok(reply_str)) => match OpReply::from_json(&reply_str) {
            Ok(reply) => println!("{}", format_reply(&reply)),
            Err(e) => println!("Bad reply from the robot: {}", e),
        },
        Ok(Err(_)) => println!("Bad reply from the robot: not UTF-8"),
        Err(zmq::Error::EAGAIN) => println!("No reply from the robot (timed out)"),
        Err(e) => println!("Could not read the reply: {}", e),
    }
}

fn format_reply(reply: &OpReply) -> String {
    format!(
        "robot: fwd {:+.2} rot {:+.2} aux {:+.2} | invert {} | {} | batt {:.1} V",
        reply.forward,
        reply.rotation,
        reply.auxiliary,
        match reply.invert {
            true => "on",
            false => "off",
        },
        match reply.pause {
            true => "PAUSED",
            false => "active",
        },
        reply.battery_v
    )
}

fn neutral_controller() -> ControllerData {
    ControllerData {
        left_stick_y: 0.0,
        right_stick_y: 0.0,
        left_trigger: 0.0,
        right_trigger: 0.0,
        invert_button: false,
    }
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl FromStr for OnOff {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on" => Ok(OnOff::On),
            "off" => Ok(OnOff::Off),
            _ => Err(format!("expected \"on\" or \"off\", got \"{}\"", s)),
        }
    }
}
