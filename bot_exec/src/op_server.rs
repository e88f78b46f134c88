//! # Operator Server Module
//!
//! This module abstracts over the networking side of the robot executable. The server accepts
//! requests from the operator console, allowing packets to be recieved and a state echo to be
//! returned for every request.
//!
//! The console may send packets faster than the control cycle runs, so each cycle drains every
//! request waiting on the socket and keeps only the most recent valid packet. Every drained
//! request is answered, as the REP pattern demands, with the reply snapshot taken at the start of
//! the cycle. Malformed packets are logged and answered like any other request, they simply
//! don't produce a packet for the session to act on.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use comms_if::{
    net::{zmq, MonitoredSocket, MonitoredSocketError, SocketOptions},
    op::{OpPacket, OpReply},
};
use log::warn;

// Internal
use crate::params::BotExecParams;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Maximum number of requests drained from the socket in a single cycle.
///
/// Bounds the time spent reading the socket so that a console flooding the link cannot stall the
/// control cycle.
const MAX_DRAIN_PER_CYCLE: usize = 16;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An abstraction over the networking part of the robot executable.
///
/// The server accepts requests from the operator console, allowing packets to be recieved and
/// the applied command to be echoed back for every request.
pub struct OpServer {
    /// REP socket which accepts packets from the console
    op_socket: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors which can occur in the [`OpServer`]
#[derive(thiserror::Error, Debug)]
pub enum OpServerError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not encode the reply: {0}")]
    ReplyEncodeError(serde_json::Error),

    #[error("Could not read from the operator socket: {0}")]
    RecvError(zmq::Error),

    #[error("Could not send a reply to the console: {0}")]
    SendError(zmq::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl OpServer {
    /// Create a new instance of the operator server.
    ///
    /// This function will not wait for a connection from the console before returning.
    pub fn new(ctx: &zmq::Context, params: &BotExecParams) -> Result<Self, OpServerError> {
        // Create the socket options
        let op_socket_options = SocketOptions {
            bind: true,
            block_on_first_connect: false,
            linger: 1,
            recv_timeout: 10,
            send_timeout: 10,
            ..Default::default()
        };

        // Create the socket
        let op_socket = MonitoredSocket::new(ctx, zmq::REP, op_socket_options, &params.op_endpoint)?;

        // Create self
        Ok(Self { op_socket })
    }

    /// Drain all pending requests from the console and return the latest valid packet.
    ///
    /// Every drained request is answered with `reply`. `None` is returned when no valid packet
    /// arrived this cycle, which is not an error - silence is handled by the session's watchdog,
    /// not here.
    ///
    /// An `Err` from this function means the link itself has failed and the session cannot
    /// continue.
    pub fn recieve_latest(&mut self, reply: &OpReply) -> Result<Option<OpPacket>, OpServerError> {
        // The same snapshot answers every request drained this cycle
        let reply_str = reply.to_json().map_err(OpServerError::ReplyEncodeError)?;

        let mut latest = None;

        for _ in 0..MAX_DRAIN_PER_CYCLE {
            let msg = match self.op_socket.recv_string(zmq::DONTWAIT) {
                Ok(m) => m,
                // Nothing more waiting on the socket
                Err(zmq::Error::EAGAIN) => break,
                Err(e) => return Err(OpServerError::RecvError(e)),
            };

            // The REP pattern requires each request be answered before the next read
            if let Err(e) = self.op_socket.send(&reply_str, 0) {
                return Err(OpServerError::SendError(e));
            }

            let packet_str = match msg {
                Ok(s) => s,
                Err(bytes) => {
                    warn!("Recieved a non UTF-8 packet from the console ({} bytes)", bytes.len());
                    continue;
                }
            };

            match OpPacket::from_json(&packet_str) {
                Ok(packet) => latest = Some(packet),
                Err(e) => warn!("Could not parse packet {:?}: {}", packet_str, e),
            }
        }

        Ok(latest)
    }
}

impl From<MonitoredSocketError> for OpServerError {
    fn from(e: MonitoredSocketError) -> Self {
        OpServerError::SocketError(e)
    }
}
