//! Client Session
//!
//! Serves one controller connection: reads a frame, executes every command
//! in it in order, and answers with one frame holding the responses.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crate::bridge::Simulation;
use crate::error::{Result, TraciError};
use crate::protocol::{
    encode_responses, parse_commands, read_frame, write_frame, Command, Response,
};
use crate::router::Router;
use crate::subscription::SubscriptionRegistry;

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    Closed,
}

/// Handles a single controller connection
pub struct Session<S: Simulation> {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    router: Arc<Router<S>>,

    /// Subscriptions registered by this controller
    subscriptions: SubscriptionRegistry,

    state: SessionState,

    max_frame_size: u32,

    /// Peer address for logging
    peer_addr: String,
}

impl<S: Simulation> Session<S> {
    /// Create a new session handler
    ///
    /// Sets up buffered I/O and disables Nagle's algorithm
    pub fn new(stream: TcpStream, router: Arc<Router<S>>, max_frame_size: u32) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            router,
            subscriptions: SubscriptionRegistry::new(),
            state: SessionState::Connected,
            max_frame_size,
            peer_addr,
        })
    }

    /// Configure connection timeouts; zero leaves a direction unbounded
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        if read_ms > 0 {
            self.reader
                .get_ref()
                .set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            self.writer
                .get_ref()
                .set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }
        Ok(())
    }

    /// Serve the connection until the controller closes it
    ///
    /// Disconnects and CLOSE end the session with `Ok`. A malformed frame
    /// ends only this session and is returned as the error.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Session established with {}", self.peer_addr);

        while self.state == SessionState::Connected {
            let payload = match read_frame(&mut self.reader, self.max_frame_size) {
                Ok(payload) => payload,
                Err(e) if e.is_disconnect() || is_timeout(&e) => {
                    tracing::debug!("Client {} disconnected: {}", self.peer_addr, e);
                    self.state = SessionState::Closed;
                    return Ok(());
                }
                Err(e) => {
                    if e.is_protocol() {
                        tracing::warn!("Bad frame from {}: {}", self.peer_addr, e);
                    } else {
                        tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    }
                    self.state = SessionState::Closed;
                    return Err(e);
                }
            };

            let commands = match parse_commands(payload) {
                Ok(commands) => commands,
                Err(e) => {
                    tracing::warn!("Malformed command from {}: {}", self.peer_addr, e);
                    self.state = SessionState::Closed;
                    return Err(e);
                }
            };

            tracing::trace!("Received {} command(s) from {}", commands.len(), self.peer_addr);

            let responses = self.execute_all(&commands);

            if let Err(e) = self.send_responses(&responses) {
                self.state = SessionState::Closed;
                if e.is_disconnect() {
                    tracing::debug!(
                        "Client {} disconnected before response could be sent: {}",
                        self.peer_addr,
                        e
                    );
                    return Ok(());
                }
                tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                return Err(e);
            }
        }

        tracing::debug!("Session with {} closed", self.peer_addr);
        Ok(())
    }

    /// Execute commands in frame order
    ///
    /// Commands after a CLOSE are not executed.
    fn execute_all(&mut self, commands: &[Command]) -> Vec<Response> {
        let mut responses = Vec::with_capacity(commands.len());
        for command in commands {
            let routed = self.router.route(command, &mut self.subscriptions);
            responses.push(routed.response);
            if routed.close {
                tracing::debug!("Client {} requested close", self.peer_addr);
                self.state = SessionState::Closed;
                break;
            }
        }
        responses
    }

    fn send_responses(&mut self, responses: &[Response]) -> Result<()> {
        let payload = encode_responses(responses)?;
        write_frame(&mut self.writer, &payload)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

fn is_timeout(err: &TraciError) -> bool {
    matches!(
        err,
        TraciError::Io(e)
            if matches!(e.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut)
    )
}
