//! TCP Server
//!
//! Accepts controller connections and hands them to a fixed pool of worker
//! threads, one session per worker at a time.

use std::collections::HashMap;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, SendTimeoutError};
use parking_lot::{Condvar, Mutex};

use super::connection::Session;
use crate::bridge::Simulation;
use crate::config::Config;
use crate::error::{Result, TraciError};
use crate::router::Router;

/// Accept loop poll interval while idle
const ACCEPT_POLL: Duration = Duration::from_millis(50);

/// Clonable handle that stops a running [`Server`]
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// TCP server for simulation controllers
pub struct Server<S: Simulation> {
    config: Config,
    router: Arc<Router<S>>,
    listener: TcpListener,
    local_addr: SocketAddr,
    shutdown: ShutdownHandle,
    connections: Arc<ConnectionTracker>,
}

impl<S: Simulation> Server<S> {
    /// Bind the listening socket
    ///
    /// Binding to port 0 picks a free port; see [`Server::local_addr`].
    pub fn bind(config: Config, router: Arc<Router<S>>) -> Result<Self> {
        config.validate()?;

        let listener = TcpListener::bind(&config.listen_addr)?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        Ok(Self {
            config,
            router,
            listener,
            local_addr,
            shutdown: ShutdownHandle::default(),
            connections: Arc::new(ConnectionTracker::default()),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Number of sessions currently being served
    pub fn active_connections(&self) -> usize {
        self.connections.len()
    }

    /// Serve connections until shutdown is requested (blocking)
    ///
    /// On shutdown the listening socket is closed and every session stops
    /// reading. A session still answering a request gets `shutdown_grace_ms`
    /// to write its reply before its socket is closed.
    pub fn run(self) -> Result<()> {
        tracing::info!(
            "Listening on {} ({} worker(s))",
            self.local_addr,
            self.config.max_connections
        );

        let (tx, rx) = channel::bounded::<TcpStream>(0);
        let workers = self.spawn_workers(rx)?;

        let Self {
            config,
            listener,
            shutdown,
            connections,
            ..
        } = self;

        while !shutdown.is_shutdown() {
            match listener.accept() {
                Ok((stream, addr)) => {
                    tracing::debug!("Accepted connection from {}", addr);
                    if let Err(e) = stream.set_nonblocking(false) {
                        tracing::warn!("Failed to configure connection from {}: {}", addr, e);
                        continue;
                    }

                    let mut pending = stream;
                    loop {
                        match tx.send_timeout(pending, ACCEPT_POLL) {
                            Ok(()) => break,
                            Err(SendTimeoutError::Timeout(stream)) => {
                                if shutdown.is_shutdown() {
                                    let _ = stream.shutdown(Shutdown::Both);
                                    break;
                                }
                                pending = stream;
                            }
                            Err(SendTimeoutError::Disconnected(_)) => {
                                return Err(TraciError::Protocol(
                                    "worker pool terminated".to_string(),
                                ));
                            }
                        }
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL);
                }
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    thread::sleep(ACCEPT_POLL);
                }
            }
        }

        drop(listener);
        drop(tx);
        tracing::info!("Shutting down, {} open session(s)", connections.len());
        connections.stop_reading();

        let grace = Duration::from_millis(config.shutdown_grace_ms);
        if !connections.wait_idle(grace) {
            tracing::warn!(
                "Closing {} session(s) still open after {:?}",
                connections.len(),
                grace
            );
            connections.close_all();
        }

        for worker in workers {
            if worker.join().is_err() {
                tracing::error!("session worker panicked");
            }
        }

        tracing::info!("Server stopped");
        Ok(())
    }

    fn spawn_workers(&self, rx: Receiver<TcpStream>) -> Result<Vec<JoinHandle<()>>> {
        (0..self.config.max_connections)
            .map(|index| {
                let rx = rx.clone();
                let router = Arc::clone(&self.router);
                let connections = Arc::clone(&self.connections);
                let config = self.config.clone();

                thread::Builder::new()
                    .name(format!("session-{}", index))
                    .spawn(move || {
                        for stream in rx.iter() {
                            serve(stream, &router, &connections, &config);
                        }
                    })
                    .map_err(TraciError::from)
            })
            .collect()
    }
}

fn serve<S: Simulation>(
    stream: TcpStream,
    router: &Arc<Router<S>>,
    connections: &ConnectionTracker,
    config: &Config,
) {
    let _registered = match stream.try_clone() {
        Ok(handle) => Registered {
            id: connections.insert(handle),
            connections,
        },
        Err(e) => {
            tracing::warn!("Failed to register connection: {}", e);
            return;
        }
    };

    let result = Session::new(stream, Arc::clone(router), config.max_frame_size).and_then(
        |mut session| {
            session.set_timeouts(config.read_timeout_ms, config.write_timeout_ms)?;
            session.handle()
        },
    );
    if let Err(e) = result {
        tracing::debug!("Session ended with error: {}", e);
    }
}

/// Tracker entry of a session being served; removed on drop, unwinding included
struct Registered<'a> {
    id: u64,
    connections: &'a ConnectionTracker,
}

impl Drop for Registered<'_> {
    fn drop(&mut self) {
        self.connections.remove(self.id);
    }
}

/// Open sockets, so shutdown can signal them, wait, and then close them
#[derive(Default)]
struct ConnectionTracker {
    next_id: AtomicU64,
    open: Mutex<HashMap<u64, TcpStream>>,
    idle: Condvar,
    stopping: AtomicBool,
}

impl ConnectionTracker {
    fn insert(&self, stream: TcpStream) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut open = self.open.lock();
        // handed over after shutdown began: the session sees EOF at once
        if self.stopping.load(Ordering::SeqCst) {
            let _ = stream.shutdown(Shutdown::Read);
        }
        open.insert(id, stream);
        id
    }

    fn remove(&self, id: u64) {
        let mut open = self.open.lock();
        open.remove(&id);
        if open.is_empty() {
            self.idle.notify_all();
        }
    }

    fn len(&self) -> usize {
        self.open.lock().len()
    }

    /// Wait until no session is open; false on timeout
    fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut open = self.open.lock();
        while !open.is_empty() {
            if self.idle.wait_until(&mut open, deadline).timed_out() {
                return open.is_empty();
            }
        }
        true
    }

    /// Make blocked and future frame reads see end of stream
    ///
    /// Replies already being computed can still be written.
    fn stop_reading(&self) {
        let open = self.open.lock();
        self.stopping.store(true, Ordering::SeqCst);
        for stream in open.values() {
            let _ = stream.shutdown(Shutdown::Read);
        }
    }

    fn close_all(&self) {
        for stream in self.open.lock().values() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}
