//! Network Module
//!
//! TCP server and controller session handling.
//!
//! ## Architecture
//! - Single acceptor thread
//! - Worker thread pool, one session per worker
//! - Commands routed through [`crate::router::Router`]

mod connection;
mod server;

pub use connection::{Session, SessionState};
pub use server::{Server, ShutdownHandle};
