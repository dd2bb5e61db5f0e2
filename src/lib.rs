//! # simtraci
//!
//! A TraCI-style remote control server for a pedestrian simulation:
//! - Length-prefixed binary protocol with batched commands per frame
//! - Get/set/subscribe APIs for persons and the simulation
//! - Lockstep or free-running simulation clock
//! - Multiple concurrent controllers sharing one simulation
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │              (one Session per controller)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ frames ──► commands
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                   Command Router                             │
//! │      control commands │ subscriptions │ handler registry     │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ with_state / advance
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                    SimBridge                                 │
//! │          (Mutex + step_requested / step_completed)           │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ step
//!                ┌──────▼──────┐
//!                │  SimDriver  │──► World
//!                └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod bridge;
pub mod world;
pub mod handler;
pub mod subscription;
pub mod router;
pub mod network;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{TraciError, Result};
pub use config::Config;
pub use bridge::{SimBridge, SimDriver, Simulation};
pub use client::TraciClient;
pub use handler::{default_registry, HandlerRegistry};
pub use network::{Server, ShutdownHandle};
pub use router::Router;
pub use world::World;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of simtraci
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
