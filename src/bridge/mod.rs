//! Simulation Access Bridge
//!
//! The synchronization boundary between client sessions and the simulation
//! driver. It owns the simulation state and hands it out under mutual
//! exclusion; it contains no simulation logic itself.
//!
//! ## Concurrency Model
//!
//! ```text
//!   session ──with_state──┐
//!   session ──advance─────┼──► Mutex<Inner { state, requested, completed }>
//!   driver  ──step────────┘          │                 ▲
//!                          step_requested         step_completed
//!                             (Condvar)              (Condvar)
//! ```
//!
//! - `with_state` runs a closure with exclusive access to the state.
//! - `advance` raises the requested step count, sleeps until the driver has
//!   completed it, then evaluates its closure while still holding the lock,
//!   so the result always reflects a whole step boundary.
//! - The driver executes one step per lock acquisition and fairly hands the
//!   lock over between steps.

mod driver;

pub use driver::SimDriver;

use std::time::Duration;

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::error::{Result, TraciError};

/// What the bridge needs from the simulation it controls
pub trait Simulation: Send + 'static {
    /// Execute one logical step
    fn step(&mut self);

    /// Current simulation time in seconds
    fn sim_time(&self) -> f64;

    /// Simulated seconds per step
    fn step_length(&self) -> f64;

    /// Replace the running scenario
    fn load_scenario(&mut self, name: &str, _content: &str) -> Result<()> {
        Err(TraciError::Scenario(format!(
            "cannot load {}: scenario loading is not supported",
            name
        )))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DriverState {
    Stopped,
    Running,
    Stopping,
}

struct Inner<S> {
    state: S,
    /// Steps asked for by `advance` (or the free-running clock)
    requested: u64,
    /// Steps the driver has executed
    completed: u64,
    driver: DriverState,
}

/// Shared access point to the simulation state
pub struct SimBridge<S> {
    inner: Mutex<Inner<S>>,
    step_requested: Condvar,
    step_completed: Condvar,
}

impl<S: Simulation> SimBridge<S> {
    /// Wrap a simulation. No driver is running yet; see [`SimDriver::spawn`].
    pub fn new(state: S) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state,
                requested: 0,
                completed: 0,
                driver: DriverState::Stopped,
            }),
            step_requested: Condvar::new(),
            step_completed: Condvar::new(),
        }
    }

    /// Run `f` with exclusive access to the simulation state
    pub fn with_state<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut S) -> R,
    {
        let mut inner = self.inner.lock();
        f(&mut inner.state)
    }

    /// Advance the simulation by `steps` and evaluate `at_boundary` there
    ///
    /// Blocks until the driver reports the step boundary. `at_boundary` runs
    /// before the driver can take another step. With concurrent callers the
    /// boundary reached may lie beyond this caller's own target.
    pub fn advance<R, F>(&self, steps: u64, at_boundary: F) -> Result<R>
    where
        F: FnOnce(&mut S) -> R,
    {
        let mut inner = self.inner.lock();
        if inner.driver != DriverState::Running {
            return Err(TraciError::DriverStopped);
        }

        let target = inner
            .requested
            .max(inner.completed)
            .checked_add(steps)
            .ok_or_else(|| {
                TraciError::Protocol(format!("cannot schedule {} more steps", steps))
            })?;
        inner.requested = target;
        self.step_requested.notify_one();

        while inner.completed < target {
            if inner.driver != DriverState::Running {
                return Err(TraciError::DriverStopped);
            }
            self.step_completed.wait(&mut inner);
        }

        Ok(at_boundary(&mut inner.state))
    }

    /// Number of steps executed so far
    pub fn steps_completed(&self) -> u64 {
        self.inner.lock().completed
    }

    /// Whether a driver is attached and running
    pub fn is_driver_running(&self) -> bool {
        self.inner.lock().driver == DriverState::Running
    }

    // =========================================================================
    // Driver side
    // =========================================================================

    fn attach_driver(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.driver != DriverState::Stopped {
            return Err(TraciError::Config(
                "a simulation driver is already attached".to_string(),
            ));
        }
        inner.driver = DriverState::Running;
        Ok(())
    }

    fn request_stop(&self) {
        let mut inner = self.inner.lock();
        if inner.driver == DriverState::Running {
            inner.driver = DriverState::Stopping;
        }
        self.step_requested.notify_all();
        self.step_completed.notify_all();
    }

    /// Driver loop; returns once a stop was requested
    fn run_driver(&self, interval: Option<Duration>) {
        let mut inner = self.inner.lock();

        while inner.driver == DriverState::Running {
            if inner.completed < inner.requested {
                inner.state.step();
                inner.completed += 1;
                tracing::trace!(
                    step = inner.completed,
                    sim_time = inner.state.sim_time(),
                    "simulation step completed"
                );
                self.step_completed.notify_all();
                MutexGuard::bump(&mut inner);
                continue;
            }

            match interval {
                Some(interval) => {
                    let timeout = self.step_requested.wait_for(&mut inner, interval);
                    if timeout.timed_out()
                        && inner.driver == DriverState::Running
                        && inner.completed >= inner.requested
                    {
                        inner.requested = inner.completed + 1;
                    }
                }
                None => self.step_requested.wait(&mut inner),
            }
        }

        inner.driver = DriverState::Stopped;
        self.step_completed.notify_all();
        tracing::debug!(steps = inner.completed, "simulation driver stopped");
    }
}
