//! Simulation driver
//!
//! Runs the simulation on its own thread. In lockstep mode it only executes
//! steps requested through [`SimBridge::advance`]; with an interval it also
//! advances one step per interval on its own.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::{SimBridge, Simulation};
use crate::error::Result;

/// Handle to a running driver thread
///
/// Dropping the handle stops the driver and joins its thread.
pub struct SimDriver<S: Simulation> {
    bridge: Arc<SimBridge<S>>,
    handle: Option<JoinHandle<()>>,
}

impl<S: Simulation> SimDriver<S> {
    /// Start driving `bridge`
    ///
    /// `interval` of `None` means lockstep: time only moves when a client
    /// asks for it.
    pub fn spawn(bridge: Arc<SimBridge<S>>, interval: Option<Duration>) -> Result<Self> {
        bridge.attach_driver()?;

        let driven = Arc::clone(&bridge);
        let spawned = thread::Builder::new()
            .name("sim-driver".to_string())
            .spawn(move || driven.run_driver(interval));

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                bridge.request_stop();
                return Err(e.into());
            }
        };

        tracing::debug!(?interval, "simulation driver started");

        Ok(Self {
            bridge,
            handle: Some(handle),
        })
    }

    /// The bridge this driver advances
    pub fn bridge(&self) -> &Arc<SimBridge<S>> {
        &self.bridge
    }

    /// Stop the driver and wait for its thread to exit
    ///
    /// Sessions blocked in `advance` wake up with `DriverStopped`.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.bridge.request_stop();
            if handle.join().is_err() {
                tracing::error!("simulation driver thread panicked");
            }
        }
    }
}

impl<S: Simulation> Drop for SimDriver<S> {
    fn drop(&mut self) {
        self.stop();
    }
}
