//! Configuration for simtraci
//!
//! Centralized configuration with sensible defaults. A config can be built in
//! code through [`ConfigBuilder`] or loaded from a TOML file; fields missing
//! from the file keep their defaults.
//!
//! ```toml
//! listen_addr = "0.0.0.0:9999"
//! max_connections = 4
//! step_length = 0.4
//! scenario = "scenarios/corridor.scenario"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Result, TraciError};

/// Main configuration for a simtraci server
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Size of the session worker pool (max concurrently served clients)
    pub max_connections: usize,

    /// Connection read timeout (milliseconds, 0 = block forever)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = block forever)
    pub write_timeout_ms: u64,

    /// Largest accepted frame, including the 4-byte length field
    pub max_frame_size: u32,

    /// How long shutdown waits for sessions before force-closing them
    pub shutdown_grace_ms: u64,

    // -------------------------------------------------------------------------
    // Simulation Configuration
    // -------------------------------------------------------------------------
    /// Simulated seconds per step
    pub step_length: f64,

    /// Free-running step interval (milliseconds, 0 = lockstep with clients)
    pub step_interval_ms: u64,

    /// Scenario loaded at startup
    pub scenario: Option<PathBuf>,

    /// Directory where scenario files sent by clients are stored
    pub data_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:9999".to_string(),
            max_connections: 16,
            read_timeout_ms: 0,
            write_timeout_ms: 0,
            max_frame_size: 16 * 1024 * 1024, // 16 MB
            shutdown_grace_ms: 4000,
            step_length: 0.4,
            step_interval_ms: 0,
            scenario: None,
            data_dir: PathBuf::from("./simtraci_data"),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load a config from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            TraciError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&text)
    }

    /// Parse a config from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(text).map_err(|e| TraciError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that the type system cannot express
    pub fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(TraciError::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }
        if !(self.step_length > 0.0) {
            return Err(TraciError::Config(format!(
                "step_length must be positive, got {}",
                self.step_length
            )));
        }
        if self.max_frame_size <= 4 {
            return Err(TraciError::Config(format!(
                "max_frame_size must exceed the length field, got {}",
                self.max_frame_size
            )));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Start from an existing config (e.g. one loaded from a file)
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the worker pool size
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the maximum frame size (in bytes)
    pub fn max_frame_size(mut self, bytes: u32) -> Self {
        self.config.max_frame_size = bytes;
        self
    }

    /// Set the shutdown grace period (in milliseconds)
    pub fn shutdown_grace_ms(mut self, ms: u64) -> Self {
        self.config.shutdown_grace_ms = ms;
        self
    }

    /// Set the simulated step length (in seconds)
    pub fn step_length(mut self, seconds: f64) -> Self {
        self.config.step_length = seconds;
        self
    }

    /// Set the free-running step interval (in milliseconds)
    pub fn step_interval_ms(mut self, ms: u64) -> Self {
        self.config.step_interval_ms = ms;
        self
    }

    /// Set the scenario loaded at startup
    pub fn scenario(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.scenario = Some(path.into());
        self
    }

    /// Set the directory for received scenario files
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
