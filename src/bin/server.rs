//! simtraci Server Binary
//!
//! Starts the simulation, its driver, and the TCP server.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use simtraci::config::ConfigBuilder;
use simtraci::network::Server;
use simtraci::{default_registry, Config, Router, SimBridge, SimDriver, World};
use tracing_subscriber::{fmt, EnvFilter};

/// simtraci Server
#[derive(Parser, Debug)]
#[command(name = "simtraci-server")]
#[command(about = "Remote control server for a pedestrian simulation")]
#[command(version)]
struct Args {
    /// TOML configuration file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address (host:port)
    #[arg(short, long)]
    listen: Option<String>,

    /// Maximum concurrent controllers
    #[arg(short, long)]
    max_connections: Option<usize>,

    /// Scenario file to load at startup
    #[arg(short, long)]
    scenario: Option<PathBuf>,

    /// Simulated seconds per step
    #[arg(long)]
    step_length: Option<f64>,

    /// Advance one step per interval without waiting for controllers (0 = lockstep)
    #[arg(long)]
    step_interval_ms: Option<u64>,

    /// Directory for scenario files received from controllers
    #[arg(short, long)]
    data_dir: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> simtraci::Result<Config> {
        let base = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        let mut builder = ConfigBuilder::from_config(base);
        if let Some(listen) = self.listen {
            builder = builder.listen_addr(listen);
        }
        if let Some(count) = self.max_connections {
            builder = builder.max_connections(count);
        }
        if let Some(path) = self.scenario {
            builder = builder.scenario(path);
        }
        if let Some(seconds) = self.step_length {
            builder = builder.step_length(seconds);
        }
        if let Some(ms) = self.step_interval_ms {
            builder = builder.step_interval_ms(ms);
        }
        if let Some(path) = self.data_dir {
            builder = builder.data_dir(path);
        }

        let config = builder.build();
        config.validate()?;
        Ok(config)
    }
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,simtraci=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let config = match Args::parse().into_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("simtraci Server v{}", simtraci::VERSION);
    tracing::info!("Listen address: {}", config.listen_addr);
    tracing::info!("Data directory: {}", config.data_dir.display());

    let world = match load_world(&config) {
        Ok(world) => world,
        Err(e) => {
            tracing::error!("Failed to load scenario: {}", e);
            std::process::exit(1);
        }
    };

    let bridge = Arc::new(SimBridge::new(world));
    let interval = (config.step_interval_ms > 0).then(|| Duration::from_millis(config.step_interval_ms));
    let driver = match SimDriver::spawn(Arc::clone(&bridge), interval) {
        Ok(driver) => driver,
        Err(e) => {
            tracing::error!("Failed to start simulation driver: {}", e);
            std::process::exit(1);
        }
    };

    let router = Arc::new(Router::new(
        Arc::new(default_registry()),
        bridge,
        config.data_dir.clone(),
    ));

    let server = match Server::bind(config, router) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to bind: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        driver.shutdown();
        std::process::exit(1);
    }

    driver.shutdown();
    tracing::info!("Server stopped");
}

fn load_world(config: &Config) -> simtraci::Result<World> {
    match &config.scenario {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            let name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("scenario");
            let world = World::from_scenario(name, &content, config.step_length)?;
            tracing::info!(
                "Loaded scenario {} with {} pedestrian(s)",
                name,
                world.pedestrian_count()
            );
            Ok(world)
        }
        None => {
            tracing::info!("No scenario given, starting with an empty world");
            Ok(World::new(config.step_length))
        }
    }
}
