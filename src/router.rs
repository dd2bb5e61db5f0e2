//! Command Router
//!
//! Executes one parsed command on behalf of a session and produces its
//! response. Get/set commands go to the [`HandlerRegistry`]; control and
//! subscribe commands are handled here.
//!
//! Routing never fails: anything that goes wrong while executing a well-formed
//! command is reported to the client as an ERROR status.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::bridge::{SimBridge, Simulation};
use crate::error::{Result, TraciError};
use crate::handler::HandlerRegistry;
use crate::protocol::{
    Command, Response, ResponseBody, SubscribeCommand, TraciCmd, API_VERSION,
};
use crate::subscription::{Subscription, SubscriptionRegistry};

/// Outcome of routing one command
#[derive(Debug, Clone, PartialEq)]
pub struct Routed {
    pub response: Response,
    /// The session must close after sending the response
    pub close: bool,
}

impl Routed {
    fn reply(response: Response) -> Self {
        Self {
            response,
            close: false,
        }
    }
}

/// Shared per-server command executor
pub struct Router<S: Simulation> {
    registry: Arc<HandlerRegistry<S>>,
    bridge: Arc<SimBridge<S>>,
    data_dir: PathBuf,
}

impl<S: Simulation> Router<S> {
    pub fn new(registry: Arc<HandlerRegistry<S>>, bridge: Arc<SimBridge<S>>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            registry,
            bridge,
            data_dir: data_dir.into(),
        }
    }

    pub fn bridge(&self) -> &Arc<SimBridge<S>> {
        &self.bridge
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry<S>> {
        &self.registry
    }

    /// Execute a command for a session owning `subscriptions`
    pub fn route(&self, command: &Command, subscriptions: &mut SubscriptionRegistry) -> Routed {
        tracing::trace!(cmd = command.cmd().id(), "routing command");

        match command {
            Command::GetVersion => Routed::reply(Response::version(version_identifier())),
            Command::SimStep { target_time } => {
                Routed::reply(self.sim_step(*target_time, subscriptions))
            }
            Command::Load { args } => Routed::reply(self.load(args)),
            Command::SendFile { name, content } => Routed::reply(self.send_file(name, content)),
            Command::Close => Routed {
                response: command.default_response(),
                close: true,
            },
            Command::Get(_) | Command::Set(_) => {
                Routed::reply(self.registry.execute(command, &self.bridge))
            }
            Command::Subscribe(subscribe) => Routed::reply(self.subscribe(subscribe, subscriptions)),
        }
    }

    // =========================================================================
    // Control commands
    // =========================================================================

    fn sim_step(&self, target_time: f64, subscriptions: &mut SubscriptionRegistry) -> Response {
        let (now, step_length) = self
            .bridge
            .with_state(|state| (state.sim_time(), state.step_length()));
        let Some(steps) = steps_until(target_time, now, step_length) else {
            return Response::error(
                TraciCmd::SimStep,
                format!("target time {} is out of reach from {}", target_time, now),
            );
        };

        let registry = &self.registry;
        let advanced = self
            .bridge
            .advance(steps, |state| subscriptions.evaluate(registry, state));

        match advanced {
            Ok(results) => {
                tracing::trace!(steps, subscriptions = results.len(), "advanced simulation");
                Response::sim_step(results)
            }
            Err(e) => Response::error(TraciCmd::SimStep, e.to_string()),
        }
    }

    fn load(&self, args: &[String]) -> Response {
        let Some(path) = args.first() else {
            return Response::error(TraciCmd::Load, "LOAD expects a scenario path");
        };

        match self.load_path(Path::new(path)) {
            Ok(()) => Response::ok(TraciCmd::Load),
            Err(e) => Response::error(TraciCmd::Load, e.to_string()),
        }
    }

    fn load_path(&self, path: &Path) -> Result<()> {
        let content = fs::read_to_string(path).map_err(|e| {
            TraciError::Scenario(format!("cannot read {}: {}", path.display(), e))
        })?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("scenario");
        self.bridge
            .with_state(|state| state.load_scenario(name, &content))
    }

    fn send_file(&self, name: &str, content: &str) -> Response {
        match self.store_and_load(name, content) {
            Ok(path) => {
                tracing::info!(path = %path.display(), "scenario received");
                Response::ok(TraciCmd::SendFile)
            }
            Err(e) => Response::error(TraciCmd::SendFile, e.to_string()),
        }
    }

    fn store_and_load(&self, name: &str, content: &str) -> Result<PathBuf> {
        // only the final component is used so clients cannot escape data_dir
        let file_name = Path::new(name)
            .file_name()
            .ok_or_else(|| TraciError::Scenario(format!("invalid file name '{}'", name)))?;

        fs::create_dir_all(&self.data_dir)?;
        let path = self.data_dir.join(file_name);
        fs::write(&path, content)?;

        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("scenario")
            .to_string();
        self.bridge
            .with_state(|state| state.load_scenario(&stem, content))?;
        Ok(path)
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    fn subscribe(&self, command: &SubscribeCommand, subscriptions: &mut SubscriptionRegistry) -> Response {
        let Some(surface) = self.registry.surface(command.cmd) else {
            return Response::not_implemented(
                command.cmd,
                format!("no API surface handles subscription 0x{:02X}", command.cmd.id()),
            );
        };

        if command.variables.is_empty() {
            return if subscriptions.remove(command.cmd, &command.element_id) {
                Response::ok(command.cmd)
            } else {
                Response::error(
                    command.cmd,
                    format!("no subscription for '{}'", command.element_id),
                )
            };
        }

        let subscription = Subscription::from(command);
        let current = self.bridge.with_state(|state| {
            surface.subscription_result(&subscription.element_id, &subscription.variables, state)
        });
        subscriptions.register(subscription);

        Response::with_body(command.cmd, ResponseBody::Subscription(current))
    }
}

/// Identifier string reported by GET_VERSION
pub fn version_identifier() -> String {
    format!(
        "simtraci {}. Supports a subset of commands based on TraCI version {}",
        crate::VERSION,
        API_VERSION
    )
}

/// Most steps a single SIM_STEP may request
pub const MAX_STEPS_PER_REQUEST: u64 = u32::MAX as u64;

/// Steps needed to reach `target_time`; at least one
///
/// `None` when the target is NaN or more than [`MAX_STEPS_PER_REQUEST`]
/// steps away.
pub fn steps_until(target_time: f64, now: f64, step_length: f64) -> Option<u64> {
    if target_time.is_nan() {
        return None;
    }
    if target_time <= now || !(step_length > 0.0) {
        return Some(1);
    }
    // tolerance keeps exact multiples from rounding up one step too far
    let steps = ((target_time - now) / step_length - 1e-9).ceil().max(1.0);
    if !steps.is_finite() || steps > MAX_STEPS_PER_REQUEST as f64 {
        return None;
    }
    Some(steps as u64)
}
