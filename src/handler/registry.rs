//! Handler registry
//!
//! Maps `(opcode, variable)` pairs to handler functions per API surface and
//! turns handler output into responses. Registration is an explicit call
//! sequence at startup; afterwards the registry is immutable and shared
//! through an `Arc` without locking.

use std::collections::HashMap;

use super::{HandlerError, HandlerFn, HandlerResult, ValueRequest};
use crate::bridge::{SimBridge, Simulation};
use crate::protocol::{
    CmdType, Command, GetCommand, Response, ResponseBody, ResultCode, SetCommand,
    SubscribedValue, SubscriptionResult, TraciCmd, TypedValue, ValueResponse,
};

/// Opcodes belonging to one API surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceIds {
    pub get: TraciCmd,
    pub set: TraciCmd,
    pub subscribe: TraciCmd,
    pub get_response: TraciCmd,
    pub subscribe_response: TraciCmd,
}

/// Handler table of one API surface
pub struct ApiSurface<S> {
    name: &'static str,
    ids: SurfaceIds,
    /// Variable table of this surface, for diagnostics
    variable_name: fn(u8) -> Option<&'static str>,
    handlers: HashMap<(TraciCmd, u8), HandlerFn<S>>,
}

impl<S> ApiSurface<S> {
    pub fn new(name: &'static str, ids: SurfaceIds, variable_name: fn(u8) -> Option<&'static str>) -> Self {
        Self {
            name,
            ids,
            variable_name,
            handlers: HashMap::new(),
        }
    }

    /// Bind a handler to `(cmd, variable)`
    ///
    /// # Panics
    /// If `cmd` is not this surface's get or set opcode, or the pair is bound
    /// twice. Both are mistakes in the static handler table.
    pub fn register(mut self, cmd: TraciCmd, variable: u8, handler: HandlerFn<S>) -> Self {
        assert!(
            cmd == self.ids.get || cmd == self.ids.set,
            "{}: 0x{:02X} is not a get/set opcode of this surface",
            self.name,
            cmd.id()
        );
        let previous = self.handlers.insert((cmd, variable), handler);
        assert!(
            previous.is_none(),
            "{}: handler for (0x{:02X}, 0x{:02X}) registered twice",
            self.name,
            cmd.id(),
            variable
        );
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn ids(&self) -> SurfaceIds {
        self.ids
    }

    /// Number of bound handlers
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    pub fn has_handler(&self, cmd: TraciCmd, variable: u8) -> bool {
        self.handlers.contains_key(&(cmd, variable))
    }

    /// Invoke the handler bound to `(cmd, request.variable)`
    pub fn call(&self, cmd: TraciCmd, request: &ValueRequest<'_>, state: &mut S) -> HandlerResult {
        match self.handlers.get(&(cmd, request.variable)) {
            Some(handler) => handler(request, state),
            None => Err(HandlerError::NotImplemented(format!(
                "{} variable 0x{:02X} ({}) is not implemented for command 0x{:02X}",
                self.name,
                request.variable,
                (self.variable_name)(request.variable).unwrap_or("unknown"),
                cmd.id()
            ))),
        }
    }

    /// Evaluate a value subscription on this surface
    pub fn subscription_result(&self, element_id: &str, variables: &[u8], state: &mut S) -> SubscriptionResult {
        let values = variables
            .iter()
            .map(|&variable| {
                let request = ValueRequest {
                    variable,
                    element_id,
                    value: None,
                };
                let outcome = self
                    .call(self.ids.get, &request, state)
                    .and_then(|value| value.ok_or_else(|| no_value(variable)));
                match outcome {
                    Ok(value) => SubscribedValue {
                        variable,
                        status: ResultCode::Ok,
                        value,
                    },
                    Err(e) => SubscribedValue {
                        variable,
                        status: e.result_code(),
                        value: TypedValue::String(e.to_string()),
                    },
                }
            })
            .collect();

        SubscriptionResult {
            cmd: self.ids.subscribe_response,
            element_id: element_id.to_string(),
            values,
        }
    }
}

/// Builder collecting API surfaces
pub struct RegistryBuilder<S> {
    surfaces: Vec<ApiSurface<S>>,
}

impl<S> RegistryBuilder<S> {
    pub fn surface(mut self, surface: ApiSurface<S>) -> Self {
        self.surfaces.push(surface);
        self
    }

    /// Freeze the table
    ///
    /// # Panics
    /// If two surfaces claim the same opcode.
    pub fn build(self) -> HandlerRegistry<S> {
        let mut by_cmd = HashMap::new();
        for (index, surface) in self.surfaces.iter().enumerate() {
            for cmd in [surface.ids.get, surface.ids.set, surface.ids.subscribe] {
                let previous = by_cmd.insert(cmd, index);
                assert!(
                    previous.is_none(),
                    "opcode 0x{:02X} claimed by more than one API surface",
                    cmd.id()
                );
            }
        }
        HandlerRegistry {
            surfaces: self.surfaces,
            by_cmd,
        }
    }
}

/// Dispatcher over all API surfaces
pub struct HandlerRegistry<S> {
    surfaces: Vec<ApiSurface<S>>,
    by_cmd: HashMap<TraciCmd, usize>,
}

impl<S> HandlerRegistry<S> {
    pub fn builder() -> RegistryBuilder<S> {
        RegistryBuilder {
            surfaces: Vec::new(),
        }
    }

    /// Surface owning a get/set/subscribe opcode
    pub fn surface(&self, cmd: TraciCmd) -> Option<&ApiSurface<S>> {
        self.by_cmd.get(&cmd).map(|&index| &self.surfaces[index])
    }

    pub fn surfaces(&self) -> impl Iterator<Item = &ApiSurface<S>> {
        self.surfaces.iter()
    }

    /// Run a get or set command against `state`
    ///
    /// Never fails: missing handlers become NOT_IMPLEMENTED, handler errors
    /// become ERROR.
    pub fn dispatch(&self, command: &Command, state: &mut S) -> Response {
        let Some(surface) = self.surface(command.cmd()) else {
            return Response::not_implemented(
                command.cmd(),
                format!("no API surface handles command 0x{:02X}", command.cmd().id()),
            );
        };

        match command {
            Command::Get(get) => Self::dispatch_get(surface, get, state),
            Command::Set(set) => Self::dispatch_set(surface, set, state),
            other => Response::not_implemented(
                other.cmd(),
                format!(
                    "command 0x{:02X} is not a get/set command",
                    other.cmd().id()
                ),
            ),
        }
    }

    fn dispatch_get(surface: &ApiSurface<S>, get: &GetCommand, state: &mut S) -> Response {
        let request = ValueRequest {
            variable: get.variable,
            element_id: &get.element_id,
            value: None,
        };

        match surface.call(get.cmd, &request, state) {
            Ok(Some(value)) => Response::with_body(
                get.cmd,
                ResponseBody::Value(ValueResponse {
                    cmd: surface.ids.get_response,
                    variable: get.variable,
                    element_id: get.element_id.clone(),
                    value,
                }),
            ),
            Ok(None) => no_value(get.variable).into_response(get.cmd),
            Err(e) => {
                tracing::debug!(surface = surface.name, variable = get.variable, error = %e, "get failed");
                e.into_response(get.cmd)
            }
        }
    }

    fn dispatch_set(surface: &ApiSurface<S>, set: &SetCommand, state: &mut S) -> Response {
        let request = ValueRequest {
            variable: set.variable,
            element_id: &set.element_id,
            value: Some(&set.value),
        };

        match surface.call(set.cmd, &request, state) {
            Ok(_) => Response::ok(set.cmd),
            Err(e) => {
                tracing::debug!(surface = surface.name, variable = set.variable, error = %e, "set failed");
                e.into_response(set.cmd)
            }
        }
    }
}

impl<S: Simulation> HandlerRegistry<S> {
    /// Run a get or set command with exclusive access to the simulation
    pub fn execute(&self, command: &Command, bridge: &SimBridge<S>) -> Response {
        debug_assert!(matches!(command.cmd_type(), CmdType::Get | CmdType::Set));
        bridge.with_state(|state| self.dispatch(command, state))
    }
}

fn no_value(variable: u8) -> HandlerError {
    HandlerError::Failed(format!(
        "handler for variable 0x{:02X} returned no value",
        variable
    ))
}
