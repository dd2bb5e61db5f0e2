//! Handler Module
//!
//! Get/set handlers for each API surface and the registry that dispatches
//! to them.
//!
//! ## Architecture
//! - One [`ApiSurface`] per API (person, simulation), built once at startup
//! - [`HandlerRegistry`] maps opcodes to surfaces; read-only after `build()`
//! - Handlers are plain functions over the simulation state; the registry
//!   calls them inside [`crate::bridge::SimBridge::with_state`]

mod registry;

pub mod person;
pub mod simulation;

pub use registry::{ApiSurface, HandlerRegistry, RegistryBuilder, SurfaceIds};

use thiserror::Error;

use crate::protocol::{Response, ResultCode, TraciCmd, TypedValue};
use crate::world::World;

/// Recoverable handler failure, reported to the client as a status
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HandlerError {
    #[error("{0}")]
    NotImplemented(String),

    #[error("element '{0}' not found")]
    ElementNotFound(String),

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("{0}")]
    Failed(String),
}

impl HandlerError {
    /// Status code this error is reported with
    pub fn result_code(&self) -> ResultCode {
        match self {
            HandlerError::NotImplemented(_) => ResultCode::NotImplemented,
            _ => ResultCode::Error,
        }
    }

    /// Status-only response for `cmd`
    pub fn into_response(self, cmd: TraciCmd) -> Response {
        match self.result_code() {
            ResultCode::NotImplemented => Response::not_implemented(cmd, self.to_string()),
            _ => Response::error(cmd, self.to_string()),
        }
    }
}

/// A get returns `Some(value)`, a set returns `None`
pub type HandlerResult = std::result::Result<Option<TypedValue>, HandlerError>;

/// What a handler gets to see of the command
#[derive(Debug, Clone, Copy)]
pub struct ValueRequest<'a> {
    pub variable: u8,
    pub element_id: &'a str,
    /// Present for set commands
    pub value: Option<&'a TypedValue>,
}

impl<'a> ValueRequest<'a> {
    /// The value of a set command
    pub fn value(&self) -> std::result::Result<&'a TypedValue, HandlerError> {
        self.value
            .ok_or_else(|| HandlerError::InvalidValue("set command without value".to_string()))
    }
}

/// Handler function signature
pub type HandlerFn<S> = fn(&ValueRequest<'_>, &mut S) -> HandlerResult;

/// Registry with the person and simulation APIs over [`World`]
pub fn default_registry() -> HandlerRegistry<World> {
    HandlerRegistry::builder()
        .surface(person::surface())
        .surface(simulation::surface())
        .build()
}
