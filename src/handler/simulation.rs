//! Simulation API
//!
//! Global simulation values. The element id is ignored.

use super::{ApiSurface, HandlerError, HandlerResult, SurfaceIds, ValueRequest};
use crate::bridge::Simulation;
use crate::protocol::{TraciCmd, TypedValue};
use crate::world::World;

pub const IDS: SurfaceIds = SurfaceIds {
    get: TraciCmd::GetSimulationValue,
    set: TraciCmd::SetSimulationState,
    subscribe: TraciCmd::SubSimulationValue,
    get_response: TraciCmd::ResponseGetSimulationValue,
    subscribe_response: TraciCmd::ResponseSubSimulationValue,
};

/// Simulation variables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SimulationVar {
    /// Current simulation time (double, seconds)
    Time = 0x66,
    /// Step length (double, seconds)
    DeltaT = 0x7B,
    /// Pedestrians still in the simulation (int)
    MinExpectedNumber = 0x7D,
}

impl SimulationVar {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0x66 => Some(SimulationVar::Time),
            0x7B => Some(SimulationVar::DeltaT),
            0x7D => Some(SimulationVar::MinExpectedNumber),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            SimulationVar::Time => "TIME",
            SimulationVar::DeltaT => "DELTA_T",
            SimulationVar::MinExpectedNumber => "MIN_EXPECTED_NUMBER",
        }
    }

    fn name_of(id: u8) -> Option<&'static str> {
        Self::from_id(id).map(SimulationVar::name)
    }
}

/// Build the simulation API table
pub fn surface() -> ApiSurface<World> {
    ApiSurface::new("simulation", IDS, SimulationVar::name_of)
        .register(IDS.get, SimulationVar::Time.id(), get_time)
        .register(IDS.get, SimulationVar::DeltaT.id(), get_delta_t)
        .register(IDS.get, SimulationVar::MinExpectedNumber.id(), get_min_expected_number)
        .register(IDS.set, SimulationVar::DeltaT.id(), set_delta_t)
}

fn get_time(_req: &ValueRequest<'_>, world: &mut World) -> HandlerResult {
    Ok(Some(TypedValue::Double(world.sim_time())))
}

fn get_delta_t(_req: &ValueRequest<'_>, world: &mut World) -> HandlerResult {
    Ok(Some(TypedValue::Double(world.step_length())))
}

fn get_min_expected_number(_req: &ValueRequest<'_>, world: &mut World) -> HandlerResult {
    Ok(Some(TypedValue::Integer(world.pedestrian_count() as i32)))
}

fn set_delta_t(req: &ValueRequest<'_>, world: &mut World) -> HandlerResult {
    let step_length = req.value()?.as_f64().ok_or_else(|| {
        HandlerError::InvalidValue("DELTA_T expects a double".to_string())
    })?;
    if !(step_length > 0.0) {
        return Err(HandlerError::InvalidValue(format!(
            "DELTA_T must be positive, got {}",
            step_length
        )));
    }
    world.set_step_length(step_length);
    Ok(None)
}
