//! Person API
//!
//! Get/set handlers for pedestrians. Element ids are decimal pedestrian ids;
//! ID_LIST and COUNT ignore the element id.

use super::{ApiSurface, HandlerError, HandlerResult, SurfaceIds, ValueRequest};
use crate::protocol::{DataType, TraciCmd, TypedValue, Vec3};
use crate::world::{Pedestrian, World};

pub const IDS: SurfaceIds = SurfaceIds {
    get: TraciCmd::GetPersonValue,
    set: TraciCmd::SetPersonState,
    subscribe: TraciCmd::SubPersonValue,
    get_response: TraciCmd::ResponseGetPersonValue,
    subscribe_response: TraciCmd::ResponseSubPersonValue,
};

/// Person variables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PersonVar {
    IdList = 0x00,
    Count = 0x01,
    Pos3D = 0x39,
    Speed = 0x40,
    Pos2D = 0x42,
    Angle = 0x43,
    Length = 0x44,
    Color = 0x45,
    MinGap = 0x4C,
    Width = 0x4D,
    Type = 0x4F,
    RoadId = 0x50,
    EdgePos = 0x56,
    WaitingTime = 0x7A,
    NextEdge = 0xC1,
    RemainingStages = 0xC2,
    Vehicle = 0xC3,
}

impl PersonVar {
    pub const ALL: [PersonVar; 17] = [
        PersonVar::IdList,
        PersonVar::Count,
        PersonVar::Pos3D,
        PersonVar::Speed,
        PersonVar::Pos2D,
        PersonVar::Angle,
        PersonVar::Length,
        PersonVar::Color,
        PersonVar::MinGap,
        PersonVar::Width,
        PersonVar::Type,
        PersonVar::RoadId,
        PersonVar::EdgePos,
        PersonVar::WaitingTime,
        PersonVar::NextEdge,
        PersonVar::RemainingStages,
        PersonVar::Vehicle,
    ];

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| v.id() == id)
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            PersonVar::IdList => "ID_LIST",
            PersonVar::Count => "COUNT",
            PersonVar::Pos3D => "POS_3D",
            PersonVar::Speed => "SPEED",
            PersonVar::Pos2D => "POS_2D",
            PersonVar::Angle => "ANGLE",
            PersonVar::Length => "LENGTH",
            PersonVar::Color => "COLOR",
            PersonVar::MinGap => "MIN_GAP",
            PersonVar::Width => "WIDTH",
            PersonVar::Type => "TYPE",
            PersonVar::RoadId => "ROAD_ID",
            PersonVar::EdgePos => "EDGE_POS",
            PersonVar::WaitingTime => "WAITING_TIME",
            PersonVar::NextEdge => "NEXT_EDGE",
            PersonVar::RemainingStages => "REMAINING_STAGES",
            PersonVar::Vehicle => "VEHICLE",
        }
    }

    /// Data type the variable is reported with
    pub fn data_type(self) -> DataType {
        match self {
            PersonVar::IdList => DataType::StringList,
            PersonVar::Count | PersonVar::RemainingStages => DataType::Integer,
            PersonVar::Pos3D => DataType::Pos3D,
            PersonVar::Pos2D => DataType::Pos2D,
            PersonVar::Color => DataType::Color,
            PersonVar::Type | PersonVar::RoadId | PersonVar::NextEdge | PersonVar::Vehicle => {
                DataType::String
            }
            PersonVar::Speed
            | PersonVar::Angle
            | PersonVar::Length
            | PersonVar::MinGap
            | PersonVar::Width
            | PersonVar::EdgePos
            | PersonVar::WaitingTime => DataType::Double,
        }
    }

    fn name_of(id: u8) -> Option<&'static str> {
        Self::from_id(id).map(PersonVar::name)
    }
}

/// Build the person API table
///
/// COLOR, WAITING_TIME, EDGE_POS, MIN_GAP, NEXT_EDGE, REMAINING_STAGES and
/// VEHICLE are known but unbound and answer NOT_IMPLEMENTED.
pub fn surface() -> ApiSurface<World> {
    let get = IDS.get;
    let set = IDS.set;

    ApiSurface::new("person", IDS, PersonVar::name_of)
        .register(get, PersonVar::IdList.id(), get_id_list)
        .register(get, PersonVar::Count.id(), get_count)
        .register(get, PersonVar::Speed.id(), get_speed)
        .register(get, PersonVar::Pos2D.id(), get_position_2d)
        .register(get, PersonVar::Pos3D.id(), get_position_3d)
        .register(get, PersonVar::Angle.id(), get_angle)
        .register(get, PersonVar::Length.id(), get_length)
        .register(get, PersonVar::Width.id(), get_width)
        .register(get, PersonVar::Type.id(), get_type)
        .register(get, PersonVar::RoadId.id(), get_road_id)
        .register(set, PersonVar::Speed.id(), set_speed)
        .register(set, PersonVar::Pos2D.id(), set_position_2d)
}

// =============================================================================
// Helpers
// =============================================================================

fn find<'w>(world: &'w World, element_id: &str) -> Result<&'w Pedestrian, HandlerError> {
    element_id
        .parse::<i32>()
        .ok()
        .and_then(|id| world.pedestrian(id))
        .ok_or_else(|| HandlerError::ElementNotFound(element_id.to_string()))
}

fn find_mut<'w>(world: &'w mut World, element_id: &str) -> Result<&'w mut Pedestrian, HandlerError> {
    element_id
        .parse::<i32>()
        .ok()
        .and_then(|id| world.pedestrian_mut(id))
        .ok_or_else(|| HandlerError::ElementNotFound(element_id.to_string()))
}

fn expect_type(req: &ValueRequest<'_>, expected: DataType) -> Result<TypedValue, HandlerError> {
    let value = req.value()?;
    if value.data_type() != expected {
        return Err(HandlerError::InvalidValue(format!(
            "variable 0x{:02X} expects data type 0x{:02X}, got 0x{:02X}",
            req.variable,
            expected.id(),
            value.data_type().id()
        )));
    }
    Ok(value.clone())
}

// =============================================================================
// Get handlers
// =============================================================================

fn get_id_list(_req: &ValueRequest<'_>, world: &mut World) -> HandlerResult {
    let ids = world.pedestrians().map(|p| p.id.to_string()).collect();
    Ok(Some(TypedValue::StringList(ids)))
}

fn get_count(_req: &ValueRequest<'_>, world: &mut World) -> HandlerResult {
    Ok(Some(TypedValue::Integer(world.pedestrian_count() as i32)))
}

fn get_speed(req: &ValueRequest<'_>, world: &mut World) -> HandlerResult {
    let ped = find(world, req.element_id)?;
    Ok(Some(TypedValue::Double(ped.velocity.length())))
}

fn get_position_2d(req: &ValueRequest<'_>, world: &mut World) -> HandlerResult {
    let ped = find(world, req.element_id)?;
    Ok(Some(TypedValue::Pos2D(ped.position)))
}

fn get_position_3d(req: &ValueRequest<'_>, world: &mut World) -> HandlerResult {
    let ped = find(world, req.element_id)?;
    Ok(Some(TypedValue::Pos3D(Vec3 {
        x: ped.position.x,
        y: ped.position.y,
        z: 0.0,
    })))
}

fn get_angle(req: &ValueRequest<'_>, world: &mut World) -> HandlerResult {
    let ped = find(world, req.element_id)?;
    Ok(Some(TypedValue::Double(ped.angle())))
}

fn get_length(req: &ValueRequest<'_>, world: &mut World) -> HandlerResult {
    let ped = find(world, req.element_id)?;
    Ok(Some(TypedValue::Double(ped.radius * 2.0)))
}

fn get_width(req: &ValueRequest<'_>, world: &mut World) -> HandlerResult {
    let ped = find(world, req.element_id)?;
    Ok(Some(TypedValue::Double(ped.radius * 2.0)))
}

fn get_type(req: &ValueRequest<'_>, world: &mut World) -> HandlerResult {
    find(world, req.element_id)?;
    Ok(Some(TypedValue::String("pedestrian".to_string())))
}

fn get_road_id(req: &ValueRequest<'_>, world: &mut World) -> HandlerResult {
    // pedestrians are not bound to a road network
    find(world, req.element_id)?;
    Ok(Some(TypedValue::String("road000".to_string())))
}

// =============================================================================
// Set handlers
// =============================================================================

fn set_speed(req: &ValueRequest<'_>, world: &mut World) -> HandlerResult {
    let speed = expect_type(req, DataType::Double)?
        .as_f64()
        .unwrap_or_default();
    if !(speed >= 0.0) {
        return Err(HandlerError::InvalidValue(format!(
            "speed must be non-negative, got {}",
            speed
        )));
    }
    find_mut(world, req.element_id)?.speed = speed;
    Ok(None)
}

fn set_position_2d(req: &ValueRequest<'_>, world: &mut World) -> HandlerResult {
    let position = expect_type(req, DataType::Pos2D)?
        .as_pos2d()
        .unwrap_or_default();
    find_mut(world, req.element_id)?.position = position;
    Ok(None)
}
