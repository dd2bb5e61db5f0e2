//! Command identifiers
//!
//! The global, append-only opcode table. Every opcode carries the category
//! that decides how the rest of a command unit is laid out.

use crate::error::{Result, TraciError};

/// Command categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmdType {
    /// Session and simulation control (version, step, close, ...)
    Control,
    /// Variable retrieval
    Get,
    /// Variable change
    Set,
    /// Value subscription
    Subscribe,
    /// Context subscription (not supported)
    ContextSubscribe,
    /// Only valid in server replies
    Response,
}

/// Command / response identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TraciCmd {
    // Control
    GetVersion = 0x00,
    Load = 0x01,
    SimStep = 0x02,
    SendFile = 0x75,
    Close = 0x7F,

    // Simulation API
    GetSimulationValue = 0xAB,
    ResponseGetSimulationValue = 0xBB,
    SetSimulationState = 0xCB,
    SubSimulationValue = 0xDB,
    ResponseSubSimulationValue = 0xEB,
    SubSimulationContext = 0x8B,
    ResponseSubSimulationContext = 0x9B,

    // Person API
    GetPersonValue = 0xAE,
    ResponseGetPersonValue = 0xBE,
    SetPersonState = 0xCE,
    SubPersonValue = 0xDE,
    ResponseSubPersonValue = 0xEE,
    SubPersonContext = 0x8E,
    ResponseSubPersonContext = 0x9E,
}

impl TraciCmd {
    /// Look up an opcode. Unknown ids are a protocol error.
    pub fn from_id(id: u8) -> Result<Self> {
        let cmd = match id {
            0x00 => TraciCmd::GetVersion,
            0x01 => TraciCmd::Load,
            0x02 => TraciCmd::SimStep,
            0x75 => TraciCmd::SendFile,
            0x7F => TraciCmd::Close,
            0xAB => TraciCmd::GetSimulationValue,
            0xBB => TraciCmd::ResponseGetSimulationValue,
            0xCB => TraciCmd::SetSimulationState,
            0xDB => TraciCmd::SubSimulationValue,
            0xEB => TraciCmd::ResponseSubSimulationValue,
            0x8B => TraciCmd::SubSimulationContext,
            0x9B => TraciCmd::ResponseSubSimulationContext,
            0xAE => TraciCmd::GetPersonValue,
            0xBE => TraciCmd::ResponseGetPersonValue,
            0xCE => TraciCmd::SetPersonState,
            0xDE => TraciCmd::SubPersonValue,
            0xEE => TraciCmd::ResponseSubPersonValue,
            0x8E => TraciCmd::SubPersonContext,
            0x9E => TraciCmd::ResponseSubPersonContext,
            other => return Err(TraciError::UnknownOpcode(other)),
        };
        Ok(cmd)
    }

    /// Wire id
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Category of this opcode
    pub fn cmd_type(self) -> CmdType {
        match self {
            TraciCmd::GetVersion
            | TraciCmd::Load
            | TraciCmd::SimStep
            | TraciCmd::SendFile
            | TraciCmd::Close => CmdType::Control,

            TraciCmd::GetSimulationValue | TraciCmd::GetPersonValue => CmdType::Get,

            TraciCmd::SetSimulationState | TraciCmd::SetPersonState => CmdType::Set,

            TraciCmd::SubSimulationValue | TraciCmd::SubPersonValue => CmdType::Subscribe,

            TraciCmd::SubSimulationContext | TraciCmd::SubPersonContext => {
                CmdType::ContextSubscribe
            }

            TraciCmd::ResponseGetSimulationValue
            | TraciCmd::ResponseSubSimulationValue
            | TraciCmd::ResponseSubSimulationContext
            | TraciCmd::ResponseGetPersonValue
            | TraciCmd::ResponseSubPersonValue
            | TraciCmd::ResponseSubPersonContext => CmdType::Response,
        }
    }
}
