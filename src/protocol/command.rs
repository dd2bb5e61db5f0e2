//! Command definitions
//!
//! Represents commands from clients. A command unit's content starts with the
//! opcode; the opcode's category decides the rest of the layout:
//!
//! - Control: one fixed layout per opcode
//! - Get:       `[ubyte var][string elementId]`
//! - Set:       `[ubyte var][string elementId][ubyte dataType][value]`
//! - Subscribe: `[double begin][double end][string elementId][ubyte n][ubyte var × n]`

use bytes::Bytes;

use super::buffer::{TraciReader, TraciWriter};
use super::opcode::{CmdType, TraciCmd};
use super::response::Response;
use super::value::TypedValue;
use crate::error::{Result, TraciError};

/// Time value meaning "no bound" in subscription windows
pub const UNBOUNDED_TIME: f64 = -1_073_741_824.0;

/// Variable retrieval
#[derive(Debug, Clone, PartialEq)]
pub struct GetCommand {
    pub cmd: TraciCmd,
    pub variable: u8,
    pub element_id: String,
}

/// Variable change
#[derive(Debug, Clone, PartialEq)]
pub struct SetCommand {
    pub cmd: TraciCmd,
    pub variable: u8,
    pub element_id: String,
    pub value: TypedValue,
}

/// Value subscription
#[derive(Debug, Clone, PartialEq)]
pub struct SubscribeCommand {
    pub cmd: TraciCmd,
    pub begin: f64,
    pub end: f64,
    pub element_id: String,
    /// Empty list removes the subscription for `(cmd, element_id)`
    pub variables: Vec<u8>,
}

/// A parsed command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Query the protocol version
    GetVersion,

    /// Load a scenario; the first argument is a path on the server
    Load { args: Vec<String> },

    /// Advance the simulation up to `target_time` (at least one step)
    SimStep { target_time: f64 },

    /// Transfer a scenario file and load it
    SendFile { name: String, content: String },

    /// End the session
    Close,

    Get(GetCommand),
    Set(SetCommand),
    Subscribe(SubscribeCommand),
}

impl Command {
    /// Build a get command
    pub fn get(cmd: TraciCmd, variable: u8, element_id: impl Into<String>) -> Self {
        Command::Get(GetCommand {
            cmd,
            variable,
            element_id: element_id.into(),
        })
    }

    /// Build a set command
    pub fn set(cmd: TraciCmd, variable: u8, element_id: impl Into<String>, value: TypedValue) -> Self {
        Command::Set(SetCommand {
            cmd,
            variable,
            element_id: element_id.into(),
            value,
        })
    }

    /// Build a subscription without a time window
    pub fn subscribe(cmd: TraciCmd, element_id: impl Into<String>, variables: Vec<u8>) -> Self {
        Command::Subscribe(SubscribeCommand {
            cmd,
            begin: UNBOUNDED_TIME,
            end: UNBOUNDED_TIME,
            element_id: element_id.into(),
            variables,
        })
    }

    /// Get the command identifier
    pub fn cmd(&self) -> TraciCmd {
        match self {
            Command::GetVersion => TraciCmd::GetVersion,
            Command::Load { .. } => TraciCmd::Load,
            Command::SimStep { .. } => TraciCmd::SimStep,
            Command::SendFile { .. } => TraciCmd::SendFile,
            Command::Close => TraciCmd::Close,
            Command::Get(c) => c.cmd,
            Command::Set(c) => c.cmd,
            Command::Subscribe(c) => c.cmd,
        }
    }

    /// Get the command category
    pub fn cmd_type(&self) -> CmdType {
        self.cmd().cmd_type()
    }

    /// Response for commands that carry no payload: an OK status
    pub fn default_response(&self) -> Response {
        Response::ok(self.cmd())
    }

    // =========================================================================
    // Decoding
    // =========================================================================

    /// Decode a command from a unit's content (opcode first)
    ///
    /// The content must be consumed exactly; trailing bytes mean the peer and
    /// server disagree about the layout.
    pub fn decode(content: Bytes) -> Result<Command> {
        let mut r = TraciReader::new(content);
        let cmd = TraciCmd::from_id(r.read_u8()?)?;

        let command = match cmd.cmd_type() {
            CmdType::Control => Self::decode_control(cmd, &mut r)?,
            CmdType::Get => Command::Get(GetCommand {
                cmd,
                variable: r.read_u8()?,
                element_id: r.read_string()?,
            }),
            CmdType::Set => {
                let variable = r.read_u8()?;
                let element_id = r.read_string()?;
                let value = r.read_typed_value()?;
                Command::Set(SetCommand {
                    cmd,
                    variable,
                    element_id,
                    value,
                })
            }
            CmdType::Subscribe => {
                let begin = r.read_f64()?;
                let end = r.read_f64()?;
                let element_id = r.read_string()?;
                let count = r.read_u8()?;
                let mut variables = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    variables.push(r.read_u8()?);
                }
                Command::Subscribe(SubscribeCommand {
                    cmd,
                    begin,
                    end,
                    element_id,
                    variables,
                })
            }
            CmdType::ContextSubscribe => {
                return Err(TraciError::NotImplemented(format!(
                    "context subscription 0x{:02X}",
                    cmd.id()
                )))
            }
            CmdType::Response => {
                return Err(TraciError::Protocol(format!(
                    "response identifier 0x{:02X} sent as a command",
                    cmd.id()
                )))
            }
        };

        if r.has_remaining() {
            return Err(TraciError::Protocol(format!(
                "{} trailing bytes after command 0x{:02X}",
                r.remaining(),
                cmd.id()
            )));
        }

        Ok(command)
    }

    fn decode_control(cmd: TraciCmd, r: &mut TraciReader) -> Result<Command> {
        let command = match cmd {
            TraciCmd::GetVersion => Command::GetVersion,
            TraciCmd::Load => Command::Load {
                args: r.read_string_list()?,
            },
            TraciCmd::SimStep => Command::SimStep {
                target_time: r.read_f64()?,
            },
            TraciCmd::SendFile => Command::SendFile {
                name: r.read_string()?,
                content: r.read_string()?,
            },
            TraciCmd::Close => Command::Close,
            other => {
                return Err(TraciError::Protocol(format!(
                    "0x{:02X} is not a control command",
                    other.id()
                )))
            }
        };
        Ok(command)
    }

    // =========================================================================
    // Encoding
    // =========================================================================

    /// Encode the unit content (opcode first) for this command
    pub fn encode_content(&self, w: &mut TraciWriter) -> Result<()> {
        w.write_u8(self.cmd().id());

        match self {
            Command::GetVersion | Command::Close => {}
            Command::Load { args } => w.write_string_list(args),
            Command::SimStep { target_time } => w.write_f64(*target_time),
            Command::SendFile { name, content } => {
                w.write_string(name);
                w.write_string(content);
            }
            Command::Get(c) => {
                w.write_u8(c.variable);
                w.write_string(&c.element_id);
            }
            Command::Set(c) => {
                w.write_u8(c.variable);
                w.write_string(&c.element_id);
                w.write_typed_value(&c.value)?;
            }
            Command::Subscribe(c) => {
                let count = u8::try_from(c.variables.len()).map_err(|_| {
                    TraciError::Protocol(format!(
                        "{} subscription variables, at most 255 fit the wire format",
                        c.variables.len()
                    ))
                })?;
                w.write_f64(c.begin);
                w.write_f64(c.end);
                w.write_string(&c.element_id);
                w.write_u8(count);
                for variable in &c.variables {
                    w.write_u8(*variable);
                }
            }
        }

        Ok(())
    }
}
