//! Response definitions
//!
//! Every response starts with a status unit
//! `[ubyte opcode][ubyte resultCode][string description]`, optionally followed
//! by a payload whose shape depends on the command that was answered.

use bytes::Bytes;

use super::buffer::{TraciReader, TraciWriter};
use super::opcode::{CmdType, TraciCmd};
use super::value::TypedValue;
use crate::error::{Result, TraciError};

/// Protocol version reported by GET_VERSION
pub const API_VERSION: i32 = 20;

/// Result codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResultCode {
    Ok = 0x00,
    NotImplemented = 0x01,
    Error = 0xFF,
}

impl ResultCode {
    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            0x00 => Ok(ResultCode::Ok),
            0x01 => Ok(ResultCode::NotImplemented),
            0xFF => Ok(ResultCode::Error),
            other => Err(TraciError::Protocol(format!(
                "unknown result code: 0x{:02X}",
                other
            ))),
        }
    }
}

// =============================================================================
// Response parts
// =============================================================================

/// Status block present at the start of every response
#[derive(Debug, Clone, PartialEq)]
pub struct StatusResponse {
    pub cmd: TraciCmd,
    pub result: ResultCode,
    pub description: String,
}

impl StatusResponse {
    pub fn decode(content: Bytes) -> Result<Self> {
        let mut r = TraciReader::new(content);
        let status = Self {
            cmd: TraciCmd::from_id(r.read_u8()?)?,
            result: ResultCode::from_id(r.read_u8()?)?,
            description: r.read_string()?,
        };
        expect_consumed(&r, "status response")?;
        Ok(status)
    }

    pub fn encode_content(&self, w: &mut TraciWriter) {
        w.write_u8(self.cmd.id());
        w.write_u8(self.result as u8);
        w.write_string(&self.description);
    }
}

/// Payload of a GET_VERSION reply
#[derive(Debug, Clone, PartialEq)]
pub struct VersionInfo {
    pub api_version: i32,
    pub identifier: String,
}

impl VersionInfo {
    pub fn decode(content: Bytes) -> Result<Self> {
        let mut r = TraciReader::new(content);
        let cmd = TraciCmd::from_id(r.read_u8()?)?;
        if cmd != TraciCmd::GetVersion {
            return Err(TraciError::Protocol(format!(
                "expected version payload, got 0x{:02X}",
                cmd.id()
            )));
        }
        let info = Self {
            api_version: r.read_i32()?,
            identifier: r.read_string()?,
        };
        expect_consumed(&r, "version payload")?;
        Ok(info)
    }

    pub fn encode_content(&self, w: &mut TraciWriter) {
        w.write_u8(TraciCmd::GetVersion.id());
        w.write_i32(self.api_version);
        w.write_string(&self.identifier);
    }
}

/// Payload of a successful get: `[resp opcode][var][elementId][typed value]`
#[derive(Debug, Clone, PartialEq)]
pub struct ValueResponse {
    pub cmd: TraciCmd,
    pub variable: u8,
    pub element_id: String,
    pub value: TypedValue,
}

impl ValueResponse {
    pub fn decode(content: Bytes) -> Result<Self> {
        let mut r = TraciReader::new(content);
        let cmd = response_cmd(&mut r)?;
        let value = Self {
            cmd,
            variable: r.read_u8()?,
            element_id: r.read_string()?,
            value: r.read_typed_value()?,
        };
        expect_consumed(&r, "value response")?;
        Ok(value)
    }

    pub fn encode_content(&self, w: &mut TraciWriter) -> Result<()> {
        w.write_u8(self.cmd.id());
        w.write_u8(self.variable);
        w.write_string(&self.element_id);
        w.write_typed_value(&self.value)
    }
}

/// One variable inside a subscription result
#[derive(Debug, Clone, PartialEq)]
pub struct SubscribedValue {
    pub variable: u8,
    pub status: ResultCode,
    /// On failure a string with the error description
    pub value: TypedValue,
}

/// Values of one subscription at one step
///
/// Content: `[resp opcode][string elementId][ubyte n]` then per variable
/// `[ubyte var][ubyte status][typed value]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionResult {
    pub cmd: TraciCmd,
    pub element_id: String,
    pub values: Vec<SubscribedValue>,
}

impl SubscriptionResult {
    pub fn decode(content: Bytes) -> Result<Self> {
        let mut r = TraciReader::new(content);
        let cmd = response_cmd(&mut r)?;
        let element_id = r.read_string()?;
        let count = r.read_u8()?;
        let mut values = Vec::with_capacity(count as usize);
        for _ in 0..count {
            values.push(SubscribedValue {
                variable: r.read_u8()?,
                status: ResultCode::from_id(r.read_u8()?)?,
                value: r.read_typed_value()?,
            });
        }
        expect_consumed(&r, "subscription result")?;
        Ok(Self {
            cmd,
            element_id,
            values,
        })
    }

    pub fn encode_content(&self, w: &mut TraciWriter) -> Result<()> {
        let count = u8::try_from(self.values.len()).map_err(|_| {
            TraciError::Protocol(format!(
                "{} subscribed values, at most 255 fit the wire format",
                self.values.len()
            ))
        })?;
        w.write_u8(self.cmd.id());
        w.write_string(&self.element_id);
        w.write_u8(count);
        for value in &self.values {
            w.write_u8(value.variable);
            w.write_u8(value.status as u8);
            w.write_typed_value(&value.value)?;
        }
        Ok(())
    }

    /// Value of one variable, if it was evaluated successfully
    pub fn value_of(&self, variable: u8) -> Option<&TypedValue> {
        self.values
            .iter()
            .find(|v| v.variable == variable && v.status == ResultCode::Ok)
            .map(|v| &v.value)
    }
}

// =============================================================================
// Response
// =============================================================================

/// Payload following the status block
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// Status only
    None,
    Version(VersionInfo),
    Value(ValueResponse),
    Subscription(SubscriptionResult),
    /// Results of all active subscriptions after a step, in registration order
    SimStep(Vec<SubscriptionResult>),
}

/// A response to send to a client
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: StatusResponse,
    pub body: ResponseBody,
}

impl Response {
    fn status_only(cmd: TraciCmd, result: ResultCode, description: impl Into<String>) -> Self {
        Self {
            status: StatusResponse {
                cmd,
                result,
                description: description.into(),
            },
            body: ResponseBody::None,
        }
    }

    /// Create an OK response without payload
    pub fn ok(cmd: TraciCmd) -> Self {
        Self::status_only(cmd, ResultCode::Ok, "")
    }

    /// Create an ERROR response
    pub fn error(cmd: TraciCmd, description: impl Into<String>) -> Self {
        Self::status_only(cmd, ResultCode::Error, description)
    }

    /// Create a NOT_IMPLEMENTED response
    pub fn not_implemented(cmd: TraciCmd, description: impl Into<String>) -> Self {
        Self::status_only(cmd, ResultCode::NotImplemented, description)
    }

    /// Create an OK response with a payload
    pub fn with_body(cmd: TraciCmd, body: ResponseBody) -> Self {
        let mut response = Self::ok(cmd);
        response.body = body;
        response
    }

    /// Create the GET_VERSION reply
    pub fn version(identifier: impl Into<String>) -> Self {
        Self::with_body(
            TraciCmd::GetVersion,
            ResponseBody::Version(VersionInfo {
                api_version: API_VERSION,
                identifier: identifier.into(),
            }),
        )
    }

    /// Create the SIM_STEP reply
    pub fn sim_step(results: Vec<SubscriptionResult>) -> Self {
        Self::with_body(TraciCmd::SimStep, ResponseBody::SimStep(results))
    }

    pub fn cmd(&self) -> TraciCmd {
        self.status.cmd
    }

    pub fn result(&self) -> ResultCode {
        self.status.result
    }

    pub fn is_ok(&self) -> bool {
        self.status.result == ResultCode::Ok
    }

    pub fn description(&self) -> &str {
        &self.status.description
    }

    /// Value of a get reply
    pub fn value(&self) -> Option<&TypedValue> {
        match &self.body {
            ResponseBody::Value(v) => Some(&v.value),
            _ => None,
        }
    }

    /// Subscription results of a SIM_STEP reply
    pub fn subscriptions(&self) -> &[SubscriptionResult] {
        match &self.body {
            ResponseBody::SimStep(results) => results,
            _ => &[],
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn response_cmd(r: &mut TraciReader) -> Result<TraciCmd> {
    let cmd = TraciCmd::from_id(r.read_u8()?)?;
    if cmd.cmd_type() != CmdType::Response {
        return Err(TraciError::Protocol(format!(
            "expected a response identifier, got 0x{:02X}",
            cmd.id()
        )));
    }
    Ok(cmd)
}

fn expect_consumed(r: &TraciReader, what: &str) -> Result<()> {
    if r.has_remaining() {
        return Err(TraciError::Protocol(format!(
            "{} trailing bytes after {}",
            r.remaining(),
            what
        )));
    }
    Ok(())
}
