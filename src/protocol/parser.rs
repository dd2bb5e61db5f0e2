//! Command parser
//!
//! Slices a frame payload into self-length-prefixed units and writes units
//! back. Each unit starts with its own length:
//!
//! ```text
//! short:    [ubyte len = 1 + content]             [content]   content <= 254
//! extended: [ubyte 0x00][int len = 5 + content]   [content]
//! ```
//!
//! The SIM_STEP reply breaks the pattern: after its status unit comes a bare
//! int with the number of subscription results, then that many results, each
//! written as an extended unit.

use bytes::Bytes;

use super::buffer::{TraciReader, TraciWriter};
use super::command::Command;
use super::opcode::{CmdType, TraciCmd};
use super::response::{
    Response, ResponseBody, ResultCode, StatusResponse, SubscriptionResult, ValueResponse,
    VersionInfo,
};
use crate::error::{Result, TraciError};

/// Largest content that fits the single-byte length form
pub const SHORT_UNIT_MAX_CONTENT: usize = 254;

/// Marker byte plus int length of the extended form
pub const EXTENDED_HEADER_SIZE: usize = 5;

// =============================================================================
// Reading
// =============================================================================

/// Reads consecutive units from one frame payload
#[derive(Debug, Clone)]
pub struct PacketReader {
    reader: TraciReader,
}

impl PacketReader {
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            reader: TraciReader::new(payload),
        }
    }

    pub fn has_remaining(&self) -> bool {
        self.reader.has_remaining()
    }

    pub fn remaining(&self) -> usize {
        self.reader.remaining()
    }

    /// Slice off the next unit and return its content (opcode first)
    pub fn next_unit(&mut self) -> Result<Bytes> {
        let short_len = self.reader.read_u8()?;
        let content_len = if short_len == 0 {
            let ext_len = self.reader.read_i32()?;
            if ext_len < EXTENDED_HEADER_SIZE as i32 {
                return Err(TraciError::Protocol(format!(
                    "extended unit length {} is shorter than its header",
                    ext_len
                )));
            }
            ext_len as usize - EXTENDED_HEADER_SIZE
        } else {
            short_len as usize - 1
        };

        if content_len > self.reader.remaining() {
            return Err(TraciError::Protocol(format!(
                "unit declares {} bytes but only {} remain in the frame",
                content_len,
                self.reader.remaining()
            )));
        }

        self.reader.read_bytes(content_len)
    }

    /// Opcode of the next unit, without consuming it
    fn peek_unit_cmd(&self) -> Result<Option<TraciCmd>> {
        if !self.has_remaining() {
            return Ok(None);
        }
        let mut probe = self.clone();
        let content = probe.next_unit()?;
        match content.first() {
            Some(id) => Ok(Some(TraciCmd::from_id(*id)?)),
            None => Ok(None),
        }
    }

    /// Decode the next command, or `None` at the end of the payload
    pub fn next_command(&mut self) -> Result<Option<Command>> {
        if !self.has_remaining() {
            return Ok(None);
        }
        let content = self.next_unit()?;
        if content.is_empty() {
            return Err(TraciError::Protocol("empty command unit".to_string()));
        }
        Command::decode(content).map(Some)
    }

    /// Decode the next response, or `None` at the end of the payload
    ///
    /// Which payload follows the status depends on the answered command:
    /// GET_VERSION and SIM_STEP always carry one when OK; get and subscribe
    /// replies carry one when the next unit has a response identifier.
    pub fn next_response(&mut self) -> Result<Option<Response>> {
        if !self.has_remaining() {
            return Ok(None);
        }
        let status = StatusResponse::decode(self.next_unit()?)?;

        let body = if status.result != ResultCode::Ok {
            ResponseBody::None
        } else {
            match status.cmd {
                TraciCmd::GetVersion => ResponseBody::Version(VersionInfo::decode(self.next_unit()?)?),
                TraciCmd::SimStep => ResponseBody::SimStep(self.read_subscription_results()?),
                cmd => match (cmd.cmd_type(), self.peek_unit_cmd()?) {
                    (CmdType::Get, Some(next)) if next.cmd_type() == CmdType::Response => {
                        ResponseBody::Value(ValueResponse::decode(self.next_unit()?)?)
                    }
                    (CmdType::Subscribe, Some(next)) if next.cmd_type() == CmdType::Response => {
                        ResponseBody::Subscription(SubscriptionResult::decode(self.next_unit()?)?)
                    }
                    _ => ResponseBody::None,
                },
            }
        };

        Ok(Some(Response { status, body }))
    }

    fn read_subscription_results(&mut self) -> Result<Vec<SubscriptionResult>> {
        let count = self.reader.read_i32()?;
        if count < 0 {
            return Err(TraciError::Protocol(format!(
                "negative subscription count {}",
                count
            )));
        }

        let mut results = Vec::with_capacity((count as usize).min(self.remaining()));
        for _ in 0..count {
            if self.reader.peek_u8()? != 0 {
                return Err(TraciError::Protocol(
                    "subscription result without extended length marker".to_string(),
                ));
            }
            results.push(SubscriptionResult::decode(self.next_unit()?)?);
        }
        Ok(results)
    }
}

/// Parse every command in a frame payload
///
/// Any malformed unit fails the whole frame.
pub fn parse_commands(payload: impl Into<Bytes>) -> Result<Vec<Command>> {
    let mut reader = PacketReader::new(payload);
    let mut commands = Vec::new();
    while let Some(command) = reader.next_command()? {
        commands.push(command);
    }
    Ok(commands)
}

/// Parse every response in a frame payload
pub fn parse_responses(payload: impl Into<Bytes>) -> Result<Vec<Response>> {
    let mut reader = PacketReader::new(payload);
    let mut responses = Vec::new();
    while let Some(response) = reader.next_response()? {
        responses.push(response);
    }
    Ok(responses)
}

// =============================================================================
// Writing
// =============================================================================

/// Builds a frame payload out of units
#[derive(Debug, Default)]
pub struct PacketWriter {
    writer: TraciWriter,
}

impl PacketWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.writer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writer.is_empty()
    }

    /// Prefix `content` with the shortest length form that fits
    pub fn write_unit(&mut self, content: &[u8]) {
        if content.len() <= SHORT_UNIT_MAX_CONTENT {
            self.writer.write_u8((content.len() + 1) as u8);
            self.writer.write_bytes(content);
        } else {
            self.write_extended_unit(content);
        }
    }

    /// Prefix `content` with the extended length form regardless of size
    pub fn write_extended_unit(&mut self, content: &[u8]) {
        self.writer.write_u8(0);
        self.writer
            .write_i32((content.len() + EXTENDED_HEADER_SIZE) as i32);
        self.writer.write_bytes(content);
    }

    pub fn write_command(&mut self, command: &Command) -> Result<()> {
        let mut content = TraciWriter::new();
        command.encode_content(&mut content)?;
        self.write_unit(content.as_slice());
        Ok(())
    }

    pub fn write_response(&mut self, response: &Response) -> Result<()> {
        let mut status = TraciWriter::new();
        response.status.encode_content(&mut status);
        self.write_unit(status.as_slice());

        match &response.body {
            ResponseBody::None => {}
            ResponseBody::Version(info) => {
                let mut content = TraciWriter::new();
                info.encode_content(&mut content);
                self.write_unit(content.as_slice());
            }
            ResponseBody::Value(value) => {
                let mut content = TraciWriter::new();
                value.encode_content(&mut content)?;
                self.write_unit(content.as_slice());
            }
            ResponseBody::Subscription(result) => {
                let mut content = TraciWriter::new();
                result.encode_content(&mut content)?;
                self.write_unit(content.as_slice());
            }
            ResponseBody::SimStep(results) => {
                self.writer.write_i32(results.len() as i32);
                for result in results {
                    let mut content = TraciWriter::new();
                    result.encode_content(&mut content)?;
                    self.write_extended_unit(content.as_slice());
                }
            }
        }

        Ok(())
    }

    /// Finish the payload
    pub fn finish(self) -> Bytes {
        self.writer.freeze()
    }
}

/// Encode commands into one frame payload
pub fn encode_commands(commands: &[Command]) -> Result<Bytes> {
    let mut writer = PacketWriter::new();
    for command in commands {
        writer.write_command(command)?;
    }
    Ok(writer.finish())
}

/// Encode responses into one frame payload
pub fn encode_responses(responses: &[Response]) -> Result<Bytes> {
    let mut writer = PacketWriter::new();
    for response in responses {
        writer.write_response(response)?;
    }
    Ok(writer.finish())
}
