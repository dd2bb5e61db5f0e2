//! Blocking Controller Client
//!
//! Speaks the same framing as the server. Used by the CLI and the tests.

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;

use crate::error::{Result, TraciError};
use crate::protocol::{
    encode_commands, parse_responses, read_frame, write_frame, Command, Response, ResponseBody,
    TraciCmd, TypedValue, VersionInfo, MAX_FRAME_SIZE,
};

/// Client connection to a simulation server
pub struct TraciClient {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl TraciClient {
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        let read_stream = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }

    /// Send commands in one frame and read the frame answering them
    pub fn send(&mut self, commands: &[Command]) -> Result<Vec<Response>> {
        let payload = encode_commands(commands)?;
        write_frame(&mut self.writer, &payload)?;

        let reply = read_frame(&mut self.reader, MAX_FRAME_SIZE)?;
        parse_responses(reply)
    }

    /// Send one command and return its response
    pub fn request(&mut self, command: Command) -> Result<Response> {
        self.send(std::slice::from_ref(&command))?
            .into_iter()
            .next()
            .ok_or_else(|| TraciError::Protocol("empty response frame".to_string()))
    }

    pub fn get_version(&mut self) -> Result<VersionInfo> {
        let response = self.request(Command::GetVersion)?;
        match &response.body {
            ResponseBody::Version(info) => Ok(info.clone()),
            _ => Err(failure(&response)),
        }
    }

    /// Advance to `target_time`; a target at or before now advances one step
    pub fn next_step(&mut self, target_time: f64) -> Result<Response> {
        self.request(Command::SimStep { target_time })
    }

    /// Read one variable; non-OK statuses become errors
    pub fn get(&mut self, cmd: TraciCmd, variable: u8, element_id: &str) -> Result<TypedValue> {
        let response = self.request(Command::get(cmd, variable, element_id))?;
        response
            .value()
            .cloned()
            .ok_or_else(|| failure(&response))
    }

    pub fn set(&mut self, cmd: TraciCmd, variable: u8, element_id: &str, value: TypedValue) -> Result<Response> {
        self.request(Command::set(cmd, variable, element_id, value))
    }

    pub fn subscribe(&mut self, cmd: TraciCmd, element_id: &str, variables: Vec<u8>) -> Result<Response> {
        self.request(Command::subscribe(cmd, element_id, variables))
    }

    /// Upload a scenario file and load it on the server
    pub fn send_file(&mut self, path: impl AsRef<Path>) -> Result<Response> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| TraciError::Protocol(format!("invalid file name {}", path.display())))?
            .to_string();
        self.request(Command::SendFile { name, content })
    }

    /// Load a scenario already present on the server
    pub fn load(&mut self, path: &str) -> Result<Response> {
        self.request(Command::Load {
            args: vec![path.to_string()],
        })
    }

    pub fn close(mut self) -> Result<Response> {
        self.request(Command::Close)
    }
}

fn failure(response: &Response) -> TraciError {
    TraciError::Protocol(format!(
        "command 0x{:02X} failed with {:?}: {}",
        response.cmd().id(),
        response.result(),
        response.description()
    ))
}
