//! Protocol Module
//!
//! Defines the TraCI-style wire protocol between controllers and the server.
//!
//! ## Layers
//! ```text
//! Frame:    [int totalLen][payload]                        (codec)
//! Payload:  unit unit unit ...                             (parser)
//! Unit:     [ubyte len | 0x00 int len][opcode][body]       (parser)
//! Body:     primitives and typed values                    (buffer)
//! ```
//!
//! ### Status Codes
//! - 0x00: OK
//! - 0x01: NOT_IMPLEMENTED
//! - 0xFF: ERROR

mod buffer;
mod codec;
mod command;
mod opcode;
mod parser;
mod response;
mod value;

pub use buffer::{TraciReader, TraciWriter};
pub use codec::{encode_frame, payload_len, read_frame, write_frame, LENGTH_FIELD_SIZE, MAX_FRAME_SIZE};
pub use command::{Command, GetCommand, SetCommand, SubscribeCommand, UNBOUNDED_TIME};
pub use opcode::{CmdType, TraciCmd};
pub use parser::{
    encode_commands, encode_responses, parse_commands, parse_responses, PacketReader,
    PacketWriter, EXTENDED_HEADER_SIZE, SHORT_UNIT_MAX_CONTENT,
};
pub use response::{
    Response, ResponseBody, ResultCode, StatusResponse, SubscribedValue, SubscriptionResult,
    ValueResponse, VersionInfo, API_VERSION,
};
pub use value::{Color, DataType, TypedValue, Vec2, Vec3};
