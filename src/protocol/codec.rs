//! Frame codec
//!
//! Turns a byte stream into length-delimited frames and back.
//!
//! ## Wire Format
//! ```text
//! ┌──────────────────┬─────────────────────────────────────┐
//! │ Total Len (4)    │         Payload (Len - 4)           │
//! └──────────────────┴─────────────────────────────────────┘
//! ```
//! The length field is a big-endian int and counts itself.

use std::io::{ErrorKind, Read, Write};

use bytes::Bytes;

use crate::error::{Result, TraciError};

/// Size of the frame length field
pub const LENGTH_FIELD_SIZE: usize = 4;

/// Default maximum frame size (16 MB), including the length field
pub const MAX_FRAME_SIZE: u32 = 16 * 1024 * 1024;

// =============================================================================
// Encoding
// =============================================================================

/// Encode a payload as one frame
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let total_len = (LENGTH_FIELD_SIZE + payload.len()) as u32;

    let mut frame = Vec::with_capacity(total_len as usize);
    frame.extend_from_slice(&total_len.to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}

/// Validate a frame length field and return the payload length
pub fn payload_len(total_len: i32, max_frame_size: u32) -> Result<usize> {
    let payload_len = i64::from(total_len) - LENGTH_FIELD_SIZE as i64;
    if payload_len <= 0 {
        return Err(TraciError::Frame(format!(
            "frame length {} leaves no payload",
            total_len
        )));
    }
    if total_len as u32 > max_frame_size {
        return Err(TraciError::Frame(format!(
            "frame too large: {} bytes (max {})",
            total_len, max_frame_size
        )));
    }
    Ok(payload_len as usize)
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Write one frame to a stream
///
/// The length field and payload go out in a single buffer so that two frames
/// written by the same owner can never interleave.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<()> {
    let frame = encode_frame(payload);
    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(())
}

/// Read one frame from a stream and return its payload
///
/// Blocks until a complete frame is received. A clean end of stream before
/// the first length byte, or in the middle of a frame, is reported as
/// [`TraciError::ConnectionClosed`].
pub fn read_frame<R: Read>(reader: &mut R, max_frame_size: u32) -> Result<Bytes> {
    let mut header = [0u8; LENGTH_FIELD_SIZE];
    read_exact(reader, &mut header)?;

    let total_len = i32::from_be_bytes(header);
    let payload_len = payload_len(total_len, max_frame_size)?;

    let mut payload = vec![0u8; payload_len];
    read_exact(reader, &mut payload)?;

    Ok(Bytes::from(payload))
}

fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(TraciError::ConnectionClosed),
        Err(e) => Err(TraciError::Io(e)),
    }
}
