//! Codec Tests
//!
//! Tests for frame reading/writing over streams.

use std::io::Cursor;

use simtraci::protocol::{encode_frame, read_frame, write_frame, MAX_FRAME_SIZE};
use simtraci::TraciError;

// =============================================================================
// Frame Encoding
// =============================================================================

#[test]
fn test_length_field_counts_itself() {
    let frame = encode_frame(&[0xAA, 0xBB, 0xCC]);
    assert_eq!(frame, vec![0, 0, 0, 7, 0xAA, 0xBB, 0xCC]);
}

#[test]
fn test_write_then_read_frames() {
    let mut buf = Vec::new();
    write_frame(&mut buf, b"first").unwrap();
    write_frame(&mut buf, &[0x00; 300]).unwrap();

    let mut cursor = Cursor::new(buf);
    assert_eq!(&read_frame(&mut cursor, MAX_FRAME_SIZE).unwrap()[..], b"first");
    assert_eq!(read_frame(&mut cursor, MAX_FRAME_SIZE).unwrap().len(), 300);
}

// =============================================================================
// Stream Edge Cases
// =============================================================================

#[test]
fn test_eof_before_frame_is_connection_closed() {
    let mut cursor = Cursor::new(Vec::<u8>::new());
    match read_frame(&mut cursor, MAX_FRAME_SIZE) {
        Err(TraciError::ConnectionClosed) => {}
        other => panic!("Expected ConnectionClosed, got {:?}", other),
    }
}

#[test]
fn test_eof_inside_frame_is_connection_closed() {
    let mut frame = encode_frame(b"truncated");
    frame.truncate(8);
    let mut cursor = Cursor::new(frame);
    let err = read_frame(&mut cursor, MAX_FRAME_SIZE).unwrap_err();
    assert!(err.is_disconnect());
}

#[test]
fn test_length_without_payload_rejected() {
    for total in [0i32, 4, -8] {
        let mut cursor = Cursor::new(total.to_be_bytes().to_vec());
        match read_frame(&mut cursor, MAX_FRAME_SIZE) {
            Err(TraciError::Frame(_)) => {}
            other => panic!("Expected Frame error for length {}, got {:?}", total, other),
        }
    }
}

#[test]
fn test_oversized_frame_rejected() {
    let frame = encode_frame(&[0u8; 64]);
    let mut cursor = Cursor::new(frame);
    match read_frame(&mut cursor, 32) {
        Err(TraciError::Frame(msg)) => assert!(msg.contains("too large")),
        other => panic!("Expected Frame error, got {:?}", other),
    }
}
