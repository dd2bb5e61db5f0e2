//! Buffer Tests
//!
//! Tests for primitive and typed value reading/writing.

use simtraci::protocol::{Color, DataType, TraciReader, TraciWriter, TypedValue, Vec2, Vec3};
use simtraci::TraciError;

fn roundtrip(value: TypedValue) -> TypedValue {
    let mut w = TraciWriter::new();
    w.write_typed_value(&value).unwrap();
    let mut r = TraciReader::new(w.freeze());
    let decoded = r.read_typed_value().unwrap();
    assert!(!r.has_remaining(), "reader left {} bytes", r.remaining());
    decoded
}

// =============================================================================
// Primitives
// =============================================================================

#[test]
fn test_primitives_are_big_endian() {
    let mut w = TraciWriter::new();
    w.write_u8(0xAB);
    w.write_i8(-2);
    w.write_i32(0x01020304);
    w.write_f64(1.5);

    assert_eq!(
        w.as_slice(),
        &[
            0xAB, 0xFE, 0x01, 0x02, 0x03, 0x04, 0x3F, 0xF8, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00
        ]
    );

    let mut r = TraciReader::new(w.freeze());
    assert_eq!(r.read_u8().unwrap(), 0xAB);
    assert_eq!(r.read_i8().unwrap(), -2);
    assert_eq!(r.read_i32().unwrap(), 0x01020304);
    assert_eq!(r.read_f64().unwrap(), 1.5);
    assert!(!r.has_remaining());
}

#[test]
fn test_empty_and_unicode_strings() {
    let mut w = TraciWriter::new();
    w.write_string("");
    w.write_string("Fußgänger");
    let mut r = TraciReader::new(w.freeze());
    assert_eq!(r.read_string().unwrap(), "");
    assert_eq!(r.read_string().unwrap(), "Fußgänger");
}

#[test]
fn test_string_list() {
    let ids = vec!["1".to_string(), "22".to_string(), "".to_string()];
    let mut w = TraciWriter::new();
    w.write_string_list(&ids);
    let mut r = TraciReader::new(w.freeze());
    assert_eq!(r.read_string_list().unwrap(), ids);
}

// =============================================================================
// Typed Values
// =============================================================================

#[test]
fn test_typed_values_keep_their_type() {
    let values = vec![
        TypedValue::Pos2D(Vec2::new(1.0, -2.5)),
        TypedValue::Pos3D(Vec3 {
            x: 1.0,
            y: 2.0,
            z: 3.0,
        }),
        TypedValue::Polygon(vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(1.0, 1.0)]),
        TypedValue::UByte(200),
        TypedValue::Byte(-100),
        TypedValue::Integer(-42),
        TypedValue::Double(0.4),
        TypedValue::String("road000".to_string()),
        TypedValue::StringList(vec!["a".to_string(), "b".to_string()]),
        TypedValue::Compound(vec![TypedValue::Integer(1), TypedValue::String("x".to_string())]),
        TypedValue::Color(Color {
            r: 255,
            g: 0,
            b: 128,
            a: 255,
        }),
    ];

    for value in values {
        let data_type = value.data_type();
        let decoded = roundtrip(value.clone());
        assert_eq!(decoded.data_type(), data_type);
        assert_eq!(decoded, value);
    }
}

#[test]
fn test_typed_value_tag_comes_first() {
    let mut w = TraciWriter::new();
    w.write_typed_value(&TypedValue::Double(2.0)).unwrap();
    assert_eq!(w.as_slice()[0], DataType::Double.id());
    assert_eq!(w.len(), 9);
}

#[test]
fn test_oversized_polygon_rejected() {
    let points = vec![Vec2::new(0.0, 0.0); 256];
    let mut w = TraciWriter::new();
    assert!(w.write_typed_value(&TypedValue::Polygon(points)).is_err());
}

// =============================================================================
// Error Cases
// =============================================================================

#[test]
fn test_underflow() {
    let mut r = TraciReader::new(vec![0u8, 1, 2]);
    match r.read_f64() {
        Err(TraciError::BufferUnderflow { needed, available }) => {
            assert_eq!(needed, 8);
            assert_eq!(available, 3);
        }
        other => panic!("Expected BufferUnderflow, got {:?}", other),
    }
}

#[test]
fn test_string_longer_than_buffer() {
    let mut r = TraciReader::new(vec![0u8, 0, 0, 10, b'a']);
    assert!(r.read_string().is_err());
}

#[test]
fn test_unknown_data_type() {
    let mut r = TraciReader::new(vec![0x42u8, 0, 0, 0, 0]);
    match r.read_typed_value() {
        Err(TraciError::UnknownDataType(0x42)) => {}
        other => panic!("Expected UnknownDataType, got {:?}", other),
    }
}
