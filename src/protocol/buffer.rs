//! Primitive buffer
//!
//! Cursor-based reader and append-only writer for the primitive wire types
//! that appear inside a frame payload. All integers are big-endian.
//!
//! | type        | encoding                                   |
//! |-------------|--------------------------------------------|
//! | ubyte/byte  | 1 byte                                     |
//! | int         | 4 bytes                                    |
//! | double      | 8 bytes (IEEE 754)                         |
//! | string      | int length + UTF-8 bytes                   |
//! | list        | int count + count encoded elements         |
//! | typed value | ubyte data type + the type's encoding      |

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::value::{Color, DataType, TypedValue, Vec2, Vec3};
use crate::error::{Result, TraciError};

// =============================================================================
// Reader
// =============================================================================

/// Sequential reader over a fixed byte range
#[derive(Debug, Clone)]
pub struct TraciReader {
    buf: Bytes,
}

impl TraciReader {
    pub fn new(buf: impl Into<Bytes>) -> Self {
        Self { buf: buf.into() }
    }

    /// Bytes left after the cursor
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    pub fn has_remaining(&self) -> bool {
        self.buf.has_remaining()
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        let available = self.buf.remaining();
        if available < needed {
            return Err(TraciError::BufferUnderflow { needed, available });
        }
        Ok(())
    }

    /// Look at the next byte without consuming it
    pub fn peek_u8(&self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.buf[0])
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        self.ensure(1)?;
        Ok(self.buf.get_i8())
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.ensure(4)?;
        Ok(self.buf.get_i32())
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        self.ensure(8)?;
        Ok(self.buf.get_f64())
    }

    /// Split off the next `len` bytes without copying
    pub fn read_bytes(&mut self, len: usize) -> Result<Bytes> {
        self.ensure(len)?;
        Ok(self.buf.split_to(len))
    }

    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_i32()?;
        if len < 0 {
            return Err(TraciError::Protocol(format!("negative string length {}", len)));
        }
        let raw = self.read_bytes(len as usize)?;
        String::from_utf8(raw.to_vec())
            .map_err(|e| TraciError::Protocol(format!("string is not UTF-8: {}", e)))
    }

    /// Read an int count followed by that many elements
    pub fn read_list<T, F>(&mut self, mut read_element: F) -> Result<Vec<T>>
    where
        F: FnMut(&mut Self) -> Result<T>,
    {
        let count = self.read_i32()?;
        if count < 0 {
            return Err(TraciError::Protocol(format!("negative list length {}", count)));
        }
        // Every element takes at least one byte, so a count beyond the
        // remaining bytes cannot be satisfied.
        let mut items = Vec::with_capacity((count as usize).min(self.remaining()));
        for _ in 0..count {
            items.push(read_element(self)?);
        }
        Ok(items)
    }

    pub fn read_string_list(&mut self) -> Result<Vec<String>> {
        self.read_list(|r| r.read_string())
    }

    pub fn read_data_type(&mut self) -> Result<DataType> {
        DataType::from_id(self.read_u8()?)
    }

    /// Read a data type tag and the value it announces
    pub fn read_typed_value(&mut self) -> Result<TypedValue> {
        let data_type = self.read_data_type()?;
        self.read_value(data_type)
    }

    /// Read a value whose data type tag was already consumed
    pub fn read_value(&mut self, data_type: DataType) -> Result<TypedValue> {
        let value = match data_type {
            DataType::Pos2D => TypedValue::Pos2D(self.read_vec2()?),
            DataType::Pos3D => TypedValue::Pos3D(Vec3 {
                x: self.read_f64()?,
                y: self.read_f64()?,
                z: self.read_f64()?,
            }),
            DataType::Polygon => {
                let count = self.read_u8()?;
                let mut points = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    points.push(self.read_vec2()?);
                }
                TypedValue::Polygon(points)
            }
            DataType::UByte => TypedValue::UByte(self.read_u8()?),
            DataType::Byte => TypedValue::Byte(self.read_i8()?),
            DataType::Integer => TypedValue::Integer(self.read_i32()?),
            DataType::Double => TypedValue::Double(self.read_f64()?),
            DataType::String => TypedValue::String(self.read_string()?),
            DataType::StringList => TypedValue::StringList(self.read_string_list()?),
            DataType::Compound => TypedValue::Compound(self.read_list(|r| r.read_typed_value())?),
            DataType::Color => TypedValue::Color(Color {
                r: self.read_u8()?,
                g: self.read_u8()?,
                b: self.read_u8()?,
                a: self.read_u8()?,
            }),
        };
        Ok(value)
    }

    fn read_vec2(&mut self) -> Result<Vec2> {
        Ok(Vec2::new(self.read_f64()?, self.read_f64()?))
    }
}

// =============================================================================
// Writer
// =============================================================================

/// Append-only writer, the byte-for-byte mirror of [`TraciReader`]
#[derive(Debug, Default, Clone)]
pub struct TraciWriter {
    buf: BytesMut,
}

impl TraciWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Finish writing and hand out the bytes
    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    pub fn write_i8(&mut self, value: i8) {
        self.buf.put_i8(value);
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buf.put_i32(value);
    }

    pub fn write_f64(&mut self, value: f64) {
        self.buf.put_f64(value);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }

    pub fn write_string(&mut self, value: &str) {
        self.buf.put_i32(value.len() as i32);
        self.buf.put_slice(value.as_bytes());
    }

    /// Write an int count followed by each element
    pub fn write_list<T, F>(&mut self, items: &[T], mut write_element: F) -> Result<()>
    where
        F: FnMut(&mut Self, &T) -> Result<()>,
    {
        self.buf.put_i32(items.len() as i32);
        for item in items {
            write_element(self, item)?;
        }
        Ok(())
    }

    pub fn write_string_list(&mut self, values: &[String]) {
        self.buf.put_i32(values.len() as i32);
        for value in values {
            self.write_string(value);
        }
    }

    /// Write the data type tag and then the value
    pub fn write_typed_value(&mut self, value: &TypedValue) -> Result<()> {
        self.write_u8(value.data_type().id());
        self.write_value(value)
    }

    /// Write the value without its tag
    pub fn write_value(&mut self, value: &TypedValue) -> Result<()> {
        match value {
            TypedValue::Pos2D(v) => self.write_vec2(*v),
            TypedValue::Pos3D(v) => {
                self.write_f64(v.x);
                self.write_f64(v.y);
                self.write_f64(v.z);
            }
            TypedValue::Polygon(points) => {
                let count = u8::try_from(points.len()).map_err(|_| {
                    TraciError::Protocol(format!(
                        "polygon has {} points, at most 255 fit the wire format",
                        points.len()
                    ))
                })?;
                self.write_u8(count);
                for point in points {
                    self.write_vec2(*point);
                }
            }
            TypedValue::UByte(v) => self.write_u8(*v),
            TypedValue::Byte(v) => self.write_i8(*v),
            TypedValue::Integer(v) => self.write_i32(*v),
            TypedValue::Double(v) => self.write_f64(*v),
            TypedValue::String(v) => self.write_string(v),
            TypedValue::StringList(v) => self.write_string_list(v),
            TypedValue::Compound(items) => {
                self.write_list(items, |w, item| w.write_typed_value(item))?
            }
            TypedValue::Color(c) => {
                self.write_u8(c.r);
                self.write_u8(c.g);
                self.write_u8(c.b);
                self.write_u8(c.a);
            }
        }
        Ok(())
    }

    fn write_vec2(&mut self, v: Vec2) {
        self.write_f64(v.x);
        self.write_f64(v.y);
    }
}
