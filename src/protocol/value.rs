//! Typed values
//!
//! A typed value is a 1-byte data type tag followed by the type's encoding.
//! The reader/writer halves live in [`super::buffer`].

use crate::error::{Result, TraciError};

/// Data type tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DataType {
    Pos2D = 0x01,
    Pos3D = 0x03,
    Polygon = 0x06,
    UByte = 0x07,
    Byte = 0x08,
    Integer = 0x09,
    Double = 0x0B,
    String = 0x0C,
    StringList = 0x0E,
    Compound = 0x0F,
    Color = 0x11,
}

impl DataType {
    /// Look up a data type tag. Unknown tags are a protocol error.
    pub fn from_id(id: u8) -> Result<Self> {
        let data_type = match id {
            0x01 => DataType::Pos2D,
            0x03 => DataType::Pos3D,
            0x06 => DataType::Polygon,
            0x07 => DataType::UByte,
            0x08 => DataType::Byte,
            0x09 => DataType::Integer,
            0x0B => DataType::Double,
            0x0C => DataType::String,
            0x0E => DataType::StringList,
            0x0F => DataType::Compound,
            0x11 => DataType::Color,
            other => return Err(TraciError::UnknownDataType(other)),
        };
        Ok(data_type)
    }

    /// Wire id
    pub fn id(self) -> u8 {
        self as u8
    }
}

/// 2D position
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn distance(self, other: Vec2) -> f64 {
        Vec2::new(other.x - self.x, other.y - self.y).length()
    }
}

/// 3D position
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// A value together with its wire type
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Pos2D(Vec2),
    Pos3D(Vec3),
    /// At most 255 points (count is a single byte on the wire)
    Polygon(Vec<Vec2>),
    UByte(u8),
    Byte(i8),
    Integer(i32),
    Double(f64),
    String(String),
    StringList(Vec<String>),
    Compound(Vec<TypedValue>),
    Color(Color),
}

impl TypedValue {
    /// The tag this value is written with
    pub fn data_type(&self) -> DataType {
        match self {
            TypedValue::Pos2D(_) => DataType::Pos2D,
            TypedValue::Pos3D(_) => DataType::Pos3D,
            TypedValue::Polygon(_) => DataType::Polygon,
            TypedValue::UByte(_) => DataType::UByte,
            TypedValue::Byte(_) => DataType::Byte,
            TypedValue::Integer(_) => DataType::Integer,
            TypedValue::Double(_) => DataType::Double,
            TypedValue::String(_) => DataType::String,
            TypedValue::StringList(_) => DataType::StringList,
            TypedValue::Compound(_) => DataType::Compound,
            TypedValue::Color(_) => DataType::Color,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TypedValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_pos2d(&self) -> Option<Vec2> {
        match self {
            TypedValue::Pos2D(v) => Some(*v),
            _ => None,
        }
    }
}
