//! Wire type markers.
//!
//! The marker set is the contract between encoder and decoder. A byte that
//! is not listed here is rejected with `UnknownTypeCode`; types are never
//! inferred from payload shape.

use crate::error::{CodecError, Result};

/// Value flag: a payload follows.
pub const VALUE_FLAG_NONE: u8 = 0x00;

/// Value flag: the value is null and no payload follows.
pub const VALUE_FLAG_NULL: u8 = 0x01;

/// Leading byte of the request/response envelope format.
pub const MESSAGE_VERSION: u8 = 0x81;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DataType {
    Int = 0x01,
    Long = 0x02,
    String = 0x03,
    Date = 0x04,
    Timestamp = 0x05,
    Class = 0x06,
    Double = 0x07,
    Float = 0x08,
    List = 0x09,
    Map = 0x0a,
    Set = 0x0b,
    Uuid = 0x0c,
    Bytecode = 0x15,
    Lambda = 0x1d,
    Byte = 0x24,
    Short = 0x26,
    Boolean = 0x27,
    Metrics = 0x2c,
    Char = 0x80,
    UnspecifiedNull = 0xfe,
}

impl DataType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0x01 => Some(Self::Int),
            0x02 => Some(Self::Long),
            0x03 => Some(Self::String),
            0x04 => Some(Self::Date),
            0x05 => Some(Self::Timestamp),
            0x06 => Some(Self::Class),
            0x07 => Some(Self::Double),
            0x08 => Some(Self::Float),
            0x09 => Some(Self::List),
            0x0a => Some(Self::Map),
            0x0b => Some(Self::Set),
            0x0c => Some(Self::Uuid),
            0x15 => Some(Self::Bytecode),
            0x1d => Some(Self::Lambda),
            0x24 => Some(Self::Byte),
            0x26 => Some(Self::Short),
            0x27 => Some(Self::Boolean),
            0x2c => Some(Self::Metrics),
            0x80 => Some(Self::Char),
            0xfe => Some(Self::UnspecifiedNull),
            _ => None,
        }
    }

    /// Like `from_u8`, but an unregistered marker is an error.
    pub fn from_code(v: u8) -> Result<Self> {
        Self::from_u8(v).ok_or(CodecError::UnknownTypeCode(v))
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}
