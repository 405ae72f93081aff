//! DATE and TIMESTAMP: `[i64 milliseconds since epoch]`.
//!
//! Both markers share this implementation; they differ only in the value
//! constructor used on decode.

use bytes::{Buf, BufMut, BytesMut};
use chrono::{DateTime, Utc};

use crate::error::{CodecError, Result};
use crate::io::buffer::read_i64;
use crate::io::{BinaryReader, BinaryWriter, DataType, Value};
use super::TypeSerializer;

pub struct DateSerializer {
    data_type: DataType,
    construct: fn(DateTime<Utc>) -> Value,
}

impl DateSerializer {
    pub const DATE: DateSerializer = DateSerializer::new(DataType::Date, Value::Date);
    pub const TIMESTAMP: DateSerializer = DateSerializer::new(DataType::Timestamp, Value::Timestamp);

    const fn new(data_type: DataType, construct: fn(DateTime<Utc>) -> Value) -> Self {
        Self { data_type, construct }
    }
}

impl TypeSerializer for DateSerializer {
    fn data_type(&self) -> DataType {
        self.data_type
    }

    fn read_value(&self, buf: &mut dyn Buf, _reader: &BinaryReader) -> Result<Value> {
        let millis = read_i64(buf)?;
        let instant = DateTime::<Utc>::from_timestamp_millis(millis).ok_or_else(|| {
            CodecError::Decode(format!("Timestamp out of range: {} ms", millis))
        })?;
        Ok((self.construct)(instant))
    }

    fn write_value(&self, value: &Value, buf: &mut BytesMut, _writer: &BinaryWriter) -> Result<()> {
        match value {
            Value::Date(instant) | Value::Timestamp(instant) if value.data_type() == self.data_type => {
                buf.put_i64(instant.timestamp_millis());
                Ok(())
            }
            other => Err(CodecError::mismatch(self.data_type, other)),
        }
    }
}
