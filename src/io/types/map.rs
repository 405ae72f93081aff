//! MAP: `[i32 count]([fully-qualified key][fully-qualified value])*`.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{CodecError, Result};
use crate::io::buffer::{length_to_i32, read_length};
use crate::io::{BinaryReader, BinaryWriter, DataType, Value, VALUE_FLAG_NONE};
use super::string::write_string;
use super::TypeSerializer;

pub struct MapSerializer;

impl MapSerializer {
    /// Read the bare payload, entries in wire order.
    pub fn read_entries(&self, buf: &mut dyn Buf, reader: &BinaryReader) -> Result<Vec<(Value, Value)>> {
        let len = read_length(buf)?;
        let mut entries = Vec::with_capacity(len.min(buf.remaining() / 4));
        for _ in 0..len {
            let key = reader.read(buf)?;
            let value = reader.read(buf)?;
            entries.push((key, value));
        }
        Ok(entries)
    }

    /// Write the bare payload from any iterator of key/value pairs.
    pub fn write_entries<'a, I>(&self, entries: I, buf: &mut BytesMut, writer: &BinaryWriter) -> Result<()>
    where
        I: ExactSizeIterator<Item = (&'a Value, &'a Value)>,
    {
        buf.put_i32(length_to_i32(entries.len())?);
        for (key, value) in entries {
            writer.write(key, buf)?;
            writer.write(value, buf)?;
        }
        Ok(())
    }

    /// Read a map whose keys must all be strings.
    pub fn read_string_keyed(&self, buf: &mut dyn Buf, reader: &BinaryReader) -> Result<Vec<(String, Value)>> {
        self.read_entries(buf, reader)?
            .into_iter()
            .map(|(key, value)| match key {
                Value::String(key) => Ok((key, value)),
                other => Err(CodecError::Decode(format!(
                    "Expected string map key, found {:?}",
                    other.data_type()
                ))),
            })
            .collect()
    }

    /// Write a map with string keys.
    pub fn write_string_keyed<'a, I>(&self, entries: I, buf: &mut BytesMut, writer: &BinaryWriter) -> Result<()>
    where
        I: ExactSizeIterator<Item = (&'a String, &'a Value)>,
    {
        buf.put_i32(length_to_i32(entries.len())?);
        for (key, value) in entries {
            buf.put_u8(DataType::String.code());
            buf.put_u8(VALUE_FLAG_NONE);
            write_string(key, buf)?;
            writer.write(value, buf)?;
        }
        Ok(())
    }
}

impl TypeSerializer for MapSerializer {
    fn data_type(&self) -> DataType {
        DataType::Map
    }

    fn read_value(&self, buf: &mut dyn Buf, reader: &BinaryReader) -> Result<Value> {
        self.read_entries(buf, reader).map(Value::Map)
    }

    fn write_value(&self, value: &Value, buf: &mut BytesMut, writer: &BinaryWriter) -> Result<()> {
        match value {
            Value::Map(entries) => self.write_entries(entries.iter().map(|(k, v)| (k, v)), buf, writer),
            other => Err(CodecError::mismatch(DataType::Map, other)),
        }
    }
}
