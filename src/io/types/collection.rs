//! LIST and SET: `[i32 count][fully-qualified item]*`.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{CodecError, Result};
use crate::io::buffer::{length_to_i32, read_length};
use crate::io::{BinaryReader, BinaryWriter, DataType, Value};
use super::TypeSerializer;

pub struct CollectionSerializer {
    data_type: DataType,
}

impl CollectionSerializer {
    pub const LIST: CollectionSerializer = CollectionSerializer { data_type: DataType::List };
    pub const SET: CollectionSerializer = CollectionSerializer { data_type: DataType::Set };

    /// Read the bare payload: count followed by fully-qualified items.
    pub fn read_items(&self, buf: &mut dyn Buf, reader: &BinaryReader) -> Result<Vec<Value>> {
        let len = read_length(buf)?;
        // Every item takes at least two bytes; don't trust the count for allocation.
        let mut items = Vec::with_capacity(len.min(buf.remaining() / 2));
        for _ in 0..len {
            items.push(reader.read(buf)?);
        }
        Ok(items)
    }

    /// Write the bare payload for any sequence of values.
    pub fn write_items(&self, items: &[Value], buf: &mut BytesMut, writer: &BinaryWriter) -> Result<()> {
        buf.put_i32(length_to_i32(items.len())?);
        for item in items {
            writer.write(item, buf)?;
        }
        Ok(())
    }
}

impl TypeSerializer for CollectionSerializer {
    fn data_type(&self) -> DataType {
        self.data_type
    }

    fn read_value(&self, buf: &mut dyn Buf, reader: &BinaryReader) -> Result<Value> {
        let items = self.read_items(buf, reader)?;
        Ok(match self.data_type {
            DataType::Set => Value::Set(items),
            _ => Value::List(items),
        })
    }

    fn write_value(&self, value: &Value, buf: &mut BytesMut, writer: &BinaryWriter) -> Result<()> {
        match (self.data_type, value) {
            (DataType::List, Value::List(items)) | (DataType::Set, Value::Set(items)) => {
                self.write_items(items, buf, writer)
            }
            (expected, other) => Err(CodecError::mismatch(expected, other)),
        }
    }
}
