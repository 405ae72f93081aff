//! CLASS: a type descriptor, written as the bare STRING of its
//! fully-qualified name and resolved through the reader's `TypeRegistry`.

use bytes::{Buf, BytesMut};

use crate::error::{CodecError, Result};
use crate::io::{BinaryReader, BinaryWriter, DataType, Value};
use super::string::{read_string, write_string};
use super::TypeSerializer;

pub struct ClassSerializer;

impl TypeSerializer for ClassSerializer {
    fn data_type(&self) -> DataType {
        DataType::Class
    }

    fn read_value(&self, buf: &mut dyn Buf, reader: &BinaryReader) -> Result<Value> {
        let name = read_string(buf)?;
        reader.types().resolve(&name).map(Value::Class)
    }

    fn write_value(&self, value: &Value, buf: &mut BytesMut, _writer: &BinaryWriter) -> Result<()> {
        match value {
            Value::Class(descriptor) => write_string(&descriptor.name, buf),
            other => Err(CodecError::mismatch(DataType::Class, other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::io::TypeRegistry;

    #[test]
    fn test_class_roundtrip() {
        let reader = BinaryReader::new();
        let descriptor = reader.types().resolve("java.util.UUID").unwrap();

        let mut buf = BytesMut::new();
        ClassSerializer
            .write_value(&Value::Class(descriptor.clone()), &mut buf, &BinaryWriter)
            .unwrap();

        let mut slice: &[u8] = &buf;
        let decoded = ClassSerializer.read_value(&mut slice, &reader).unwrap();
        assert_eq!(decoded, Value::Class(descriptor));
    }

    #[test]
    fn test_unresolvable_name_is_unknown_type() {
        let mut buf = BytesMut::new();
        write_string("com.example.Missing", &mut buf).unwrap();

        let mut slice: &[u8] = &buf;
        let err = ClassSerializer.read_value(&mut slice, &BinaryReader::new()).unwrap_err();
        assert_eq!(err, CodecError::UnknownType("com.example.Missing".to_string()));
    }

    #[test]
    fn test_resolution_uses_reader_registry() {
        let mut buf = BytesMut::new();
        write_string("x.Custom", &mut buf).unwrap();

        let reader = BinaryReader::with_types(Arc::new(
            TypeRegistry::standard_types().with_type("x.Custom", None),
        ));
        let mut slice: &[u8] = &buf;
        let decoded = ClassSerializer.read_value(&mut slice, &reader).unwrap();
        assert!(matches!(decoded, Value::Class(ref d) if d.name == "x.Custom"));
    }
}
