//! Request/response envelopes.
//!
//! ```text
//! request:  [0x81][UUID id][STRING op][STRING processor][MAP args]
//! response: [0x81][nullable UUID id][INT code][nullable STRING message]
//!           [MAP attributes][MAP meta][fully-qualified data]
//! ```
//!
//! Fields are bare; the two nullable fields carry a value flag.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::{Buf, BufMut, BytesMut};
use uuid::Uuid;

use crate::error::{CodecError, Result};
use crate::server::message::{
    RequestMessage, ResponseMessage, ResponseResult, ResponseStatus, ResponseStatusCode,
};
use super::buffer::{read_i32, read_u8};
use super::types::map::MapSerializer;
use super::types::string::{read_string, write_string};
use super::{BinaryReader, BinaryWriter, DataType, TypeRegistry, Value, MESSAGE_VERSION};

/// Encodes and decodes whole messages.
#[derive(Debug, Clone, Default)]
pub struct MessageSerializer {
    reader: BinaryReader,
    writer: BinaryWriter,
}

impl MessageSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_types(types: Arc<TypeRegistry>) -> Self {
        Self { reader: BinaryReader::with_types(types), writer: BinaryWriter }
    }

    pub fn serialize_request(&self, request: &RequestMessage) -> Result<BytesMut> {
        let mut buf = BytesMut::new();
        buf.put_u8(MESSAGE_VERSION);
        buf.put_u128(request.request_id.as_u128());
        write_string(&request.op, &mut buf)?;
        write_string(&request.processor, &mut buf)?;
        MapSerializer.write_string_keyed(request.args.iter(), &mut buf, &self.writer)?;
        Ok(buf)
    }

    pub fn deserialize_request(&self, buf: &mut dyn Buf) -> Result<RequestMessage> {
        check_version(buf)?;
        let request_id = match self.reader.read_value(buf, DataType::Uuid, false)? {
            Value::Uuid(id) => id,
            other => return Err(unexpected("request id", &other)),
        };
        let op = read_string(buf)?;
        let processor = read_string(buf)?;
        let args = self.read_map(buf)?;
        Ok(RequestMessage { request_id, op, processor, args })
    }

    pub fn serialize_response(&self, response: &ResponseMessage) -> Result<BytesMut> {
        let mut buf = BytesMut::new();
        buf.put_u8(MESSAGE_VERSION);

        let id = response.request_id.map(Value::Uuid).unwrap_or(Value::Null);
        self.write_nullable(&id, DataType::Uuid, &mut buf)?;
        buf.put_i32(response.status.code.code());
        let message = response.status.message.clone().map(Value::String).unwrap_or(Value::Null);
        self.write_nullable(&message, DataType::String, &mut buf)?;
        MapSerializer.write_string_keyed(response.status.attributes.iter(), &mut buf, &self.writer)?;
        MapSerializer.write_string_keyed(response.result.meta.iter(), &mut buf, &self.writer)?;
        self.writer.write(&response.result.data, &mut buf)?;
        Ok(buf)
    }

    pub fn deserialize_response(&self, buf: &mut dyn Buf) -> Result<ResponseMessage> {
        check_version(buf)?;
        let request_id = match self.reader.read_value(buf, DataType::Uuid, true)? {
            Value::Uuid(id) => Some(id),
            Value::Null => None,
            other => return Err(unexpected("request id", &other)),
        };
        let raw_code = read_i32(buf)?;
        let code = ResponseStatusCode::from_code(raw_code)
            .ok_or_else(|| CodecError::Decode(format!("Unknown status code {}", raw_code)))?;
        let message = match self.reader.read_value(buf, DataType::String, true)? {
            Value::String(message) => Some(message),
            Value::Null => None,
            other => return Err(unexpected("status message", &other)),
        };
        let attributes = self.read_map(buf)?;
        let meta = self.read_map(buf)?;
        let data = self.reader.read(buf)?;

        Ok(ResponseMessage {
            request_id,
            status: ResponseStatus { code, message, attributes },
            result: ResponseResult { data, meta },
        })
    }

    /// Request id of a frame, if it gets that far. Used to address the reply
    /// to a request whose body failed to decode.
    pub fn peek_request_id(&self, bytes: &[u8]) -> Option<Uuid> {
        let mut slice = bytes;
        check_version(&mut slice).ok()?;
        match self.reader.read_value(&mut slice, DataType::Uuid, false).ok()? {
            Value::Uuid(id) => Some(id),
            _ => None,
        }
    }

    fn write_nullable(&self, value: &Value, data_type: DataType, buf: &mut BytesMut) -> Result<()> {
        if !value.is_null() && value.data_type() != data_type {
            return Err(CodecError::mismatch(data_type, value));
        }
        self.writer.write_value(value, buf, true)
    }

    fn read_map(&self, buf: &mut dyn Buf) -> Result<HashMap<String, Value>> {
        Ok(MapSerializer.read_string_keyed(buf, &self.reader)?.into_iter().collect())
    }
}

fn check_version(buf: &mut dyn Buf) -> Result<()> {
    match read_u8(buf)? {
        MESSAGE_VERSION => Ok(()),
        other => Err(CodecError::Decode(format!(
            "Unsupported message version 0x{:02x}",
            other
        ))),
    }
}

fn unexpected(field: &str, value: &Value) -> CodecError {
    CodecError::Decode(format!("Unexpected {:?} for {}", value.data_type(), field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{Bytecode, Metrics};

    #[test]
    fn test_request_roundtrip() {
        let bytecode = Bytecode::new().add_step("V", vec![]).add_step("count", vec![]);
        let request = RequestMessage::build("bytecode")
            .processor("traversal")
            .add_arg("gremlin", Value::Bytecode(bytecode))
            .add_arg("aliases", Value::Map(vec![(Value::from("g"), Value::from("g"))]))
            .add_arg("batchSize", 16)
            .create();

        let serializer = MessageSerializer::new();
        let bytes = serializer.serialize_request(&request).unwrap();
        assert_eq!(bytes[0], MESSAGE_VERSION);
        assert_eq!(&bytes[1..17], request.request_id.as_bytes());

        let mut slice: &[u8] = &bytes;
        assert_eq!(serializer.deserialize_request(&mut slice).unwrap(), request);
        assert!(slice.is_empty());
    }

    #[test]
    fn test_response_roundtrip() {
        let mut meta = HashMap::new();
        meta.insert("sideEffectKey".to_string(), Value::from("a"));
        let response = ResponseMessage::build_for(Some(Uuid::new_v4()))
            .code(ResponseStatusCode::PartialContent)
            .status_message("more to come")
            .result(Value::List(vec![Value::Metrics(Metrics::new("0", "GraphStep"))]))
            .response_meta_data(meta)
            .create();

        let serializer = MessageSerializer::new();
        let bytes = serializer.serialize_response(&response).unwrap();
        let mut slice: &[u8] = &bytes;
        assert_eq!(serializer.deserialize_response(&mut slice).unwrap(), response);
    }

    #[test]
    fn test_response_without_id_or_message() {
        let response = ResponseMessage::build_for(None)
            .code(ResponseStatusCode::RequestErrorMalformedRequest)
            .create();
        let serializer = MessageSerializer::new();
        let bytes = serializer.serialize_response(&response).unwrap();
        // version, null flag, status code
        assert_eq!(&bytes[..2], &[MESSAGE_VERSION, crate::io::VALUE_FLAG_NULL]);
        assert_eq!(&bytes[2..6], &498i32.to_be_bytes());

        let mut slice: &[u8] = &bytes;
        let decoded = serializer.deserialize_response(&mut slice).unwrap();
        assert_eq!(decoded.request_id, None);
        assert_eq!(decoded.status.message, None);
    }

    #[test]
    fn test_wrong_version_rejected() {
        let request = RequestMessage::build("keys").create();
        let serializer = MessageSerializer::new();
        let mut bytes = serializer.serialize_request(&request).unwrap();
        bytes[0] = 0x80;
        let mut slice: &[u8] = &bytes;
        assert!(matches!(
            serializer.deserialize_request(&mut slice),
            Err(CodecError::Decode(_))
        ));
    }

    #[test]
    fn test_peek_request_id_on_truncated_frame() {
        let request = RequestMessage::build("close").add_arg("sideEffect", Uuid::new_v4()).create();
        let serializer = MessageSerializer::new();
        let bytes = serializer.serialize_request(&request).unwrap();

        let truncated = &bytes[..20];
        let mut slice: &[u8] = truncated;
        assert!(serializer.deserialize_request(&mut slice).is_err());
        assert_eq!(serializer.peek_request_id(truncated), Some(request.request_id));
        assert_eq!(serializer.peek_request_id(&[MESSAGE_VERSION, 1, 2]), None);
    }
}
