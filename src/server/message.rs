//! Request and response envelopes.

use std::collections::HashMap;

use uuid::Uuid;

use crate::io::Value;

/// Status codes carried on responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseStatusCode {
    Success,
    NoContent,
    PartialContent,
    RequestErrorMalformedRequest,
    RequestErrorInvalidRequestArguments,
    ServerError,
    ServerErrorTimeout,
    ServerErrorSerialization,
}

impl ResponseStatusCode {
    pub fn code(self) -> i32 {
        match self {
            Self::Success => 200,
            Self::NoContent => 204,
            Self::PartialContent => 206,
            Self::RequestErrorMalformedRequest => 498,
            Self::RequestErrorInvalidRequestArguments => 499,
            Self::ServerError => 500,
            Self::ServerErrorTimeout => 598,
            Self::ServerErrorSerialization => 599,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            200 => Some(Self::Success),
            204 => Some(Self::NoContent),
            206 => Some(Self::PartialContent),
            498 => Some(Self::RequestErrorMalformedRequest),
            499 => Some(Self::RequestErrorInvalidRequestArguments),
            500 => Some(Self::ServerError),
            598 => Some(Self::ServerErrorTimeout),
            599 => Some(Self::ServerErrorSerialization),
            _ => None,
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, Self::Success | Self::NoContent | Self::PartialContent)
    }

    /// Whether this is the last response the client receives for a request.
    pub fn is_final(self) -> bool {
        self != Self::PartialContent
    }
}

/// A client request. Argument keys are case-sensitive.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestMessage {
    pub request_id: Uuid,
    pub op: String,
    pub processor: String,
    pub args: HashMap<String, Value>,
}

impl RequestMessage {
    /// Start a request for `op` with a fresh random id.
    pub fn build(op: impl Into<String>) -> RequestMessageBuilder {
        RequestMessageBuilder {
            message: RequestMessage {
                request_id: Uuid::new_v4(),
                op: op.into(),
                processor: String::new(),
                args: HashMap::new(),
            },
        }
    }

    pub fn arg(&self, key: &str) -> Option<&Value> {
        self.args.get(key)
    }
}

pub struct RequestMessageBuilder {
    message: RequestMessage,
}

impl RequestMessageBuilder {
    pub fn request_id(mut self, request_id: Uuid) -> Self {
        self.message.request_id = request_id;
        self
    }

    pub fn processor(mut self, processor: impl Into<String>) -> Self {
        self.message.processor = processor.into();
        self
    }

    pub fn add_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.message.args.insert(key.into(), value.into());
        self
    }

    pub fn create(self) -> RequestMessage {
        self.message
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseStatus {
    pub code: ResponseStatusCode,
    pub message: Option<String>,
    pub attributes: HashMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseResult {
    pub data: Value,
    pub meta: HashMap<String, Value>,
}

/// A server response. `request_id` is `None` only for replies to frames
/// that could not be decoded far enough to read an id.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseMessage {
    pub request_id: Option<Uuid>,
    pub status: ResponseStatus,
    pub result: ResponseResult,
}

impl ResponseMessage {
    pub fn build(request: &RequestMessage) -> ResponseMessageBuilder {
        Self::build_for(Some(request.request_id))
    }

    pub fn build_for(request_id: Option<Uuid>) -> ResponseMessageBuilder {
        ResponseMessageBuilder {
            message: ResponseMessage {
                request_id,
                status: ResponseStatus {
                    code: ResponseStatusCode::Success,
                    message: None,
                    attributes: HashMap::new(),
                },
                result: ResponseResult {
                    data: Value::Null,
                    meta: HashMap::new(),
                },
            },
        }
    }

    pub fn code(&self) -> ResponseStatusCode {
        self.status.code
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status.message.as_deref()
    }
}

pub struct ResponseMessageBuilder {
    message: ResponseMessage,
}

impl ResponseMessageBuilder {
    pub fn code(mut self, code: ResponseStatusCode) -> Self {
        self.message.status.code = code;
        self
    }

    pub fn status_message(mut self, message: impl Into<String>) -> Self {
        self.message.status.message = Some(message.into());
        self
    }

    pub fn status_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.message.status.attributes.insert(key.into(), value);
        self
    }

    pub fn result(mut self, data: Value) -> Self {
        self.message.result.data = data;
        self
    }

    pub fn response_meta_data(mut self, meta: HashMap<String, Value>) -> Self {
        self.message.result.meta = meta;
        self
    }

    pub fn create(self) -> ResponseMessage {
        self.message
    }
}
