//! Type-tagged binary codec.
//!
//! Every fully-qualified value is written as
//!
//! ```text
//! [marker: u8][value_flag: u8][payload]
//! ```
//!
//! where the marker is a `DataType` and the value flag is `0x00` (payload
//! follows) or `0x01` (null, no payload). Composite types embed their fields
//! as bare payloads when the field type is fixed by position. Multi-byte
//! numbers are big-endian throughout.
//!
//! ```
//! use gremlin_op::io::{BinaryReader, BinaryWriter, Value};
//!
//! let bytes = BinaryWriter::new().to_bytes(&Value::from("marko")).unwrap();
//! let value = BinaryReader::new().read(&mut &bytes[..]).unwrap();
//! assert_eq!(value, Value::from("marko"));
//! ```

pub mod buffer;
pub mod data_type;
pub mod graphson;
pub mod message;
pub mod reader;
pub mod type_registry;
pub mod types;
pub mod value;
pub mod writer;

pub use data_type::{DataType, MESSAGE_VERSION, VALUE_FLAG_NONE, VALUE_FLAG_NULL};
pub use message::MessageSerializer;
pub use reader::BinaryReader;
pub use type_registry::TypeRegistry;
pub use value::{Bytecode, Instruction, Lambda, Metrics, TypeDescriptor, Value};
pub use writer::BinaryWriter;
