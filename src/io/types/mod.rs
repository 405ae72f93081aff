//! Per-type serializers.
//!
//! Each serializer is a stateless `{read_value, write_value}` pair for one
//! marker. `serializer_for` is the registry: an exhaustive match over
//! `DataType`, so every marker has exactly one serializer and adding a type
//! means adding a marker and an arm here.

use bytes::{Buf, BytesMut};

use crate::error::Result;
use super::{BinaryReader, BinaryWriter, DataType, Value};

pub mod bytecode;
pub mod character;
pub mod class;
pub mod collection;
pub mod date;
pub mod map;
pub mod metrics;
pub mod primitive;
pub mod string;

pub use self::bytecode::{BytecodeSerializer, LambdaSerializer};
pub use self::character::CharSerializer;
pub use self::class::ClassSerializer;
pub use self::collection::CollectionSerializer;
pub use self::date::DateSerializer;
pub use self::map::MapSerializer;
pub use self::metrics::MetricsSerializer;
pub use self::primitive::{
    BooleanSerializer, ByteSerializer, DoubleSerializer, FloatSerializer, IntSerializer,
    LongSerializer, ShortSerializer, UuidSerializer,
};
pub use self::string::StringSerializer;

/// Payload codec for one wire type. Markers and value flags are handled by
/// `BinaryReader`/`BinaryWriter`; implementations see only the payload.
pub trait TypeSerializer: Sync {
    fn data_type(&self) -> DataType;

    fn read_value(&self, buf: &mut dyn Buf, reader: &BinaryReader) -> Result<Value>;

    fn write_value(&self, value: &Value, buf: &mut BytesMut, writer: &BinaryWriter) -> Result<()>;
}

static INT: IntSerializer = IntSerializer;
static LONG: LongSerializer = LongSerializer;
static SHORT: ShortSerializer = ShortSerializer;
static BYTE: ByteSerializer = ByteSerializer;
static DOUBLE: DoubleSerializer = DoubleSerializer;
static FLOAT: FloatSerializer = FloatSerializer;
static BOOLEAN: BooleanSerializer = BooleanSerializer;
static UUID: UuidSerializer = UuidSerializer;
static STRING: StringSerializer = StringSerializer;
static CHAR: CharSerializer = CharSerializer;
static CLASS: ClassSerializer = ClassSerializer;
static DATE: DateSerializer = DateSerializer::DATE;
static TIMESTAMP: DateSerializer = DateSerializer::TIMESTAMP;
static LIST: CollectionSerializer = CollectionSerializer::LIST;
static SET: CollectionSerializer = CollectionSerializer::SET;
static MAP: MapSerializer = MapSerializer;
static METRICS: MetricsSerializer = MetricsSerializer;
static BYTECODE: BytecodeSerializer = BytecodeSerializer;
static LAMBDA: LambdaSerializer = LambdaSerializer;

/// The serializer registered for `data_type`. `None` only for the untyped
/// null marker, which has no payload.
pub fn serializer_for(data_type: DataType) -> Option<&'static dyn TypeSerializer> {
    let serializer: &'static dyn TypeSerializer = match data_type {
        DataType::Int => &INT,
        DataType::Long => &LONG,
        DataType::Short => &SHORT,
        DataType::Byte => &BYTE,
        DataType::Double => &DOUBLE,
        DataType::Float => &FLOAT,
        DataType::Boolean => &BOOLEAN,
        DataType::Uuid => &UUID,
        DataType::String => &STRING,
        DataType::Char => &CHAR,
        DataType::Class => &CLASS,
        DataType::Date => &DATE,
        DataType::Timestamp => &TIMESTAMP,
        DataType::List => &LIST,
        DataType::Set => &SET,
        DataType::Map => &MAP,
        DataType::Metrics => &METRICS,
        DataType::Bytecode => &BYTECODE,
        DataType::Lambda => &LAMBDA,
        DataType::UnspecifiedNull => return None,
    };
    Some(serializer)
}
