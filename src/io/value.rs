//! Values carried on the wire.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::DataType;

/// Any value the codec can read or write.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i32),
    Long(i64),
    Short(i16),
    Byte(i8),
    Double(f64),
    Float(f32),
    Boolean(bool),
    String(String),
    Char(char),
    Uuid(Uuid),
    Date(DateTime<Utc>),
    Timestamp(DateTime<Utc>),
    Class(TypeDescriptor),
    List(Vec<Value>),
    Set(Vec<Value>),
    /// Entries in wire order; keys may be any value.
    Map(Vec<(Value, Value)>),
    Metrics(Metrics),
    Bytecode(Bytecode),
    Lambda(Lambda),
}

impl Value {
    /// Wire marker used when this value is written fully-qualified.
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Null => DataType::UnspecifiedNull,
            Value::Int(_) => DataType::Int,
            Value::Long(_) => DataType::Long,
            Value::Short(_) => DataType::Short,
            Value::Byte(_) => DataType::Byte,
            Value::Double(_) => DataType::Double,
            Value::Float(_) => DataType::Float,
            Value::Boolean(_) => DataType::Boolean,
            Value::String(_) => DataType::String,
            Value::Char(_) => DataType::Char,
            Value::Uuid(_) => DataType::Uuid,
            Value::Date(_) => DataType::Date,
            Value::Timestamp(_) => DataType::Timestamp,
            Value::Class(_) => DataType::Class,
            Value::List(_) => DataType::List,
            Value::Set(_) => DataType::Set,
            Value::Map(_) => DataType::Map,
            Value::Metrics(_) => DataType::Metrics,
            Value::Bytecode(_) => DataType::Bytecode,
            Value::Lambda(_) => DataType::Lambda,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integral value widened to `i64` (Byte, Short, Int, Long).
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Byte(v) => Some(v as i64),
            Value::Short(v) => Some(v as i64),
            Value::Int(v) => Some(v as i64),
            Value::Long(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

// ── Type descriptor ────────────────────────────────────────────────

/// A fully-qualified type name that resolved through the `TypeRegistry`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeDescriptor {
    pub name: String,
    /// Wire marker for values of this type, when one exists.
    pub data_type: Option<DataType>,
}

// ── Metrics ────────────────────────────────────────────────────────

/// Execution metrics for one step of a profiled traversal.
///
/// The field order below is the wire order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Metrics {
    pub id: String,
    pub name: String,
    pub duration_ns: i64,
    pub counts: BTreeMap<String, i64>,
    pub annotations: BTreeMap<String, Value>,
    pub nested: Vec<Metrics>,
}

impl Metrics {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_duration(mut self, duration_ns: i64) -> Self {
        self.duration_ns = duration_ns;
        self
    }

    pub fn with_count(mut self, key: impl Into<String>, count: i64) -> Self {
        self.counts.insert(key.into(), count);
        self
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: Value) -> Self {
        self.annotations.insert(key.into(), value);
        self
    }

    pub fn with_nested(mut self, nested: Metrics) -> Self {
        self.nested.push(nested);
        self
    }
}

// ── Bytecode ───────────────────────────────────────────────────────

/// One operator invocation inside bytecode.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub operator: String,
    pub arguments: Vec<Value>,
}

impl Instruction {
    pub fn new(operator: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self { operator: operator.into(), arguments }
    }
}

/// Serialized traversal: source instructions (configure the traversal
/// source) followed by step instructions (the traversal itself).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Bytecode {
    pub source_instructions: Vec<Instruction>,
    pub step_instructions: Vec<Instruction>,
}

impl Bytecode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_source(mut self, operator: impl Into<String>, arguments: Vec<Value>) -> Self {
        self.source_instructions.push(Instruction::new(operator, arguments));
        self
    }

    pub fn add_step(mut self, operator: impl Into<String>, arguments: Vec<Value>) -> Self {
        self.step_instructions.push(Instruction::new(operator, arguments));
        self
    }

    /// Language of the first lambda embedded anywhere in the bytecode,
    /// including nested child traversals.
    pub fn lambda_language(&self) -> Option<&str> {
        self.source_instructions
            .iter()
            .chain(self.step_instructions.iter())
            .flat_map(|i| i.arguments.iter())
            .find_map(lambda_language_of)
    }
}

fn lambda_language_of(value: &Value) -> Option<&str> {
    match value {
        Value::Lambda(lambda) => Some(lambda.language.as_str()),
        Value::Bytecode(child) => child.lambda_language(),
        Value::List(items) | Value::Set(items) => items.iter().find_map(lambda_language_of),
        _ => None,
    }
}

/// Script fragment to be evaluated by a script engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lambda {
    pub language: String,
    pub script: String,
    /// Number of arguments the lambda takes; -1 when unknown.
    pub arguments: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_data_types() {
        assert_eq!(Value::from("x").data_type(), DataType::String);
        assert_eq!(Value::Null.data_type(), DataType::UnspecifiedNull);
        assert_eq!(Value::Metrics(Metrics::default()).data_type(), DataType::Metrics);
    }

    #[test]
    fn test_as_i64_widens_integral_values() {
        assert_eq!(Value::Byte(-3).as_i64(), Some(-3));
        assert_eq!(Value::Int(7).as_i64(), Some(7));
        assert_eq!(Value::Long(1 << 40).as_i64(), Some(1 << 40));
        assert_eq!(Value::Double(1.0).as_i64(), None);
    }

    #[test]
    fn test_lambda_language_absent() {
        let bytecode = Bytecode::new().add_step("V", vec![]).add_step("count", vec![]);
        assert_eq!(bytecode.lambda_language(), None);
    }

    #[test]
    fn test_lambda_language_in_nested_traversal() {
        let lambda = Lambda {
            language: "gremlin-groovy".to_string(),
            script: "it.get()".to_string(),
            arguments: 1,
        };
        let child = Bytecode::new().add_step("map", vec![Value::Lambda(lambda)]);
        let bytecode = Bytecode::new()
            .add_step("V", vec![])
            .add_step("local", vec![Value::Bytecode(child)]);
        assert_eq!(bytecode.lambda_language(), Some("gremlin-groovy"));
    }
}
