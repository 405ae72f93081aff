//! Closed registry of type names that CLASS values may carry.
//!
//! A class descriptor on the wire is a fully-qualified type name. Decoding
//! resolves that name here; names are never loaded dynamically, and an
//! unknown name fails with `UnknownType`.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::error::{CodecError, Result};
use super::{DataType, TypeDescriptor};

/// Names understood by every peer, with the marker of their values.
const STANDARD_TYPES: &[(&str, Option<DataType>)] = &[
    ("java.lang.Integer", Some(DataType::Int)),
    ("java.lang.Long", Some(DataType::Long)),
    ("java.lang.Short", Some(DataType::Short)),
    ("java.lang.Byte", Some(DataType::Byte)),
    ("java.lang.Double", Some(DataType::Double)),
    ("java.lang.Float", Some(DataType::Float)),
    ("java.lang.Boolean", Some(DataType::Boolean)),
    ("java.lang.String", Some(DataType::String)),
    ("java.lang.Character", Some(DataType::Char)),
    ("java.lang.Class", Some(DataType::Class)),
    ("java.lang.Object", None),
    ("java.util.UUID", Some(DataType::Uuid)),
    ("java.util.Date", Some(DataType::Date)),
    ("java.sql.Timestamp", Some(DataType::Timestamp)),
    ("java.util.List", Some(DataType::List)),
    ("java.util.ArrayList", Some(DataType::List)),
    ("java.util.Set", Some(DataType::Set)),
    ("java.util.HashSet", Some(DataType::Set)),
    ("java.util.LinkedHashSet", Some(DataType::Set)),
    ("java.util.Map", Some(DataType::Map)),
    ("java.util.HashMap", Some(DataType::Map)),
    ("java.util.LinkedHashMap", Some(DataType::Map)),
    ("org.apache.tinkerpop.gremlin.process.traversal.Bytecode", Some(DataType::Bytecode)),
    ("org.apache.tinkerpop.gremlin.util.function.Lambda", Some(DataType::Lambda)),
    ("org.apache.tinkerpop.gremlin.process.traversal.util.Metrics", Some(DataType::Metrics)),
    ("org.apache.tinkerpop.gremlin.process.traversal.util.MutableMetrics", Some(DataType::Metrics)),
    ("org.apache.tinkerpop.gremlin.process.traversal.util.ImmutableMetrics", Some(DataType::Metrics)),
    ("org.apache.tinkerpop.gremlin.structure.Vertex", None),
    ("org.apache.tinkerpop.gremlin.structure.Edge", None),
    ("org.apache.tinkerpop.gremlin.structure.VertexProperty", None),
    ("org.apache.tinkerpop.gremlin.structure.Property", None),
];

/// Registry mapping type names to descriptors.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: HashMap<String, Option<DataType>>,
}

impl TypeRegistry {
    /// Empty registry. Every lookup fails until types are added.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry of standard names.
    pub fn standard() -> Arc<TypeRegistry> {
        static STANDARD: OnceLock<Arc<TypeRegistry>> = OnceLock::new();
        STANDARD
            .get_or_init(|| Arc::new(Self::standard_types()))
            .clone()
    }

    /// A fresh copy of the standard names, to extend with `with_type`.
    pub fn standard_types() -> TypeRegistry {
        STANDARD_TYPES
            .iter()
            .fold(TypeRegistry::new(), |registry, &(name, dt)| registry.with_type(name, dt))
    }

    /// Add a name. Registration happens while building the registry only;
    /// a shared registry is never mutated.
    pub fn with_type(mut self, name: impl Into<String>, data_type: Option<DataType>) -> Self {
        self.types.insert(name.into(), data_type);
        self
    }

    pub fn resolve(&self, name: &str) -> Result<TypeDescriptor> {
        self.types
            .get(name)
            .map(|&data_type| TypeDescriptor { name: name.to_string(), data_type })
            .ok_or_else(|| CodecError::UnknownType(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
