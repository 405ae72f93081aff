//! METRICS: profiling data for one traversal step, recursive.
//!
//! ```text
//! [STRING id][STRING name][LONG duration_ns]
//! [MAP<STRING, LONG> counts][MAP<STRING, any> annotations]
//! [LIST<METRICS> nested]
//! ```
//!
//! All six fields are bare (no marker, not nullable). `nested` uses the
//! generic list payload with fully-qualified METRICS items rather than a
//! dedicated wire type.

use std::collections::BTreeMap;

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{CodecError, Result};
use crate::io::buffer::{length_to_i32, read_i64};
use crate::io::{BinaryReader, BinaryWriter, DataType, Metrics, Value};
use super::collection::CollectionSerializer;
use super::map::MapSerializer;
use super::string::{read_string, write_string};
use super::TypeSerializer;

pub struct MetricsSerializer;

impl MetricsSerializer {
    pub fn read_metrics(&self, buf: &mut dyn Buf, reader: &BinaryReader) -> Result<Metrics> {
        let id = read_string(buf)?;
        let name = read_string(buf)?;
        let duration_ns = read_i64(buf)?;

        let counts = MapSerializer
            .read_string_keyed(buf, reader)?
            .into_iter()
            .map(|(key, count)| match count.as_i64() {
                Some(count) => Ok((key, count)),
                None => Err(CodecError::Decode(format!(
                    "Metrics count '{}' is not integral: {:?}",
                    key,
                    count.data_type()
                ))),
            })
            .collect::<Result<BTreeMap<_, _>>>()?;

        let annotations: BTreeMap<String, Value> =
            MapSerializer.read_string_keyed(buf, reader)?.into_iter().collect();

        let nested = CollectionSerializer::LIST
            .read_items(buf, reader)?
            .into_iter()
            .map(|item| match item {
                Value::Metrics(child) => Ok(child),
                other => Err(CodecError::Decode(format!(
                    "Nested metrics entry has type {:?}",
                    other.data_type()
                ))),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Metrics { id, name, duration_ns, counts, annotations, nested })
    }

    pub fn write_metrics(&self, metrics: &Metrics, buf: &mut BytesMut, writer: &BinaryWriter) -> Result<()> {
        write_string(&metrics.id, buf)?;
        write_string(&metrics.name, buf)?;
        buf.put_i64(metrics.duration_ns);

        let counts: Vec<(String, Value)> = metrics
            .counts
            .iter()
            .map(|(key, &count)| (key.clone(), Value::Long(count)))
            .collect();
        MapSerializer.write_string_keyed(counts.iter().map(|(k, v)| (k, v)), buf, writer)?;

        MapSerializer.write_string_keyed(metrics.annotations.iter(), buf, writer)?;

        // Same bytes as CollectionSerializer::LIST.write_items over
        // Value::Metrics items, without cloning the subtree into values.
        buf.put_i32(length_to_i32(metrics.nested.len())?);
        for child in &metrics.nested {
            buf.put_u8(DataType::Metrics.code());
            buf.put_u8(crate::io::VALUE_FLAG_NONE);
            self.write_metrics(child, buf, writer)?;
        }
        Ok(())
    }
}

impl TypeSerializer for MetricsSerializer {
    fn data_type(&self) -> DataType {
        DataType::Metrics
    }

    fn read_value(&self, buf: &mut dyn Buf, reader: &BinaryReader) -> Result<Value> {
        self.read_metrics(buf, reader).map(Value::Metrics)
    }

    fn write_value(&self, value: &Value, buf: &mut BytesMut, writer: &BinaryWriter) -> Result<()> {
        match value {
            Value::Metrics(metrics) => self.write_metrics(metrics, buf, writer),
            other => Err(CodecError::mismatch(DataType::Metrics, other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(metrics: &Metrics) -> Metrics {
        let mut buf = BytesMut::new();
        MetricsSerializer.write_metrics(metrics, &mut buf, &BinaryWriter).unwrap();
        let mut slice: &[u8] = &buf;
        let decoded = MetricsSerializer.read_metrics(&mut slice, &BinaryReader::new()).unwrap();
        assert!(slice.is_empty(), "trailing bytes after metrics");
        decoded
    }

    #[test]
    fn test_empty_metrics_layout() {
        let mut buf = BytesMut::new();
        MetricsSerializer
            .write_metrics(&Metrics::new("7.0.0()", "GraphStep"), &mut buf, &BinaryWriter)
            .unwrap();

        let mut expected = Vec::new();
        expected.extend_from_slice(&7i32.to_be_bytes());
        expected.extend_from_slice(b"7.0.0()");
        expected.extend_from_slice(&9i32.to_be_bytes());
        expected.extend_from_slice(b"GraphStep");
        expected.extend_from_slice(&0i64.to_be_bytes()); // duration
        expected.extend_from_slice(&0i32.to_be_bytes()); // counts
        expected.extend_from_slice(&0i32.to_be_bytes()); // annotations
        expected.extend_from_slice(&0i32.to_be_bytes()); // nested
        assert_eq!(&buf[..], &expected[..]);
    }

    #[test]
    fn test_counts_are_long_entries() {
        let metrics = Metrics::new("a", "b").with_count("traverserCount", 4);
        let mut buf = BytesMut::new();
        MetricsSerializer.write_metrics(&metrics, &mut buf, &BinaryWriter).unwrap();

        // id(4+1) name(4+1) duration(8) count-len(4) then key marker
        let counts_entry = &buf[22..];
        assert_eq!(counts_entry[0], DataType::String.code());
        let value_marker_at = 2 + 4 + "traverserCount".len();
        assert_eq!(counts_entry[value_marker_at], DataType::Long.code());
    }

    #[test]
    fn test_full_roundtrip_with_nesting() {
        let leaf = Metrics::new("2.0.0()", "CountGlobalStep")
            .with_duration(1_250)
            .with_count("elementCount", 1);
        let middle = Metrics::new("1.0.0()", "VertexStep")
            .with_duration(98_000)
            .with_count("traverserCount", 12)
            .with_count("elementCount", 12)
            .with_annotation("percentDur", Value::Double(37.5))
            .with_nested(leaf.clone())
            .with_nested(leaf);
        let root = Metrics::new("0.0.0()", "GraphStep(vertex,[])")
            .with_duration(i64::MAX)
            .with_annotation("note", Value::from("root"))
            .with_annotation("empty", Value::Null)
            .with_nested(middle);

        assert_eq!(roundtrip(&root), root);
    }

    #[test]
    fn test_deep_nesting_preserves_order() {
        let mut metrics = Metrics::new("leaf", "leaf");
        for depth in 0..32 {
            metrics = Metrics::new(format!("n{}", depth), "step")
                .with_nested(Metrics::new("first", "first"))
                .with_nested(metrics);
        }
        let decoded = roundtrip(&metrics);
        assert_eq!(decoded, metrics);
        assert_eq!(decoded.nested[0].id, "first");
    }

    #[test]
    fn test_int_counts_widen_to_long() {
        let mut buf = BytesMut::new();
        write_string("id", &mut buf).unwrap();
        write_string("name", &mut buf).unwrap();
        buf.put_i64(5);
        MapSerializer
            .write_entries(
                [(&Value::from("c"), &Value::Int(3))].into_iter(),
                &mut buf,
                &BinaryWriter,
            )
            .unwrap();
        buf.put_i32(0);
        buf.put_i32(0);

        let mut slice: &[u8] = &buf;
        let decoded = MetricsSerializer.read_metrics(&mut slice, &BinaryReader::new()).unwrap();
        assert_eq!(decoded.counts.get("c"), Some(&3));
    }

    #[test]
    fn test_non_metrics_nested_item_rejected() {
        let mut buf = BytesMut::new();
        write_string("id", &mut buf).unwrap();
        write_string("name", &mut buf).unwrap();
        buf.put_i64(0);
        buf.put_i32(0);
        buf.put_i32(0);
        CollectionSerializer::LIST
            .write_items(&[Value::from("oops")], &mut buf, &BinaryWriter)
            .unwrap();

        let mut slice: &[u8] = &buf;
        let err = MetricsSerializer.read_metrics(&mut slice, &BinaryReader::new()).unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
    }

    #[test]
    fn test_truncated_metrics_underflows() {
        let metrics = Metrics::new("id", "name").with_count("x", 1);
        let mut buf = BytesMut::new();
        MetricsSerializer.write_metrics(&metrics, &mut buf, &BinaryWriter).unwrap();

        let mut slice: &[u8] = &buf[..buf.len() - 3];
        let err = MetricsSerializer.read_metrics(&mut slice, &BinaryReader::new()).unwrap_err();
        assert!(matches!(err, CodecError::BufferUnderflow { .. }));
    }
}
