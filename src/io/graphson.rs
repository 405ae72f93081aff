//! Textual bytecode: the GraphSON 2.0 `g:Bytecode` subset.
//!
//! ```text
//! {"@type":"g:Bytecode","@value":{"step":[["V"],["has","name","marko"]],"source":[...]}}
//! ```
//!
//! Instruction arguments may be plain JSON (strings, booleans, numbers, arrays,
//! objects) or typed `{"@type": ..., "@value": ...}` wrappers for the value
//! types this crate models.

use chrono::{DateTime, Utc};
use serde_json::{Map as JsonMap, Value as Json};
use uuid::Uuid;

use crate::error::{CodecError, Result};
use super::{Bytecode, Instruction, Lambda, TypeRegistry, Value};

const TYPE_KEY: &str = "@type";
const VALUE_KEY: &str = "@value";

/// Parse a GraphSON bytecode document.
pub fn parse_bytecode(text: &str) -> Result<Bytecode> {
    let json: Json = serde_json::from_str(text)
        .map_err(|e| CodecError::Decode(format!("Invalid GraphSON: {}", e)))?;
    match from_json(&json, &TypeRegistry::standard())? {
        Value::Bytecode(bytecode) => Ok(bytecode),
        other => Err(CodecError::Decode(format!(
            "Expected g:Bytecode, found {:?}",
            other.data_type()
        ))),
    }
}

/// Convert one GraphSON node into a value.
pub fn from_json(json: &Json, types: &TypeRegistry) -> Result<Value> {
    match json {
        Json::Null => Ok(Value::Null),
        Json::Bool(b) => Ok(Value::Boolean(*b)),
        Json::String(s) => Ok(Value::String(s.clone())),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i32::try_from(i).map(Value::Int).unwrap_or(Value::Long(i)))
            } else {
                n.as_f64()
                    .map(Value::Double)
                    .ok_or_else(|| CodecError::Decode(format!("Unrepresentable number {}", n)))
            }
        }
        Json::Array(items) => items
            .iter()
            .map(|item| from_json(item, types))
            .collect::<Result<Vec<_>>>()
            .map(Value::List),
        Json::Object(object) => match (object.get(TYPE_KEY), object.get(VALUE_KEY)) {
            (Some(Json::String(type_name)), Some(inner)) if object.len() == 2 => {
                typed_from_json(type_name, inner, types)
            }
            _ => object
                .iter()
                .map(|(k, v)| Ok((Value::String(k.clone()), from_json(v, types)?)))
                .collect::<Result<Vec<_>>>()
                .map(Value::Map),
        },
    }
}

fn typed_from_json(type_name: &str, inner: &Json, types: &TypeRegistry) -> Result<Value> {
    match type_name {
        "g:Int32" => integer(type_name, inner).and_then(|i| {
            i32::try_from(i)
                .map(Value::Int)
                .map_err(|_| CodecError::Decode(format!("g:Int32 out of range: {}", i)))
        }),
        "g:Int64" => integer(type_name, inner).map(Value::Long),
        "g:Double" => float(type_name, inner).map(Value::Double),
        "g:Float" => float(type_name, inner).map(|f| Value::Float(f as f32)),
        "g:UUID" => Uuid::parse_str(string(type_name, inner)?)
            .map(Value::Uuid)
            .map_err(|e| CodecError::Decode(format!("Invalid g:UUID: {}", e))),
        "g:Date" | "g:Timestamp" => {
            let millis = integer(type_name, inner)?;
            let at = DateTime::<Utc>::from_timestamp_millis(millis)
                .ok_or_else(|| CodecError::Decode(format!("{} out of range: {}", type_name, millis)))?;
            Ok(if type_name == "g:Date" { Value::Date(at) } else { Value::Timestamp(at) })
        }
        "g:Class" => types.resolve(string(type_name, inner)?).map(Value::Class),
        "g:List" | "g:Set" => {
            let Json::Array(items) = inner else {
                return Err(shape(type_name, "an array"));
            };
            let items = items
                .iter()
                .map(|item| from_json(item, types))
                .collect::<Result<Vec<_>>>()?;
            Ok(if type_name == "g:List" { Value::List(items) } else { Value::Set(items) })
        }
        "g:Map" => map_from_json(inner, types),
        "g:Lambda" => lambda_from_json(inner),
        "g:Bytecode" => bytecode_from_json(inner, types).map(Value::Bytecode),
        other => Err(CodecError::UnknownType(other.to_string())),
    }
}

/// `g:Map` values are a flat array of alternating keys and values.
fn map_from_json(inner: &Json, types: &TypeRegistry) -> Result<Value> {
    let Json::Array(flat) = inner else {
        return Err(shape("g:Map", "an array"));
    };
    if flat.len() % 2 != 0 {
        return Err(CodecError::Decode("g:Map has an odd number of elements".to_string()));
    }
    flat.chunks(2)
        .map(|pair| Ok((from_json(&pair[0], types)?, from_json(&pair[1], types)?)))
        .collect::<Result<Vec<_>>>()
        .map(Value::Map)
}

fn lambda_from_json(inner: &Json) -> Result<Value> {
    let Json::Object(object) = inner else {
        return Err(shape("g:Lambda", "an object"));
    };
    let field = |name: &str| -> Result<String> {
        object
            .get(name)
            .and_then(Json::as_str)
            .map(str::to_string)
            .ok_or_else(|| CodecError::Decode(format!("g:Lambda is missing '{}'", name)))
    };
    let arguments = match object.get("arguments") {
        None => -1,
        Some(json) => integer("g:Lambda", json).and_then(|n| {
            i32::try_from(n).map_err(|_| CodecError::Decode(format!("Lambda arguments out of range: {}", n)))
        })?,
    };
    Ok(Value::Lambda(Lambda {
        language: field("language")?,
        script: field("script")?,
        arguments,
    }))
}

fn bytecode_from_json(inner: &Json, types: &TypeRegistry) -> Result<Bytecode> {
    let Json::Object(object) = inner else {
        return Err(shape("g:Bytecode", "an object"));
    };
    Ok(Bytecode {
        source_instructions: instructions(object, "source", types)?,
        step_instructions: instructions(object, "step", types)?,
    })
}

fn instructions(object: &JsonMap<String, Json>, field: &str, types: &TypeRegistry) -> Result<Vec<Instruction>> {
    let Some(list) = object.get(field) else {
        return Ok(Vec::new());
    };
    let Json::Array(list) = list else {
        return Err(shape(field, "an array"));
    };

    list.iter()
        .map(|entry| {
            let Some((Json::String(operator), args)) = entry.as_array().and_then(|a| a.split_first()) else {
                return Err(CodecError::Decode(format!(
                    "Each '{}' instruction must be an array starting with the operator name",
                    field
                )));
            };
            let arguments = args
                .iter()
                .map(|arg| from_json(arg, types))
                .collect::<Result<Vec<_>>>()?;
            Ok(Instruction::new(operator.clone(), arguments))
        })
        .collect()
}

fn integer(type_name: &str, json: &Json) -> Result<i64> {
    json.as_i64().ok_or_else(|| shape(type_name, "an integer"))
}

fn float(type_name: &str, json: &Json) -> Result<f64> {
    json.as_f64().ok_or_else(|| shape(type_name, "a number"))
}

fn string<'a>(type_name: &str, json: &'a Json) -> Result<&'a str> {
    json.as_str().ok_or_else(|| shape(type_name, "a string"))
}

fn shape(type_name: &str, expected: &str) -> CodecError {
    CodecError::Decode(format!("{} value must be {}", type_name, expected))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_bytecode() {
        let bytecode = parse_bytecode(
            r#"{"@type":"g:Bytecode","@value":{"step":[["V"],["has","name","marko"],["count"]]}}"#,
        )
        .unwrap();
        assert!(bytecode.source_instructions.is_empty());
        assert_eq!(bytecode.step_instructions.len(), 3);
        assert_eq!(bytecode.step_instructions[1].operator, "has");
        assert_eq!(
            bytecode.step_instructions[1].arguments,
            vec![Value::from("name"), Value::from("marko")]
        );
    }

    #[test]
    fn test_typed_arguments() {
        let bytecode = parse_bytecode(
            r#"{"@type":"g:Bytecode","@value":{
                "source":[["withSideEffect","x",{"@type":"g:Int64","@value":7}]],
                "step":[["V",{"@type":"g:Int32","@value":1}],
                        ["is",{"@type":"g:Double","@value":1.5}],
                        ["has","id",{"@type":"g:UUID","@value":"41d2e28a-20a4-4ab0-b379-d810dede3786"}],
                        ["has","created",{"@type":"g:Date","@value":1481750076295}]]}}"#,
        )
        .unwrap();
        assert_eq!(bytecode.source_instructions[0].arguments[1], Value::Long(7));
        assert_eq!(bytecode.step_instructions[0].arguments[0], Value::Int(1));
        assert_eq!(bytecode.step_instructions[1].arguments[0], Value::Double(1.5));
        assert!(matches!(bytecode.step_instructions[2].arguments[1], Value::Uuid(_)));
        assert_eq!(
            bytecode.step_instructions[3].arguments[1],
            Value::Date(DateTime::<Utc>::from_timestamp_millis(1481750076295).unwrap())
        );
    }

    #[test]
    fn test_plain_numbers_narrow_to_int() {
        let types = TypeRegistry::standard();
        assert_eq!(from_json(&serde_json::json!(5), &types).unwrap(), Value::Int(5));
        assert_eq!(
            from_json(&serde_json::json!(5_000_000_000i64), &types).unwrap(),
            Value::Long(5_000_000_000)
        );
    }

    #[test]
    fn test_lambda_argument() {
        let bytecode = parse_bytecode(
            r#"{"@type":"g:Bytecode","@value":{"step":[["V"],["map",
                {"@type":"g:Lambda","@value":{"script":"it.get()","language":"gremlin-groovy","arguments":1}}]]}}"#,
        )
        .unwrap();
        assert_eq!(bytecode.lambda_language(), Some("gremlin-groovy"));
    }

    #[test]
    fn test_map_and_class() {
        let types = TypeRegistry::standard();
        let json = serde_json::json!({"@type":"g:Map","@value":["a",{"@type":"g:Class","@value":"java.lang.String"}]});
        let Value::Map(entries) = from_json(&json, &types).unwrap() else {
            panic!("expected map");
        };
        assert_eq!(entries[0].0, Value::from("a"));
        assert!(matches!(entries[0].1, Value::Class(_)));
    }

    #[test]
    fn test_rejects_unknown_type_and_bad_shapes() {
        assert!(matches!(
            parse_bytecode(r#"{"@type":"g:Vertex","@value":{}}"#),
            Err(CodecError::UnknownType(_))
        ));
        assert!(matches!(parse_bytecode("not json"), Err(CodecError::Decode(_))));
        assert!(matches!(
            parse_bytecode(r#"{"@type":"g:Bytecode","@value":{"step":[[1]]}}"#),
            Err(CodecError::Decode(_))
        ));
        assert!(matches!(parse_bytecode(r#""g.V()""#), Err(CodecError::Decode(_))));
    }
}
