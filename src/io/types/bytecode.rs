//! BYTECODE and LAMBDA.
//!
//! ```text
//! BYTECODE: [i32 steps]([STRING op][i32 n][fq arg]{n})* [i32 sources](same)*
//! LAMBDA:   [STRING language][STRING script][i32 arguments]
//! ```

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{CodecError, Result};
use crate::io::buffer::{length_to_i32, read_i32, read_length};
use crate::io::{BinaryReader, BinaryWriter, Bytecode, DataType, Instruction, Lambda, Value};
use super::string::{read_string, write_string};
use super::TypeSerializer;

pub struct BytecodeSerializer;
pub struct LambdaSerializer;

fn read_instructions(buf: &mut dyn Buf, reader: &BinaryReader) -> Result<Vec<Instruction>> {
    let count = read_length(buf)?;
    let mut instructions = Vec::with_capacity(count.min(buf.remaining() / 8));
    for _ in 0..count {
        let operator = read_string(buf)?;
        let arg_count = read_length(buf)?;
        let mut arguments = Vec::with_capacity(arg_count.min(buf.remaining() / 2));
        for _ in 0..arg_count {
            arguments.push(reader.read(buf)?);
        }
        instructions.push(Instruction { operator, arguments });
    }
    Ok(instructions)
}

fn write_instructions(instructions: &[Instruction], buf: &mut BytesMut, writer: &BinaryWriter) -> Result<()> {
    buf.put_i32(length_to_i32(instructions.len())?);
    for instruction in instructions {
        write_string(&instruction.operator, buf)?;
        buf.put_i32(length_to_i32(instruction.arguments.len())?);
        for argument in &instruction.arguments {
            writer.write(argument, buf)?;
        }
    }
    Ok(())
}

impl TypeSerializer for BytecodeSerializer {
    fn data_type(&self) -> DataType {
        DataType::Bytecode
    }

    fn read_value(&self, buf: &mut dyn Buf, reader: &BinaryReader) -> Result<Value> {
        let step_instructions = read_instructions(buf, reader)?;
        let source_instructions = read_instructions(buf, reader)?;
        Ok(Value::Bytecode(Bytecode { source_instructions, step_instructions }))
    }

    fn write_value(&self, value: &Value, buf: &mut BytesMut, writer: &BinaryWriter) -> Result<()> {
        let Value::Bytecode(bytecode) = value else {
            return Err(CodecError::mismatch(DataType::Bytecode, value));
        };
        write_instructions(&bytecode.step_instructions, buf, writer)?;
        write_instructions(&bytecode.source_instructions, buf, writer)
    }
}

impl TypeSerializer for LambdaSerializer {
    fn data_type(&self) -> DataType {
        DataType::Lambda
    }

    fn read_value(&self, buf: &mut dyn Buf, _reader: &BinaryReader) -> Result<Value> {
        let language = read_string(buf)?;
        let script = read_string(buf)?;
        let arguments = read_i32(buf)?;
        Ok(Value::Lambda(Lambda { language, script, arguments }))
    }

    fn write_value(&self, value: &Value, buf: &mut BytesMut, _writer: &BinaryWriter) -> Result<()> {
        let Value::Lambda(lambda) = value else {
            return Err(CodecError::mismatch(DataType::Lambda, value));
        };
        write_string(&lambda.language, buf)?;
        write_string(&lambda.script, buf)?;
        buf.put_i32(lambda.arguments);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytecode_roundtrip_steps_before_sources() {
        let bytecode = Bytecode::new()
            .add_source("withSideEffect", vec![Value::from("a"), Value::List(vec![])])
            .add_step("V", vec![])
            .add_step("has", vec![Value::from("name"), Value::from("marko")])
            .add_step("count", vec![]);

        let mut buf = BytesMut::new();
        BytecodeSerializer
            .write_value(&Value::Bytecode(bytecode.clone()), &mut buf, &BinaryWriter)
            .unwrap();

        // steps count comes first
        assert_eq!(&buf[0..4], &3i32.to_be_bytes());

        let mut slice: &[u8] = &buf;
        let decoded = BytecodeSerializer.read_value(&mut slice, &BinaryReader::new()).unwrap();
        assert_eq!(decoded, Value::Bytecode(bytecode));
    }

    #[test]
    fn test_lambda_roundtrip() {
        let lambda = Lambda {
            language: "gremlin-groovy".to_string(),
            script: "x -> x.get()".to_string(),
            arguments: -1,
        };
        let mut buf = BytesMut::new();
        LambdaSerializer
            .write_value(&Value::Lambda(lambda.clone()), &mut buf, &BinaryWriter)
            .unwrap();
        let mut slice: &[u8] = &buf;
        assert_eq!(
            LambdaSerializer.read_value(&mut slice, &BinaryReader::new()).unwrap(),
            Value::Lambda(lambda)
        );
    }
}
