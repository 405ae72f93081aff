//! Bounds-checked reads over a `bytes::Buf` cursor.
//!
//! `Buf::get_*` panics when the buffer is short; every read here checks
//! `remaining()` first and reports `BufferUnderflow` instead.

use bytes::{Buf, Bytes};

use crate::error::{CodecError, Result};

#[inline]
fn ensure(buf: &dyn Buf, needed: usize) -> Result<()> {
    let remaining = buf.remaining();
    if remaining < needed {
        return Err(CodecError::BufferUnderflow { needed, remaining });
    }
    Ok(())
}

pub fn read_u8(buf: &mut dyn Buf) -> Result<u8> {
    ensure(buf, 1)?;
    Ok(buf.get_u8())
}

pub fn read_i8(buf: &mut dyn Buf) -> Result<i8> {
    ensure(buf, 1)?;
    Ok(buf.get_i8())
}

pub fn read_i16(buf: &mut dyn Buf) -> Result<i16> {
    ensure(buf, 2)?;
    Ok(buf.get_i16())
}

pub fn read_i32(buf: &mut dyn Buf) -> Result<i32> {
    ensure(buf, 4)?;
    Ok(buf.get_i32())
}

pub fn read_i64(buf: &mut dyn Buf) -> Result<i64> {
    ensure(buf, 8)?;
    Ok(buf.get_i64())
}

pub fn read_f32(buf: &mut dyn Buf) -> Result<f32> {
    ensure(buf, 4)?;
    Ok(buf.get_f32())
}

pub fn read_f64(buf: &mut dyn Buf) -> Result<f64> {
    ensure(buf, 8)?;
    Ok(buf.get_f64())
}

pub fn read_u128(buf: &mut dyn Buf) -> Result<u128> {
    ensure(buf, 16)?;
    Ok(buf.get_u128())
}

/// Read exactly `len` bytes.
pub fn read_bytes(buf: &mut dyn Buf, len: usize) -> Result<Bytes> {
    ensure(buf, len)?;
    Ok(buf.copy_to_bytes(len))
}

/// Read an `i32` element/byte count and reject negative values.
pub fn read_length(buf: &mut dyn Buf) -> Result<usize> {
    let len = read_i32(buf)?;
    usize::try_from(len).map_err(|_| CodecError::Decode(format!("Negative length: {}", len)))
}

/// Convert a collection length to the wire's `i32`.
pub fn length_to_i32(len: usize) -> Result<i32> {
    i32::try_from(len).map_err(|_| CodecError::Encode(format!("Length {} exceeds i32 range", len)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_i32_big_endian() {
        let mut buf: &[u8] = &[0x00, 0x00, 0x01, 0x02];
        assert_eq!(read_i32(&mut buf).unwrap(), 258);
        assert_eq!(buf.remaining(), 0);
    }

    #[test]
    fn test_short_buffer_underflows() {
        let mut buf: &[u8] = &[0x00, 0x01];
        assert_eq!(
            read_i64(&mut buf),
            Err(CodecError::BufferUnderflow { needed: 8, remaining: 2 })
        );
    }

    #[test]
    fn test_negative_length_rejected() {
        let mut buf: &[u8] = &[0xff, 0xff, 0xff, 0xff];
        assert!(matches!(read_length(&mut buf), Err(CodecError::Decode(_))));
    }

    #[test]
    fn test_read_bytes_exact() {
        let mut buf: &[u8] = b"abcdef";
        assert_eq!(&read_bytes(&mut buf, 3).unwrap()[..], b"abc");
        assert_eq!(buf, b"def");
    }
}
