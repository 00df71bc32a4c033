//! PostgreSQL wire protocol encoding and decoding primitives.
//!
//! PostgreSQL uses big-endian (network byte order) for all integers.

use zerocopy::FromBytes;

use crate::error::Kind;

use super::types::{I16Be, I32Be, I64Be, U16Be, U32Be};

/// Read 1-byte unsigned integer.
#[inline]
pub fn read_u8(data: &[u8]) -> Result<(u8, &[u8]), Kind> {
    if data.is_empty() {
        return Err(Kind::ProtocolValueError);
    }
    Ok((data[0], &data[1..]))
}

/// Read 2-byte big-endian signed integer.
#[inline]
pub fn read_i16(data: &[u8]) -> Result<(i16, &[u8]), Kind> {
    if data.len() < 2 {
        return Err(Kind::ProtocolValueError);
    }
    let value = I16Be::ref_from_bytes(&data[..2])
        .map_err(|_| Kind::ProtocolValueError)?
        .get();
    Ok((value, &data[2..]))
}

/// Read 2-byte big-endian unsigned integer.
#[inline]
pub fn read_u16(data: &[u8]) -> Result<(u16, &[u8]), Kind> {
    if data.len() < 2 {
        return Err(Kind::ProtocolValueError);
    }
    let value = U16Be::ref_from_bytes(&data[..2])
        .map_err(|_| Kind::ProtocolValueError)?
        .get();
    Ok((value, &data[2..]))
}

/// Read 4-byte big-endian signed integer.
#[inline]
pub fn read_i32(data: &[u8]) -> Result<(i32, &[u8]), Kind> {
    if data.len() < 4 {
        return Err(Kind::ProtocolValueError);
    }
    let value = I32Be::ref_from_bytes(&data[..4])
        .map_err(|_| Kind::ProtocolValueError)?
        .get();
    Ok((value, &data[4..]))
}

/// Read 4-byte big-endian unsigned integer.
#[inline]
pub fn read_u32(data: &[u8]) -> Result<(u32, &[u8]), Kind> {
    if data.len() < 4 {
        return Err(Kind::ProtocolValueError);
    }
    let value = U32Be::ref_from_bytes(&data[..4])
        .map_err(|_| Kind::ProtocolValueError)?
        .get();
    Ok((value, &data[4..]))
}

/// Read 8-byte big-endian signed integer.
#[inline]
pub fn read_i64(data: &[u8]) -> Result<(i64, &[u8]), Kind> {
    if data.len() < 8 {
        return Err(Kind::ProtocolValueError);
    }
    let value = I64Be::ref_from_bytes(&data[..8])
        .map_err(|_| Kind::ProtocolValueError)?
        .get();
    Ok((value, &data[8..]))
}

/// Read fixed-length bytes.
#[inline]
pub fn read_bytes(data: &[u8], len: usize) -> Result<(&[u8], &[u8]), Kind> {
    if data.len() < len {
        return Err(Kind::ProtocolValueError);
    }
    Ok((&data[..len], &data[len..]))
}

/// Read null-terminated string (PostgreSQL String type).
/// Returns the string bytes (without the null terminator) and remaining data.
#[inline]
pub fn read_cstring(data: &[u8]) -> Result<(&[u8], &[u8]), Kind> {
    match memchr::memchr(0, data) {
        Some(pos) => Ok((&data[..pos], &data[pos + 1..])),
        None => Err(Kind::ProtocolValueError),
    }
}

/// Read null-terminated string as &str.
#[inline]
pub fn read_cstr(data: &[u8]) -> Result<(&str, &[u8]), Kind> {
    let (bytes, rest) = read_cstring(data)?;
    let s = simdutf8::compat::from_utf8(bytes).map_err(|_| Kind::ProtocolValueError)?;
    Ok((s, rest))
}

/// Message builder helper that handles the length field.
///
/// PostgreSQL message format:
/// - Type byte (1 byte) - NOT included in length
/// - Length (4 bytes) - includes itself
/// - Payload (Length - 4 bytes)
pub struct MessageBuilder<'a> {
    buf: &'a mut Vec<u8>,
    /// Position of the length field
    start: usize,
    /// Position of the whole message, for rollback on overflow
    msg_start: usize,
}

impl<'a> MessageBuilder<'a> {
    /// Start building a message with a type byte.
    pub fn new(buf: &'a mut Vec<u8>, type_byte: u8) -> Self {
        let msg_start = buf.len();
        buf.push(type_byte);
        let start = buf.len();
        buf.extend_from_slice(&[0, 0, 0, 0]); // Placeholder for length
        Self {
            buf,
            start,
            msg_start,
        }
    }

    /// Start building a startup-family message (no type byte).
    pub fn new_untyped(buf: &'a mut Vec<u8>) -> Self {
        let msg_start = buf.len();
        let start = buf.len();
        buf.extend_from_slice(&[0, 0, 0, 0]); // Placeholder for length
        Self {
            buf,
            start,
            msg_start,
        }
    }

    /// Write a u8.
    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    /// Write an i16.
    pub fn write_i16(&mut self, value: i16) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    /// Write an i32.
    pub fn write_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    /// Write a u32.
    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    /// Write raw bytes.
    pub fn write_bytes(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Write null-terminated string.
    pub fn write_cstr(&mut self, s: &str) {
        self.buf.extend_from_slice(s.as_bytes());
        self.buf.push(0);
    }

    /// Finish building the message and fill in the length field.
    ///
    /// Fails with `SerializationOverflow` when the message length does not
    /// fit in an i32. The truncated message is removed from the buffer so the
    /// payload stays aligned with its tag stream.
    pub fn finish(self) -> Result<(), Kind> {
        let len = self.buf.len() - self.start;
        match i32::try_from(len) {
            Ok(len) => {
                self.buf[self.start..self.start + 4].copy_from_slice(&len.to_be_bytes());
                Ok(())
            }
            Err(_) => {
                self.buf.truncate(self.msg_start);
                Err(Kind::SerializationOverflow)
            }
        }
    }
}
