//! Extended query protocol messages.

use crate::error::Kind;
use crate::protocol::codec::MessageBuilder;
use crate::protocol::types::{FormatCode, Oid};
use crate::value::{Param, ParamFormat};

/// Statement or portal selector for Describe and Close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Statement,
    Portal,
}

impl Target {
    fn as_byte(self) -> u8 {
        match self {
            Target::Statement => b'S',
            Target::Portal => b'P',
        }
    }
}

/// Write a Parse message to create a prepared statement.
///
/// - `name`: Statement name (empty string for unnamed statement)
/// - `query`: SQL query with $1, $2, ... placeholders
/// - `param_oids`: Parameter type OIDs (0 = let server infer)
pub fn write_parse(
    buf: &mut Vec<u8>,
    name: &str,
    query: &str,
    param_oids: &[Oid],
) -> Result<(), Kind> {
    let count = i16::try_from(param_oids.len()).map_err(|_| Kind::SerializationOverflow)?;
    let mut msg = MessageBuilder::new(buf, super::msg_type::PARSE);
    msg.write_cstr(name);
    msg.write_cstr(query);
    msg.write_i16(count);
    for &oid in param_oids {
        msg.write_i32(oid as i32);
    }
    msg.finish()
}

/// Write a Bind message to create a portal from a prepared statement.
///
/// Per-parameter format codes are emitted, chosen from the format policy and
/// each value's capabilities; a single result format code applies to all
/// result columns.
pub fn write_bind(
    buf: &mut Vec<u8>,
    portal: &str,
    statement: &str,
    params: &[Param<'_>],
    fmt: ParamFormat,
    result_fmt: FormatCode,
) -> Result<(), Kind> {
    let count = i16::try_from(params.len()).map_err(|_| Kind::SerializationOverflow)?;
    let mut msg = MessageBuilder::new(buf, super::msg_type::BIND);

    msg.write_cstr(portal);
    msg.write_cstr(statement);

    // Parameter format codes, one per parameter
    msg.write_i16(count);
    for p in params {
        msg.write_i16(p.wire_format(fmt) as i16);
    }

    // Parameter values (count + length-prefixed data)
    msg.write_i16(count);
    let mut values = Vec::new();
    for p in params {
        values.clear();
        p.encode(fmt, &mut values);
        msg.write_bytes(&values);
    }

    // Result format codes
    msg.write_i16(1);
    msg.write_i16(result_fmt as i16);

    msg.finish()
}

/// Write an Execute message to run a portal.
///
/// - `portal`: Portal name
/// - `max_rows`: Maximum number of rows to return (0 = unlimited)
pub fn write_execute(buf: &mut Vec<u8>, portal: &str, max_rows: i32) -> Result<(), Kind> {
    let mut msg = MessageBuilder::new(buf, super::msg_type::EXECUTE);
    msg.write_cstr(portal);
    msg.write_i32(max_rows);
    msg.finish()
}

/// Write a Describe message to get metadata for a statement or portal.
pub fn write_describe(buf: &mut Vec<u8>, target: Target, name: &str) -> Result<(), Kind> {
    let mut msg = MessageBuilder::new(buf, super::msg_type::DESCRIBE);
    msg.write_u8(target.as_byte());
    msg.write_cstr(name);
    msg.finish()
}

/// Write a Close message to release a statement or portal.
pub fn write_close(buf: &mut Vec<u8>, target: Target, name: &str) -> Result<(), Kind> {
    let mut msg = MessageBuilder::new(buf, super::msg_type::CLOSE);
    msg.write_u8(target.as_byte());
    msg.write_cstr(name);
    msg.finish()
}

/// Write a Sync message.
///
/// This ends an extended query sequence and causes:
/// - Implicit COMMIT if successful and not in explicit transaction
/// - Implicit ROLLBACK if failed and not in explicit transaction
/// - Server responds with ReadyForQuery
pub fn write_sync(buf: &mut Vec<u8>) -> Result<(), Kind> {
    let msg = MessageBuilder::new(buf, super::msg_type::SYNC);
    msg.finish()
}

/// Write a Flush message.
///
/// Forces the server to send all pending responses without waiting for Sync.
pub fn write_flush(buf: &mut Vec<u8>) -> Result<(), Kind> {
    let msg = MessageBuilder::new(buf, super::msg_type::FLUSH);
    msg.finish()
}
