//! Simple query protocol messages.

use crate::error::Kind;
use crate::protocol::codec::MessageBuilder;

/// Write a Query message (simple query protocol).
pub fn write_query(buf: &mut Vec<u8>, sql: &str) -> Result<(), Kind> {
    let mut msg = MessageBuilder::new(buf, super::msg_type::QUERY);
    msg.write_cstr(sql);
    msg.finish()
}
