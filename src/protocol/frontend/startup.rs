//! Startup and termination messages.

use crate::error::Kind;
use crate::protocol::codec::MessageBuilder;

/// Protocol version 3.0 (0x00030000)
pub const PROTOCOL_VERSION_3_0: i32 = 196608;

/// Cancel request code
pub const CANCEL_REQUEST_CODE: i32 = 80877102;

/// Write a StartupMessage.
///
/// Parameters is a list of (name, value) pairs.
/// Required: "user" - database username
/// Optional: "database", "options", "client_encoding", etc.
pub fn write_startup(buf: &mut Vec<u8>, params: &[(&str, &str)]) -> Result<(), Kind> {
    let mut msg = MessageBuilder::new_untyped(buf);
    msg.write_i32(PROTOCOL_VERSION_3_0);

    for (name, value) in params {
        msg.write_cstr(name);
        msg.write_cstr(value);
    }

    // Terminator
    msg.write_u8(0);
    msg.finish()
}

/// Write a CancelRequest message.
///
/// This is sent on a NEW connection to cancel a query running on another
/// connection. The server closes the connection immediately with no response.
pub fn write_cancel_request(buf: &mut Vec<u8>, pid: u32, secret_key: u32) -> Result<(), Kind> {
    let mut msg = MessageBuilder::new_untyped(buf);
    msg.write_i32(CANCEL_REQUEST_CODE);
    msg.write_u32(pid);
    msg.write_u32(secret_key);
    msg.finish()
}

/// Write a Terminate message.
///
/// Sent to cleanly close the connection.
pub fn write_terminate(buf: &mut Vec<u8>) -> Result<(), Kind> {
    let msg = MessageBuilder::new(buf, super::msg_type::TERMINATE);
    msg.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup() {
        let mut buf = Vec::new();
        write_startup(&mut buf, &[("user", "postgres"), ("database", "test")]).unwrap();

        // Check length is at start
        let len = i32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
        assert_eq!(len as usize, buf.len());

        // Check protocol version
        let version = i32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
        assert_eq!(version, PROTOCOL_VERSION_3_0);

        // Trailing NUL after the key/value pairs
        assert_eq!(buf[buf.len() - 1], 0);
    }

    #[test]
    fn test_cancel_request() {
        let mut buf = Vec::new();
        write_cancel_request(&mut buf, 1234, 5678).unwrap();

        assert_eq!(buf.len(), 16);
        assert_eq!(&buf[0..4], &16_i32.to_be_bytes());
        assert_eq!(&buf[4..8], &CANCEL_REQUEST_CODE.to_be_bytes());
    }

    #[test]
    fn test_terminate() {
        let mut buf = Vec::new();
        write_terminate(&mut buf).unwrap();

        assert_eq!(buf.len(), 5);
        assert_eq!(buf[0], b'X');
        assert_eq!(&buf[1..5], &4_i32.to_be_bytes());
    }
}
