//! PostgreSQL backend (server → client) messages.

pub mod auth;
pub mod error;
pub mod extended;
pub mod query;

pub use auth::{AuthRequest, BackendKeyData, NotificationResponse, ParameterStatus, ReadyForQuery};
pub use error::parse_diagnostics;
pub use extended::ParameterDescription;
pub use query::{CommandComplete, DataRow, FieldDescription, RowDescription};

use crate::error::{Diagnostics, Kind};

/// Backend message type bytes.
pub mod msg_type {
    /// Authentication message
    pub const AUTHENTICATION: u8 = b'R';
    /// BackendKeyData
    pub const BACKEND_KEY_DATA: u8 = b'K';
    /// ParameterStatus
    pub const PARAMETER_STATUS: u8 = b'S';
    /// ReadyForQuery
    pub const READY_FOR_QUERY: u8 = b'Z';
    /// RowDescription
    pub const ROW_DESCRIPTION: u8 = b'T';
    /// DataRow
    pub const DATA_ROW: u8 = b'D';
    /// CommandComplete
    pub const COMMAND_COMPLETE: u8 = b'C';
    /// EmptyQueryResponse
    pub const EMPTY_QUERY_RESPONSE: u8 = b'I';
    /// ErrorResponse
    pub const ERROR_RESPONSE: u8 = b'E';
    /// NoticeResponse
    pub const NOTICE_RESPONSE: u8 = b'N';
    /// NotificationResponse
    pub const NOTIFICATION_RESPONSE: u8 = b'A';
    /// ParseComplete
    pub const PARSE_COMPLETE: u8 = b'1';
    /// BindComplete
    pub const BIND_COMPLETE: u8 = b'2';
    /// CloseComplete
    pub const CLOSE_COMPLETE: u8 = b'3';
    /// ParameterDescription
    pub const PARAMETER_DESCRIPTION: u8 = b't';
    /// NoData
    pub const NO_DATA: u8 = b'n';
    /// PortalSuspended
    pub const PORTAL_SUSPENDED: u8 = b's';
}

/// One parsed backend message.
///
/// Borrowed variants alias the read buffer and are only valid for the
/// duration of one dispatch.
#[derive(Debug)]
pub enum BackendMessage<'a> {
    Authentication(AuthRequest),
    BackendKeyData(BackendKeyData),
    ParameterStatus(ParameterStatus<'a>),
    ReadyForQuery(ReadyForQuery),
    RowDescription(RowDescription<'a>),
    DataRow(DataRow<'a>),
    CommandComplete(CommandComplete<'a>),
    EmptyQueryResponse,
    PortalSuspended,
    ParseComplete,
    BindComplete,
    CloseComplete,
    ParameterDescription(ParameterDescription),
    NoData,
    ErrorResponse(Diagnostics),
    NoticeResponse(Diagnostics),
    NotificationResponse(NotificationResponse<'a>),
    /// Unrecognized tag; payload was discarded
    Unknown { tag: u8 },
}

impl<'a> BackendMessage<'a> {
    /// Parse one message body given its type tag.
    pub fn parse(tag: u8, payload: &'a [u8]) -> Result<Self, Kind> {
        let msg = match tag {
            msg_type::AUTHENTICATION => {
                BackendMessage::Authentication(AuthRequest::parse(payload)?)
            }
            msg_type::BACKEND_KEY_DATA => {
                BackendMessage::BackendKeyData(*BackendKeyData::parse(payload)?)
            }
            msg_type::PARAMETER_STATUS => {
                BackendMessage::ParameterStatus(ParameterStatus::parse(payload)?)
            }
            msg_type::READY_FOR_QUERY => {
                BackendMessage::ReadyForQuery(ReadyForQuery::parse(payload)?)
            }
            msg_type::ROW_DESCRIPTION => {
                BackendMessage::RowDescription(RowDescription::parse(payload)?)
            }
            msg_type::DATA_ROW => BackendMessage::DataRow(DataRow::parse(payload)?),
            msg_type::COMMAND_COMPLETE => {
                BackendMessage::CommandComplete(CommandComplete::parse(payload)?)
            }
            msg_type::EMPTY_QUERY_RESPONSE => BackendMessage::EmptyQueryResponse,
            msg_type::PORTAL_SUSPENDED => BackendMessage::PortalSuspended,
            msg_type::PARSE_COMPLETE => BackendMessage::ParseComplete,
            msg_type::BIND_COMPLETE => BackendMessage::BindComplete,
            msg_type::CLOSE_COMPLETE => BackendMessage::CloseComplete,
            msg_type::PARAMETER_DESCRIPTION => {
                BackendMessage::ParameterDescription(ParameterDescription::parse(payload)?)
            }
            msg_type::NO_DATA => BackendMessage::NoData,
            msg_type::ERROR_RESPONSE => BackendMessage::ErrorResponse(parse_diagnostics(payload)?),
            msg_type::NOTICE_RESPONSE => {
                BackendMessage::NoticeResponse(parse_diagnostics(payload)?)
            }
            msg_type::NOTIFICATION_RESPONSE => {
                BackendMessage::NotificationResponse(NotificationResponse::parse(payload)?)
            }
            other => BackendMessage::Unknown { tag: other },
        };
        Ok(msg)
    }
}

/// Total frame size (tag + length field + payload) of the message at the
/// start of `data`, or `None` when fewer than 5 header bytes are buffered.
///
/// The length field includes itself but not the tag, so a frame occupies
/// `length + 1` bytes.
pub fn frame_len(data: &[u8]) -> Result<Option<usize>, Kind> {
    if data.len() < 5 {
        return Ok(None);
    }
    let len = i32::from_be_bytes([data[1], data[2], data[3], data[4]]);
    if len < 4 {
        return Err(Kind::ProtocolValueError);
    }
    Ok(Some(len as usize + 1))
}

/// Decode one backend message from the front of `data`.
///
/// Returns `None` when the buffered bytes do not yet hold a complete frame;
/// otherwise the parsed message and the number of bytes it occupied.
pub fn next_message(data: &[u8]) -> Result<Option<(BackendMessage<'_>, usize)>, Kind> {
    let total = match frame_len(data)? {
        Some(total) => total,
        None => return Ok(None),
    };
    if data.len() < total {
        return Ok(None);
    }
    let payload = &data[5..total];
    Ok(Some((BackendMessage::parse(data[0], payload)?, total)))
}
