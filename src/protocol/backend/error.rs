//! Error and notice response messages.

use crate::error::{Diagnostics, Kind};
use crate::protocol::codec::read_cstr;

/// Diagnostic field codes used in ErrorResponse and NoticeResponse.
mod field {
    pub const SEVERITY: u8 = b'S';
    pub const SEVERITY_NON_LOCALIZED: u8 = b'V';
    pub const SQLSTATE: u8 = b'C';
    pub const MESSAGE: u8 = b'M';
    pub const DETAIL: u8 = b'D';
    pub const HINT: u8 = b'H';
    pub const POSITION: u8 = b'P';
    pub const INTERNAL_POSITION: u8 = b'p';
    pub const INTERNAL_QUERY: u8 = b'q';
    pub const WHERE: u8 = b'W';
    pub const SCHEMA: u8 = b's';
    pub const TABLE: u8 = b't';
    pub const COLUMN: u8 = b'c';
    pub const DATA_TYPE: u8 = b'd';
    pub const CONSTRAINT: u8 = b'n';
    pub const FILE: u8 = b'F';
    pub const LINE: u8 = b'L';
    pub const ROUTINE: u8 = b'R';
}

/// Parse the (field-code, NUL-terminated value) sequence of an ErrorResponse
/// or NoticeResponse into a [`Diagnostics`] block.
///
/// Unknown field codes are skipped.
pub fn parse_diagnostics(payload: &[u8]) -> Result<Diagnostics, Kind> {
    let mut diag = Diagnostics::default();
    let mut data = payload;

    while !data.is_empty() && data[0] != 0 {
        let code = data[0];
        let (value, rest) = read_cstr(&data[1..])?;
        data = rest;

        match code {
            field::SEVERITY => diag.severity = Some(value.to_string()),
            field::SEVERITY_NON_LOCALIZED => diag.severity_non_localized = Some(value.to_string()),
            field::SQLSTATE => diag.sqlstate = Some(value.to_string()),
            field::MESSAGE => diag.message = Some(value.to_string()),
            field::DETAIL => diag.detail = Some(value.to_string()),
            field::HINT => diag.hint = Some(value.to_string()),
            field::POSITION => diag.position = value.parse().ok(),
            field::INTERNAL_POSITION => diag.internal_position = value.parse().ok(),
            field::INTERNAL_QUERY => diag.internal_query = Some(value.to_string()),
            field::WHERE => diag.where_ = Some(value.to_string()),
            field::SCHEMA => diag.schema = Some(value.to_string()),
            field::TABLE => diag.table = Some(value.to_string()),
            field::COLUMN => diag.column = Some(value.to_string()),
            field::DATA_TYPE => diag.data_type = Some(value.to_string()),
            field::CONSTRAINT => diag.constraint = Some(value.to_string()),
            field::FILE => diag.file = Some(value.to_string()),
            field::LINE => diag.line = value.parse().ok(),
            field::ROUTINE => diag.routine = Some(value.to_string()),
            _ => {}
        }
    }

    Ok(diag)
}
