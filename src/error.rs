//! Error types for pglink.

use thiserror::Error;

/// Result type for pglink operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Stable client-side error codes.
///
/// Every failure the library itself can produce maps to exactly one of these
/// codes; transport failures pass through as [`Error::Io`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Kind {
    /// Destination field is non-nullable but the column was NULL
    #[error("unexpected NULL value")]
    UnexpectedNull,

    /// Column type OID is not acceptable for the destination field
    #[error("incompatible field type")]
    IncompatibleFieldType,

    /// Destination field name absent from the row
    #[error("field not found in row description")]
    FieldNotFound,

    /// Trailing bytes after a text integer parse
    #[error("extra bytes after value")]
    ExtraBytes,

    /// Malformed text or binary value, or malformed protocol message
    #[error("malformed protocol value")]
    ProtocolValueError,

    /// Request tag sequence incompatible with the handler
    #[error("incompatible response type")]
    IncompatibleResponseType,

    /// Handler's expected messages were skipped due to a previous error
    #[error("step skipped due to a previous error")]
    StepSkipped,

    /// Server sent an ErrorResponse while executing; diagnostics attached
    #[error("server error during execution")]
    ExecServerError,

    /// Server sent an ErrorResponse during startup; diagnostics attached
    #[error("server error during startup")]
    ServerStartupError,

    /// Message length exceeds 2^31 - 1
    #[error("serialized message too long")]
    SerializationOverflow,

    /// Server requested an authentication method this library does not handle
    #[error("unsupported authentication method")]
    UnsupportedAuthMethod,

    /// Server requested a password but none was configured
    #[error("password required but not provided")]
    PasswordRequired,

    /// Connection is in the Failed or Closed phase
    #[error("connection is unusable")]
    ConnectionUnusable,

    /// Another operation is outstanding on this connection
    #[error("operation already in progress")]
    OperationInProgress,

    /// Connection parameters are invalid (bad URL, empty host, ...)
    #[error("invalid connection parameters")]
    InvalidParams,
}

/// PostgreSQL error/notice diagnostic fields.
///
/// Filled from an ErrorResponse or NoticeResponse. Either all-empty (no
/// server diagnostic available) or populated with whatever fields the server
/// sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    /// Severity: ERROR, FATAL, PANIC, WARNING, NOTICE, DEBUG, INFO, LOG
    pub severity: Option<String>,
    /// Non-localized severity (same as severity but never translated)
    pub severity_non_localized: Option<String>,
    /// SQLSTATE error code (5 characters)
    pub sqlstate: Option<String>,
    /// Primary error message
    pub message: Option<String>,
    /// Detailed error explanation
    pub detail: Option<String>,
    /// Suggestion for fixing the error
    pub hint: Option<String>,
    /// Cursor position in query string (1-based)
    pub position: Option<u32>,
    /// Position in internal query
    pub internal_position: Option<u32>,
    /// Failed internal command text
    pub internal_query: Option<String>,
    /// Context/stack trace
    pub where_: Option<String>,
    /// Schema name
    pub schema: Option<String>,
    /// Table name
    pub table: Option<String>,
    /// Column name
    pub column: Option<String>,
    /// Data type name
    pub data_type: Option<String>,
    /// Constraint name
    pub constraint: Option<String>,
    /// Source file name
    pub file: Option<String>,
    /// Source line number
    pub line: Option<u32>,
    /// Source routine name
    pub routine: Option<String>,
}

impl Diagnostics {
    /// True if no field is populated.
    pub fn is_empty(&self) -> bool {
        *self == Diagnostics::default()
    }
}

impl std::fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(severity) = &self.severity {
            write!(f, "{}: ", severity)?;
        }
        if let Some(message) = &self.message {
            write!(f, "{}", message)?;
        }
        if let Some(code) = &self.sqlstate {
            write!(f, " (SQLSTATE {})", code)?;
        }
        if let Some(detail) = &self.detail {
            write!(f, "\nDETAIL: {}", detail)?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "\nHINT: {}", hint)?;
        }
        Ok(())
    }
}

/// An error code paired with server diagnostics.
///
/// `diag` is empty unless the code originated from a server ErrorResponse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecError {
    pub kind: Kind,
    pub diag: Diagnostics,
}

impl ExecError {
    /// Create an error with empty diagnostics.
    pub fn new(kind: Kind) -> Self {
        Self {
            kind,
            diag: Diagnostics::default(),
        }
    }

    /// Create an error carrying server diagnostics.
    pub fn with_diag(kind: Kind, diag: Diagnostics) -> Self {
        Self { kind, diag }
    }

    /// Get the SQLSTATE code from the attached diagnostics, if any.
    pub fn sqlstate(&self) -> Option<&str> {
        self.diag.sqlstate.as_deref()
    }
}

impl std::fmt::Display for ExecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)?;
        if !self.diag.is_empty() {
            write!(f, ": {}", self.diag)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExecError {}

impl From<Kind> for ExecError {
    fn from(kind: Kind) -> Self {
        Self::new(kind)
    }
}

/// Error type for pglink.
#[derive(Debug, Error)]
pub enum Error {
    /// Client-side or server-reported protocol error
    #[error("{0}")]
    Exec(#[from] ExecError),

    /// I/O error from the transport
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get the client error code if this is not a transport error.
    pub fn kind(&self) -> Option<Kind> {
        match self {
            Error::Exec(e) => Some(e.kind),
            Error::Io(_) => None,
        }
    }

    /// Get the server diagnostics attached to this error, if any.
    pub fn diag(&self) -> Option<&Diagnostics> {
        match self {
            Error::Exec(e) if !e.diag.is_empty() => Some(&e.diag),
            _ => None,
        }
    }
}

impl From<Kind> for Error {
    fn from(kind: Kind) -> Self {
        Error::Exec(ExecError::new(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let mut diag = Diagnostics::default();
        diag.severity = Some("ERROR".into());
        diag.message = Some("relation does not exist".into());
        diag.sqlstate = Some("42P01".into());
        let err = ExecError::with_diag(Kind::ExecServerError, diag);
        let s = err.to_string();
        assert!(s.contains("42P01"));
        assert!(s.contains("relation does not exist"));
    }

    #[test]
    fn test_empty_diag() {
        assert!(Diagnostics::default().is_empty());
        let err = ExecError::new(Kind::StepSkipped);
        assert_eq!(err.to_string(), Kind::StepSkipped.to_string());
    }
}
