//! Query parameter values.

use crate::protocol::types::{oid, FormatCode, Oid};

/// Format selection policy for query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParamFormat {
    /// Use text format for all parameters.
    Text,
    /// Pick binary where the value supports it, text otherwise.
    #[default]
    SelectBest,
}

/// A value used as a query parameter.
///
/// Each variant carries or implies a (type OID, wire format) pair. Whether a
/// parameter goes over the wire as text or binary is decided at request build
/// time from the [`ParamFormat`] policy and the variant's capabilities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Param<'a> {
    /// SQL NULL (type left unspecified)
    Null,
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    /// UTF-8 string, sent in text format
    Text(&'a str),
    /// Pre-encoded bytes with an explicit type OID and format
    Bytes {
        oid: Oid,
        format: FormatCode,
        data: &'a [u8],
    },
}

impl Param<'_> {
    /// The type OID this value naturally maps to (0 = unspecified).
    pub fn type_oid(&self) -> Oid {
        match self {
            Param::Null => 0,
            Param::I16(_) => oid::INT2,
            Param::I32(_) => oid::INT4,
            Param::I64(_) => oid::INT8,
            Param::F32(_) => oid::FLOAT4,
            Param::F64(_) => oid::FLOAT8,
            Param::Text(_) => 0,
            Param::Bytes { oid, .. } => *oid,
        }
    }

    /// True when the variant carries a binary encoding for its OID.
    pub fn supports_binary(&self) -> bool {
        match self {
            Param::I16(_) | Param::I32(_) | Param::I64(_) | Param::F32(_) | Param::F64(_) => true,
            Param::Bytes { format, .. } => *format == FormatCode::Binary,
            Param::Null | Param::Text(_) => false,
        }
    }

    /// The format this parameter is sent in under the given policy.
    pub fn wire_format(&self, fmt: ParamFormat) -> FormatCode {
        match fmt {
            ParamFormat::Text => match self {
                // Pre-encoded bytes keep their declared format
                Param::Bytes { format, .. } => *format,
                _ => FormatCode::Text,
            },
            ParamFormat::SelectBest => {
                if self.supports_binary() {
                    FormatCode::Binary
                } else {
                    FormatCode::Text
                }
            }
        }
    }

    /// Encode the value into a Bind parameter slot: int32 length (-1 for
    /// NULL) followed by the value bytes in the chosen format.
    pub fn encode(&self, fmt: ParamFormat, buf: &mut Vec<u8>) {
        fn put(buf: &mut Vec<u8>, data: &[u8]) {
            buf.extend_from_slice(&(data.len() as i32).to_be_bytes());
            buf.extend_from_slice(data);
        }

        match (self, self.wire_format(fmt)) {
            (Param::Null, _) => buf.extend_from_slice(&(-1_i32).to_be_bytes()),
            (Param::I16(v), FormatCode::Binary) => put(buf, &v.to_be_bytes()),
            (Param::I32(v), FormatCode::Binary) => put(buf, &v.to_be_bytes()),
            (Param::I64(v), FormatCode::Binary) => put(buf, &v.to_be_bytes()),
            (Param::F32(v), FormatCode::Binary) => put(buf, &v.to_bits().to_be_bytes()),
            (Param::F64(v), FormatCode::Binary) => put(buf, &v.to_bits().to_be_bytes()),
            (Param::I16(v), FormatCode::Text) => put(buf, v.to_string().as_bytes()),
            (Param::I32(v), FormatCode::Text) => put(buf, v.to_string().as_bytes()),
            (Param::I64(v), FormatCode::Text) => put(buf, v.to_string().as_bytes()),
            (Param::F32(v), FormatCode::Text) => put(buf, v.to_string().as_bytes()),
            (Param::F64(v), FormatCode::Text) => put(buf, v.to_string().as_bytes()),
            (Param::Text(s), _) => put(buf, s.as_bytes()),
            (Param::Bytes { data, .. }, _) => put(buf, data),
        }
    }
}

impl From<i16> for Param<'_> {
    fn from(v: i16) -> Self {
        Param::I16(v)
    }
}

impl From<i32> for Param<'_> {
    fn from(v: i32) -> Self {
        Param::I32(v)
    }
}

impl From<i64> for Param<'_> {
    fn from(v: i64) -> Self {
        Param::I64(v)
    }
}

impl From<f32> for Param<'_> {
    fn from(v: f32) -> Self {
        Param::F32(v)
    }
}

impl From<f64> for Param<'_> {
    fn from(v: f64) -> Self {
        Param::F64(v)
    }
}

impl<'a> From<&'a str> for Param<'a> {
    fn from(v: &'a str) -> Self {
        Param::Text(v)
    }
}

impl<'a, T> From<Option<T>> for Param<'a>
where
    T: Into<Param<'a>>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Param::Null,
        }
    }
}
