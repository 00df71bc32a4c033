//! [`FieldDecode`] implementations for the built-in destination types.

use crate::error::Kind;
use crate::protocol::types::{oid, FormatCode};
use crate::row::{ColumnMeta, FieldDecode};
use crate::types::datetime::{Date, Interval, Time, TimeTz, Timestamp, TimestampTz};

/// Parse a decimal text integer. Trailing bytes after the digits are an
/// `ExtraBytes` error; anything else malformed is `ProtocolValueError`.
fn parse_text_int<T: std::str::FromStr>(data: &[u8]) -> Result<T, Kind> {
    let s = simdutf8::compat::from_utf8(data).map_err(|_| Kind::ProtocolValueError)?;
    let body = s.strip_prefix(['+', '-']).unwrap_or(s);
    let digits = body
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(body.len());
    if digits == 0 {
        return Err(Kind::ProtocolValueError);
    }
    if digits != body.len() {
        return Err(Kind::ExtraBytes);
    }
    s.parse().map_err(|_| Kind::ProtocolValueError)
}

fn binary_i16(data: &[u8]) -> Result<i16, Kind> {
    let arr: [u8; 2] = data.try_into().map_err(|_| Kind::ProtocolValueError)?;
    Ok(i16::from_be_bytes(arr))
}

fn binary_i32(data: &[u8]) -> Result<i32, Kind> {
    let arr: [u8; 4] = data.try_into().map_err(|_| Kind::ProtocolValueError)?;
    Ok(i32::from_be_bytes(arr))
}

fn binary_i64(data: &[u8]) -> Result<i64, Kind> {
    let arr: [u8; 8] = data.try_into().map_err(|_| Kind::ProtocolValueError)?;
    Ok(i64::from_be_bytes(arr))
}

fn non_null(value: Option<&[u8]>) -> Result<&[u8], Kind> {
    value.ok_or(Kind::UnexpectedNull)
}

// === Integers ===
//
// Widening across the integer OIDs is permitted when the destination is
// wider; narrowing is rejected at compatibility-check time.

impl FieldDecode for i16 {
    fn check(meta: &ColumnMeta) -> Result<(), Kind> {
        match meta.type_oid {
            oid::INT2 => Ok(()),
            _ => Err(Kind::IncompatibleFieldType),
        }
    }

    fn decode(value: Option<&[u8]>, meta: &ColumnMeta) -> Result<Self, Kind> {
        let data = non_null(value)?;
        match meta.format {
            FormatCode::Text => parse_text_int(data),
            FormatCode::Binary => binary_i16(data),
        }
    }
}

impl FieldDecode for i32 {
    fn check(meta: &ColumnMeta) -> Result<(), Kind> {
        match meta.type_oid {
            oid::INT2 | oid::INT4 => Ok(()),
            _ => Err(Kind::IncompatibleFieldType),
        }
    }

    fn decode(value: Option<&[u8]>, meta: &ColumnMeta) -> Result<Self, Kind> {
        let data = non_null(value)?;
        match meta.format {
            FormatCode::Text => parse_text_int(data),
            FormatCode::Binary => match meta.type_oid {
                oid::INT2 => binary_i16(data).map(i32::from),
                _ => binary_i32(data),
            },
        }
    }
}

impl FieldDecode for i64 {
    fn check(meta: &ColumnMeta) -> Result<(), Kind> {
        match meta.type_oid {
            oid::INT2 | oid::INT4 | oid::INT8 => Ok(()),
            _ => Err(Kind::IncompatibleFieldType),
        }
    }

    fn decode(value: Option<&[u8]>, meta: &ColumnMeta) -> Result<Self, Kind> {
        let data = non_null(value)?;
        match meta.format {
            FormatCode::Text => parse_text_int(data),
            FormatCode::Binary => match meta.type_oid {
                oid::INT2 => binary_i16(data).map(i64::from),
                oid::INT4 => binary_i32(data).map(i64::from),
                _ => binary_i64(data),
            },
        }
    }
}

// === Floats ===

impl FieldDecode for f32 {
    fn check(meta: &ColumnMeta) -> Result<(), Kind> {
        match meta.type_oid {
            oid::FLOAT4 => Ok(()),
            _ => Err(Kind::IncompatibleFieldType),
        }
    }

    fn decode(value: Option<&[u8]>, meta: &ColumnMeta) -> Result<Self, Kind> {
        let data = non_null(value)?;
        match meta.format {
            FormatCode::Text => {
                let s = simdutf8::compat::from_utf8(data).map_err(|_| Kind::ProtocolValueError)?;
                s.parse().map_err(|_| Kind::ProtocolValueError)
            }
            FormatCode::Binary => {
                let arr: [u8; 4] = data.try_into().map_err(|_| Kind::ProtocolValueError)?;
                Ok(f32::from_be_bytes(arr))
            }
        }
    }
}

impl FieldDecode for f64 {
    fn check(meta: &ColumnMeta) -> Result<(), Kind> {
        match meta.type_oid {
            oid::FLOAT4 | oid::FLOAT8 => Ok(()),
            _ => Err(Kind::IncompatibleFieldType),
        }
    }

    fn decode(value: Option<&[u8]>, meta: &ColumnMeta) -> Result<Self, Kind> {
        let data = non_null(value)?;
        match meta.format {
            FormatCode::Text => {
                let s = simdutf8::compat::from_utf8(data).map_err(|_| Kind::ProtocolValueError)?;
                s.parse().map_err(|_| Kind::ProtocolValueError)
            }
            FormatCode::Binary => match meta.type_oid {
                oid::FLOAT4 => {
                    let arr: [u8; 4] = data.try_into().map_err(|_| Kind::ProtocolValueError)?;
                    Ok(f32::from_be_bytes(arr) as f64)
                }
                _ => {
                    let arr: [u8; 8] = data.try_into().map_err(|_| Kind::ProtocolValueError)?;
                    Ok(f64::from_be_bytes(arr))
                }
            },
        }
    }
}

// === Booleans ===

impl FieldDecode for bool {
    fn check(meta: &ColumnMeta) -> Result<(), Kind> {
        match meta.type_oid {
            oid::BOOL => Ok(()),
            _ => Err(Kind::IncompatibleFieldType),
        }
    }

    fn decode(value: Option<&[u8]>, meta: &ColumnMeta) -> Result<Self, Kind> {
        let data = non_null(value)?;
        match meta.format {
            FormatCode::Text => match data {
                b"t" | b"true" => Ok(true),
                b"f" | b"false" => Ok(false),
                _ => Err(Kind::ProtocolValueError),
            },
            FormatCode::Binary => {
                if data.len() != 1 {
                    return Err(Kind::ProtocolValueError);
                }
                Ok(data[0] != 0)
            }
        }
    }
}

// === Strings and raw bytes ===
//
// Any column OID is accepted for a string-like destination. Text values must
// be UTF-8; binary values are taken as raw bytes (UTF-8-checked for String).

impl FieldDecode for String {
    fn check(_meta: &ColumnMeta) -> Result<(), Kind> {
        Ok(())
    }

    fn decode(value: Option<&[u8]>, _meta: &ColumnMeta) -> Result<Self, Kind> {
        let data = non_null(value)?;
        simdutf8::compat::from_utf8(data)
            .map(|s| s.to_owned())
            .map_err(|_| Kind::ProtocolValueError)
    }
}

impl FieldDecode for Vec<u8> {
    fn check(_meta: &ColumnMeta) -> Result<(), Kind> {
        Ok(())
    }

    fn decode(value: Option<&[u8]>, _meta: &ColumnMeta) -> Result<Self, Kind> {
        non_null(value).map(|data| data.to_vec())
    }
}

// === NULL handling ===

impl<T: FieldDecode> FieldDecode for Option<T> {
    fn check(meta: &ColumnMeta) -> Result<(), Kind> {
        T::check(meta)
    }

    fn decode(value: Option<&[u8]>, meta: &ColumnMeta) -> Result<Self, Kind> {
        match value {
            None => Ok(None),
            Some(_) => T::decode(value, meta).map(Some),
        }
    }
}

// === Date/time types ===

macro_rules! impl_datetime_decode {
    ($ty:ty, $type_oid:expr) => {
        impl FieldDecode for $ty {
            fn check(meta: &ColumnMeta) -> Result<(), Kind> {
                if meta.type_oid == $type_oid {
                    Ok(())
                } else {
                    Err(Kind::IncompatibleFieldType)
                }
            }

            fn decode(value: Option<&[u8]>, meta: &ColumnMeta) -> Result<Self, Kind> {
                let data = non_null(value)?;
                match meta.format {
                    FormatCode::Text => {
                        let s = simdutf8::compat::from_utf8(data)
                            .map_err(|_| Kind::ProtocolValueError)?;
                        <$ty>::parse_text(s)
                    }
                    FormatCode::Binary => <$ty>::parse_binary(data),
                }
            }
        }
    };
}

impl_datetime_decode!(Date, oid::DATE);
impl_datetime_decode!(Time, oid::TIME);
impl_datetime_decode!(TimeTz, oid::TIMETZ);
impl_datetime_decode!(Timestamp, oid::TIMESTAMP);
impl_datetime_decode!(TimestampTz, oid::TIMESTAMPTZ);
impl_datetime_decode!(Interval, oid::INTERVAL);
