//! Common PostgreSQL wire protocol types.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// PostgreSQL Object Identifier (OID)
pub type Oid = u32;

/// Type OIDs understood out of the box.
pub mod oid {
    use super::Oid;

    pub const BOOL: Oid = 16;
    pub const BYTEA: Oid = 17;
    pub const NAME: Oid = 19;
    pub const INT8: Oid = 20;
    pub const INT2: Oid = 21;
    pub const INT4: Oid = 23;
    pub const TEXT: Oid = 25;
    pub const FLOAT4: Oid = 700;
    pub const FLOAT8: Oid = 701;
    pub const BPCHAR: Oid = 1042;
    pub const VARCHAR: Oid = 1043;
    pub const DATE: Oid = 1082;
    pub const TIME: Oid = 1083;
    pub const TIMESTAMP: Oid = 1114;
    pub const TIMESTAMPTZ: Oid = 1184;
    pub const INTERVAL: Oid = 1186;
    pub const TIMETZ: Oid = 1266;
}

/// Data format code in PostgreSQL protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u16)]
pub enum FormatCode {
    /// Text format (human-readable)
    #[default]
    Text = 0,
    /// Binary format (type-specific packed representation)
    Binary = 1,
}

impl FormatCode {
    /// Create a FormatCode from a raw u16 value.
    pub fn from_u16(value: u16) -> Self {
        match value {
            1 => FormatCode::Binary,
            _ => FormatCode::Text,
        }
    }
}

impl From<u16> for FormatCode {
    fn from(value: u16) -> Self {
        Self::from_u16(value)
    }
}

/// Transaction status indicator from ReadyForQuery message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum TransactionStatus {
    /// Idle (not in transaction block)
    #[default]
    Idle = b'I',
    /// In transaction block
    InTransaction = b'T',
    /// In failed transaction block (queries will be rejected until rollback)
    Failed = b'E',
}

impl TransactionStatus {
    /// Create a TransactionStatus from a raw byte value.
    pub fn from_byte(value: u8) -> Option<Self> {
        match value {
            b'I' => Some(TransactionStatus::Idle),
            b'T' => Some(TransactionStatus::InTransaction),
            b'E' => Some(TransactionStatus::Failed),
            _ => None,
        }
    }

    /// Returns true if currently in a transaction (either active or failed).
    pub fn in_transaction(self) -> bool {
        matches!(
            self,
            TransactionStatus::InTransaction | TransactionStatus::Failed
        )
    }
}

/// Big-endian 16-bit signed integer for zerocopy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct I16Be([u8; 2]);

impl I16Be {
    /// Create a new I16Be from a native i16.
    pub const fn new(value: i16) -> Self {
        Self(value.to_be_bytes())
    }

    /// Get the native i16 value.
    pub const fn get(self) -> i16 {
        i16::from_be_bytes(self.0)
    }
}

/// Big-endian 16-bit unsigned integer for zerocopy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct U16Be([u8; 2]);

impl U16Be {
    /// Create a new U16Be from a native u16.
    pub const fn new(value: u16) -> Self {
        Self(value.to_be_bytes())
    }

    /// Get the native u16 value.
    pub const fn get(self) -> u16 {
        u16::from_be_bytes(self.0)
    }
}

/// Big-endian 32-bit signed integer for zerocopy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct I32Be([u8; 4]);

impl I32Be {
    /// Create a new I32Be from a native i32.
    pub const fn new(value: i32) -> Self {
        Self(value.to_be_bytes())
    }

    /// Get the native i32 value.
    pub const fn get(self) -> i32 {
        i32::from_be_bytes(self.0)
    }
}

/// Big-endian 32-bit unsigned integer for zerocopy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct U32Be([u8; 4]);

impl U32Be {
    /// Create a new U32Be from a native u32.
    pub const fn new(value: u32) -> Self {
        Self(value.to_be_bytes())
    }

    /// Get the native u32 value.
    pub const fn get(self) -> u32 {
        u32::from_be_bytes(self.0)
    }
}

/// Big-endian 64-bit signed integer for zerocopy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct I64Be([u8; 8]);

impl I64Be {
    /// Create a new I64Be from a native i64.
    pub const fn new(value: i64) -> Self {
        Self(value.to_be_bytes())
    }

    /// Get the native i64 value.
    pub const fn get(self) -> i64 {
        i64::from_be_bytes(self.0)
    }
}
