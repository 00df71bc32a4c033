//! Typed row decoding: destination maps and record traits.

use crate::error::Kind;
use crate::protocol::backend::query::RowDescription;
use crate::protocol::types::{FormatCode, Oid};

/// Owned copy of one column's metadata from a RowDescription.
///
/// Stored in a [`DestMap`] so it outlives the message that carried it.
#[derive(Debug, Clone, Default)]
pub struct ColumnMeta {
    /// Table OID (0 if not a table column)
    pub table_oid: Oid,
    /// Column attribute number (0 if not a table column)
    pub column_id: i16,
    /// Data type OID
    pub type_oid: Oid,
    /// Type size (-1 for variable, -2 for null-terminated)
    pub type_size: i16,
    /// Type modifier (type-specific)
    pub type_modifier: i32,
    /// Format code (0=text, 1=binary)
    pub format: FormatCode,
}

/// One destination field's source column.
#[derive(Debug, Clone)]
pub struct DestEntry {
    db_index: usize,
    meta: ColumnMeta,
}

impl DestEntry {
    /// Index of the source column within the DB row.
    pub fn db_index(&self) -> usize {
        self.db_index
    }

    /// Metadata of the source column.
    pub fn meta(&self) -> &ColumnMeta {
        &self.meta
    }
}

/// Mapping from destination-record fields to DB columns.
///
/// Destination fields are positioned by column name, not by index. Extra DB
/// columns are allowed and ignored; a destination field with no matching
/// column is an error.
#[derive(Debug, Clone)]
pub struct DestMap {
    entries: Vec<DestEntry>,
    column_count: usize,
}

impl DestMap {
    /// Number of columns in the source row.
    pub fn column_count(&self) -> usize {
        self.column_count
    }

    /// Entry for the destination field at `index` (declared field order).
    pub fn entry(&self, index: usize) -> &DestEntry {
        &self.entries[index]
    }

    /// All entries, in declared field order.
    pub fn entries(&self) -> &[DestEntry] {
        &self.entries
    }
}

/// Compute the destination map for `field_names` against a RowDescription.
///
/// Fails with `FieldNotFound` when any destination field has no column of
/// the same name.
pub fn compute_dest_map(desc: &RowDescription<'_>, field_names: &[&str]) -> Result<DestMap, Kind> {
    let mut entries: Vec<Option<DestEntry>> = vec![None; field_names.len()];

    for (db_index, field) in desc.fields().iter().enumerate() {
        if let Some(pos) = field_names.iter().position(|name| *name == field.name) {
            entries[pos] = Some(DestEntry {
                db_index,
                meta: ColumnMeta {
                    table_oid: field.table_oid,
                    column_id: field.column_id,
                    type_oid: field.type_oid,
                    type_size: field.type_size,
                    type_modifier: field.type_modifier,
                    format: field.format,
                },
            });
        }
    }

    let entries: Option<Vec<DestEntry>> = entries.into_iter().collect();
    match entries {
        Some(entries) => Ok(DestMap {
            entries,
            column_count: desc.len(),
        }),
        None => Err(Kind::FieldNotFound),
    }
}

/// Decoding of one destination field type from a wire value.
///
/// `check` is the request-time compatibility predicate over the column
/// metadata (type OID acceptance); `decode` parses the text or binary value
/// according to the column's format code.
pub trait FieldDecode: Sized {
    /// Verify the column type is acceptable for this destination type.
    fn check(meta: &ColumnMeta) -> Result<(), Kind>;

    /// Parse the column value. `None` is a NULL column.
    fn decode(value: Option<&[u8]>, meta: &ColumnMeta) -> Result<Self, Kind>;
}

/// A destination record decodable from a DB row by field name.
///
/// Implemented via the [`record!`](crate::record) macro; the declared field
/// order defines the decode order, while `FIELDS` positions each field by
/// column name.
pub trait FromRecord: Sized {
    /// Declared destination field names, in order.
    const FIELDS: &'static [&'static str];

    /// Verify every destination field against its mapped column.
    ///
    /// Reports the first incompatible field.
    fn check(map: &DestMap) -> Result<(), Kind>;

    /// Decode one row. All fields are parsed even after a failure so the
    /// whole row is consumed; the first error wins.
    fn decode(map: &DestMap, values: &[Option<&[u8]>]) -> Result<Self, Kind>;
}

/// Define a destination record type and derive [`FromRecord`] for it.
///
/// The struct must also implement `Default` (each row starts from the
/// default value and fields are filled in by name).
///
/// ```
/// pglink::record! {
///     #[derive(Debug, Default, PartialEq)]
///     pub struct Count {
///         pub amount: i64,
///     }
/// }
/// ```
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $( $(#[$fmeta:meta])* $fvis:vis $field:ident : $ty:ty ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $( $(#[$fmeta])* $fvis $field : $ty, )+
        }

        impl $crate::row::FromRecord for $name {
            const FIELDS: &'static [&'static str] = &[ $( stringify!($field) ),+ ];

            fn check(
                map: &$crate::row::DestMap,
            ) -> ::core::result::Result<(), $crate::error::Kind> {
                let mut idx = 0usize;
                $(
                    <$ty as $crate::row::FieldDecode>::check(map.entry(idx).meta())?;
                    idx += 1;
                )+
                let _ = idx;
                Ok(())
            }

            fn decode(
                map: &$crate::row::DestMap,
                values: &[::core::option::Option<&[u8]>],
            ) -> ::core::result::Result<Self, $crate::error::Kind> {
                let mut out = <Self as ::core::default::Default>::default();
                let mut first_err: ::core::option::Option<$crate::error::Kind> = None;
                let mut idx = 0usize;
                $(
                    {
                        let entry = map.entry(idx);
                        let value = values.get(entry.db_index()).copied().flatten();
                        match <$ty as $crate::row::FieldDecode>::decode(value, entry.meta()) {
                            Ok(v) => out.$field = v,
                            Err(e) => {
                                if first_err.is_none() {
                                    first_err = Some(e);
                                }
                            }
                        }
                        idx += 1;
                    }
                )+
                let _ = idx;
                match first_err {
                    None => Ok(out),
                    Some(e) => Err(e),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::oid;

    fn desc(cols: &[(&str, Oid)]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(cols.len() as u16).to_be_bytes());
        for (name, type_oid) in cols {
            buf.extend_from_slice(name.as_bytes());
            buf.push(0);
            buf.extend_from_slice(&0_u32.to_be_bytes());
            buf.extend_from_slice(&0_i16.to_be_bytes());
            buf.extend_from_slice(&type_oid.to_be_bytes());
            buf.extend_from_slice(&(-1_i16).to_be_bytes());
            buf.extend_from_slice(&(-1_i32).to_be_bytes());
            buf.extend_from_slice(&0_u16.to_be_bytes());
        }
        buf
    }

    #[test]
    fn test_dest_map_by_name() {
        let buf = desc(&[("b", oid::TEXT), ("a", oid::INT4)]);
        let rd = RowDescription::parse(&buf).unwrap();
        let map = compute_dest_map(&rd, &["a", "b"]).unwrap();
        assert_eq!(map.entry(0).db_index(), 1);
        assert_eq!(map.entry(1).db_index(), 0);
        assert_eq!(map.entry(0).meta().type_oid, oid::INT4);
    }

    #[test]
    fn test_dest_map_missing_field() {
        let buf = desc(&[("a", oid::INT4)]);
        let rd = RowDescription::parse(&buf).unwrap();
        assert_eq!(
            compute_dest_map(&rd, &["a", "missing"]).unwrap_err(),
            Kind::FieldNotFound
        );
    }

    #[test]
    fn test_dest_map_extra_columns_ignored() {
        let buf = desc(&[("a", oid::INT4), ("ignored", oid::TEXT)]);
        let rd = RowDescription::parse(&buf).unwrap();
        let map = compute_dest_map(&rd, &["a"]).unwrap();
        assert_eq!(map.entries().len(), 1);
        assert_eq!(map.column_count(), 2);
    }

    record! {
        #[derive(Debug, Default, PartialEq)]
        struct Pair {
            num: i32,
            label: String,
        }
    }

    #[test]
    fn test_record_decode_by_name() {
        // Columns arrive in the opposite order of the struct fields
        let buf = desc(&[("label", oid::TEXT), ("num", oid::INT4)]);
        let rd = RowDescription::parse(&buf).unwrap();
        let map = compute_dest_map(&rd, Pair::FIELDS).unwrap();
        Pair::check(&map).unwrap();

        let values: Vec<Option<&[u8]>> = vec![Some(b"hi"), Some(b"42")];
        let pair = Pair::decode(&map, &values).unwrap();
        assert_eq!(
            pair,
            Pair {
                num: 42,
                label: "hi".into()
            }
        );
    }

    #[test]
    fn test_record_first_error_wins() {
        let buf = desc(&[("num", oid::INT4), ("label", oid::TEXT)]);
        let rd = RowDescription::parse(&buf).unwrap();
        let map = compute_dest_map(&rd, Pair::FIELDS).unwrap();

        // num is NULL (error) and label is valid; the NULL error wins
        let values: Vec<Option<&[u8]>> = vec![None, Some(b"ok")];
        assert_eq!(Pair::decode(&map, &values).unwrap_err(), Kind::UnexpectedNull);
    }

    #[test]
    fn test_record_incompatible_check() {
        let buf = desc(&[("num", oid::TEXT), ("label", oid::TEXT)]);
        let rd = RowDescription::parse(&buf).unwrap();
        let map = compute_dest_map(&rd, Pair::FIELDS).unwrap();
        assert_eq!(Pair::check(&map).unwrap_err(), Kind::IncompatibleFieldType);
    }
}
