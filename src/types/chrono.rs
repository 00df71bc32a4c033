//! Chrono crate adapters (NaiveDate, NaiveTime, NaiveDateTime, DateTime<Utc>).
//!
//! Decoding goes through the crate-local wire types; values outside chrono's
//! representable range (including the infinities) fail with
//! `protocol_value_error`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::error::Kind;
use crate::row::{ColumnMeta, FieldDecode};
use crate::types::datetime::{Date, Time, Timestamp, TimestampTz};

fn chrono_date(date: Date) -> Result<NaiveDate, Kind> {
    if date == Date::MIN || date == Date::MAX {
        return Err(Kind::ProtocolValueError);
    }
    let (year, month, day) = date.ymd();
    i32::try_from(year)
        .ok()
        .and_then(|year| NaiveDate::from_ymd_opt(year, month, day))
        .ok_or(Kind::ProtocolValueError)
}

impl FieldDecode for NaiveDate {
    fn check(meta: &ColumnMeta) -> Result<(), Kind> {
        Date::check(meta)
    }

    fn decode(value: Option<&[u8]>, meta: &ColumnMeta) -> Result<Self, Kind> {
        chrono_date(Date::decode(value, meta)?)
    }
}

impl FieldDecode for NaiveTime {
    fn check(meta: &ColumnMeta) -> Result<(), Kind> {
        Time::check(meta)
    }

    fn decode(value: Option<&[u8]>, meta: &ColumnMeta) -> Result<Self, Kind> {
        let time = Time::decode(value, meta)?;
        let usecs = time.microseconds();
        let secs = (usecs / 1_000_000) as u32;
        let nano = ((usecs % 1_000_000) * 1000) as u32;
        // 24:00:00 is representable on the wire but not in chrono
        NaiveTime::from_num_seconds_from_midnight_opt(secs, nano).ok_or(Kind::ProtocolValueError)
    }
}

impl FieldDecode for NaiveDateTime {
    fn check(meta: &ColumnMeta) -> Result<(), Kind> {
        Timestamp::check(meta)
    }

    fn decode(value: Option<&[u8]>, meta: &ColumnMeta) -> Result<Self, Kind> {
        let ts = Timestamp::decode(value, meta)?;
        if ts == Timestamp::MIN || ts == Timestamp::MAX {
            return Err(Kind::ProtocolValueError);
        }
        DateTime::<Utc>::from_timestamp_micros(ts.unix_micros())
            .map(|dt| dt.naive_utc())
            .ok_or(Kind::ProtocolValueError)
    }
}

impl FieldDecode for DateTime<Utc> {
    fn check(meta: &ColumnMeta) -> Result<(), Kind> {
        TimestampTz::check(meta)
    }

    fn decode(value: Option<&[u8]>, meta: &ColumnMeta) -> Result<Self, Kind> {
        let ts = TimestampTz::decode(value, meta)?;
        if ts == TimestampTz::MIN || ts == TimestampTz::MAX {
            return Err(Kind::ProtocolValueError);
        }
        DateTime::<Utc>::from_timestamp_micros(ts.unix_micros()).ok_or(Kind::ProtocolValueError)
    }
}
