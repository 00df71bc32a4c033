//! PostgreSQL date/time wire types.
//!
//! Integer-backed values covering the full server-side ranges:
//!
//! | Type        | OID  | Binary encoding                                |
//! |-------------|------|------------------------------------------------|
//! | date        | 1082 | int32 days since 2000-01-01                    |
//! | time        | 1083 | int64 microseconds since midnight              |
//! | timetz      | 1266 | int64 microseconds + int32 seconds west of UTC |
//! | timestamp   | 1114 | int64 microseconds since 2000-01-01 00:00:00   |
//! | timestamptz | 1184 | same as timestamp, instant is UTC              |
//! | interval    | 1186 | int64 microseconds + int32 days + int32 months |
//!
//! Binary sizes are strict (4/8/12/8/8/16 bytes). Values are normalized to
//! the Unix epoch on load by shifting with the PostgreSQL 2000-01-01 epoch.
//! `infinity` and `-infinity` map to each type's representable extrema.

use std::fmt;

use crate::error::Kind;

/// Days from 1970-01-01 to 2000-01-01.
const PG_EPOCH_DAYS: i32 = 10_957;

/// Microseconds from 1970-01-01 to 2000-01-01.
const PG_EPOCH_USECS: i64 = 946_684_800_000_000;

const USECS_PER_SEC: i64 = 1_000_000;
const USECS_PER_DAY: i64 = 86_400_000_000;

// === Civil calendar arithmetic ===
//
// Proleptic Gregorian day <-> (year, month, day) conversion over the whole
// PostgreSQL date range, which exceeds what calendar crates represent.

fn days_from_civil(year: i64, month: i64, day: i64) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let mp = (month + 9) % 12;
    let doy = (153 * mp + 2) / 5 + day - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };
    (y, m as u32, d as u32)
}

fn is_leap_year(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i64, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 0,
    }
}

// === Text parsing helpers ===

fn trim(s: &str) -> &str {
    s.trim_matches(|c: char| c.is_ascii_whitespace())
}

/// Strip a trailing case-insensitive " BC" suffix. Returns (rest, had_bc).
fn consume_bc(s: &str) -> (&str, bool) {
    let s = trim(s);
    if s.len() >= 2 && s[s.len() - 2..].eq_ignore_ascii_case("BC") {
        (trim(&s[..s.len() - 2]), true)
    } else {
        (s, false)
    }
}

/// Recognize "infinity" / "-infinity". Returns Some(negative).
fn parse_infinity(s: &str) -> Option<bool> {
    let s = trim(s);
    if s.eq_ignore_ascii_case("infinity") {
        Some(false)
    } else if s.eq_ignore_ascii_case("-infinity") {
        Some(true)
    } else {
        None
    }
}

/// Parse a run of ASCII digits; returns (value, rest).
fn parse_digits(s: &str) -> Result<(i64, &str), Kind> {
    let end = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    if end == 0 {
        return Err(Kind::ProtocolValueError);
    }
    let value = s[..end].parse().map_err(|_| Kind::ProtocolValueError)?;
    Ok((value, &s[end..]))
}

/// Parse `YYYY-MM-DD` into (year, month, day). Consumes the whole input.
fn parse_date_parts(s: &str) -> Result<(i64, u32, u32), Kind> {
    let s = trim(s);
    let (year, rest) = parse_digits(s)?;
    let rest = rest.strip_prefix('-').ok_or(Kind::ProtocolValueError)?;
    let (month, rest) = parse_digits(rest)?;
    let rest = rest.strip_prefix('-').ok_or(Kind::ProtocolValueError)?;
    let (day, rest) = parse_digits(rest)?;
    if !rest.is_empty() {
        return Err(Kind::ProtocolValueError);
    }
    let (month, day) = (month as u32, day as u32);
    if month < 1 || month > 12 || day < 1 || day > days_in_month(year, month) {
        return Err(Kind::ProtocolValueError);
    }
    Ok((year, month, day))
}

/// Parse a leading `HH:MM:SS[.ffffff]` component.
///
/// Fractional digits are scaled to microseconds regardless of count. When
/// `bounded` is set, the hours field is limited to 0-24 with 24:00:00 only
/// as the exact end-of-day instant. Returns (microseconds, rest).
fn parse_time_prefix(s: &str, bounded: bool) -> Result<(i64, &str), Kind> {
    let (hours, rest) = parse_digits(s)?;
    let rest = rest.strip_prefix(':').ok_or(Kind::ProtocolValueError)?;
    let (minutes, rest) = parse_digits(rest)?;
    let rest = rest.strip_prefix(':').ok_or(Kind::ProtocolValueError)?;
    let (seconds, mut rest) = parse_digits(rest)?;

    let mut usecs_frac: i64 = 0;
    if let Some(frac_str) = rest.strip_prefix('.') {
        let end = frac_str
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(frac_str.len());
        if end == 0 {
            return Err(Kind::ProtocolValueError);
        }
        let digits = &frac_str[..end];
        let mut frac: i64 = digits.parse().map_err(|_| Kind::ProtocolValueError)?;
        if digits.len() > 6 {
            for _ in 0..digits.len() - 6 {
                frac /= 10;
            }
        } else {
            for _ in 0..6 - digits.len() {
                frac *= 10;
            }
        }
        usecs_frac = frac;
        rest = &frac_str[end..];
    }

    if minutes > 59 || seconds > 59 {
        return Err(Kind::ProtocolValueError);
    }
    if bounded {
        if hours > 24 {
            return Err(Kind::ProtocolValueError);
        }
        if hours == 24 && (minutes != 0 || seconds != 0 || usecs_frac != 0) {
            return Err(Kind::ProtocolValueError);
        }
    }

    let total = hours
        .checked_mul(3600 * USECS_PER_SEC)
        .and_then(|t| t.checked_add(minutes * 60 * USECS_PER_SEC))
        .and_then(|t| t.checked_add(seconds * USECS_PER_SEC))
        .and_then(|t| t.checked_add(usecs_frac))
        .ok_or(Kind::ProtocolValueError)?;
    Ok((total, rest))
}

/// Parse a timezone suffix: empty, `Z`/`UTC`/`UT`/`GMT`, `±HH`, `±HHMM` or
/// `±HH:MM`, limited to ±15:59. Returns the offset in seconds east of UTC.
fn parse_tz_suffix(s: &str) -> Result<i32, Kind> {
    let s = trim(s);
    if s.is_empty() {
        return Ok(0);
    }
    if s.eq_ignore_ascii_case("Z")
        || s.eq_ignore_ascii_case("UTC")
        || s.eq_ignore_ascii_case("UT")
        || s.eq_ignore_ascii_case("GMT")
    {
        return Ok(0);
    }

    let (sign, rest) = match s.as_bytes()[0] {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return Err(Kind::ProtocolValueError),
    };

    let digit_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let (hours, minutes) = match digit_end {
        // ±HH followed by nothing or :MM
        1 | 2 => {
            let hours: i32 = rest[..digit_end]
                .parse()
                .map_err(|_| Kind::ProtocolValueError)?;
            let tail = &rest[digit_end..];
            let minutes = if tail.is_empty() {
                0
            } else {
                let mm = tail.strip_prefix(':').ok_or(Kind::ProtocolValueError)?;
                if mm.len() != 2 || !mm.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(Kind::ProtocolValueError);
                }
                mm.parse::<i32>().map_err(|_| Kind::ProtocolValueError)?
            };
            (hours, minutes)
        }
        // ±HHMM
        4 if digit_end == rest.len() => {
            let hours: i32 = rest[..2].parse().map_err(|_| Kind::ProtocolValueError)?;
            let minutes: i32 = rest[2..4].parse().map_err(|_| Kind::ProtocolValueError)?;
            (hours, minutes)
        }
        _ => return Err(Kind::ProtocolValueError),
    };

    if hours > 15 || minutes > 59 {
        return Err(Kind::ProtocolValueError);
    }
    Ok(sign * (hours * 3600 + minutes * 60))
}

fn fixed_bytes<const N: usize>(data: &[u8]) -> Result<[u8; N], Kind> {
    data.try_into().map_err(|_| Kind::ProtocolValueError)
}

struct TimeOfDay(i64);

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.0 / USECS_PER_SEC;
        let frac = self.0 % USECS_PER_SEC;
        write!(
            f,
            "{:02}:{:02}:{:02}",
            secs / 3600,
            (secs / 60) % 60,
            secs % 60
        )?;
        if frac != 0 {
            let mut digits = format!("{:06}", frac);
            while digits.ends_with('0') {
                digits.pop();
            }
            write!(f, ".{}", digits)?;
        }
        Ok(())
    }
}

fn fmt_date_parts(f: &mut fmt::Formatter<'_>, year: i64, month: u32, day: u32) -> fmt::Result {
    // Years <= 0 display as BC: year 0 is 1 BC
    let display_year = if year <= 0 { 1 - year } else { year };
    write!(f, "{:04}-{:02}-{:02}", display_year, month, day)
}

fn fmt_tz_offset(f: &mut fmt::Formatter<'_>, offset_secs: i32) -> fmt::Result {
    let sign = if offset_secs < 0 { '-' } else { '+' };
    let abs = offset_secs.unsigned_abs();
    write!(f, "{}{:02}", sign, abs / 3600)?;
    if abs % 3600 != 0 {
        write!(f, ":{:02}", (abs / 60) % 60)?;
    }
    Ok(())
}

// === date ===

/// A calendar date; days since 1970-01-01.
///
/// [`Date::MIN`] and [`Date::MAX`] stand for `-infinity` and `infinity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Date {
    days: i32,
}

impl Date {
    /// `-infinity`
    pub const MIN: Date = Date { days: i32::MIN };
    /// `infinity`
    pub const MAX: Date = Date { days: i32::MAX };

    /// Construct from days since 1970-01-01.
    pub const fn from_unix_days(days: i32) -> Self {
        Self { days }
    }

    /// Construct from a proleptic Gregorian date. Year 0 is 1 BC.
    pub fn from_ymd(year: i64, month: u32, day: u32) -> Option<Self> {
        if month < 1 || month > 12 || day < 1 || day > days_in_month(year, month) {
            return None;
        }
        let days = days_from_civil(year, month as i64, day as i64);
        i32::try_from(days).ok().map(|days| Self { days })
    }

    /// Days since 1970-01-01.
    pub const fn unix_days(&self) -> i32 {
        self.days
    }

    /// (year, month, day); year 0 is 1 BC.
    pub fn ymd(&self) -> (i64, u32, u32) {
        civil_from_days(self.days as i64)
    }

    /// Parse the text encoding: `YYYY-MM-DD`, optional trailing ` BC`,
    /// `infinity` / `-infinity`.
    pub fn parse_text(s: &str) -> Result<Self, Kind> {
        if let Some(neg) = parse_infinity(s) {
            return Ok(if neg { Date::MIN } else { Date::MAX });
        }
        let (s, bc) = consume_bc(s);
        let (year, month, day) = parse_date_parts(s)?;
        let year = if bc { 1 - year } else { year };
        Date::from_ymd(year, month, day).ok_or(Kind::ProtocolValueError)
    }

    /// Parse the binary encoding: int32 days since 2000-01-01, exactly 4
    /// bytes. The server's infinities arrive as the int32 extrema.
    pub fn parse_binary(data: &[u8]) -> Result<Self, Kind> {
        let pg_days = i32::from_be_bytes(fixed_bytes::<4>(data)?);
        match pg_days {
            i32::MAX => Ok(Date::MAX),
            i32::MIN => Ok(Date::MIN),
            _ => pg_days
                .checked_add(PG_EPOCH_DAYS)
                .map(Date::from_unix_days)
                .ok_or(Kind::ProtocolValueError),
        }
    }

    /// Encode to the binary wire format.
    pub fn to_binary(&self) -> [u8; 4] {
        let pg_days = match *self {
            Date::MAX => i32::MAX,
            Date::MIN => i32::MIN,
            _ => self.days - PG_EPOCH_DAYS,
        };
        pg_days.to_be_bytes()
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Date::MAX => write!(f, "infinity"),
            Date::MIN => write!(f, "-infinity"),
            _ => {
                let (year, month, day) = self.ymd();
                fmt_date_parts(f, year, month, day)?;
                if year <= 0 {
                    write!(f, " BC")?;
                }
                Ok(())
            }
        }
    }
}

// === time ===

/// Time of day; microseconds since midnight. `24:00:00` is representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Time {
    usecs: i64,
}

impl Time {
    /// Construct from microseconds since midnight (0 to 24h inclusive).
    pub fn from_microseconds(usecs: i64) -> Option<Self> {
        if (0..=USECS_PER_DAY).contains(&usecs) {
            Some(Self { usecs })
        } else {
            None
        }
    }

    /// Construct from hour/minute/second/microsecond components.
    pub fn from_hms_micro(hour: u32, minute: u32, second: u32, micro: u32) -> Option<Self> {
        if minute > 59 || second > 59 || micro > 999_999 {
            return None;
        }
        let usecs = hour as i64 * 3_600 * USECS_PER_SEC
            + minute as i64 * 60 * USECS_PER_SEC
            + second as i64 * USECS_PER_SEC
            + micro as i64;
        Self::from_microseconds(usecs)
    }

    /// Microseconds since midnight.
    pub const fn microseconds(&self) -> i64 {
        self.usecs
    }

    /// Parse the text encoding: `HH:MM:SS[.ffffff]`, 24-hour clock,
    /// `24:00:00` allowed.
    pub fn parse_text(s: &str) -> Result<Self, Kind> {
        let s = trim(s);
        let (usecs, rest) = parse_time_prefix(s, true)?;
        if !trim(rest).is_empty() {
            return Err(Kind::ProtocolValueError);
        }
        Time::from_microseconds(usecs).ok_or(Kind::ProtocolValueError)
    }

    /// Parse the binary encoding: int64 microseconds, exactly 8 bytes.
    pub fn parse_binary(data: &[u8]) -> Result<Self, Kind> {
        let usecs = i64::from_be_bytes(fixed_bytes::<8>(data)?);
        Time::from_microseconds(usecs).ok_or(Kind::ProtocolValueError)
    }

    /// Encode to the binary wire format.
    pub fn to_binary(&self) -> [u8; 8] {
        self.usecs.to_be_bytes()
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", TimeOfDay(self.usecs))
    }
}

// === timetz ===

/// Time of day with a UTC offset.
///
/// The offset is seconds east of UTC; the wire stores seconds west, so the
/// value is negated on load and store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TimeTz {
    /// Time since midnight
    pub time: Time,
    /// Seconds east of UTC
    pub offset_secs: i32,
}

impl TimeTz {
    /// Construct from a time and an offset in seconds east of UTC.
    pub const fn new(time: Time, offset_secs: i32) -> Self {
        Self { time, offset_secs }
    }

    /// Parse the text encoding: `HH:MM:SS[.ffffff]±HH[:MM]`.
    pub fn parse_text(s: &str) -> Result<Self, Kind> {
        let s = trim(s);
        let (usecs, rest) = parse_time_prefix(s, true)?;
        let time = Time::from_microseconds(usecs).ok_or(Kind::ProtocolValueError)?;
        let offset_secs = parse_tz_suffix(rest)?;
        Ok(TimeTz { time, offset_secs })
    }

    /// Parse the binary encoding: int64 microseconds + int32 seconds west of
    /// UTC, exactly 12 bytes. The offset sign is flipped to seconds east.
    pub fn parse_binary(data: &[u8]) -> Result<Self, Kind> {
        let data = fixed_bytes::<12>(data)?;
        let usecs = i64::from_be_bytes(data[..8].try_into().unwrap());
        let west_secs = i32::from_be_bytes(data[8..].try_into().unwrap());
        let time = Time::from_microseconds(usecs).ok_or(Kind::ProtocolValueError)?;
        Ok(TimeTz {
            time,
            offset_secs: -west_secs,
        })
    }

    /// Encode to the binary wire format (offset stored as seconds west).
    pub fn to_binary(&self) -> [u8; 12] {
        let mut out = [0u8; 12];
        out[..8].copy_from_slice(&self.time.to_binary());
        out[8..].copy_from_slice(&(-self.offset_secs).to_be_bytes());
        out
    }
}

impl fmt::Display for TimeTz {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.time)?;
        fmt_tz_offset(f, self.offset_secs)
    }
}

// === timestamp ===

/// Date and time without timezone; microseconds since 1970-01-01 00:00:00.
///
/// [`Timestamp::MIN`] and [`Timestamp::MAX`] stand for `-infinity` and
/// `infinity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp {
    usecs: i64,
}

impl Timestamp {
    /// `-infinity`
    pub const MIN: Timestamp = Timestamp { usecs: i64::MIN };
    /// `infinity`
    pub const MAX: Timestamp = Timestamp { usecs: i64::MAX };

    /// Construct from microseconds since 1970-01-01 00:00:00.
    pub const fn from_unix_micros(usecs: i64) -> Self {
        Self { usecs }
    }

    /// Construct from a date and a time of day.
    pub fn from_date_time(date: Date, time: Time) -> Option<Self> {
        (date.unix_days() as i64)
            .checked_mul(USECS_PER_DAY)
            .and_then(|d| d.checked_add(time.microseconds()))
            .map(Self::from_unix_micros)
    }

    /// Microseconds since 1970-01-01 00:00:00.
    pub const fn unix_micros(&self) -> i64 {
        self.usecs
    }

    /// The date part.
    pub fn date(&self) -> Date {
        Date::from_unix_days(self.usecs.div_euclid(USECS_PER_DAY) as i32)
    }

    /// Microseconds since midnight of the date part.
    pub fn time_of_day(&self) -> i64 {
        self.usecs.rem_euclid(USECS_PER_DAY)
    }

    /// Parse the text encoding: `YYYY-MM-DD HH:MM:SS[.ffffff]`, optional
    /// ` BC`, `infinity` / `-infinity`.
    pub fn parse_text(s: &str) -> Result<Self, Kind> {
        if let Some(neg) = parse_infinity(s) {
            return Ok(if neg { Timestamp::MIN } else { Timestamp::MAX });
        }
        let (s, bc) = consume_bc(s);
        let (usecs, rest) = parse_timestamp_text(s, bc)?;
        if !trim(rest).is_empty() {
            return Err(Kind::ProtocolValueError);
        }
        Ok(Timestamp::from_unix_micros(usecs))
    }

    /// Parse the binary encoding: int64 microseconds since 2000-01-01,
    /// exactly 8 bytes. The server's infinities arrive as the int64 extrema.
    pub fn parse_binary(data: &[u8]) -> Result<Self, Kind> {
        parse_binary_pg_micros(data).map(Timestamp::from_unix_micros)
    }

    /// Encode to the binary wire format.
    pub fn to_binary(&self) -> [u8; 8] {
        encode_binary_pg_micros(self.usecs)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Timestamp::MAX => write!(f, "infinity"),
            Timestamp::MIN => write!(f, "-infinity"),
            _ => fmt_timestamp_parts(f, self.usecs, ""),
        }
    }
}

/// Shared date+time text parser; returns Unix microseconds plus the
/// unconsumed suffix (empty or a timezone).
fn parse_timestamp_text(s: &str, bc: bool) -> Result<(i64, &str), Kind> {
    let s = trim(s);
    let sep = s.find(&[' ', 'T'][..]).ok_or(Kind::ProtocolValueError)?;
    let (year, month, day) = parse_date_parts(&s[..sep])?;
    let year = if bc { 1 - year } else { year };
    let date = Date::from_ymd(year, month, day).ok_or(Kind::ProtocolValueError)?;

    let time_str = trim(&s[sep + 1..]);
    let (tod, rest) = parse_time_prefix(time_str, true)?;
    let time = Time::from_microseconds(tod).ok_or(Kind::ProtocolValueError)?;

    let ts = Timestamp::from_date_time(date, time).ok_or(Kind::ProtocolValueError)?;
    Ok((ts.unix_micros(), rest))
}

fn parse_binary_pg_micros(data: &[u8]) -> Result<i64, Kind> {
    let pg_usecs = i64::from_be_bytes(fixed_bytes::<8>(data)?);
    match pg_usecs {
        i64::MAX => Ok(i64::MAX),
        i64::MIN => Ok(i64::MIN),
        _ => pg_usecs
            .checked_add(PG_EPOCH_USECS)
            .ok_or(Kind::ProtocolValueError),
    }
}

fn encode_binary_pg_micros(usecs: i64) -> [u8; 8] {
    let pg_usecs = match usecs {
        i64::MAX => i64::MAX,
        i64::MIN => i64::MIN,
        _ => usecs - PG_EPOCH_USECS,
    };
    pg_usecs.to_be_bytes()
}

fn fmt_timestamp_parts(f: &mut fmt::Formatter<'_>, usecs: i64, tz: &str) -> fmt::Result {
    let (year, month, day) = civil_from_days(usecs.div_euclid(USECS_PER_DAY));
    fmt_date_parts(f, year, month, day)?;
    write!(f, " {}", TimeOfDay(usecs.rem_euclid(USECS_PER_DAY)))?;
    f.write_str(tz)?;
    if year <= 0 {
        write!(f, " BC")?;
    }
    Ok(())
}

// === timestamptz ===

/// An absolute instant; microseconds since 1970-01-01 00:00:00 UTC.
///
/// [`TimestampTz::MIN`] and [`TimestampTz::MAX`] stand for `-infinity` and
/// `infinity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimestampTz {
    usecs: i64,
}

impl TimestampTz {
    /// `-infinity`
    pub const MIN: TimestampTz = TimestampTz { usecs: i64::MIN };
    /// `infinity`
    pub const MAX: TimestampTz = TimestampTz { usecs: i64::MAX };

    /// Construct from microseconds since 1970-01-01 00:00:00 UTC.
    pub const fn from_unix_micros(usecs: i64) -> Self {
        Self { usecs }
    }

    /// Microseconds since 1970-01-01 00:00:00 UTC.
    pub const fn unix_micros(&self) -> i64 {
        self.usecs
    }

    /// Parse the text encoding:
    /// `YYYY-MM-DD HH:MM:SS[.ffffff]±HH[:MM]`, optional ` BC`,
    /// `infinity` / `-infinity`. The offset is folded into the UTC instant.
    pub fn parse_text(s: &str) -> Result<Self, Kind> {
        if let Some(neg) = parse_infinity(s) {
            return Ok(if neg { TimestampTz::MIN } else { TimestampTz::MAX });
        }
        let (s, bc) = consume_bc(s);
        let (local_usecs, rest) = parse_timestamp_text(s, bc)?;
        let offset_secs = parse_tz_suffix(rest)?;
        local_usecs
            .checked_sub(offset_secs as i64 * USECS_PER_SEC)
            .map(TimestampTz::from_unix_micros)
            .ok_or(Kind::ProtocolValueError)
    }

    /// Parse the binary encoding: int64 microseconds since
    /// 2000-01-01 00:00:00 UTC, exactly 8 bytes.
    pub fn parse_binary(data: &[u8]) -> Result<Self, Kind> {
        parse_binary_pg_micros(data).map(TimestampTz::from_unix_micros)
    }

    /// Encode to the binary wire format.
    pub fn to_binary(&self) -> [u8; 8] {
        encode_binary_pg_micros(self.usecs)
    }
}

impl fmt::Display for TimestampTz {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            TimestampTz::MAX => write!(f, "infinity"),
            TimestampTz::MIN => write!(f, "-infinity"),
            _ => fmt_timestamp_parts(f, self.usecs, "+00"),
        }
    }
}

// === interval ===

/// A duration as months + days + microseconds, the three independently
/// signed components PostgreSQL tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Interval {
    pub months: i32,
    pub days: i32,
    pub usecs: i64,
}

impl Interval {
    /// Construct from components.
    pub const fn new(months: i32, days: i32, usecs: i64) -> Self {
        Self {
            months,
            days,
            usecs,
        }
    }

    /// Parse the text encoding, e.g. `1 year 2 mons 3 days 04:05:06.000007`.
    ///
    /// Every singular/plural unit of {year, mon, day, hour, minute, second}
    /// is accepted and combined additively. A sign before an `HH:MM:SS`
    /// component applies to the whole component.
    pub fn parse_text(s: &str) -> Result<Self, Kind> {
        let s = trim(s);
        if s.is_empty() {
            return Err(Kind::ProtocolValueError);
        }

        let mut out = Interval::default();
        let mut rest = s;

        while !rest.is_empty() {
            rest = rest.trim_start_matches(|c: char| c.is_ascii_whitespace());
            if rest.is_empty() {
                break;
            }

            let part_end = rest
                .find(|c: char| c.is_ascii_whitespace())
                .unwrap_or(rest.len());
            let part = &rest[..part_end];

            if part.contains(':') {
                // Signed HH:MM:SS[.ffffff]; the sign covers the whole component
                let (sign, body) = match part.as_bytes()[0] {
                    b'-' => (-1, &part[1..]),
                    b'+' => (1, &part[1..]),
                    _ => (1, part),
                };
                let (usecs, tail) = parse_time_prefix(body, false)?;
                if !tail.is_empty() {
                    return Err(Kind::ProtocolValueError);
                }
                out.usecs = out
                    .usecs
                    .checked_add(sign * usecs)
                    .ok_or(Kind::ProtocolValueError)?;
                rest = &rest[part_end..];
            } else {
                // "value unit"
                let (sign, body) = match rest.as_bytes()[0] {
                    b'-' => (-1i64, &rest[1..]),
                    b'+' => (1i64, &rest[1..]),
                    _ => (1i64, rest),
                };
                let (value, after_num) = parse_digits(body)?;
                let value = sign * value;

                let after_num = after_num.trim_start_matches(|c: char| c.is_ascii_whitespace());
                let unit_end = after_num
                    .find(|c: char| !c.is_ascii_alphabetic())
                    .unwrap_or(after_num.len());
                let unit = &after_num[..unit_end];

                match unit {
                    "year" | "years" => {
                        out.months = add_i32(out.months, value.checked_mul(12))?;
                    }
                    "mon" | "mons" => out.months = add_i32(out.months, Some(value))?,
                    "day" | "days" => out.days = add_i32(out.days, Some(value))?,
                    "hour" | "hours" => {
                        out.usecs = add_usecs(out.usecs, value, 3600 * USECS_PER_SEC)?
                    }
                    "minute" | "minutes" => {
                        out.usecs = add_usecs(out.usecs, value, 60 * USECS_PER_SEC)?
                    }
                    "second" | "seconds" => out.usecs = add_usecs(out.usecs, value, USECS_PER_SEC)?,
                    _ => return Err(Kind::ProtocolValueError),
                }
                rest = &after_num[unit_end..];
            }
        }

        Ok(out)
    }

    /// Parse the binary encoding: int64 microseconds + int32 days + int32
    /// months, exactly 16 bytes.
    pub fn parse_binary(data: &[u8]) -> Result<Self, Kind> {
        let data = fixed_bytes::<16>(data)?;
        Ok(Interval {
            usecs: i64::from_be_bytes(data[..8].try_into().unwrap()),
            days: i32::from_be_bytes(data[8..12].try_into().unwrap()),
            months: i32::from_be_bytes(data[12..].try_into().unwrap()),
        })
    }

    /// Encode to the binary wire format.
    pub fn to_binary(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[..8].copy_from_slice(&self.usecs.to_be_bytes());
        out[8..12].copy_from_slice(&self.days.to_be_bytes());
        out[12..].copy_from_slice(&self.months.to_be_bytes());
        out
    }
}

fn add_i32(current: i32, value: Option<i64>) -> Result<i32, Kind> {
    let value = value.ok_or(Kind::ProtocolValueError)?;
    i32::try_from(value)
        .ok()
        .and_then(|v| current.checked_add(v))
        .ok_or(Kind::ProtocolValueError)
}

fn add_usecs(current: i64, value: i64, scale: i64) -> Result<i64, Kind> {
    value
        .checked_mul(scale)
        .and_then(|v| current.checked_add(v))
        .ok_or(Kind::ProtocolValueError)
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut wrote = false;
        let years = self.months / 12;
        let mons = self.months % 12;

        if years != 0 {
            write!(f, "{} year{}", years, if years.abs() == 1 { "" } else { "s" })?;
            wrote = true;
        }
        if mons != 0 {
            if wrote {
                write!(f, " ")?;
            }
            write!(f, "{} mon{}", mons, if mons.abs() == 1 { "" } else { "s" })?;
            wrote = true;
        }
        if self.days != 0 {
            if wrote {
                write!(f, " ")?;
            }
            write!(
                f,
                "{} day{}",
                self.days,
                if self.days.abs() == 1 { "" } else { "s" }
            )?;
            wrote = true;
        }
        if self.usecs != 0 || !wrote {
            if wrote {
                write!(f, " ")?;
            }
            if self.usecs < 0 {
                write!(f, "-")?;
            }
            let abs = self.usecs.unsigned_abs() as i64;
            let secs = abs / USECS_PER_SEC;
            write!(
                f,
                "{:02}:{:02}:{:02}",
                secs / 3600,
                (secs / 60) % 60,
                secs % 60
            )?;
            let frac = abs % USECS_PER_SEC;
            if frac != 0 {
                write!(f, ".{:06}", frac)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // --- date ---

    #[test]
    fn test_date_text() {
        let date = Date::parse_text("1977-06-21").unwrap();
        assert_eq!(date.ymd(), (1977, 6, 21));
        assert_eq!(date.to_string(), "1977-06-21");
    }

    #[test]
    fn test_date_binary() {
        // 1977-06-21 is -8229 days from 2000-01-01
        let date = Date::parse_binary(&[0xFF, 0xFF, 0xDF, 0xDB]).unwrap();
        assert_eq!(date.ymd(), (1977, 6, 21));
        assert_eq!(date.to_string(), "1977-06-21");
    }

    #[test]
    fn test_date_binary_strict_size() {
        assert_eq!(Date::parse_binary(&[0, 0, 0]), Err(Kind::ProtocolValueError));
        assert_eq!(
            Date::parse_binary(&[0, 0, 0, 0, 0]),
            Err(Kind::ProtocolValueError)
        );
    }

    #[test]
    fn test_date_bc() {
        let date = Date::parse_text("0001-01-01 BC").unwrap();
        assert_eq!(date.ymd(), (0, 1, 1));
        assert_eq!(date.to_string(), "0001-01-01 BC");
    }

    #[test]
    fn test_date_extrema() {
        let date = Date::parse_text("5874897-12-31").unwrap();
        assert_eq!(date.ymd(), (5_874_897, 12, 31));

        assert_eq!(Date::parse_text("infinity").unwrap(), Date::MAX);
        assert_eq!(Date::parse_text("-infinity").unwrap(), Date::MIN);
        assert_eq!(Date::parse_binary(&i32::MAX.to_be_bytes()).unwrap(), Date::MAX);
        assert_eq!(Date::parse_binary(&i32::MIN.to_be_bytes()).unwrap(), Date::MIN);
    }

    #[test]
    fn test_date_roundtrip() {
        for s in ["2024-02-29", "0001-01-01", "1969-12-31", "0004-03-01 BC"] {
            let date = Date::parse_text(s).unwrap();
            assert_eq!(date.to_string(), s);
            assert_eq!(Date::parse_binary(&date.to_binary()).unwrap(), date);
        }
    }

    #[test]
    fn test_date_invalid() {
        assert!(Date::parse_text("2024-13-01").is_err());
        assert!(Date::parse_text("2023-02-29").is_err());
        assert!(Date::parse_text("2024-01").is_err());
        assert!(Date::parse_text("2024-01-01x").is_err());
    }

    // --- time ---

    #[test]
    fn test_time_binary() {
        // 75,979,000,000 us = 21:06:19
        let time = Time::parse_binary(&[0x00, 0x00, 0x00, 0x11, 0xB0, 0xB3, 0x88, 0xC0]).unwrap();
        assert_eq!(time.microseconds(), 75_979_000_000);
        assert_eq!(time.to_string(), "21:06:19");
    }

    #[test]
    fn test_time_text_fractions() {
        assert_eq!(
            Time::parse_text("12:00:00.5").unwrap().microseconds(),
            12 * 3600 * 1_000_000 + 500_000
        );
        assert_eq!(
            Time::parse_text("12:00:00.123456").unwrap().microseconds(),
            12 * 3600 * 1_000_000 + 123_456
        );
        assert_eq!(
            Time::parse_text("00:00:00.000001").unwrap().microseconds(),
            1
        );
    }

    #[test]
    fn test_time_end_of_day() {
        let time = Time::parse_text("24:00:00").unwrap();
        assert_eq!(time.microseconds(), 86_400_000_000);
        assert_eq!(time.to_string(), "24:00:00");
        assert_eq!(Time::parse_binary(&time.to_binary()).unwrap(), time);

        assert!(Time::parse_text("24:00:01").is_err());
        assert!(Time::parse_text("25:00:00").is_err());
    }

    #[test]
    fn test_time_invalid() {
        assert!(Time::parse_text("12:60:00").is_err());
        assert!(Time::parse_text("12:00:61").is_err());
        assert!(Time::parse_text("12:00").is_err());
        assert!(Time::parse_text("12:00:00trailing").is_err());
        assert!(Time::parse_binary(&[0; 7]).is_err());
    }

    #[test]
    fn test_time_roundtrip() {
        for s in ["00:00:00", "21:06:19", "23:59:59.999999", "01:02:03.04"] {
            let time = Time::parse_text(s).unwrap();
            assert_eq!(Time::parse_text(&time.to_string()).unwrap(), time);
            assert_eq!(Time::parse_binary(&time.to_binary()).unwrap(), time);
        }
    }

    // --- timetz ---

    #[test]
    fn test_timetz_binary() {
        // 12:34:23.435350 at seconds-west -18000, negated to +05:00
        let bytes = [
            0x00, 0x00, 0x00, 0x0A, 0x89, 0xE9, 0x36, 0x56, 0xFF, 0xFF, 0xB9, 0xB0,
        ];
        let value = TimeTz::parse_binary(&bytes).unwrap();
        assert_eq!(value.time.microseconds(), 45_263_435_350);
        assert_eq!(value.offset_secs, 18_000);
        assert_eq!(value.to_string(), "12:34:23.43535+05");
    }

    #[test]
    fn test_timetz_text_offsets() {
        assert_eq!(TimeTz::parse_text("01:02:03+05").unwrap().offset_secs, 18_000);
        assert_eq!(
            TimeTz::parse_text("01:02:03+05:30").unwrap().offset_secs,
            19_800
        );
        assert_eq!(
            TimeTz::parse_text("01:02:03+0530").unwrap().offset_secs,
            19_800
        );
        assert_eq!(TimeTz::parse_text("01:02:03-08").unwrap().offset_secs, -28_800);
        assert_eq!(TimeTz::parse_text("01:02:03Z").unwrap().offset_secs, 0);
        assert_eq!(TimeTz::parse_text("01:02:03").unwrap().offset_secs, 0);
    }

    #[test]
    fn test_timetz_offset_limit() {
        assert!(TimeTz::parse_text("01:02:03+15:59").is_ok());
        assert!(TimeTz::parse_text("01:02:03+16:00").is_err());
        assert!(TimeTz::parse_text("01:02:03+05:60").is_err());
    }

    #[test]
    fn test_timetz_roundtrip() {
        let value = TimeTz::parse_text("12:34:23.435350+05:30").unwrap();
        assert_eq!(TimeTz::parse_text(&value.to_string()).unwrap(), value);
        assert_eq!(TimeTz::parse_binary(&value.to_binary()).unwrap(), value);
    }

    #[test]
    fn test_timetz_binary_strict_size() {
        assert!(TimeTz::parse_binary(&[0; 11]).is_err());
        assert!(TimeTz::parse_binary(&[0; 13]).is_err());
    }

    // --- timestamp ---

    #[test]
    fn test_timestamp_text() {
        let ts = Timestamp::parse_text("2026-02-08 20:03:00").unwrap();
        assert_eq!(ts.to_string(), "2026-02-08 20:03:00");
    }

    #[test]
    fn test_timestamp_binary_epoch_shift() {
        // 2000-01-01 00:00:00 on the wire is zero
        let ts = Timestamp::parse_binary(&0_i64.to_be_bytes()).unwrap();
        assert_eq!(ts.unix_micros(), 946_684_800_000_000);
        assert_eq!(ts.to_string(), "2000-01-01 00:00:00");
    }

    #[test]
    fn test_timestamp_infinity() {
        assert_eq!(Timestamp::parse_text("infinity").unwrap(), Timestamp::MAX);
        assert_eq!(Timestamp::parse_text("-infinity").unwrap(), Timestamp::MIN);
        assert_eq!(
            Timestamp::parse_binary(&i64::MAX.to_be_bytes()).unwrap(),
            Timestamp::MAX
        );
        assert_eq!(
            Timestamp::parse_binary(&i64::MIN.to_be_bytes()).unwrap(),
            Timestamp::MIN
        );
        assert_eq!(Timestamp::MAX.to_string(), "infinity");
    }

    #[test]
    fn test_timestamp_bc() {
        let ts = Timestamp::parse_text("0001-01-01 00:00:00 BC").unwrap();
        assert_eq!(ts.date().ymd(), (0, 1, 1));
        assert_eq!(ts.to_string(), "0001-01-01 00:00:00 BC");
    }

    #[test]
    fn test_timestamp_roundtrip() {
        for s in [
            "1970-01-01 00:00:00",
            "1969-07-20 20:17:40",
            "2024-02-29 23:59:59.999999",
        ] {
            let ts = Timestamp::parse_text(s).unwrap();
            assert_eq!(ts.to_string(), s);
            assert_eq!(Timestamp::parse_binary(&ts.to_binary()).unwrap(), ts);
        }
    }

    #[test]
    fn test_timestamp_binary_strict_size() {
        assert!(Timestamp::parse_binary(&[0; 7]).is_err());
        assert!(Timestamp::parse_binary(&[0; 9]).is_err());
    }

    // --- timestamptz ---

    #[test]
    fn test_timestamptz_offset_folded() {
        let utc = TimestampTz::parse_text("2024-01-15 10:00:00+00").unwrap();
        let plus_two = TimestampTz::parse_text("2024-01-15 12:00:00+02").unwrap();
        assert_eq!(utc, plus_two);

        let minus = TimestampTz::parse_text("2024-01-15 08:00:00-02:00").unwrap();
        assert_eq!(utc, minus);
    }

    #[test]
    fn test_timestamptz_binary_matches_timestamp() {
        let bytes = 86_400_000_000_i64.to_be_bytes();
        let ts = TimestampTz::parse_binary(&bytes).unwrap();
        assert_eq!(ts.to_string(), "2000-01-02 00:00:00+00");
    }

    #[test]
    fn test_timestamptz_roundtrip() {
        let ts = TimestampTz::parse_text("1977-06-21 21:06:19.5+05:30").unwrap();
        assert_eq!(TimestampTz::parse_text(&ts.to_string()).unwrap(), ts);
        assert_eq!(TimestampTz::parse_binary(&ts.to_binary()).unwrap(), ts);
    }

    // --- interval ---

    #[test]
    fn test_interval_binary() {
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&1_i64.to_be_bytes());
        bytes[8..12].copy_from_slice(&1_i32.to_be_bytes());
        bytes[12..].copy_from_slice(&1_i32.to_be_bytes());

        let inv = Interval::parse_binary(&bytes).unwrap();
        assert_eq!(inv, Interval::new(1, 1, 1));
    }

    #[test]
    fn test_interval_text_full() {
        let inv = Interval::parse_text("1 year 2 mons 3 days 04:05:06.000007").unwrap();
        assert_eq!(inv.months, 14);
        assert_eq!(inv.days, 3);
        assert_eq!(
            inv.usecs,
            (4 * 3600 + 5 * 60 + 6) * 1_000_000 + 7
        );
    }

    #[test]
    fn test_interval_units_additive() {
        let inv =
            Interval::parse_text("2 years 1 mon 5 days 1 hour 2 minutes 3 seconds").unwrap();
        assert_eq!(inv.months, 25);
        assert_eq!(inv.days, 5);
        assert_eq!(inv.usecs, (3600 + 120 + 3) * 1_000_000);

        // Same unit repeated keeps accumulating
        let inv = Interval::parse_text("1 day 1 day").unwrap();
        assert_eq!(inv.days, 2);
    }

    #[test]
    fn test_interval_signed_time_part() {
        // The sign applies to the whole HH:MM:SS component
        let inv = Interval::parse_text("-04:05:06").unwrap();
        assert_eq!(inv.usecs, -((4 * 3600 + 5 * 60 + 6) * 1_000_000));

        let inv = Interval::parse_text("1 day -01:00:00").unwrap();
        assert_eq!(inv.days, 1);
        assert_eq!(inv.usecs, -3600 * 1_000_000);
    }

    #[test]
    fn test_interval_negative_units() {
        let inv = Interval::parse_text("-1 year -2 mons").unwrap();
        assert_eq!(inv.months, -14);
    }

    #[test]
    fn test_interval_invalid_unit() {
        assert!(Interval::parse_text("3 fortnights").is_err());
        assert!(Interval::parse_text("").is_err());
    }

    #[test]
    fn test_interval_display_roundtrip() {
        for inv in [
            Interval::new(14, 3, (4 * 3600 + 5 * 60 + 6) * 1_000_000 + 7),
            Interval::new(1, 1, 1),
            Interval::new(0, 0, 0),
            Interval::new(-13, -1, -1_000_000),
        ] {
            assert_eq!(Interval::parse_text(&inv.to_string()).unwrap(), inv);
            assert_eq!(Interval::parse_binary(&inv.to_binary()).unwrap(), inv);
        }
    }

    #[test]
    fn test_interval_binary_strict_size() {
        assert!(Interval::parse_binary(&[0; 15]).is_err());
        assert!(Interval::parse_binary(&[0; 17]).is_err());
    }

    // --- civil arithmetic ---

    #[test]
    fn test_civil_roundtrip() {
        for days in [-719_468, -1, 0, 1, 10_957, 2_932_896] {
            let (y, m, d) = civil_from_days(days);
            assert_eq!(days_from_civil(y, m as i64, d as i64), days);
        }
        assert_eq!(civil_from_days(0), (1970, 1, 1));
        assert_eq!(civil_from_days(10_957), (2000, 1, 1));
    }
}
