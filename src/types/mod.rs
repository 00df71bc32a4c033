//! Destination value types and their wire decoders.

pub mod datetime;

mod decode;

#[cfg(feature = "with-chrono")]
mod chrono;

pub use datetime::{Date, Interval, Time, TimeTz, Timestamp, TimestampTz};
