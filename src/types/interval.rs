//! INTERVAL decoding
//!
//! Interval fields are stored with a bias so that they sort as unsigned
//! bytes: 32-bit fields are offset by `0x8000_0000`, single-byte fields by 60.

use serde::Serialize;

use crate::error::{Error, Result};

const WIDE_BIAS: i64 = 0x8000_0000;
const NARROW_BIAS: i32 = 60;

/// INTERVAL YEAR TO MONTH
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IntervalYm {
    /// Whole years
    pub years: i32,
    /// Remaining months
    pub months: i32,
}

/// INTERVAL DAY TO SECOND
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IntervalDs {
    /// Whole days
    pub days: i32,
    /// Hours
    pub hours: i32,
    /// Minutes
    pub minutes: i32,
    /// Seconds
    pub seconds: i32,
    /// Fractional seconds in nanoseconds
    pub nanos: i32,
}

fn wide(raw: &[u8]) -> i32 {
    (u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]) as i64 - WIDE_BIAS) as i32
}

fn narrow(byte: u8) -> i32 {
    byte as i32 - NARROW_BIAS
}

/// Decode the 5-byte YEAR TO MONTH form
pub fn decode_interval_ym(data: &[u8]) -> Result<IntervalYm> {
    if data.len() < 5 {
        return Err(Error::Conversion(format!(
            "INTERVAL YEAR TO MONTH needs 5 bytes, got {}",
            data.len()
        )));
    }
    Ok(IntervalYm {
        years: wide(&data[0..4]),
        months: narrow(data[4]),
    })
}

/// Decode the 11-byte DAY TO SECOND form
pub fn decode_interval_ds(data: &[u8]) -> Result<IntervalDs> {
    if data.len() < 11 {
        return Err(Error::Conversion(format!(
            "INTERVAL DAY TO SECOND needs 11 bytes, got {}",
            data.len()
        )));
    }
    Ok(IntervalDs {
        days: wide(&data[0..4]),
        hours: narrow(data[4]),
        minutes: narrow(data[5]),
        seconds: narrow(data[6]),
        nanos: wide(&data[7..11]),
    })
}

impl std::fmt::Display for IntervalYm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:+}-{}", self.years, self.months)
    }
}

impl std::fmt::Display for IntervalDs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:+} {}:{}:{}.{}",
            self.days, self.hours, self.minutes, self.seconds, self.nanos
        )
    }
}
