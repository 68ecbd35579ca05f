//! DATE and TIMESTAMP decoding
//!
//! All date-time types share a 7-byte prefix: century and year with an
//! offset of 100, month, day, then hour, minute and second with an offset
//! of 1. TIMESTAMP adds a big-endian nanosecond count in bytes 7..11, and
//! TIMESTAMP WITH TIME ZONE adds an hour and minute offset in bytes 11..13.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::error::{Error, Result};

const TZ_HOUR_OFFSET: i32 = 20;
const TZ_MINUTE_OFFSET: i32 = 60;
/// Set in the hour byte when the zone is a named region
const HAS_REGION_ID: u8 = 0x80;

/// A decoded date-time value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OracleDateTime {
    /// Wall-clock value as sent
    pub datetime: NaiveDateTime,
    /// Offset from UTC in minutes, when the value carried one
    pub offset_minutes: Option<i32>,
    /// Region id, when the zone is a named region
    pub region_id: Option<u16>,
}

impl std::fmt::Display for OracleDateTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.datetime.format("%Y-%m-%d %H:%M:%S%.f"))?;
        if let Some(offset) = self.offset_minutes {
            let sign = if offset < 0 { '-' } else { '+' };
            write!(f, " {}{:02}:{:02}", sign, offset.abs() / 60, offset.abs() % 60)?;
        }
        Ok(())
    }
}

/// Decode any of the 7, 11 or 13 byte date-time forms
pub fn decode_datetime(data: &[u8]) -> Result<OracleDateTime> {
    if data.len() < 7 {
        return Err(Error::Conversion(format!(
            "date needs at least 7 bytes, got {}",
            data.len()
        )));
    }

    let year = (data[0] as i32 - 100) * 100 + (data[1] as i32 - 100);
    let nanos = match data.get(7..11) {
        Some(raw) => u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]),
        None => 0,
    };
    let datetime = NaiveDate::from_ymd_opt(year, data[2] as u32, data[3] as u32)
        .and_then(|date| {
            date.and_hms_nano_opt(
                data[4].saturating_sub(1) as u32,
                data[5].saturating_sub(1) as u32,
                data[6].saturating_sub(1) as u32,
                nanos,
            )
        })
        .ok_or_else(|| Error::Conversion(format!("invalid date bytes {}", hex::encode(data))))?;

    let (offset_minutes, region_id) = match data.get(11..13) {
        Some(&[hour, minute]) if hour != 0 && minute != 0 => {
            if hour & HAS_REGION_ID != 0 {
                let region = (((hour & 0x7F) as u16) << 6) | ((minute & 0xFC) as u16 >> 2);
                (None, Some(region))
            } else {
                let offset = (hour as i32 - TZ_HOUR_OFFSET) * 60 + (minute as i32 - TZ_MINUTE_OFFSET);
                (Some(offset), None)
            }
        }
        _ => (None, None),
    };

    Ok(OracleDateTime {
        datetime,
        offset_minutes,
        region_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_date() {
        let value = decode_datetime(&[120, 124, 3, 15, 11, 31, 46]).unwrap();
        assert_eq!(value.to_string(), "2024-03-15 10:30:45");
        assert_eq!(value.offset_minutes, None);
    }

    #[test]
    fn test_decode_timestamp_with_fraction() {
        let mut data = vec![120, 124, 3, 15, 11, 31, 46];
        data.extend_from_slice(&500_000_000u32.to_be_bytes());
        let value = decode_datetime(&data).unwrap();
        assert_eq!(value.to_string(), "2024-03-15 10:30:45.500");
    }

    #[test]
    fn test_decode_timestamp_with_offset() {
        let mut data = vec![120, 124, 1, 1, 1, 1, 1, 0, 0, 0, 0];
        // +05:30
        data.extend_from_slice(&[25, 90]);
        let value = decode_datetime(&data).unwrap();
        assert_eq!(value.offset_minutes, Some(330));
        assert_eq!(value.to_string(), "2024-01-01 00:00:00 +05:30");
    }

    #[test]
    fn test_invalid_dates() {
        assert!(decode_datetime(&[120, 124, 3]).is_err());
        assert!(decode_datetime(&[120, 124, 13, 1, 1, 1, 1]).is_err());
    }
}
