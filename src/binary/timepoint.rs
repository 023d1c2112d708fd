// Timepoint codec: Modified Julian Date based wire timestamps.
//
// Layout (MSB first):
//   b0      RFA
//   b1-17   MJD (17 bits)
//   b18     RFA
//   b19     LTO flag (local-time offset field present)
//   b20     form flag: 0 = short (no seconds), 1 = long
//   b21-25  hours
//   b26-31  minutes
//   long form only:
//   b32-37  seconds
//   b38-47  RFA
//   when the LTO flag is set, appended after the short/long body:
//   2 bits  RFA
//   1 bit   offset sign (1 = negative)
//   5 bits  offset magnitude in half hours
//
// An all-zero pattern is the "now / unspecified" sentinel, not a literal
// epoch date.

use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use thiserror::Error;

use super::bitbuf::{BitBuf, BitError, BitReader};
use crate::model::Timepoint;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimepointError {
    #[error("date {0} is outside the 17-bit MJD range")]
    DateOutOfRange(NaiveDate),
    #[error("local-time offset {seconds}s exceeds the encodable +/-15.5h")]
    OffsetOutOfRange { seconds: i32 },
    #[error("MJD {0} does not map to a valid date")]
    BadJulianDay(u32),
    #[error("timepoint field out of range: {0}")]
    Bits(#[from] BitError),
}

// ---------------------------------------------------------------------------
// Modified Julian Day
// ---------------------------------------------------------------------------

/// Gregorian date to Julian Day Number, integer arithmetic with the usual
/// January/February adjustment.
fn julian_day_number(date: NaiveDate) -> i64 {
    use chrono::Datelike;
    let (year, month, day) = (date.year() as i64, date.month() as i64, date.day() as i64);
    let a = (14 - month) / 12;
    let y = year + 4800 - a;
    let m = month + 12 * a - 3;
    day + (153 * m + 2) / 5 + 365 * y + y / 4 - y / 100 + y / 400 - 32045
}

/// Date to Modified Julian Day. The MJD epoch (0) is 1858-11-17.
pub fn to_mjd(date: NaiveDate) -> Result<u32, TimepointError> {
    let mjd = julian_day_number(date) - 2_400_001;
    if !(0..1 << 17).contains(&mjd) {
        return Err(TimepointError::DateOutOfRange(date));
    }
    Ok(mjd as u32)
}

/// Modified Julian Day back to a Gregorian date.
pub fn from_mjd(mjd: u32) -> Result<NaiveDate, TimepointError> {
    let jdn = i64::from(mjd) + 2_400_001;
    let a = jdn + 32044;
    let b = (4 * a + 3) / 146097;
    let c = a - 146097 * b / 4;
    let d = (4 * c + 3) / 1461;
    let e = c - 1461 * d / 4;
    let m = (5 * e + 2) / 153;
    let day = e - (153 * m + 2) / 5 + 1;
    let month = m + 3 - 12 * (m / 10);
    let year = 100 * b + d - 4800 + m / 10;
    NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
        .ok_or(TimepointError::BadJulianDay(mjd))
}

// ---------------------------------------------------------------------------
// Encode
// ---------------------------------------------------------------------------

/// Encode a timepoint. The result is not byte-aligned; the enclosing
/// attribute pads it.
pub fn encode_timepoint(tp: &Timepoint) -> Result<BitBuf, TimepointError> {
    let mut bits = BitBuf::new();

    let (naive, offset) = match tp {
        Timepoint::Unspecified => {
            bits.append_uint(0, 32)?;
            return Ok(bits);
        }
        Timepoint::Utc(dt) => (*dt, None),
        Timepoint::Local(dt) => (dt.naive_local(), Some(dt.offset().local_minus_utc())),
    };

    bits.append_uint(0, 1)?; // RFA
    bits.append_uint(u64::from(to_mjd(naive.date())?), 17)?;
    bits.append_uint(0, 1)?; // RFA
    bits.append_uint(u64::from(offset.is_some()), 1)?;

    let time = naive.time();
    if time.second() > 0 {
        bits.append_uint(1, 1)?;
        bits.append_uint(u64::from(time.hour()), 5)?;
        bits.append_uint(u64::from(time.minute()), 6)?;
        bits.append_uint(u64::from(time.second()), 6)?;
        bits.append_uint(0, 10)?; // RFA
    } else {
        bits.append_uint(0, 1)?;
        bits.append_uint(u64::from(time.hour()), 5)?;
        bits.append_uint(u64::from(time.minute()), 6)?;
    }

    if let Some(seconds) = offset {
        // Total offset from UTC, rounded to the nearest half hour.
        let half_hours = (seconds.abs() + 900) / 1800;
        if half_hours > 31 {
            return Err(TimepointError::OffsetOutOfRange { seconds });
        }
        bits.append_uint(0, 2)?; // RFA
        bits.append_uint(u64::from(seconds < 0), 1)?;
        bits.append_uint(half_hours as u64, 5)?;
    }

    Ok(bits)
}

// ---------------------------------------------------------------------------
// Decode
// ---------------------------------------------------------------------------

/// Decode a timepoint from an attribute payload.
pub fn decode_timepoint(payload: &[u8]) -> Result<Timepoint, TimepointError> {
    if payload.iter().all(|&b| b == 0) {
        return Ok(Timepoint::Unspecified);
    }

    let mut r = BitReader::new(payload);
    r.read_uint(1)?; // RFA
    let mjd = r.read_uint(17)? as u32;
    r.read_uint(1)?; // RFA
    let has_lto = r.read_flag()?;
    let long_form = r.read_flag()?;

    let hour = r.read_uint(5)? as u32;
    let minute = r.read_uint(6)? as u32;
    let second = if long_form {
        let second = r.read_uint(6)? as u32;
        r.read_uint(10)?; // RFA
        second
    } else {
        0
    };

    let date = from_mjd(mjd)?;
    let time = NaiveTime::from_hms_opt(hour, minute, second)
        .ok_or(TimepointError::BadJulianDay(mjd))?;
    let naive = NaiveDateTime::new(date, time);

    if !has_lto {
        return Ok(Timepoint::Utc(naive));
    }

    r.read_uint(2)?; // RFA
    let negative = r.read_flag()?;
    let half_hours = r.read_uint(5)? as i32;
    let seconds = half_hours * 1800 * if negative { -1 } else { 1 };
    let offset = FixedOffset::east_opt(seconds)
        .ok_or(TimepointError::OffsetOutOfRange { seconds })?;
    let utc = naive - chrono::Duration::seconds(i64::from(seconds));
    Ok(Timepoint::Local(
        chrono::DateTime::from_naive_utc_and_offset(utc, offset),
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
