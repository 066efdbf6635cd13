//! FILETIME conversions.
//!
//! Entry timestamps travel as Windows FILETIME values: 100-nanosecond ticks
//! since 1601-01-01 UTC.

use std::time::Duration;
use std::time::SystemTime;

/// FILETIME ticks between 1601-01-01 and 1970-01-01.
pub const UNIX_EPOCH_TICKS: u64 = 116_444_736_000_000_000;

const TICKS_PER_SECOND: u64 = 10_000_000;

/// Converts Unix seconds to FILETIME. Times before 1601 clamp to zero.
#[must_use]
pub fn from_unix(seconds: i64) -> u64 {
    let ticks = i128::from(seconds) * i128::from(TICKS_PER_SECOND) + i128::from(UNIX_EPOCH_TICKS);
    u64::try_from(ticks.max(0)).unwrap_or(u64::MAX)
}

/// Splits a FILETIME into Unix seconds and sub-second nanoseconds.
#[must_use]
pub fn to_unix(filetime: u64) -> (i64, u32) {
    let ticks = i128::from(filetime) - i128::from(UNIX_EPOCH_TICKS);
    let per_second = i128::from(TICKS_PER_SECOND);
    let seconds = i64::try_from(ticks.div_euclid(per_second)).unwrap_or(i64::MAX);
    let nanos = u32::try_from(ticks.rem_euclid(per_second) * 100).unwrap_or(0);
    (seconds, nanos)
}

/// Converts a FILETIME to [`SystemTime`].
///
/// # Examples
///
/// ```
/// use arkive_core::timestamp;
/// use std::time::SystemTime;
///
/// let ft = timestamp::from_unix(0);
/// assert_eq!(timestamp::to_system_time(ft), Some(SystemTime::UNIX_EPOCH));
/// ```
#[must_use]
pub fn to_system_time(filetime: u64) -> Option<SystemTime> {
    let (seconds, nanos) = to_unix(filetime);
    if seconds >= 0 {
        SystemTime::UNIX_EPOCH.checked_add(Duration::new(seconds.unsigned_abs(), nanos))
    } else {
        let back = Duration::new(seconds.unsigned_abs(), 0).checked_sub(Duration::new(0, nanos))?;
        SystemTime::UNIX_EPOCH.checked_sub(back)
    }
}

/// Converts an MS-DOS local date/time (as stored by zip) to FILETIME,
/// treating it as UTC.
///
/// Returns `None` for out-of-range fields.
#[must_use]
pub fn from_civil(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Option<u64> {
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) || hour > 23 || minute > 59 || second > 60
    {
        return None;
    }
    let days = days_from_civil(i64::from(year), i64::from(month), i64::from(day));
    let seconds = days * 86_400 + i64::from(hour) * 3_600 + i64::from(minute) * 60 + i64::from(second);
    Some(from_unix(seconds))
}

/// Formats a FILETIME as `YYYY-MM-DD HH:MM:SS` in UTC.
///
/// # Examples
///
/// ```
/// use arkive_core::timestamp;
///
/// let ft = timestamp::from_unix(1_600_000_000);
/// assert_eq!(timestamp::format_utc(ft), "2020-09-13 12:26:40");
/// ```
#[must_use]
pub fn format_utc(filetime: u64) -> String {
    let (seconds, _) = to_unix(filetime);
    let days = seconds.div_euclid(86_400);
    let secs_of_day = seconds.rem_euclid(86_400);
    let (year, month, day) = civil_from_days(days);
    format!(
        "{year:04}-{month:02}-{day:02} {:02}:{:02}:{:02}",
        secs_of_day / 3_600,
        (secs_of_day % 3_600) / 60,
        secs_of_day % 60
    )
}

/// Proleptic Gregorian date for a day count since 1970-01-01.
fn civil_from_days(days: i64) -> (i64, i64, i64) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

/// Days since 1970-01-01 for a proleptic Gregorian date.
fn days_from_civil(year: i64, month: i64, day: i64) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = y.div_euclid(400);
    let yoe = y - era * 400;
    let mp = (month + 9) % 12;
    let doy = (153 * mp + 2) / 5 + day - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}
