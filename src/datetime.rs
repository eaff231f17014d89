use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{Datelike, NaiveDate, Utc};
use serde::{
    de::{Deserialize, Deserializer},
    ser::{Serialize, Serializer},
};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// A UTC datetime, stored as signed milliseconds since the UNIX epoch. This is exactly the
/// precision the wire format carries, so it round-trips without loss.
///
/// Calendar views ([`ymd`][DateTime::ymd], [`year`][DateTime::year], `Display`) go through
/// `chrono`, which covers roughly 262,000 years either side of year 0. The millisecond count
/// itself can reach further, and outside that range the calendar views return `None`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateTime {
    millis: i64,
}

impl DateTime {
    pub const fn from_millis(millis: i64) -> DateTime {
        DateTime { millis }
    }

    /// Build a datetime at midnight UTC on the given proleptic Gregorian calendar date. Returns
    /// `None` if the date doesn't exist or is out of range.
    pub fn from_ymd(year: i64, month: u32, day: u32) -> Option<DateTime> {
        let year = i32::try_from(year).ok()?;
        let midnight = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(0, 0, 0)?;
        Some(DateTime::from_millis(midnight.and_utc().timestamp_millis()))
    }

    pub fn now() -> DateTime {
        DateTime::from(SystemTime::now())
    }

    /// Milliseconds since January 1, 1970 0:00:00 UTC.
    pub fn timestamp_millis(&self) -> i64 {
        self.millis
    }

    /// This instant as a `chrono` datetime, if it's within `chrono`'s range.
    pub fn to_chrono(&self) -> Option<chrono::DateTime<Utc>> {
        chrono::DateTime::<Utc>::from_timestamp_millis(self.millis)
    }

    /// The calendar date as `(year, month, day)`, UTC.
    pub fn ymd(&self) -> Option<(i64, u32, u32)> {
        self.to_chrono()
            .map(|t| (i64::from(t.year()), t.month(), t.day()))
    }

    pub fn year(&self) -> Option<i64> {
        self.to_chrono().map(|t| i64::from(t.year()))
    }

    /// Milliseconds past midnight UTC.
    pub fn millis_of_day(&self) -> i64 {
        self.millis.rem_euclid(MILLIS_PER_DAY)
    }

    pub fn to_system_time(&self) -> SystemTime {
        if self.millis >= 0 {
            UNIX_EPOCH + Duration::from_millis(self.millis as u64)
        } else {
            UNIX_EPOCH - Duration::from_millis(self.millis.unsigned_abs())
        }
    }
}

impl From<SystemTime> for DateTime {
    fn from(t: SystemTime) -> DateTime {
        let millis = match t.duration_since(UNIX_EPOCH) {
            Ok(d) => i64::try_from(d.as_millis()).unwrap_or(i64::MAX),
            Err(e) => i64::try_from(e.duration().as_millis())
                .map(|m| -m)
                .unwrap_or(i64::MIN),
        };
        DateTime { millis }
    }
}

impl From<chrono::DateTime<Utc>> for DateTime {
    fn from(t: chrono::DateTime<Utc>) -> DateTime {
        DateTime::from_millis(t.timestamp_millis())
    }
}

impl fmt::Display for DateTime {
    /// RFC 3339 style, always UTC, millisecond precision. Instants outside the calendar range
    /// are shown as a raw millisecond count.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.to_chrono() {
            Some(t) => write!(f, "{}", t.format("%Y-%m-%dT%H:%M:%S%.3fZ")),
            None => write!(f, "{}ms", self.millis),
        }
    }
}

impl Serialize for DateTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.millis)
    }
}

impl<'de> Deserialize<'de> for DateTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        i64::deserialize(deserializer).map(DateTime::from_millis)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn epoch() {
        let t = DateTime::from_millis(0);
        assert_eq!(t.ymd(), Some((1970, 1, 1)));
        assert_eq!(t.to_string(), "1970-01-01T00:00:00.000Z");
    }

    #[test]
    fn before_epoch() {
        let t = DateTime::from_millis(-1);
        assert_eq!(t.ymd(), Some((1969, 12, 31)));
        assert_eq!(t.to_string(), "1969-12-31T23:59:59.999Z");
    }

    #[test]
    fn ymd_roundtrip() {
        for &(y, m, d) in &[(1990, 1, 2), (2000, 2, 29), (2012, 12, 31), (1600, 3, 1), (-44, 3, 15)]
        {
            let t = DateTime::from_ymd(y, m, d).unwrap();
            assert_eq!(t.ymd(), Some((y, m, d)));
            assert_eq!(t.millis_of_day(), 0);
        }
    }

    #[test]
    fn known_instant() {
        // 2001-09-09T01:46:40Z
        let t = DateTime::from_millis(1_000_000_000_000);
        assert_eq!(t.to_string(), "2001-09-09T01:46:40.000Z");
        assert_eq!(t.year(), Some(2001));
    }

    #[test]
    fn invalid_dates() {
        assert!(DateTime::from_ymd(2001, 2, 29).is_none());
        assert!(DateTime::from_ymd(2001, 13, 1).is_none());
        assert!(DateTime::from_ymd(2001, 4, 0).is_none());
    }

    #[test]
    fn years_out_of_range() {
        assert!(DateTime::from_ymd(i64::MAX / 2, 1, 1).is_none());
        assert!(DateTime::from_ymd(i64::MIN, 1, 1).is_none());
        assert!(DateTime::from_ymd(1_000_000, 1, 1).is_none());
    }

    #[test]
    fn beyond_calendar() {
        let t = DateTime::from_millis(i64::MAX);
        assert_eq!(t.ymd(), None);
        assert_eq!(t.year(), None);
        assert_eq!(t.to_string(), format!("{}ms", i64::MAX));
    }

    #[test]
    fn chrono_conversion() {
        let t = DateTime::from_ymd(2012, 12, 31).unwrap();
        let c = t.to_chrono().unwrap();
        assert_eq!(c.to_rfc3339(), "2012-12-31T00:00:00+00:00");
        assert_eq!(DateTime::from(c), t);
    }

    #[test]
    fn system_time() {
        let t = DateTime::from_millis(-1500);
        assert_eq!(DateTime::from(t.to_system_time()), t);
        let t = DateTime::from_millis(1_234_567);
        assert_eq!(DateTime::from(t.to_system_time()), t);
    }
}
