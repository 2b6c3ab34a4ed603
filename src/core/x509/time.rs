/*!
Certificate validity times.

Times are copied out of the certificate into plain values, so they
outlive the decoded certificate they came from.
*/

use std::fmt;

use crate::core::error::CertificateError;
use crate::core::x509::der::{tag, DerReader, DerResult};

/// A UTC instant decoded from UTCTime or GeneralizedTime
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Asn1Time {
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
}

impl Asn1Time {
    /// Build a time from calendar fields, validating ranges
    pub fn new(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> DerResult<Self> {
        if !(1..=12).contains(&month)
            || day == 0
            || day > days_in_month(year, month)
            || hour > 23
            || minute > 59
            || second > 59
        {
            return Err(CertificateError::InvalidField("time"));
        }
        Ok(Self { year, month, day, hour, minute, second })
    }

    /// Parse UTCTime content (`YYMMDDHHMMSSZ`); years 50..99 map to 19xx
    pub fn from_utc_time(value: &[u8]) -> DerResult<Self> {
        if value.len() != 13 || value[12] != b'Z' {
            return Err(CertificateError::InvalidField("time"));
        }
        let yy = two_digits(&value[0..2])?;
        let year = if yy >= 50 { 1900 + yy as u16 } else { 2000 + yy as u16 };
        Self::from_fields(year, &value[2..12])
    }

    /// Parse GeneralizedTime content (`YYYYMMDDHHMMSSZ`)
    pub fn from_generalized_time(value: &[u8]) -> DerResult<Self> {
        if value.len() != 15 || value[14] != b'Z' {
            return Err(CertificateError::InvalidField("time"));
        }
        let year = two_digits(&value[0..2])? as u16 * 100 + two_digits(&value[2..4])? as u16;
        Self::from_fields(year, &value[4..14])
    }

    /// Read a Time CHOICE from a DER reader
    pub fn read(reader: &mut DerReader<'_>) -> DerResult<Self> {
        match reader.peek_tag() {
            Some(tag::UTC_TIME) => Self::from_utc_time(reader.read(tag::UTC_TIME)?),
            Some(tag::GENERALIZED_TIME) => {
                Self::from_generalized_time(reader.read(tag::GENERALIZED_TIME)?)
            }
            Some(found) => Err(CertificateError::UnexpectedTag { expected: tag::UTC_TIME, found }),
            None => Err(CertificateError::Truncated),
        }
    }

    fn from_fields(year: u16, rest: &[u8]) -> DerResult<Self> {
        Self::new(
            year,
            two_digits(&rest[0..2])?,
            two_digits(&rest[2..4])?,
            two_digits(&rest[4..6])?,
            two_digits(&rest[6..8])?,
            two_digits(&rest[8..10])?,
        )
    }

    /// Calendar year
    pub fn year(&self) -> u16 {
        self.year
    }

    /// Seconds since the Unix epoch (negative before 1970)
    pub fn unix_timestamp(&self) -> i64 {
        let days = days_from_civil(i64::from(self.year), self.month, self.day);
        days * 86_400
            + i64::from(self.hour) * 3_600
            + i64::from(self.minute) * 60
            + i64::from(self.second)
    }
}

impl fmt::Display for Asn1Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// Certificate validity window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validity {
    pub not_before: Asn1Time,
    pub not_after: Asn1Time,
}

impl Validity {
    /// Whether `unix_time` falls inside the window (inclusive)
    pub fn contains(&self, unix_time: i64) -> bool {
        unix_time >= self.not_before.unix_timestamp() && unix_time <= self.not_after.unix_timestamp()
    }
}

fn two_digits(bytes: &[u8]) -> DerResult<u8> {
    match bytes {
        [a @ b'0'..=b'9', b @ b'0'..=b'9'] => Ok((a - b'0') * 10 + (b - b'0')),
        _ => Err(CertificateError::InvalidField("time")),
    }
}

fn is_leap_year(year: u16) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: u16, month: u8) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

// Howard Hinnant's days_from_civil
fn days_from_civil(year: i64, month: u8, day: u8) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let m = i64::from(month);
    let mp = if m > 2 { m - 3 } else { m + 9 };
    let doy = (153 * mp + 2) / 5 + i64::from(day) - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utc_time_pivot() {
        let t = Asn1Time::from_utc_time(b"491231235959Z").unwrap();
        assert_eq!(t.year(), 2049);
        let t = Asn1Time::from_utc_time(b"500101000000Z").unwrap();
        assert_eq!(t.year(), 1950);
    }

    #[test]
    fn test_unix_timestamp() {
        let epoch = Asn1Time::from_utc_time(b"700101000000Z").unwrap();
        assert_eq!(epoch.unix_timestamp(), 0);

        let t = Asn1Time::from_generalized_time(b"20000301000000Z").unwrap();
        assert_eq!(t.unix_timestamp(), 951_868_800);

        let t = Asn1Time::from_utc_time(b"240229120000Z").unwrap();
        assert_eq!(t.unix_timestamp(), 1_709_208_000);
    }

    #[test]
    fn test_rejects_invalid_times() {
        assert!(Asn1Time::from_utc_time(b"230230000000Z").is_err());
        assert!(Asn1Time::from_utc_time(b"231301000000Z").is_err());
        assert!(Asn1Time::from_utc_time(b"230101246000Z").is_err());
        assert!(Asn1Time::from_utc_time(b"2301010000Z").is_err());
        assert!(Asn1Time::from_utc_time(b"230101000000+").is_err());
        assert!(Asn1Time::from_generalized_time(b"2023010100000Z").is_err());
        assert!(Asn1Time::from_generalized_time(b"2O230101000000Z").is_err());
    }

    #[test]
    fn test_ordering_and_window() {
        let a = Asn1Time::from_utc_time(b"230101000000Z").unwrap();
        let b = Asn1Time::from_generalized_time(b"20240101000000Z").unwrap();
        assert!(a < b);

        let validity = Validity { not_before: a, not_after: b };
        assert!(validity.contains(a.unix_timestamp()));
        assert!(validity.contains(b.unix_timestamp()));
        assert!(!validity.contains(b.unix_timestamp() + 1));
        assert_eq!(a.to_string(), "2023-01-01T00:00:00Z");
    }
}
