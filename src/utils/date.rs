//! Calendar dates found in content file names.
//!
//! Only the `YYYY-MM-DD` form is recognized. Parsing validates month and day
//! ranges (leap years included) so `2024-02-30` is rejected.

use std::fmt;
use std::sync::LazyLock;

use anyhow::{Result, bail};
use regex::Regex;

/// Matches an embedded `YYYY-MM-DD` run anywhere in a string.
static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9]{4}-[0-9]{2}-[0-9]{2}").expect("valid date regex")
});

/// A calendar date without time or timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Date {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl Date {
    pub const fn from_ymd(year: u16, month: u8, day: u8) -> Self {
        Self { year, month, day }
    }

    /// Parse exactly "YYYY-MM-DD".
    pub fn parse(s: &str) -> Option<Self> {
        let bytes = s.as_bytes();
        if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
            return None;
        }

        let date = Self::from_ymd(
            parse_u16(&bytes[0..4])?,
            parse_u8(&bytes[5..7])?,
            parse_u8(&bytes[8..10])?,
        );
        date.validate().ok()?;
        Some(date)
    }

    /// Find the first valid date embedded in `s` (typically a file name).
    pub fn find_in(s: &str) -> Option<Self> {
        DATE_RE.find_iter(s).find_map(|m| Self::parse(m.as_str()))
    }

    pub fn validate(self) -> Result<()> {
        let Self { year, month, day } = self;

        if !(1..=12).contains(&month) {
            bail!("month is invalid: {month}");
        }
        if day == 0 || day > Self::days_in_month(year, month) {
            bail!("day is invalid: {day}");
        }
        Ok(())
    }

    #[inline]
    #[allow(clippy::manual_is_multiple_of)] // Manual impl for const fn
    const fn is_leap_year(year: u16) -> bool {
        year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
    }

    #[inline]
    const fn days_in_month(year: u16, month: u8) -> u8 {
        match month {
            1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
            4 | 6 | 9 | 11 => 30,
            2 if Self::is_leap_year(year) => 29,
            2 => 28,
            _ => 0,
        }
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// Parse 2-digit ASCII number
#[inline]
fn parse_u8(bytes: &[u8]) -> Option<u8> {
    let [a, b] = bytes else { return None };
    let (d1, d2) = (a.wrapping_sub(b'0'), b.wrapping_sub(b'0'));
    (d1 <= 9 && d2 <= 9).then(|| d1 * 10 + d2)
}

/// Parse 4-digit ASCII number
#[inline]
fn parse_u16(bytes: &[u8]) -> Option<u16> {
    if bytes.len() != 4 {
        return None;
    }
    bytes.iter().try_fold(0u16, |acc, &b| {
        let d = b.wrapping_sub(b'0');
        (d <= 9).then(|| acc * 10 + u16::from(d))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        assert_eq!(Date::parse("2024-06-15"), Some(Date::from_ymd(2024, 6, 15)));
        assert_eq!(Date::parse("2024-02-29"), Some(Date::from_ymd(2024, 2, 29)));
    }

    #[test]
    fn test_parse_invalid() {
        assert_eq!(Date::parse("2023-02-29"), None);
        assert_eq!(Date::parse("2024-13-01"), None);
        assert_eq!(Date::parse("2024-1-01"), None);
        assert_eq!(Date::parse("2024-06-15T00:00:00Z"), None);
        assert_eq!(Date::parse("abcd-ef-gh"), None);
    }

    #[test]
    fn test_find_in_file_name() {
        assert_eq!(
            Date::find_in("2024-03-09-hello-world.md"),
            Some(Date::from_ymd(2024, 3, 9))
        );
        assert_eq!(
            Date::find_in("posts/9999-99-99-then-2021-12-31.md"),
            Some(Date::from_ymd(2021, 12, 31))
        );
        assert_eq!(Date::find_in("about.md"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Date::from_ymd(2024, 1, 5).to_string(), "2024-01-05");
    }
}
