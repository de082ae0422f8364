/// Core types used throughout the domain layer
///
/// This module defines the ID newtypes, the calendar month type used by the
/// month filter, and the snooze unit stored alongside snoozed habits.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, SubsecRound};
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Storage format for every timestamp column
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Storage format for date columns
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Unique identifier for a diary entry
///
/// Zero means the entry has not been stored yet; the database assigns
/// the real value on insert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DiaryEntryId(pub i64);

/// Unique identifier for a habit
///
/// This is a wrapper around the row id to provide type safety - you can't
/// accidentally pass a habit ID where an entry ID is expected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HabitId(pub i64);

/// Unique identifier for a habit entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryId(pub i64);

macro_rules! impl_row_id {
    ($($ty:ident),*) => {
        $(
            impl $ty {
                /// Whether this id has been assigned by the store
                pub fn is_persisted(&self) -> bool {
                    self.0 > 0
                }
            }

            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }

            impl From<i64> for $ty {
                fn from(value: i64) -> Self {
                    Self(value)
                }
            }
        )*
    };
}

impl_row_id!(DiaryEntryId, HabitId, EntryId);

/// A calendar month, e.g. `2024-03`
///
/// Used by the calendar view and the month query. Parses from and formats
/// to the same `YYYY-MM` string that SQLite's `strftime('%Y-%m', ...)` yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    /// Create a year-month, validating the month number
    pub fn new(year: i32, month: u32) -> Result<Self, DomainError> {
        if !(1..=12).contains(&month) {
            return Err(DomainError::InvalidMonth(format!(
                "Month must be between 1 and 12, got {}",
                month
            )));
        }
        if !(1..=9999).contains(&year) {
            return Err(DomainError::InvalidMonth(format!(
                "Year must be between 1 and 9999, got {}",
                year
            )));
        }
        Ok(Self { year, month })
    }

    /// The month a given date falls in
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// First day of this month
    pub fn first_day(&self) -> NaiveDate {
        // year and month are validated on construction
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Whether the date falls inside this month
    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// The following month; `9999-12` is the last one and stays put
    pub fn next(&self) -> Self {
        let (year, month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        Self::new(year, month).unwrap_or(*self)
    }

    /// The preceding month; `0001-01` is the first one and stays put
    pub fn previous(&self) -> Self {
        let (year, month) = if self.month == 1 {
            (self.year - 1, 12)
        } else {
            (self.year, self.month - 1)
        };
        Self::new(year, month).unwrap_or(*self)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DomainError::InvalidMonth(format!("Expected YYYY-MM, got '{}'", s));

        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;

        Self::new(year, month)
    }
}

impl TryFrom<String> for YearMonth {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<YearMonth> for String {
    fn from(value: YearMonth) -> Self {
        value.to_string()
    }
}

/// Unit of a habit's snooze duration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnoozeUnit {
    Minutes,
    Hours,
    #[default]
    Days,
    Weeks,
}

impl SnoozeUnit {
    /// Name used in the database and on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            SnoozeUnit::Minutes => "minutes",
            SnoozeUnit::Hours => "hours",
            SnoozeUnit::Days => "days",
            SnoozeUnit::Weeks => "weeks",
        }
    }

    /// Read a stored unit, treating empty or unknown values as days
    pub fn from_stored(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }

    /// Length of `amount` of this unit
    pub fn duration(&self, amount: u32) -> Duration {
        let amount = i64::from(amount);
        match self {
            SnoozeUnit::Minutes => Duration::minutes(amount),
            SnoozeUnit::Hours => Duration::hours(amount),
            SnoozeUnit::Days => Duration::days(amount),
            SnoozeUnit::Weeks => Duration::weeks(amount),
        }
    }
}

impl fmt::Display for SnoozeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SnoozeUnit {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "minute" | "minutes" | "min" | "m" => Ok(SnoozeUnit::Minutes),
            "hour" | "hours" | "h" => Ok(SnoozeUnit::Hours),
            "day" | "days" | "d" => Ok(SnoozeUnit::Days),
            "week" | "weeks" | "w" => Ok(SnoozeUnit::Weeks),
            other => Err(DomainError::InvalidValue {
                message: format!(
                    "Invalid snooze unit '{}'. Valid options: minutes, hours, days, weeks",
                    other
                ),
            }),
        }
    }
}

/// Current local time truncated to whole seconds
///
/// Timestamps are persisted without fractional seconds, so anything that
/// will be stored and compared later should start from this.
pub fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local().trunc_subsecs(0)
}

/// Today's local date
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Format a timestamp the way it is stored
pub fn format_datetime(value: &NaiveDateTime) -> String {
    value.format(DATETIME_FORMAT).to_string()
}

/// Parse a stored timestamp
pub fn parse_datetime(value: &str) -> Result<NaiveDateTime, DomainError> {
    NaiveDateTime::parse_from_str(value, DATETIME_FORMAT)
        .map_err(|_| DomainError::InvalidDate(format!("Invalid timestamp '{}'", value)))
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(value: &str) -> Result<NaiveDate, DomainError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| DomainError::InvalidDate(format!("Expected YYYY-MM-DD, got '{}'", value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_month_parse_and_display() {
        let ym: YearMonth = "2024-03".parse().unwrap();
        assert_eq!(ym.year(), 2024);
        assert_eq!(ym.month(), 3);
        assert_eq!(ym.to_string(), "2024-03");

        assert!("2024-13".parse::<YearMonth>().is_err());
        assert!("2024-3".parse::<YearMonth>().is_err());
        assert!("march".parse::<YearMonth>().is_err());
    }

    #[test]
    fn test_year_month_navigation() {
        let december = YearMonth::new(2023, 12).unwrap();
        assert_eq!(december.next(), YearMonth::new(2024, 1).unwrap());
        assert_eq!(december.next().previous(), december);

        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let feb = YearMonth::of(date);
        assert!(feb.contains(date));
        assert!(!feb.contains(NaiveDate::from_ymd_opt(2023, 2, 28).unwrap()));
        assert_eq!(feb.first_day(), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
    }

    #[test]
    fn test_year_month_navigation_saturates() {
        let last = YearMonth::new(9999, 12).unwrap();
        assert_eq!(last.next(), last);
        assert_eq!(last.next().first_day(), NaiveDate::from_ymd_opt(9999, 12, 1).unwrap());

        let first = YearMonth::new(1, 1).unwrap();
        assert_eq!(first.previous(), first);
        assert_eq!(first.previous().first_day(), NaiveDate::from_ymd_opt(1, 1, 1).unwrap());
    }

    #[test]
    fn test_snooze_unit_from_stored() {
        assert_eq!(SnoozeUnit::from_stored("hours"), SnoozeUnit::Hours);
        assert_eq!(SnoozeUnit::from_stored(""), SnoozeUnit::Days);
        assert_eq!(SnoozeUnit::from_stored("fortnights"), SnoozeUnit::Days);
        assert_eq!(SnoozeUnit::Weeks.duration(2), Duration::days(14));
    }

    #[test]
    fn test_datetime_format_round_trip() {
        let value = NaiveDate::from_ymd_opt(2024, 3, 16)
            .unwrap()
            .and_hms_opt(14, 30, 15)
            .unwrap();
        let stored = format_datetime(&value);
        assert_eq!(stored, "2024-03-16T14:30:15");
        assert_eq!(parse_datetime(&stored).unwrap(), value);
    }
}
