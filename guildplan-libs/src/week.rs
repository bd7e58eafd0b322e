use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Display};
use std::str::FromStr;
use thiserror::Error;

const KEY_FORMAT: &str = "%Y-%m-%d";

#[derive(Error, Debug, Eq, PartialEq)]
pub enum WeekKeyError {
    #[error("Week key must look like YYYY-MM-DD, got {0:?}")]
    Malformed(String),
    #[error("Week key {0} is not a Monday")]
    NotMonday(NaiveDate),
}

/// Canonical identifier of a calendar week: the date of its Monday.
///
/// Keys are built from a reference date handed in by the caller, never from
/// a live clock, so every function here is deterministic.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WeekKey(NaiveDate);

impl WeekKey {
    /// The week `date` falls in.
    ///
    /// # Examples
    /// ```
    /// use chrono::NaiveDate;
    /// use guildplan_libs::week::WeekKey;
    ///
    /// // Wednesday -> Monday two days earlier
    /// let wednesday = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
    /// assert_eq!(WeekKey::containing(wednesday).to_string(), "2025-01-13");
    ///
    /// // Sunday belongs to the week that started six days earlier
    /// let sunday = NaiveDate::from_ymd_opt(2025, 1, 19).unwrap();
    /// assert_eq!(WeekKey::containing(sunday).to_string(), "2025-01-13");
    /// ```
    pub fn containing(date: NaiveDate) -> WeekKey {
        let back = date.weekday().num_days_from_monday() as i64;
        WeekKey(date - Duration::days(back))
    }

    pub fn this_week(today: NaiveDate) -> WeekKey {
        WeekKey::containing(today)
    }

    pub fn next_week(today: NaiveDate) -> WeekKey {
        WeekKey::containing(today).plus_weeks(1)
    }

    pub fn plus_weeks(self, weeks: u32) -> WeekKey {
        WeekKey(self.0 + Duration::days(7 * weeks as i64))
    }

    pub fn monday(self) -> NaiveDate {
        self.0
    }

    pub fn sunday(self) -> NaiveDate {
        self.0 + Duration::days(6)
    }

    /// Monday to Sunday, day-first without padding: `13. 1. 2025 – 19. 1. 2025`
    pub fn label(self) -> String {
        format!(
            "{} – {}",
            self.0.format("%-d. %-m. %Y"),
            self.sunday().format("%-d. %-m. %Y")
        )
    }
}

impl Display for WeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(KEY_FORMAT))
    }
}

impl FromStr for WeekKey {
    type Err = WeekKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let date = NaiveDate::parse_from_str(s.trim(), KEY_FORMAT)
            .map_err(|_| WeekKeyError::Malformed(s.to_string()))?;

        if date.weekday().num_days_from_monday() != 0 {
            return Err(WeekKeyError::NotMonday(date));
        }

        Ok(WeekKey(date))
    }
}

impl Serialize for WeekKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WeekKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
