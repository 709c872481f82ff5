use crate::errors::{AppError, AppResult};
use chrono::{Days, Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const DAY_FORMAT: &str = "%Y-%m-%d";

static CALENDAR_DAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid regex"));

/// A date without time of day, written as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CalendarDay(NaiveDate);

impl CalendarDay {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> AppResult<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or_else(|| AppError::InvalidInput(format!("{year:04}-{month:02}-{day:02} is not a calendar day")))
    }

    pub fn today() -> Self {
        Self(Local::now().date_naive())
    }

    pub fn parse(raw: &str) -> AppResult<Self> {
        if !CALENDAR_DAY_RE.is_match(raw) {
            return Err(AppError::InvalidInput(format!(
                "Expected a YYYY-MM-DD date, got {:?}",
                raw
            )));
        }
        NaiveDate::parse_from_str(raw, DAY_FORMAT)
            .map(Self)
            .map_err(|error| AppError::InvalidInput(format!("{} is not a calendar day: {}", raw, error)))
    }

    pub fn date(self) -> NaiveDate {
        self.0
    }

    /// Whole days from `self` to `later`; negative when `later` is earlier.
    pub fn days_until(self, later: CalendarDay) -> i64 {
        (later.0 - self.0).num_days()
    }

    pub fn add_days(self, days: i64) -> AppResult<Self> {
        let shifted = if days >= 0 {
            self.0.checked_add_days(Days::new(days.unsigned_abs()))
        } else {
            self.0.checked_sub_days(Days::new(days.unsigned_abs()))
        };
        shifted
            .map(Self)
            .ok_or_else(|| AppError::InvalidInput(format!("{} shifted by {} days is out of range", self, days)))
    }
}

impl fmt::Display for CalendarDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DAY_FORMAT))
    }
}

impl FromStr for CalendarDay {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for CalendarDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CalendarDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
