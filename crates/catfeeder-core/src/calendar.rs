//! Day buckets and month grids.
//!
//! Feeding entries belong to the day their `timestamp` starts with, while
//! appointments belong to the day named by their `date` field. The two rules
//! stay separate.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::record::{Appointment, FeedingEntry};

pub const WEEKDAY_LABELS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// `YYYY-MM-DD` built from the date's own components.
pub fn date_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day())
}

pub fn entries_for_date(entries: &[FeedingEntry], date: NaiveDate) -> Vec<&FeedingEntry> {
    let key = date_key(date);
    entries
        .iter()
        .filter(|entry| entry.timestamp.starts_with(&key))
        .collect()
}

pub fn appointments_for_date(appointments: &[Appointment], date: NaiveDate) -> Vec<&Appointment> {
    let key = date_key(date);
    appointments
        .iter()
        .filter(|appointment| appointment.date == key)
        .collect()
}

pub fn has_activity(entries: &[FeedingEntry], appointments: &[Appointment], date: NaiveDate) -> bool {
    let key = date_key(date);
    entries.iter().any(|entry| entry.timestamp.starts_with(&key))
        || appointments.iter().any(|appointment| appointment.date == key)
}

/// A calendar month; `month` is 1-based.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    /// `None` unless the month is 1..=12 and its first day is a representable date.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Moves by whole months, carrying into the year in both directions.
    /// `None` when the result falls outside the supported date range.
    pub fn shift(self, months: i32) -> Option<Self> {
        let index = i64::from(self.year)
            .checked_mul(12)?
            .checked_add(i64::from(self.month) - 1)?
            .checked_add(i64::from(months))?;
        let year = i32::try_from(index.div_euclid(12)).ok()?;
        let month = u32::try_from(index.rem_euclid(12)).ok()? + 1;
        Self::new(year, month)
    }

    pub fn prev(self) -> Option<Self> {
        self.shift(-1)
    }

    pub fn next(self) -> Option<Self> {
        self.shift(1)
    }

    pub fn first_day(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// The day before the first of the following month.
    pub fn last_day(self) -> NaiveDate {
        self.next()
            .and_then(|next| next.first_day().pred_opt())
            .or_else(|| (28..=31).rev().find_map(|day| self.day(day)))
            .unwrap_or_else(|| self.first_day())
    }

    pub fn days_in_month(self) -> u32 {
        self.last_day().day()
    }

    /// Weekday of the 1st, 0 = Sunday.
    pub fn first_weekday(self) -> u32 {
        self.first_day().weekday().num_days_from_sunday()
    }

    pub fn day(self, day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, day)
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        Self::of(date) == self
    }

    pub fn month_name(self) -> &'static str {
        MONTH_NAMES[(self.month as usize).saturating_sub(1) % 12]
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.month_name(), self.year)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCell {
    pub day: u32,
    pub date: NaiveDate,
    pub is_today: bool,
    pub has_activity: bool,
    pub feedings: usize,
    pub appointments: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridCell {
    Blank,
    Day(DayCell),
}

#[derive(Debug, Clone)]
pub struct MonthGrid {
    pub month: YearMonth,
    pub cells: Vec<GridCell>,
}

impl MonthGrid {
    pub fn leading_blanks(&self) -> usize {
        self.cells
            .iter()
            .take_while(|cell| matches!(cell, GridCell::Blank))
            .count()
    }

    pub fn days(&self) -> impl Iterator<Item = &DayCell> {
        self.cells.iter().filter_map(|cell| match cell {
            GridCell::Day(day) => Some(day),
            GridCell::Blank => None,
        })
    }

    pub fn weeks(&self) -> std::slice::Chunks<'_, GridCell> {
        self.cells.chunks(7)
    }
}

#[tracing::instrument(skip(entries, appointments), fields(month = %month))]
pub fn month_grid(
    month: YearMonth,
    today: NaiveDate,
    entries: &[FeedingEntry],
    appointments: &[Appointment],
) -> MonthGrid {
    let blanks = month.first_weekday() as usize;
    let days = month.days_in_month();

    let mut cells = Vec::with_capacity(blanks + days as usize);
    cells.extend(std::iter::repeat_n(GridCell::Blank, blanks));

    for day in 1..=days {
        let Some(date) = month.day(day) else {
            continue;
        };
        let feedings = entries_for_date(entries, date).len();
        let appointments = appointments_for_date(appointments, date).len();
        cells.push(GridCell::Day(DayCell {
            day,
            date,
            is_today: date == today,
            has_activity: feedings > 0 || appointments > 0,
            feedings,
            appointments,
        }));
    }

    tracing::debug!(blanks, days, "built month grid");
    MonthGrid { month, cells }
}

/// Everything recorded on one day, appointments first as the details panel shows them.
#[derive(Debug, Clone)]
pub struct DaySummary<'a> {
    pub date: NaiveDate,
    pub appointments: Vec<&'a Appointment>,
    pub feedings: Vec<&'a FeedingEntry>,
}

impl DaySummary<'_> {
    pub fn is_empty(&self) -> bool {
        self.appointments.is_empty() && self.feedings.is_empty()
    }
}

pub fn day_summary<'a>(
    entries: &'a [FeedingEntry],
    appointments: &'a [Appointment],
    date: NaiveDate,
) -> DaySummary<'a> {
    DaySummary {
        date,
        appointments: appointments_for_date(appointments, date),
        feedings: entries_for_date(entries, date),
    }
}
