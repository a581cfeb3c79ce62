use std::fmt;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_database::DatabaseError;
use shared_models::ClockTime;

// ==============================================================================
// WEEKLY SCHEDULE MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    /// Weekday of a calendar date. Pure calendar arithmetic: no time zone,
    /// no locale.
    pub fn from_date(date: NaiveDate) -> Self {
        match date.weekday() {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DayOfWeek::Monday => "Monday",
            DayOfWeek::Tuesday => "Tuesday",
            DayOfWeek::Wednesday => "Wednesday",
            DayOfWeek::Thursday => "Thursday",
            DayOfWeek::Friday => "Friday",
            DayOfWeek::Saturday => "Saturday",
            DayOfWeek::Sunday => "Sunday",
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One working window: appointments may start from `start_time` up to, but
/// not including, `end_time`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub day: DayOfWeek,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("{0} appears more than once in the schedule")]
    DuplicateDay(DayOfWeek),

    #[error("{day}: start time {start} must be before end time {end}")]
    EmptyWindow {
        day: DayOfWeek,
        start: ClockTime,
        end: ClockTime,
    },
}

/// A doctor's weekly availability. Immutable once built; updates replace the
/// whole value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ScheduleEntry>", into = "Vec<ScheduleEntry>")]
pub struct DoctorSchedule {
    entries: Vec<ScheduleEntry>,
}

impl DoctorSchedule {
    pub fn new(mut entries: Vec<ScheduleEntry>) -> Result<Self, ScheduleError> {
        entries.sort_by_key(|entry| entry.day);

        for pair in entries.windows(2) {
            if pair[0].day == pair[1].day {
                return Err(ScheduleError::DuplicateDay(pair[0].day));
            }
        }

        if let Some(entry) = entries.iter().find(|entry| entry.start_time >= entry.end_time) {
            return Err(ScheduleError::EmptyWindow {
                day: entry.day,
                start: entry.start_time,
                end: entry.end_time,
            });
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry_for(&self, day: DayOfWeek) -> Option<&ScheduleEntry> {
        self.entries.iter().find(|entry| entry.day == day)
    }

    pub fn entry_for_date(&self, date: NaiveDate) -> Option<&ScheduleEntry> {
        self.entry_for(DayOfWeek::from_date(date))
    }
}

impl TryFrom<Vec<ScheduleEntry>> for DoctorSchedule {
    type Error = ScheduleError;

    fn try_from(entries: Vec<ScheduleEntry>) -> Result<Self, Self::Error> {
        Self::new(entries)
    }
}

impl From<DoctorSchedule> for Vec<ScheduleEntry> {
    fn from(schedule: DoctorSchedule) -> Self {
        schedule.entries
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateScheduleRequest {
    pub schedule: Vec<ScheduleEntry>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Error)]
pub enum DoctorError {
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(#[from] ScheduleError),

    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),
}
