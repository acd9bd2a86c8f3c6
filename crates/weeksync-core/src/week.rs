//! Weekday names, wall-clock times, and next-occurrence math.
//!
//! A schedule declares slots under weekday names ("monday" … "sunday",
//! case-insensitive) with 24-hour "HH:MM" times. Recurrence is anchored to
//! the soonest date matching the declared weekday, evaluated against the
//! current date in the schedule's timezone.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;

use crate::error::ScheduleError;

/// A day of the week as declared in a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    /// All seven weekdays, Monday first.
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    /// Parses a weekday name case-insensitively.
    pub fn parse(name: &str) -> Result<Self, ScheduleError> {
        match name.to_ascii_lowercase().as_str() {
            "monday" => Ok(Self::Monday),
            "tuesday" => Ok(Self::Tuesday),
            "wednesday" => Ok(Self::Wednesday),
            "thursday" => Ok(Self::Thursday),
            "friday" => Ok(Self::Friday),
            "saturday" => Ok(Self::Saturday),
            "sunday" => Ok(Self::Sunday),
            _ => Err(ScheduleError::InvalidWeekday(name.to_string())),
        }
    }

    /// The two-letter RRULE BYDAY code (Mon=MO … Sun=SU).
    pub fn byday(self) -> &'static str {
        match self {
            Self::Monday => "MO",
            Self::Tuesday => "TU",
            Self::Wednesday => "WE",
            Self::Thursday => "TH",
            Self::Friday => "FR",
            Self::Saturday => "SA",
            Self::Sunday => "SU",
        }
    }

    /// The capitalized display name ("Monday").
    pub fn name(self) -> &'static str {
        match self {
            Self::Monday => "Monday",
            Self::Tuesday => "Tuesday",
            Self::Wednesday => "Wednesday",
            Self::Thursday => "Thursday",
            Self::Friday => "Friday",
            Self::Saturday => "Saturday",
            Self::Sunday => "Sunday",
        }
    }

    fn to_chrono(self) -> chrono::Weekday {
        match self {
            Self::Monday => chrono::Weekday::Mon,
            Self::Tuesday => chrono::Weekday::Tue,
            Self::Wednesday => chrono::Weekday::Wed,
            Self::Thursday => chrono::Weekday::Thu,
            Self::Friday => chrono::Weekday::Fri,
            Self::Saturday => chrono::Weekday::Sat,
            Self::Sunday => chrono::Weekday::Sun,
        }
    }

    /// Days from `today` until the next occurrence of this weekday (0–6).
    ///
    /// A `today` that already falls on this weekday yields 0.
    pub fn days_from(self, today: NaiveDate) -> u32 {
        let target = self.to_chrono().num_days_from_monday();
        let current = today.weekday().num_days_from_monday();
        (7 + target - current) % 7
    }

    /// The soonest date on or after `today` falling on this weekday.
    ///
    /// If `today` already matches, `today` itself is returned rather than
    /// the date seven days later, so a sync run on the declared day picks
    /// up the imminent occurrence.
    pub fn next_occurrence_from(self, today: NaiveDate) -> NaiveDate {
        today + Duration::days(i64::from(self.days_from(today)))
    }

    /// The soonest occurrence relative to the current date in `tz`.
    pub fn next_occurrence(self, tz: Tz) -> NaiveDate {
        self.next_occurrence_from(Utc::now().with_timezone(&tz).date_naive())
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Weekday {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A 24-hour wall-clock time parsed from a slot's `"HH:MM"` string.
///
/// A single-digit hour ("9:00") is accepted; display is always
/// zero-padded, so formatting a parsed value yields the padded form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockTime {
    /// Hour, 0–23.
    pub hour: u8,
    /// Minute, 0–59.
    pub minute: u8,
}

impl ClockTime {
    /// Parses an `"HH:MM"` string, rejecting anything outside 24-hour range.
    pub fn parse(s: &str) -> Result<Self, ScheduleError> {
        let invalid = || ScheduleError::InvalidTime(s.to_string());
        let (h, m) = s.split_once(':').ok_or_else(invalid)?;
        let hour: u8 = h.parse().map_err(|_| invalid())?;
        let minute: u8 = m.parse().map_err(|_| invalid())?;
        if hour >= 24 || minute >= 60 {
            return Err(invalid());
        }
        Ok(Self { hour, minute })
    }

    /// Converts to a chrono [`NaiveTime`].
    pub fn to_naive(self) -> NaiveTime {
        NaiveTime::from_hms_opt(u32::from(self.hour), u32::from(self.minute), 0)
            .expect("range checked on parse")
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for ClockTime {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
