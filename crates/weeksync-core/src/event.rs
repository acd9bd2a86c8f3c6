//! Derivation of event records from schedule slots.
//!
//! An [`EventRecord`] is a transient value: it is built immediately before
//! submission to the calendar service and discarded afterwards. The start
//! is anchored to the next occurrence of the slot's weekday (today counts)
//! in the schedule's timezone; recurrence is always weekly.

use chrono::{Duration, LocalResult, NaiveDate, TimeZone};
use chrono_tz::Tz;

use crate::error::ScheduleError;
use crate::schedule::SlotSpec;
use crate::week::{ClockTime, Weekday};

/// A fully-resolved event, ready for submission.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    /// Resolved title (slot override or composed default).
    pub title: String,
    /// Resolved description (slot override or empty).
    pub description: String,
    /// Timezone-aware start of the first occurrence.
    pub start: chrono::DateTime<Tz>,
    /// Timezone-aware end of the first occurrence.
    pub end: chrono::DateTime<Tz>,
    /// Weekly recurrence rule, e.g. `RRULE:FREQ=WEEKLY;BYDAY=MO`.
    pub recurrence: String,
}

impl EventRecord {
    /// Resolves `slot` into an event anchored to the next occurrence of
    /// `weekday` on or after `today`.
    ///
    /// Effective values: title falls back to `"{Weekday} {Slot}"` with the
    /// slot name title-cased, description to empty, duration to
    /// `default_duration_minutes`. Fails on a malformed slot time, and on
    /// a wall time that does not exist on the computed date (a
    /// daylight-saving spring-forward gap). An ambiguous wall time (a
    /// fall-back hour) resolves to its earlier mapping.
    pub fn build(
        weekday: Weekday,
        slot_name: &str,
        slot: &SlotSpec,
        default_duration_minutes: u32,
        tz: Tz,
        today: NaiveDate,
    ) -> Result<Self, ScheduleError> {
        let time = ClockTime::parse(&slot.time)?;
        let date = weekday.next_occurrence_from(today);

        let start = match tz.from_local_datetime(&date.and_time(time.to_naive())) {
            LocalResult::Single(dt) => dt,
            LocalResult::Ambiguous(earlier, _) => earlier,
            LocalResult::None => {
                return Err(ScheduleError::NonexistentLocalTime {
                    time: time.to_string(),
                    date,
                    zone: tz.name().to_string(),
                });
            }
        };

        let duration = slot.duration_minutes.unwrap_or(default_duration_minutes);
        let end = start + Duration::minutes(i64::from(duration));

        let title = slot
            .title
            .clone()
            .unwrap_or_else(|| format!("{} {}", weekday.name(), title_case(slot_name)));

        Ok(Self {
            title,
            description: slot.description.clone().unwrap_or_default(),
            start,
            end,
            recurrence: format!("RRULE:FREQ=WEEKLY;BYDAY={}", weekday.byday()),
        })
    }

    /// The slot's wall time, zero-padded ("09:00"), for operator output.
    pub fn start_time(&self) -> String {
        self.start.format("%H:%M").to_string()
    }
}

/// Title-cases each whitespace-separated word ("team standup" → "Team Standup").
pub fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
