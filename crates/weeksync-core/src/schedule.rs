//! Schedule file model and loader.
//!
//! The schedule is a single JSON document (`schedule.json` by default)
//! describing a weekly recurring plan: a timezone, a target calendar name,
//! attendees and reminder policy shared by every event, and per-weekday
//! time slots. It is loaded once at startup and never mutated.
//!
//! The `week` mapping (and the slot mapping under each weekday) keeps the
//! document's insertion order: the sync run iterates slots in the order
//! they were written, not in calendar order.

use std::fmt;
use std::marker::PhantomData;
use std::path::Path;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::error::ScheduleError;

/// A reminder override forwarded verbatim to the calendar service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderOverride {
    /// Delivery method, e.g. `"popup"` or `"email"`.
    pub method: String,
    /// Minutes before the event start.
    pub minutes: u32,
}

/// Account-wide defaults applied when a slot omits a value.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Defaults {
    /// Event duration in minutes when a slot has no override.
    pub duration_minutes: u32,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            duration_minutes: 30,
        }
    }
}

/// One declared time slot under a weekday.
#[derive(Debug, Clone, Deserialize)]
pub struct SlotSpec {
    /// Start time as a 24-hour `"HH:MM"` string. Validated lazily when
    /// the slot is synchronized, not at load time.
    pub time: String,
    /// Event title; defaults to `"{Weekday} {Slot}"` when absent.
    pub title: Option<String>,
    /// Event description; defaults to empty.
    pub description: Option<String>,
    /// Duration override in minutes.
    pub duration_minutes: Option<u32>,
}

/// Slots declared under one weekday, in document order.
#[derive(Debug, Clone, Default)]
pub struct SlotMap(pub Vec<(String, SlotSpec)>);

impl SlotMap {
    /// Iterates slots in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SlotSpec)> {
        self.0.iter().map(|(name, slot)| (name.as_str(), slot))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for SlotMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        ordered_map(deserializer).map(SlotMap)
    }
}

/// The whole schedule file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// IANA timezone name the whole schedule is expressed in.
    pub timezone: String,
    /// Display name of the target calendar.
    pub calendar_name: String,
    /// Attendee email addresses invited to every event.
    pub attendees: Vec<String>,
    /// Reminder overrides applied to every event.
    pub reminders: Vec<ReminderOverride>,
    /// Account-wide defaults.
    pub defaults: Defaults,
    /// Weekday name → slots, in document order.
    #[serde(deserialize_with = "ordered_map")]
    pub week: Vec<(String, SlotMap)>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            calendar_name: "Your Calendar".to_string(),
            attendees: Vec::new(),
            reminders: vec![ReminderOverride {
                method: "popup".to_string(),
                minutes: 15,
            }],
            defaults: Defaults::default(),
            week: Vec::new(),
        }
    }
}

impl ScheduleConfig {
    /// Loads a schedule from `path`.
    ///
    /// Fails if the file is missing, unreadable, or not valid JSON.
    /// Weekday names and slot times are validated later, per slot.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScheduleError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ScheduleError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|source| ScheduleError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(
            "loaded schedule from {} ({} slots)",
            path.display(),
            config.slot_count()
        );
        Ok(config)
    }

    /// Resolves the configured timezone name to a [`chrono_tz::Tz`].
    pub fn timezone(&self) -> Result<chrono_tz::Tz, ScheduleError> {
        self.timezone
            .parse()
            .map_err(|_| ScheduleError::InvalidTimezone(self.timezone.clone()))
    }

    /// Total number of declared slots across all weekdays.
    pub fn slot_count(&self) -> usize {
        self.week.iter().map(|(_, slots)| slots.len()).sum()
    }
}

/// Deserializes a JSON object into a vector of entries, preserving the
/// document's key order (serde's default map types do not).
fn ordered_map<'de, D, T>(deserializer: D) -> Result<Vec<(String, T)>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    struct Entries<T>(PhantomData<T>);

    impl<'de, T: Deserialize<'de>> Visitor<'de> for Entries<T> {
        type Value = Vec<(String, T)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
            while let Some(entry) = access.next_entry()? {
                entries.push(entry);
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_map(Entries(PhantomData))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(json: &str) -> ScheduleConfig {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn full_schedule_parses() {
        let config = parse(
            r#"{
                "timezone": "Europe/Paris",
                "calendar_name": "Team Schedule",
                "attendees": ["a@example.com", "b@example.com"],
                "reminders": [{"method": "email", "minutes": 30}],
                "defaults": {"duration_minutes": 45},
                "week": {
                    "monday": {
                        "standup": {"time": "09:00", "duration_minutes": 15},
                        "review": {"time": "16:00", "title": "Weekly Review"}
                    }
                }
            }"#,
        );

        assert_eq!(config.timezone, "Europe/Paris");
        assert_eq!(config.calendar_name, "Team Schedule");
        assert_eq!(config.attendees.len(), 2);
        assert_eq!(config.reminders[0].method, "email");
        assert_eq!(config.defaults.duration_minutes, 45);
        assert_eq!(config.slot_count(), 2);

        let (day, slots) = &config.week[0];
        assert_eq!(day, "monday");
        assert_eq!(slots.0[1].1.title.as_deref(), Some("Weekly Review"));
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config = parse("{}");
        assert_eq!(config.timezone, "UTC");
        assert_eq!(config.calendar_name, "Your Calendar");
        assert!(config.attendees.is_empty());
        assert_eq!(config.reminders.len(), 1);
        assert_eq!(config.reminders[0].method, "popup");
        assert_eq!(config.reminders[0].minutes, 15);
        assert_eq!(config.defaults.duration_minutes, 30);
        assert!(config.week.is_empty());
    }

    #[test]
    fn week_preserves_document_order() {
        let config = parse(
            r#"{
                "week": {
                    "wednesday": {"w1": {"time": "10:00"}},
                    "monday": {
                        "late": {"time": "18:00"},
                        "early": {"time": "08:00"}
                    },
                    "friday": {"f1": {"time": "12:00"}}
                }
            }"#,
        );

        let days: Vec<&str> = config.week.iter().map(|(d, _)| d.as_str()).collect();
        assert_eq!(days, ["wednesday", "monday", "friday"]);

        let monday_slots: Vec<&str> = config.week[1].1.iter().map(|(name, _)| name).collect();
        assert_eq!(monday_slots, ["late", "early"]);
    }

    #[test]
    fn slot_without_time_is_a_parse_error() {
        let result: Result<ScheduleConfig, _> =
            serde_json::from_str(r#"{"week": {"monday": {"standup": {"title": "x"}}}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn load_missing_file_fails_with_read_error() {
        let err = ScheduleConfig::load("/nonexistent/schedule.json").unwrap_err();
        assert!(matches!(err, ScheduleError::Read { .. }));
    }

    #[test]
    fn load_invalid_json_fails_with_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = ScheduleConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ScheduleError::Parse { .. }));
    }

    #[test]
    fn timezone_resolution() {
        let config = parse(r#"{"timezone": "America/New_York"}"#);
        assert_eq!(config.timezone().unwrap(), chrono_tz::America::New_York);

        let config = parse(r#"{"timezone": "Mars/Olympus_Mons"}"#);
        assert!(matches!(
            config.timezone(),
            Err(ScheduleError::InvalidTimezone(_))
        ));
    }
}
