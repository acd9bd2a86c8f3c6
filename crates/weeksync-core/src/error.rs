//! Error types for schedule loading and event derivation.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while loading a schedule or deriving events from it.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// The schedule file could not be read.
    #[error("failed to read schedule file {path}: {source}")]
    Read {
        /// Path that was attempted.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The schedule file is not valid JSON (or not the expected shape).
    #[error("failed to parse schedule file {path}: {source}")]
    Parse {
        /// Path that was attempted.
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A weekday key is not one of the seven recognized names.
    #[error("invalid weekday: {0}")]
    InvalidWeekday(String),

    /// A slot time is not a valid 24-hour HH:MM string.
    #[error("invalid time {0:?}: expected 24-hour HH:MM")]
    InvalidTime(String),

    /// The configured timezone is not a known IANA zone name.
    #[error("unknown timezone: {0}")]
    InvalidTimezone(String),

    /// The slot's wall time does not exist on the computed date
    /// (it falls inside a daylight-saving spring-forward gap).
    #[error("local time {time} does not exist on {date} in {zone}")]
    NonexistentLocalTime {
        /// The wall time from the slot.
        time: String,
        /// The computed occurrence date.
        date: chrono::NaiveDate,
        /// The configured zone.
        zone: String,
    },
}
