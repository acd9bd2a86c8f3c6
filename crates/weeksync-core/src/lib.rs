//! Core types: schedule model, weekday/time math, event derivation

pub mod error;
pub mod event;
pub mod schedule;
pub mod week;

pub use error::ScheduleError;
pub use event::{EventRecord, title_case};
pub use schedule::{Defaults, ReminderOverride, ScheduleConfig, SlotMap, SlotSpec};
pub use week::{ClockTime, Weekday};
