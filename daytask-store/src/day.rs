//! Day-of-week labels used as task buckets.
//!
//! The server reads the current day in two places: once at startup for the
//! console progress bar, and again on every `GET /tasks`. Both go through a
//! [`Clock`] so the two readings stay independent of each other.

use chrono::{Datelike, Local, Weekday};

/// Returns the English day name for a weekday (`"Monday"` .. `"Sunday"`).
#[must_use]
pub const fn weekday_label(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Source of the current day label.
pub trait Clock: Send + Sync {
    /// Label of the day bucket that "today" falls in.
    fn today(&self) -> String;
}

/// Wall-clock [`Clock`] using the local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> String {
        weekday_label(Local::now().weekday()).to_string()
    }
}

/// A [`Clock`] pinned to one label.
#[derive(Debug, Clone)]
pub struct FixedClock(String);

impl FixedClock {
    /// Creates a clock that always reports `day`.
    #[must_use]
    pub fn new(day: impl Into<String>) -> Self {
        Self(day.into())
    }
}

impl Clock for FixedClock {
    fn today(&self) -> String {
        self.0.clone()
    }
}
