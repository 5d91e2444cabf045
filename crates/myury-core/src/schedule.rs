//! Schedule types: terms, booked timeslots and proposed weekly slots.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const SECONDS_PER_DAY: i64 = 86_400;

/// Number of teaching weeks a weekly slot is projected over.
pub const TERM_WEEKS: u32 = 10;

const DAY_NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

// ─── Formatting ──────────────────────────────────────────────────────────────

/// Short name for a day of the week, where 0 is Monday.
pub fn day_name(day: u8) -> Result<&'static str> {
  DAY_NAMES
    .get(usize::from(day))
    .copied()
    .ok_or(Error::InvalidDay(day))
}

/// `HH:MM` for a number of seconds after midnight. Wraps past 24 hours.
pub fn format_time_of_day(seconds: u32) -> String {
  let minutes = (seconds / 60) % (24 * 60);
  format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

// ─── Terms ───────────────────────────────────────────────────────────────────

/// An academic term. Week 0 begins at `start_date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
  pub term_id:     i64,
  pub start_date:  DateTime<Utc>,
  pub finish_date: DateTime<Utc>,
  pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTerm {
  pub start_date:  DateTime<Utc>,
  pub finish_date: DateTime<Utc>,
  pub description: String,
}

// ─── Timeslots ───────────────────────────────────────────────────────────────

/// A booked timeslot occupying `[start_time, start_time + duration_secs)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleTimeslot {
  pub timeslot_id:   i64,
  pub season_id:     i64,
  pub start_time:    DateTime<Utc>,
  pub duration_secs: i64,
}

impl ScheduleTimeslot {
  pub fn end_time(&self) -> DateTime<Utc> {
    self.start_time + Duration::seconds(self.duration_secs)
  }

  /// Whether this timeslot overlaps the half-open interval `[start, end)`.
  ///
  /// Either the timeslot starts at or before `start` and runs past it, or it
  /// starts strictly inside the interval.
  pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    (self.start_time <= start && self.end_time() > start)
      || (self.start_time > start && self.start_time < end)
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTimeslot {
  pub season_id:     i64,
  pub start_time:    DateTime<Utc>,
  pub duration_secs: i64,
}

// ─── Proposed slots ──────────────────────────────────────────────────────────

/// A weekly recurring slot someone would like to book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedSlot {
  /// 0 is Monday.
  pub day:           u8,
  /// Seconds after midnight.
  pub start_secs:    u32,
  pub duration_secs: u32,
}

impl ProposedSlot {
  pub fn validate(&self) -> Result<()> {
    day_name(self.day)?;
    if self.start_secs >= SECONDS_PER_DAY as u32 {
      return Err(Error::InvalidSlot(format!(
        "start offset {}s is not within a day",
        self.start_secs
      )));
    }
    if self.duration_secs == 0 {
      return Err(Error::InvalidSlot("duration must be positive".into()));
    }
    Ok(())
  }

  /// The absolute `[start, end)` interval of this slot in `week` of a term
  /// starting at `term_start`. Fails if the interval is past the end of the
  /// representable calendar.
  pub fn project(
    &self,
    term_start: DateTime<Utc>,
    week: u32,
  ) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let days = i64::from(week) * 7 + i64::from(self.day);
    let offset =
      Duration::seconds(days * SECONDS_PER_DAY + i64::from(self.start_secs));
    let out_of_range = || {
      Error::InvalidSlot(format!("{self} in week {week} is out of date range"))
    };

    let start = term_start
      .checked_add_signed(offset)
      .ok_or_else(out_of_range)?;
    let end = start
      .checked_add_signed(Duration::seconds(i64::from(self.duration_secs)))
      .ok_or_else(out_of_range)?;
    Ok((start, end))
  }
}

impl fmt::Display for ProposedSlot {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let day = day_name(self.day).unwrap_or("???");
    write!(
      f,
      "{day} {} ({} min)",
      format_time_of_day(self.start_secs),
      self.duration_secs / 60
    )
  }
}
