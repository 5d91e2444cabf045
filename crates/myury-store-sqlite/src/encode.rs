//! Encoding and decoding helpers between Rust domain types and the plain
//! representations stored in SQLite columns.
//!
//! Metadata timestamps are stored as RFC 3339 UTC strings with a fixed
//! microsecond precision, so string comparison in SQL orders them correctly.
//! Schedule times are stored as whole unix seconds for interval arithmetic;
//! instants with a fractional second are rejected rather than truncated.

use chrono::{DateTime, SecondsFormat, TimeZone as _, Utc};
use myury_core::{
  metadata::{MetadataKey, MetadataValue, OwnerKind, OwnerRef},
  schedule::{ScheduleTimeslot, Term},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_epoch(dt: DateTime<Utc>) -> i64 { dt.timestamp() }

/// Unix seconds for `dt`, or `None` if it carries a fractional second.
pub fn whole_epoch(dt: DateTime<Utc>) -> Option<i64> {
  (dt.timestamp_subsec_nanos() == 0).then(|| dt.timestamp())
}

pub fn decode_epoch(secs: i64) -> Result<DateTime<Utc>> {
  Utc
    .timestamp_opt(secs, 0)
    .single()
    .ok_or_else(|| Error::DateParse(format!("timestamp out of range: {secs}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `metadata_keys` row.
pub struct RawKey {
  pub id:              i64,
  pub name:            String,
  pub allows_multiple: bool,
}

impl From<RawKey> for MetadataKey {
  fn from(raw: RawKey) -> Self {
    Self { id: raw.id, name: raw.name, allows_multiple: raw.allows_multiple }
  }
}

/// Raw values read from one of the `*_metadata` tables. The owner kind is
/// implied by the table queried.
pub struct RawMetadataValue {
  pub metadata_id:    i64,
  pub key_id:         i64,
  pub owner_id:       i64,
  pub value:          String,
  pub settor_id:      i64,
  pub approver_id:    i64,
  pub effective_from: String,
  pub effective_to:   Option<String>,
}

impl RawMetadataValue {
  /// Read a row selected with the column order of
  /// [`crate::store`]'s metadata `SELECT`.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      metadata_id:    row.get(0)?,
      key_id:         row.get(1)?,
      owner_id:       row.get(2)?,
      value:          row.get(3)?,
      settor_id:      row.get(4)?,
      approver_id:    row.get(5)?,
      effective_from: row.get(6)?,
      effective_to:   row.get(7)?,
    })
  }

  pub fn into_value(self, kind: OwnerKind) -> Result<MetadataValue> {
    Ok(MetadataValue {
      metadata_id:    self.metadata_id,
      key_id:         self.key_id,
      owner:          OwnerRef::new(kind, self.owner_id),
      value:          self.value,
      settor_id:      self.settor_id,
      approver_id:    self.approver_id,
      effective_from: decode_dt(&self.effective_from)?,
      effective_to:   self.effective_to.as_deref().map(decode_dt).transpose()?,
    })
  }
}

/// Raw values read from a `terms` row.
pub struct RawTerm {
  pub term_id:     i64,
  pub start_date:  i64,
  pub finish_date: i64,
  pub description: String,
}

impl RawTerm {
  pub fn into_term(self) -> Result<Term> {
    Ok(Term {
      term_id:     self.term_id,
      start_date:  decode_epoch(self.start_date)?,
      finish_date: decode_epoch(self.finish_date)?,
      description: self.description,
    })
  }
}

/// Raw values read from a `show_season_timeslots` row.
pub struct RawTimeslot {
  pub timeslot_id:   i64,
  pub season_id:     i64,
  pub start_time:    i64,
  pub duration_secs: i64,
}

impl RawTimeslot {
  pub fn into_timeslot(self) -> Result<ScheduleTimeslot> {
    Ok(ScheduleTimeslot {
      timeslot_id:   self.timeslot_id,
      season_id:     self.season_id,
      start_time:    decode_epoch(self.start_time)?,
      duration_secs: self.duration_secs,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn encoded_timestamps_sort_chronologically() {
    let a = decode_dt("2024-01-01T09:00:00Z").unwrap();
    let b = a + chrono::Duration::microseconds(1_500);
    let c = a + chrono::Duration::seconds(1);
    let encoded = [encode_dt(a), encode_dt(b), encode_dt(c)];
    assert!(encoded[0] < encoded[1] && encoded[1] < encoded[2]);
    assert_eq!(encoded[0].len(), encoded[2].len());
    assert_eq!(decode_dt(&encoded[1]).unwrap(), b);
  }

  #[test]
  fn fractional_seconds_have_no_epoch() {
    let whole = decode_dt("1970-01-08T00:00:00Z").unwrap();
    assert_eq!(whole_epoch(whole), Some(7 * 86_400));
    let frac = decode_dt("1970-01-08T00:00:00.900Z").unwrap();
    assert_eq!(whole_epoch(frac), None);
  }

  #[test]
  fn bad_timestamp_is_a_parse_error() {
    assert!(matches!(decode_dt("yesterday"), Err(Error::DateParse(_))));
  }
}
