//! Metadata types — versioned key/value attributes of shows, seasons and
//! timeslots.
//!
//! Metadata rows are append-only. A row is "open" (currently active) while its
//! `effective_to` is unset; replacing a value closes the old row at the moment
//! the new one takes effect rather than deleting it.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{Error, Result};

// ─── Owners ──────────────────────────────────────────────────────────────────

/// The kind of schedulable entity a metadata row is attached to.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OwnerKind {
  Show,
  Season,
  Timeslot,
}

impl OwnerKind {
  pub const ALL: [OwnerKind; 3] = [Self::Show, Self::Season, Self::Timeslot];

  /// The table holding metadata rows for this kind of owner.
  pub fn table(self) -> &'static str {
    match self {
      Self::Show => "show_metadata",
      Self::Season => "season_metadata",
      Self::Timeslot => "timeslot_metadata",
    }
  }

  /// The column of [`Self::table`] referencing the owning entity.
  pub fn owner_column(self) -> &'static str {
    match self {
      Self::Show => "show_id",
      Self::Season => "show_season_id",
      Self::Timeslot => "show_season_timeslot_id",
    }
  }

  /// Map a raw table/column pairing back to an owner kind.
  ///
  /// Only the three fixed pairings are accepted; anything else would write
  /// metadata against the wrong kind of entity.
  pub fn from_storage(table: &str, field: &str) -> Result<Self> {
    let kind = Self::ALL
      .into_iter()
      .find(|k| k.table() == table)
      .ok_or_else(|| Error::InvalidTable(table.to_owned()))?;

    if kind.owner_column() != field {
      return Err(Error::InvalidOwnerField {
        table: table.to_owned(),
        field: field.to_owned(),
      });
    }
    Ok(kind)
  }
}

/// A reference to one show, season or timeslot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerRef {
  pub kind: OwnerKind,
  pub id:   i64,
}

impl OwnerRef {
  pub fn new(kind: OwnerKind, id: i64) -> Self { Self { kind, id } }

  pub fn show(id: i64) -> Self { Self::new(OwnerKind::Show, id) }

  pub fn season(id: i64) -> Self { Self::new(OwnerKind::Season, id) }

  pub fn timeslot(id: i64) -> Self { Self::new(OwnerKind::Timeslot, id) }
}

// ─── Keys ────────────────────────────────────────────────────────────────────

/// A registered metadata key, e.g. `title` or `tag`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataKey {
  pub id:              i64,
  pub name:            String,
  /// Whether an owner may hold several active values for this key at once.
  pub allows_multiple: bool,
}

// ─── Values ──────────────────────────────────────────────────────────────────

/// One stored version of a metadata value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataValue {
  pub metadata_id:    i64,
  pub key_id:         i64,
  pub owner:          OwnerRef,
  pub value:          String,
  /// Member who set the value.
  pub settor_id:      i64,
  /// Member who approved the value.
  pub approver_id:    i64,
  pub effective_from: DateTime<Utc>,
  /// `None` while the row is open.
  pub effective_to:   Option<DateTime<Utc>>,
}

impl MetadataValue {
  pub fn is_open(&self) -> bool { self.effective_to.is_none() }

  /// Whether `at` falls within `[effective_from, effective_to)`.
  pub fn is_effective_at(&self, at: DateTime<Utc>) -> bool {
    self.effective_from <= at && self.effective_to.is_none_or(|to| at < to)
  }
}

/// A value supplied by a caller: one scalar, or a set of scalars for keys that
/// allow multiple values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataInput {
  Single(String),
  Multiple(Vec<String>),
}

impl From<&str> for MetadataInput {
  fn from(value: &str) -> Self { Self::Single(value.to_owned()) }
}

impl From<String> for MetadataInput {
  fn from(value: String) -> Self { Self::Single(value) }
}

impl From<Vec<String>> for MetadataInput {
  fn from(values: Vec<String>) -> Self { Self::Multiple(values) }
}

impl<const N: usize> From<[&str; N]> for MetadataInput {
  fn from(values: [&str; N]) -> Self {
    Self::Multiple(values.iter().map(|v| (*v).to_owned()).collect())
  }
}

/// The validity window of a new value. Defaults to "from now, open-ended".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectiveRange {
  pub from: DateTime<Utc>,
  pub to:   Option<DateTime<Utc>>,
}

impl EffectiveRange {
  pub fn starting_now() -> Self { Self::starting_at(Utc::now()) }

  pub fn starting_at(from: DateTime<Utc>) -> Self { Self { from, to: None } }

  pub fn until(mut self, to: DateTime<Utc>) -> Self {
    self.to = Some(to);
    self
  }
}

impl Default for EffectiveRange {
  fn default() -> Self { Self::starting_now() }
}

// ─── Writes ──────────────────────────────────────────────────────────────────

/// A row to be inserted by a [`MetadataWrite`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMetadataValue {
  pub value:          String,
  pub settor_id:      i64,
  pub approver_id:    i64,
  pub effective_from: DateTime<Utc>,
  pub effective_to:   Option<DateTime<Utc>>,
}

/// The storage changes needed to apply a [`WriteRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataWrite {
  pub owner:         OwnerRef,
  pub key_id:        i64,
  /// Close every open row for `(owner, key_id)` at this instant first.
  pub close_open_at: Option<DateTime<Utc>>,
  pub inserts:       Vec<NewMetadataValue>,
}

/// A validated request to set a metadata value.
///
/// Built with [`WriteRequest::new`], which rejects sets of values for keys
/// that only allow one. Storage backends call [`WriteRequest::plan`] with the
/// currently open values, inside the same transaction that applies the result.
#[derive(Debug, Clone)]
pub struct WriteRequest {
  key:        MetadataKey,
  owner:      OwnerRef,
  candidates: Vec<String>,
  range:      EffectiveRange,
  actor_id:   i64,
}

impl WriteRequest {
  pub fn new(
    key: MetadataKey,
    owner: OwnerRef,
    input: MetadataInput,
    range: EffectiveRange,
    actor_id: i64,
  ) -> Result<Self> {
    let candidates = match input {
      MetadataInput::Single(v) => vec![v],
      MetadataInput::Multiple(_) if !key.allows_multiple => {
        return Err(Error::MultipleValuesNotAllowed(key.name));
      }
      MetadataInput::Multiple(vs) => {
        let mut unique: Vec<String> = Vec::with_capacity(vs.len());
        for v in vs {
          if !unique.contains(&v) {
            unique.push(v);
          }
        }
        unique
      }
    };

    Ok(Self { key, owner, candidates, range, actor_id })
  }

  pub fn key(&self) -> &MetadataKey { &self.key }

  pub fn owner(&self) -> OwnerRef { self.owner }

  pub fn actor_id(&self) -> i64 { self.actor_id }

  /// Decide what to write given the values currently open for this owner and
  /// key. Returns `None` when the request would not change anything.
  pub fn plan<'a, I>(&self, current: I) -> Option<MetadataWrite>
  where
    I: IntoIterator<Item = &'a str>,
  {
    let current: Vec<&str> = current.into_iter().collect();

    let fresh: Vec<&String> = self
      .candidates
      .iter()
      .filter(|c| !current.contains(&c.as_str()))
      .collect();

    if fresh.is_empty() {
      return None;
    }

    let (close_open_at, effective_to) = if self.key.allows_multiple {
      (None, None)
    } else {
      (Some(self.range.from), self.range.to)
    };

    let inserts = fresh
      .into_iter()
      .map(|value| NewMetadataValue {
        value: value.clone(),
        settor_id: self.actor_id,
        approver_id: self.actor_id,
        effective_from: self.range.from,
        effective_to,
      })
      .collect();

    Some(MetadataWrite {
      owner: self.owner,
      key_id: self.key.id,
      close_open_at,
      inserts,
    })
  }
}

/// Result of applying a [`WriteRequest`].
#[derive(Debug, Clone)]
pub struct WriteOutcome {
  /// `false` if the request was a no-op.
  pub changed: bool,
  /// Open rows for the owner and key after the write.
  pub current: Vec<MetadataValue>,
}

// ─── In-memory mirror ────────────────────────────────────────────────────────

/// The open metadata of one owner, keyed by metadata key id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerMetadata {
  pub owner: OwnerRef,
  values:    HashMap<i64, Vec<MetadataValue>>,
}

impl OwnerMetadata {
  pub fn new(owner: OwnerRef) -> Self {
    Self { owner, values: HashMap::new() }
  }

  /// Group `rows` by key. Rows belonging to other owners are ignored.
  pub fn from_rows(owner: OwnerRef, rows: Vec<MetadataValue>) -> Self {
    let mut meta = Self::new(owner);
    for row in rows.into_iter().filter(|r| r.owner == owner) {
      meta.values.entry(row.key_id).or_default().push(row);
    }
    meta
  }

  /// Open rows for `key_id`; empty if none.
  pub fn rows(&self, key_id: i64) -> &[MetadataValue] {
    self.values.get(&key_id).map(Vec::as_slice).unwrap_or_default()
  }

  /// Replace the mirrored rows for `key_id` with `rows`.
  pub fn replace(&mut self, key_id: i64, rows: Vec<MetadataValue>) {
    if rows.is_empty() {
      self.values.remove(&key_id);
    } else {
      self.values.insert(key_id, rows);
    }
  }

  pub fn key_ids(&self) -> impl Iterator<Item = i64> + '_ {
    self.values.keys().copied()
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn key(allows_multiple: bool) -> MetadataKey {
    MetadataKey { id: 7, name: "tag".into(), allows_multiple }
  }

  fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap()
  }

  #[test]
  fn owner_kind_storage_pairs() {
    for kind in OwnerKind::ALL {
      assert_eq!(
        OwnerKind::from_storage(kind.table(), kind.owner_column()).unwrap(),
        kind
      );
    }
  }

  #[test]
  fn owner_kind_rejects_unknown_table() {
    let err = OwnerKind::from_storage("member", "memberid").unwrap_err();
    assert!(matches!(err, Error::InvalidTable(t) if t == "member"));
  }

  #[test]
  fn owner_kind_rejects_mismatched_column() {
    let err = OwnerKind::from_storage("show_metadata", "show_season_id")
      .unwrap_err();
    assert!(matches!(err, Error::InvalidOwnerField { .. }));
  }

  #[test]
  fn owner_kind_parses_from_path_segment() {
    assert_eq!("season".parse::<OwnerKind>().unwrap(), OwnerKind::Season);
    assert_eq!(OwnerKind::Timeslot.to_string(), "timeslot");
    assert!("member".parse::<OwnerKind>().is_err());
  }

  #[test]
  fn set_rejected_for_single_key() {
    let err = WriteRequest::new(
      key(false),
      OwnerRef::show(1),
      MetadataInput::from(["a"]),
      EffectiveRange::starting_at(at(0)),
      1,
    )
    .unwrap_err();
    assert!(matches!(err, Error::MultipleValuesNotAllowed(n) if n == "tag"));
  }

  #[test]
  fn single_key_unchanged_value_is_noop() {
    let req = WriteRequest::new(
      key(false),
      OwnerRef::show(1),
      "Jazz Hour".into(),
      EffectiveRange::starting_at(at(100)),
      3,
    )
    .unwrap();
    assert!(req.plan(["Jazz Hour"]).is_none());
  }

  #[test]
  fn single_key_new_value_closes_and_inserts() {
    let req = WriteRequest::new(
      key(false),
      OwnerRef::show(1),
      "Late Jazz".into(),
      EffectiveRange::starting_at(at(100)).until(at(500)),
      3,
    )
    .unwrap();
    let write = req.plan(["Jazz Hour"]).unwrap();
    assert_eq!(write.close_open_at, Some(at(100)));
    assert_eq!(write.inserts.len(), 1);
    assert_eq!(write.inserts[0].value, "Late Jazz");
    assert_eq!(write.inserts[0].effective_to, Some(at(500)));
    assert_eq!(write.inserts[0].settor_id, 3);
    assert_eq!(write.inserts[0].approver_id, 3);
  }

  #[test]
  fn multiple_key_filters_active_and_duplicates() {
    let req = WriteRequest::new(
      key(true),
      OwnerRef::season(4),
      MetadataInput::from(["b", "c", "c"]),
      EffectiveRange::starting_at(at(0)).until(at(10)),
      1,
    )
    .unwrap();
    let write = req.plan(["a", "b"]).unwrap();
    assert_eq!(write.close_open_at, None);
    let values: Vec<_> = write.inserts.iter().map(|i| i.value.as_str()).collect();
    assert_eq!(values, ["c"]);
    assert_eq!(write.inserts[0].effective_to, None);
  }

  #[test]
  fn multiple_key_all_present_is_noop() {
    let req = WriteRequest::new(
      key(true),
      OwnerRef::season(4),
      MetadataInput::from(["a", "b"]),
      EffectiveRange::starting_at(at(0)),
      1,
    )
    .unwrap();
    assert!(req.plan(["a", "b", "z"]).is_none());
  }

  #[test]
  fn effective_range_is_half_open() {
    let row = MetadataValue {
      metadata_id:    1,
      key_id:         1,
      owner:          OwnerRef::show(1),
      value:          "x".into(),
      settor_id:      1,
      approver_id:    1,
      effective_from: at(10),
      effective_to:   Some(at(20)),
    };
    assert!(!row.is_effective_at(at(9)));
    assert!(row.is_effective_at(at(10)));
    assert!(row.is_effective_at(at(19)));
    assert!(!row.is_effective_at(at(20)));
  }
}
