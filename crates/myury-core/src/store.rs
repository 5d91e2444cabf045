//! The storage traits implemented by backends (e.g. `myury-store-sqlite`).
//!
//! Higher layers (`myury-api`, the services in this crate) depend on these
//! abstractions, not on a concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  error::StoreError,
  metadata::{MetadataKey, MetadataValue, OwnerRef, WriteOutcome, WriteRequest},
  schedule::{NewTerm, NewTimeslot, ScheduleTimeslot, Term},
};

/// Bulk source of metadata key definitions.
pub trait KeySource: Send + Sync {
  type Error: StoreError;

  /// Load every registered key in a single query.
  fn load_metadata_keys(
    &self,
  ) -> impl Future<Output = Result<Vec<MetadataKey>, Self::Error>> + Send + '_;
}

/// Abstraction over a scheduler storage backend.
///
/// Metadata rows are append-only: writes insert rows and close open ones, but
/// nothing is ever deleted.
pub trait SchedulerStore: KeySource {
  // ── Metadata keys ─────────────────────────────────────────────────────

  /// Register a new metadata key.
  fn create_metadata_key(
    &self,
    name: String,
    allows_multiple: bool,
  ) -> impl Future<Output = Result<MetadataKey, Self::Error>> + Send + '_;

  // ── Metadata values ───────────────────────────────────────────────────

  /// Open rows for `owner`, optionally restricted to one key.
  fn open_metadata(
    &self,
    owner: OwnerRef,
    key_id: Option<i64>,
  ) -> impl Future<Output = Result<Vec<MetadataValue>, Self::Error>> + Send + '_;

  /// Atomically read the open values for the request's owner and key, plan
  /// the write, and apply it.
  fn set_metadata(
    &self,
    request: WriteRequest,
  ) -> impl Future<Output = Result<WriteOutcome, Self::Error>> + Send + '_;

  /// Every row ever written for `owner` and `key_id`, oldest first.
  fn metadata_history(
    &self,
    owner: OwnerRef,
    key_id: i64,
  ) -> impl Future<Output = Result<Vec<MetadataValue>, Self::Error>> + Send + '_;

  /// Rows for `owner` and `key_id` whose effective range contains `at`.
  fn metadata_at(
    &self,
    owner: OwnerRef,
    key_id: i64,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<MetadataValue>, Self::Error>> + Send + '_;

  // ── Terms ─────────────────────────────────────────────────────────────

  fn add_term(
    &self,
    term: NewTerm,
  ) -> impl Future<Output = Result<Term, Self::Error>> + Send + '_;

  /// Retrieve a term by id. Returns `None` if not found.
  fn get_term(
    &self,
    term_id: i64,
  ) -> impl Future<Output = Result<Option<Term>, Self::Error>> + Send + '_;

  // ── Timeslots ─────────────────────────────────────────────────────────

  fn book_timeslot(
    &self,
    timeslot: NewTimeslot,
  ) -> impl Future<Output = Result<ScheduleTimeslot, Self::Error>> + Send + '_;

  /// The earliest-starting booked timeslot overlapping `[start, end)`.
  fn first_overlapping_timeslot(
    &self,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<ScheduleTimeslot>, Self::Error>>
  + Send
  + '_;
}
